use crate::lattice::Sentence;

/// Configuration surface consumed by [`crate::chart::Chart`]. No file or
/// environment parsing layer lives here: the embedding decoder constructs
/// this directly from whatever configuration mechanism it already has.
#[derive(Debug, Clone)]
pub struct ChartConfig {
  /// Cube-pruning pop bound per span; `0` means unbounded.
  pub pop_limit: usize,
  /// OOV-rule creation policy, consumed by an external OOV loader; the core
  /// only carries the flag through.
  pub true_oovs_only: bool,
  /// Selects [`Chart::expand`](crate::chart::Chart::expand) vs
  /// [`Chart::expand_sans_dot_chart`](crate::chart::Chart::expand_sans_dot_chart).
  pub use_dot_chart: bool,
  /// Inside-beam cutoff passed through to every `Cell::add_hyperedge` call.
  pub beam_width: Option<f64>,
}

impl Default for ChartConfig {
  fn default() -> Self {
    Self {
      pop_limit: 0,
      true_oovs_only: false,
      use_dot_chart: true,
      beam_width: None,
    }
  }
}

impl ChartConfig {
  /// Not a stored setting: derived from whether `sentence` carries a forced
  /// target string.
  pub fn constrained_decoding(sentence: &Sentence) -> bool {
    sentence.is_constrained()
  }
}
