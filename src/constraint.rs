use crate::feature::DpState;

/// Optional constrained-decoding gate: only hyperedges whose resulting
/// dp-state is legal are admitted into a cell.
pub trait StateConstraint: std::fmt::Debug {
  fn is_legal(&self, dp_states: &DpState) -> bool;
}

/// Rejects every candidate. Useful for testing the "constraint folds into
/// NoDerivation" path (design doc §7, scenario E6) without wiring up a real
/// target-prefix tracker.
#[derive(Debug, Default)]
pub struct RejectAll;

impl StateConstraint for RejectAll {
  fn is_legal(&self, _dp_states: &DpState) -> bool {
    false
  }
}

/// Admits a dp-state only if it is a prefix of (or equal to) `target`. This
/// is the shape of real forced-decoding constraints, parameterized over a
/// fixed integerized target string; how dp-states actually encode target
/// positions is a feature-function concern external to this crate.
#[derive(Debug)]
pub struct PrefixConstraint {
  target: Vec<i32>,
}

impl PrefixConstraint {
  pub fn new(target: Vec<i32>) -> Self {
    Self { target }
  }
}

impl StateConstraint for PrefixConstraint {
  fn is_legal(&self, dp_states: &DpState) -> bool {
    dp_states.len() <= self.target.len() && dp_states[..] == self.target[..dp_states.len()]
  }
}
