use thiserror::Error;

/// Programmer-error / malformed-input failures.
///
/// Recoverable "no derivation" conditions (§7 of the design doc: `NoDerivation`,
/// `PathInfeasible`, `EmptyRules`, `ConstraintReject`) are deliberately *not*
/// represented here -- they surface as `None` from `Chart::expand` and friends,
/// with a `tracing` event at the call site instead of an `Err`.
#[derive(Debug, Error)]
pub enum ChartError {
  #[error("span out of bounds: ({i}, {j}) for sentence of length {len}")]
  SpanOutOfBounds { i: usize, j: usize, len: usize },

  #[error("trie construction conflict: node already has a rule collection for source RHS ending here")]
  DuplicateRuleCollection,

  #[error("malformed grammar source: {0}")]
  GrammarSyntax(String),

  #[error("unification failure: {0}")]
  Unification(String),

  #[error("unknown vocabulary id: {0}")]
  UnknownId(i32),
}

pub type Result<T> = std::result::Result<T, ChartError>;
