use std::rc::Rc;

use crate::rule::Rule;

/// Opaque non-local context produced by the feature functions, e.g. LM
/// boundary words. Two `HGNode`s in the same cell are the same node iff
/// their `(lhs, DpState)` pair coincides.
pub type DpState = Vec<i32>;

/// What a tail antecedent contributes to scoring: its merged dp-state and
/// its own best inside score (so `transition_cost` can be combined into a
/// running viterbi cost without re-walking the hyperedge).
#[derive(Debug, Clone)]
pub struct TailInfo {
  pub dp_state: DpState,
  pub best_score: f64,
}

#[derive(Debug, Clone)]
pub struct NodeResult {
  pub transition_cost: f64,
  pub viterbi_cost: f64,
  pub future_cost: f64,
  pub dp_states: DpState,
}

impl NodeResult {
  /// The quantity `CubePruneState`s are ranked by: higher is better.
  pub fn pruning_score(&self) -> f64 {
    self.viterbi_cost + self.future_cost
  }
}

/// A single feature function: scores one hyperedge application given the
/// rule and its already-scored tails, contributing a transition cost and a
/// fragment of the resulting dp-state.
pub trait FeatureFunction: std::fmt::Debug {
  fn transition_cost(&self, rule: &Rule, tails: &[TailInfo]) -> f64;

  /// Dp-state fragment this function contributes; fragments from every
  /// active feature function are concatenated, in function order, to form
  /// the node's full `DpState`. Defaults to none.
  fn dp_fragment(&self, _rule: &Rule, _tails: &[TailInfo]) -> DpState {
    Vec::new()
  }

  /// Heuristic estimate of remaining (outside) cost; 0 unless a function
  /// can estimate it cheaply. Purely additive to `pruning_score`.
  fn future_cost(&self, _rule: &Rule, _tails: &[TailInfo]) -> f64 {
    0.0
  }
}

/// Sums `rule.estimated_score` and forwards a tag (the rule's `lhs`) as the
/// dp-state. Good enough to exercise merging/unary-closure semantics in
/// tests without a real language model.
#[derive(Debug, Default)]
pub struct RuleScoreFeature;

impl FeatureFunction for RuleScoreFeature {
  fn transition_cost(&self, rule: &Rule, _tails: &[TailInfo]) -> f64 {
    rule.estimated_score
  }
}

/// Applies every feature function in `functions`, in order, accumulating
/// transition cost, dp-state fragments, and future cost; combines with the
/// tails' own best scores to produce the node's viterbi cost.
pub fn compute_node_result(
  functions: &[Rc<dyn FeatureFunction>],
  rule: &Rule,
  tails: &[TailInfo],
) -> NodeResult {
  let mut transition_cost = 0.0;
  let mut future_cost = 0.0;
  let mut dp_states = Vec::new();

  for f in functions {
    transition_cost += f.transition_cost(rule, tails);
    future_cost += f.future_cost(rule, tails);
    dp_states.extend(f.dp_fragment(rule, tails));
  }

  let tails_inside: f64 = tails.iter().map(|t| t.best_score).sum();
  let viterbi_cost = transition_cost + tails_inside;

  NodeResult {
    transition_cost,
    viterbi_cost,
    future_cost,
    dp_states,
  }
}
