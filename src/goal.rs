//! Final transition from `Cell(0, n)` to a single goal node.

use std::rc::Rc;

use crate::cell::NodeId;
use crate::chart_span::ChartSpan;
use crate::rule::{Production, Rule};
use crate::vocab::Vocabulary;

/// A handle into the chart's arena: the root of the accepted derivation.
/// Non-owning -- it is only valid as long as the `ChartSpan` that produced
/// it is still alive (it is never dropped mid-decode: the chart and its
/// goal handle are returned to the caller together).
#[derive(Debug, Clone, Copy)]
pub struct HyperGraph {
  pub root: NodeId,
  pub span: (usize, usize),
}

/// For every `HGNode` in `Cell(0,n)` with `lhs == target_lhs`, attaches a
/// zero-cost goal hyperedge (`GOAL -> target_lhs`) into a single synthetic
/// `HGNode` tagged with the vocabulary's reserved `GOAL` id; the usual cell
/// merge logic means that node ends up rooted at the best-scoring
/// candidate. Returns `None` (NoDerivation) if the cell is absent or no
/// node carries `target_lhs`.
pub fn assemble_goal(
  chart: &mut ChartSpan,
  vocab: &Vocabulary,
  target_lhs: i32,
  n: usize,
) -> Option<HyperGraph> {
  if n == 0 {
    return None;
  }
  let mut cell = chart.take_or_create(0, n);
  let candidates: Vec<NodeId> = cell
    .node_ids()
    .filter(|&id| cell.node(id).lhs == target_lhs)
    .collect();

  if candidates.is_empty() {
    chart.put(0, n, cell);
    return None;
  }

  let goal_id = vocab.goal_id();
  let mut root = None;
  for node_id in candidates {
    let tail_score = cell.node(node_id).best_score;
    let goal_rule = Rc::new(Rule::new(
      goal_id,
      vec![Production::Nonterminal(target_lhs)],
      vec![],
      vec![],
      0.0,
    ));
    let result = crate::feature::NodeResult {
      transition_cost: 0.0,
      viterbi_cost: tail_score,
      future_cost: 0.0,
      dp_states: Vec::new(),
    };
    root = cell.add_hyperedge(&result, goal_rule, vec![node_id], Vec::new(), None);
  }

  chart.put(0, n, cell);
  root.map(|root| HyperGraph { root, span: (0, n) })
}
