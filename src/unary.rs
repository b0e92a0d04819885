//! Agenda-based unary-rule closure: extends a cell's forest through chains
//! of unary rules without looping forever, by expanding each distinct `lhs`
//! at most once (documented triangle-inequality assumption, design doc
//! §4.6 / §9 open questions).

use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::cell::{Cell, NodeId};
use crate::chart_span::ChartSpan;
use crate::constraint::StateConstraint;
use crate::feature::{compute_node_result, FeatureFunction, TailInfo};
use crate::scfg_grammar::Grammar;
use crate::trie::EdgeLabel;

pub fn expand_unary(
  chart: &mut ChartSpan,
  grammars: &[&Grammar],
  functions: &[Rc<dyn FeatureFunction>],
  constraint: Option<&dyn StateConstraint>,
  beam_width: Option<f64>,
  i: usize,
  j: usize,
) {
  let mut cell = chart.take_or_create(i, j);
  expand_unary_in_cell(&mut cell, grammars, functions, constraint, beam_width);
  chart.put(i, j, cell);
}

fn expand_unary_in_cell(
  cell: &mut Cell,
  grammars: &[&Grammar],
  functions: &[Rc<dyn FeatureFunction>],
  constraint: Option<&dyn StateConstraint>,
  beam_width: Option<f64>,
) {
  let mut queue: VecDeque<NodeId> = cell.node_ids().collect();
  let mut seen: HashSet<i32> = HashSet::new();

  while let Some(node_id) = queue.pop_front() {
    let lhs = cell.node(node_id).lhs;
    if !seen.insert(lhs) {
      continue;
    }

    let tail_info = TailInfo {
      dp_state: cell.node(node_id).dp_state.clone(),
      best_score: cell.node(node_id).best_score,
    };

    for grammar in grammars {
      let Some(next) = grammar.trie().matches(grammar.trie_root(), EdgeLabel::Nonterminal(lhs))
      else {
        continue;
      };
      let Some(rule_collection) = grammar.trie().node(next).rules.as_ref() else {
        continue;
      };
      if rule_collection.arity() != 1 || rule_collection.is_empty() {
        continue;
      }

      for rule in rule_collection.sorted_rules().iter() {
        let result = compute_node_result(functions, rule, std::slice::from_ref(&tail_info));
        if constraint.map(|c| c.is_legal(&result.dp_states)).unwrap_or(true)
          && let Some(new_id) = cell.add_hyperedge(
            &result,
            rule.clone(),
            vec![node_id],
            rule.source_rhs.clone(),
            beam_width,
          )
        {
          let new_lhs = cell.node(new_id).lhs;
          if !seen.contains(&new_lhs) {
            queue.push_back(new_id);
          }
        }
      }
    }
  }
}
