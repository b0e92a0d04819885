//! Bounded best-first expansion over the `(R+1)`-dimensional lattice of
//! rule x tail choices for one span's completed dot nodes.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;

use crate::cell::NodeId;
use crate::chart_span::ChartSpan;
use crate::constraint::StateConstraint;
use crate::dotchart::{DotChart, DotNode};
use crate::feature::{compute_node_result, FeatureFunction, NodeResult, TailInfo};
use crate::rule::Rule;
use crate::scfg_grammar::Grammar;
use crate::vocab::Vocabulary;

pub struct CubePruneConfig {
  /// 0 means unbounded (exhaustive).
  pub pop_limit: usize,
  pub beam_width: Option<f64>,
}

/// Reconstructs the rule + resolved tails for a `(dot_idx, ranks)` state,
/// and scores it. Returns `None` if any rank is out of bounds for its axis.
fn build_state(
  chart: &ChartSpan,
  dn: &DotNode,
  sorted: &[Rc<Rule>],
  ranks: &[usize],
  functions: &[Rc<dyn FeatureFunction>],
) -> Option<(Rc<Rule>, NodeResult, Vec<NodeId>)> {
  let rule = sorted.get(ranks[0].checked_sub(1)?)?.clone();

  let mut tails_ids = Vec::with_capacity(dn.antecedents.len());
  let mut tails_info = Vec::with_capacity(dn.antecedents.len());
  for (idx, &(k, l, lhs)) in dn.antecedents.iter().enumerate() {
    let cell = chart.get(k, l)?;
    let sn = cell.super_node(lhs)?;
    let node_id = *sn.nodes.get(ranks[idx + 1].checked_sub(1)?)?;
    let node = cell.node(node_id);
    tails_ids.push(node_id);
    tails_info.push(TailInfo {
      dp_state: node.dp_state.clone(),
      best_score: node.best_score,
    });
  }

  let result = compute_node_result(functions, &rule, &tails_info);
  Some((rule, result, tails_ids))
}

struct HeapItem {
  seq: u64,
  dot_idx: usize,
  ranks: Vec<usize>,
  rule: Rc<Rule>,
  result: NodeResult,
  tails_ids: Vec<NodeId>,
}

impl HeapItem {
  fn score(&self) -> f64 {
    self.result.pruning_score()
  }
}

impl PartialEq for HeapItem {
  fn eq(&self, other: &Self) -> bool {
    self.score() == other.score() && self.seq == other.seq
  }
}
impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for HeapItem {
  fn cmp(&self, other: &Self) -> Ordering {
    // max-heap on score; ties broken by insertion order (earlier pops first).
    self
      .score()
      .partial_cmp(&other.score())
      .unwrap_or(Ordering::Equal)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

/// Runs cube pruning for span `(i, j)` against the dot nodes already
/// completed there, writing accepted hyperedges into `Cell(i, j)`.
#[allow(clippy::too_many_arguments)]
pub fn run_cube_pruning(
  chart: &mut ChartSpan,
  _vocab: &Vocabulary,
  grammar: &Grammar,
  dot_chart: &DotChart,
  functions: &[Rc<dyn FeatureFunction>],
  constraint: Option<&dyn StateConstraint>,
  config: &CubePruneConfig,
  i: usize,
  j: usize,
) {
  let dot_nodes: Vec<DotNode> = dot_chart
    .completed(grammar, i, j)
    .into_iter()
    .cloned()
    .collect();
  if dot_nodes.is_empty() {
    return;
  }

  let mut cell = chart.take_or_create(i, j);
  let mut heap: BinaryHeap<HeapItem> = BinaryHeap::new();
  let mut visited: HashSet<(usize, Vec<usize>)> = HashSet::new();
  let mut seq: u64 = 0;
  let mut pops: usize = 0;

  let is_legal = |result: &NodeResult| -> bool {
    constraint.map(|c| c.is_legal(&result.dp_states)).unwrap_or(true)
  };

  for (dot_idx, dn) in dot_nodes.iter().enumerate() {
    let trie_node = grammar.trie().node(dn.trie_node);
    let Some(rule_collection) = trie_node.rules.as_ref().filter(|rc| !rc.is_empty()) else {
      continue;
    };
    let sorted = rule_collection.sorted_rules();

    if dn.antecedents.is_empty() {
      // arity 0: every rule is emitted directly, no cube needed.
      for rule in sorted.iter() {
        let result = compute_node_result(functions, rule, &[]);
        if is_legal(&result) {
          cell.add_hyperedge(
            &result,
            rule.clone(),
            Vec::new(),
            dn.source_path.clone(),
            config.beam_width,
          );
        }
      }
      continue;
    }

    let ranks = vec![1usize; dn.antecedents.len() + 1];
    if let Some((rule, result, tails_ids)) = build_state(chart, dn, &sorted, &ranks, functions) {
      visited.insert((dot_idx, ranks.clone()));
      seq += 1;
      heap.push(HeapItem {
        seq,
        dot_idx,
        ranks,
        rule,
        result,
        tails_ids,
      });
    }
  }

  while let Some(top) = heap.pop() {
    if config.pop_limit != 0 && pops >= config.pop_limit {
      break;
    }
    pops += 1;

    let dn = &dot_nodes[top.dot_idx];
    if is_legal(&top.result) {
      cell.add_hyperedge(
        &top.result,
        top.rule.clone(),
        top.tails_ids.clone(),
        dn.source_path.clone(),
        config.beam_width,
      );
    }

    let trie_node = grammar.trie().node(dn.trie_node);
    let sorted = trie_node.rules.as_ref().unwrap().sorted_rules();

    for axis in 0..=dn.antecedents.len() {
      let mut next_ranks = top.ranks.clone();
      next_ranks[axis] += 1;

      let in_bounds = if axis == 0 {
        next_ranks[0] <= sorted.len()
      } else {
        let (k, l, lhs) = dn.antecedents[axis - 1];
        chart
          .get(k, l)
          .and_then(|c| c.super_node(lhs))
          .map(|sn| next_ranks[axis] <= sn.nodes.len())
          .unwrap_or(false)
      };
      if !in_bounds {
        continue;
      }

      let key = (top.dot_idx, next_ranks.clone());
      if visited.contains(&key) {
        continue;
      }
      if let Some((rule, result, tails_ids)) =
        build_state(chart, dn, &sorted, &next_ranks, functions)
      {
        visited.insert(key);
        seq += 1;
        heap.push(HeapItem {
          seq,
          dot_idx: top.dot_idx,
          ranks: next_ranks,
          rule,
          result,
          tails_ids,
        });
      }
    }
  }

  chart.put(i, j, cell);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::chart_span::ChartSpan;
  use crate::feature::RuleScoreFeature;
  use crate::lattice::{Lattice, Sentence};
  use crate::matcher::NonterminalMatcher;
  use crate::rule::{Production as P, Rule};
  use crate::trie::Trie;

  fn build_xy_grammar(vocab: &mut Vocabulary) -> (Grammar, i32) {
    let a = vocab.intern("a");
    let x = vocab.intern("X");
    let mut trie = Trie::new();
    for (score, _) in [(-1.0, 1), (-2.0, 2), (-3.0, 3)] {
      trie.insert(Rc::new(Rule::new(x, vec![P::Terminal(a)], vec![], vec![], score)));
    }
    (Grammar::new("g", trie, NonterminalMatcher::exact()), x)
  }

  #[test]
  fn test_terminal_rule_fast_path_emits_all() {
    let mut vocab = Vocabulary::new();
    let (grammar, x) = build_xy_grammar(&mut vocab);
    let a = vocab.id("a").unwrap();

    let lattice = Lattice::from_sentence(&[a]);
    let sentence = Sentence::new(0, lattice);
    let mut chart = ChartSpan::new(1);
    let mut dotchart = DotChart::new();
    dotchart.start_dot_items(0, &grammar);
    dotchart.expand_dot_cell(&chart, &vocab, &grammar, &sentence, 0, 1);

    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];
    let cfg = CubePruneConfig {
      pop_limit: 0,
      beam_width: None,
    };
    run_cube_pruning(&mut chart, &vocab, &grammar, &dotchart, &functions, None, &cfg, 0, 1);

    let cell = chart.get(0, 1).unwrap();
    let sn = cell.super_node(x).unwrap();
    // RuleScoreFeature's dp-state is always empty, so all 3 rule
    // alternatives merge into the same (lhs, dp_state) node; the best one
    // wins.
    assert_eq!(sn.nodes.len(), 1);
    assert_eq!(cell.node(sn.nodes[0]).best_score, -1.0);
  }

  #[test]
  fn test_pop_limit_bounds_cube_pops() {
    // S -> X X over "a a": 3x3=9 combinations, only 1 should pop with popLimit=1.
    let mut vocab = Vocabulary::new();
    let a = vocab.intern("a");
    let x = vocab.intern("X");
    let s = vocab.intern("S");
    let mut trie = Trie::new();
    trie.insert(Rc::new(Rule::new(x, vec![P::Terminal(a)], vec![], vec![], -1.0)));
    trie.insert(Rc::new(Rule::new(
      s,
      vec![P::Nonterminal(x), P::Nonterminal(x)],
      vec![],
      vec![],
      0.0,
    )));
    let grammar = Grammar::new("g", trie, NonterminalMatcher::exact());

    let lattice = Lattice::from_sentence(&[a, a]);
    let sentence = Sentence::new(0, lattice);
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];

    let mut chart = ChartSpan::new(2);
    let mut dotchart = DotChart::new();
    // width 1
    for i in 0..2 {
      dotchart.start_dot_items(i, &grammar);
      dotchart.expand_dot_cell(&chart, &vocab, &grammar, &sentence, i, i + 1);
      let cfg = CubePruneConfig { pop_limit: 0, beam_width: None };
      run_cube_pruning(&mut chart, &vocab, &grammar, &dotchart, &functions, None, &cfg, i, i + 1);
      dotchart.seed_after_cell(&chart, &vocab, &grammar, i, i + 1);
    }
    // width 2
    dotchart.expand_dot_cell(&chart, &vocab, &grammar, &sentence, 0, 2);
    let cfg = CubePruneConfig { pop_limit: 1, beam_width: None };
    run_cube_pruning(&mut chart, &vocab, &grammar, &dotchart, &functions, None, &cfg, 0, 2);

    let cell = chart.get(0, 2).unwrap();
    assert_eq!(cell.n_added, 1);
    let sn = cell.super_node(s).unwrap();
    assert_eq!(cell.node(sn.nodes[0]).best_score, -2.0);
  }

  /// Makes every distinct rule choice produce a distinct dp-state, so a
  /// cell's `SuperNode` actually accumulates multiple nodes instead of
  /// merging them all into one -- needed to exercise the cube's full
  /// (R+1)-dimensional rank space in tests.
  #[derive(Debug, Default)]
  struct DistinctDpFeature;

  impl FeatureFunction for DistinctDpFeature {
    fn transition_cost(&self, rule: &Rule, _tails: &[TailInfo]) -> f64 {
      rule.estimated_score
    }

    fn dp_fragment(&self, rule: &Rule, tails: &[TailInfo]) -> crate::feature::DpState {
      let mut fragment = vec![(rule.estimated_score * 100.0) as i32];
      for t in tails {
        fragment.extend(t.dp_state.iter().copied());
      }
      fragment
    }
  }

  #[test]
  fn test_exhaustive_cube_visits_every_combination_once() {
    // X -> a, two alternatives with distinct dp-states; S -> X X.
    let mut vocab = Vocabulary::new();
    let a = vocab.intern("a");
    let x = vocab.intern("X");
    let s = vocab.intern("S");
    let mut trie = Trie::new();
    trie.insert(Rc::new(Rule::new(x, vec![P::Terminal(a)], vec![], vec![], -1.0)));
    trie.insert(Rc::new(Rule::new(x, vec![P::Terminal(a)], vec![], vec![], -2.0)));
    trie.insert(Rc::new(Rule::new(
      s,
      vec![P::Nonterminal(x), P::Nonterminal(x)],
      vec![],
      vec![],
      0.0,
    )));
    let grammar = Grammar::new("g", trie, NonterminalMatcher::exact());

    let lattice = Lattice::from_sentence(&[a, a]);
    let sentence = Sentence::new(0, lattice);
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(DistinctDpFeature)];

    let mut chart = ChartSpan::new(2);
    let mut dotchart = DotChart::new();
    for i in 0..2 {
      dotchart.start_dot_items(i, &grammar);
      dotchart.expand_dot_cell(&chart, &vocab, &grammar, &sentence, i, i + 1);
      let cfg = CubePruneConfig { pop_limit: 0, beam_width: None };
      run_cube_pruning(&mut chart, &vocab, &grammar, &dotchart, &functions, None, &cfg, i, i + 1);
      dotchart.seed_after_cell(&chart, &vocab, &grammar, i, i + 1);
    }
    assert_eq!(chart.get(0, 1).unwrap().super_node(x).unwrap().nodes.len(), 2);

    dotchart.expand_dot_cell(&chart, &vocab, &grammar, &sentence, 0, 2);
    let cfg = CubePruneConfig { pop_limit: 0, beam_width: None };
    run_cube_pruning(&mut chart, &vocab, &grammar, &dotchart, &functions, None, &cfg, 0, 2);

    // 1 rule choice x 2 tail1 choices x 2 tail2 choices, every dp-state distinct.
    let cell = chart.get(0, 2).unwrap();
    assert_eq!(cell.n_added, 4);
    let sn = cell.super_node(s).unwrap();
    // best combination picks the -1.0 alternative for both tails: 0 + -1 + -1.
    assert_eq!(cell.node(sn.nodes[0]).best_score, -2.0);
  }
}
