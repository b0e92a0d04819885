//! The chart driver: ties `DotChart`, cube pruning, unary closure, and goal
//! assembly into the two CKY strategies exposed to callers.

use std::rc::Rc;

use tracing::{debug, instrument, trace, warn};

use crate::cell::NodeId;
use crate::chart_span::ChartSpan;
use crate::config::ChartConfig;
use crate::constraint::StateConstraint;
use crate::cube::{run_cube_pruning, CubePruneConfig};
use crate::dotchart::DotChart;
use crate::error::{ChartError, Result};
use crate::feature::{compute_node_result, FeatureFunction, TailInfo};
use crate::goal::{assemble_goal, HyperGraph};
use crate::lattice::Sentence;
use crate::rule::{Production, Rule};
use crate::scfg_grammar::Grammar;
use crate::unary::expand_unary;
use crate::vocab::Vocabulary;

/// Cooperative cancellation, checked at span boundaries only (never inside a
/// single span's cube-pruning loop).
pub trait CancelToken {
  fn is_cancelled(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct NeverCancel;

impl CancelToken for NeverCancel {
  fn is_cancelled(&self) -> bool {
    false
  }
}

pub struct Chart<'a> {
  sentence: &'a Sentence,
  vocab: &'a Vocabulary,
  grammars: Vec<&'a Grammar>,
  functions: Vec<Rc<dyn FeatureFunction>>,
  constraint: Option<&'a dyn StateConstraint>,
  goal_symbol: i32,
  config: ChartConfig,
  span: ChartSpan,
  dot_charts: Vec<DotChart>,
}

impl<'a> Chart<'a> {
  pub fn new(
    sentence: &'a Sentence,
    vocab: &'a Vocabulary,
    grammars: Vec<&'a Grammar>,
    functions: Vec<Rc<dyn FeatureFunction>>,
    constraint: Option<&'a dyn StateConstraint>,
    goal_symbol: i32,
    config: ChartConfig,
  ) -> Self {
    let dot_charts = grammars.iter().map(|_| DotChart::new()).collect();
    Self {
      sentence,
      vocab,
      grammars,
      functions,
      constraint,
      goal_symbol,
      config,
      span: ChartSpan::new(sentence.length()),
      dot_charts,
    }
  }

  pub fn set_goal_symbol_id(&mut self, goal_symbol: i32) {
    self.goal_symbol = goal_symbol;
  }

  /// Lazily-creating cell accessor, exposed to callers per the external
  /// interface contract.
  pub fn get_cell(&mut self, i: usize, j: usize) -> &crate::cell::Cell {
    self.span.get_or_create(i, j)
  }

  /// Injects a terminal production directly into `Cell(i,j)`, bypassing the
  /// dot chart and cube pruning entirely. Axioms are never beam-pruned.
  pub fn add_axiom(&mut self, i: usize, j: usize, rule: Rc<Rule>, source_path: Vec<Production>) -> Result<NodeId> {
    let n = self.sentence.length();
    if i >= j || j > n {
      return Err(ChartError::SpanOutOfBounds { i, j, len: n });
    }
    let result = compute_node_result(&self.functions, &rule, &[]);
    let cell = self.span.get_or_create(i, j);
    Ok(
      cell
        .add_hyperedge(&result, rule, Vec::new(), source_path, None)
        .expect("unbeamed add_hyperedge always yields a node"),
    )
  }

  fn cube_config(&self) -> CubePruneConfig {
    CubePruneConfig {
      pop_limit: self.config.pop_limit,
      beam_width: self.config.beam_width,
    }
  }

  /// Dispatches to [`Chart::expand_with_cancel`] or
  /// [`Chart::expand_sans_dot_chart`] per `config.use_dot_chart`.
  #[instrument(level = "debug", skip_all, fields(sentence_id = self.sentence.id, n = self.sentence.length()))]
  pub fn expand(&mut self) -> Option<HyperGraph> {
    if self.config.use_dot_chart {
      self.expand_with_cancel(&NeverCancel)
    } else {
      self.expand_sans_dot_chart()
    }
  }

  pub fn expand_with_cancel(&mut self, cancel: &dyn CancelToken) -> Option<HyperGraph> {
    let n = self.sentence.length();
    for (gi, grammar) in self.grammars.iter().enumerate() {
      for i in 0..n {
        self.dot_charts[gi].start_dot_items(i, grammar);
      }
    }

    for width in 1..=n {
      for i in 0..=(n - width) {
        if cancel.is_cancelled() {
          warn!("decode cancelled, discarding partial chart");
          return None;
        }
        let j = i + width;
        let dist = self.sentence.lattice().distance(i, j);
        if dist.is_infinite() {
          trace!(i, j, "span unreachable, skipping");
          continue;
        }

        for gi in 0..self.grammars.len() {
          let grammar = self.grammars[gi];
          if !grammar.has_rule_for_span(dist) {
            trace!(i, j, grammar = grammar.name, "no rule could complete this span, skipping");
            continue;
          }
          self.dot_charts[gi].expand_dot_cell(&self.span, self.vocab, grammar, self.sentence, i, j);
          let cube_config = self.cube_config();
          run_cube_pruning(
            &mut self.span,
            self.vocab,
            grammar,
            &self.dot_charts[gi],
            &self.functions,
            self.constraint,
            &cube_config,
            i,
            j,
          );
        }

        expand_unary(
          &mut self.span,
          &self.grammars,
          &self.functions,
          self.constraint,
          self.config.beam_width,
          i,
          j,
        );

        for gi in 0..self.grammars.len() {
          let grammar = self.grammars[gi];
          self.dot_charts[gi].seed_after_cell(&self.span, self.vocab, grammar, i, j);
        }
      }
    }

    self.finish()
  }

  /// CKY+ without a persistent dot chart: each span's partial matches are
  /// rebuilt from scratch rather than carried incrementally from narrower
  /// spans.
  #[instrument(level = "debug", skip_all, fields(sentence_id = self.sentence.id, n = self.sentence.length()))]
  pub fn expand_sans_dot_chart(&mut self) -> Option<HyperGraph> {
    let n = self.sentence.length();

    for width in 1..=n {
      for i in 0..=(n - width) {
        let j = i + width;
        let dist = self.sentence.lattice().distance(i, j);
        if dist.is_infinite() {
          trace!(i, j, "span unreachable, skipping");
          continue;
        }

        for grammar in &self.grammars {
          if !grammar.has_rule_for_span(dist) {
            trace!(i, j, grammar = grammar.name, "no rule could complete this span, skipping");
            continue;
          }
          let mut local = DotChart::new();
          for k in i..j {
            local.start_dot_items(k, grammar);
          }
          // Rebuild, narrowest-first, the dot items a persistent chart
          // would already hold for every sub-span (i,k) with k < j: each
          // one may consume a finalized lower-width cell as its first
          // antecedent.
          for k in (i + 1)..j {
            local.expand_dot_cell(&self.span, self.vocab, grammar, self.sentence, i, k);
            local.seed_after_cell(&self.span, self.vocab, grammar, i, k);
          }
          local.expand_dot_cell(&self.span, self.vocab, grammar, self.sentence, i, j);
          let cube_config = self.cube_config();
          run_cube_pruning(
            &mut self.span,
            self.vocab,
            grammar,
            &local,
            &self.functions,
            self.constraint,
            &cube_config,
            i,
            j,
          );
        }

        expand_unary(
          &mut self.span,
          &self.grammars,
          &self.functions,
          self.constraint,
          self.config.beam_width,
          i,
          j,
        );
      }
    }

    self.finish()
  }

  fn finish(&mut self) -> Option<HyperGraph> {
    let n = self.sentence.length();
    let goal = assemble_goal(&mut self.span, self.vocab, self.goal_symbol, n);
    if goal.is_none() {
      warn!(n, "no complete item in goal cell, no derivation");
    } else {
      debug!(n, "derivation found");
    }
    goal
  }
}

/// Reconstructs the score of a tail antecedent as feature functions expect
/// it; exposed for callers that walk a returned `HyperGraph` manually.
pub fn tail_info(cell: &crate::cell::Cell, node_id: NodeId) -> TailInfo {
  let node = cell.node(node_id);
  TailInfo {
    dp_state: node.dp_state.clone(),
    best_score: node.best_score,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::feature::RuleScoreFeature;
  use crate::lattice::Lattice;
  use crate::matcher::NonterminalMatcher;
  use crate::rule::Production as P;
  use crate::trie::Trie;

  fn xs_grammar(vocab: &mut Vocabulary) -> (Grammar, i32, i32) {
    let a = vocab.intern("a");
    let b = vocab.intern("b");
    let x = vocab.intern("X");
    let s = vocab.intern("S");
    let mut trie = Trie::new();
    trie.insert(Rc::new(Rule::new(x, vec![P::Terminal(a)], vec![], vec![], -1.0)));
    trie.insert(Rc::new(Rule::new(x, vec![P::Terminal(b)], vec![], vec![], -2.0)));
    trie.insert(Rc::new(Rule::new(
      s,
      vec![P::Nonterminal(x), P::Nonterminal(x)],
      vec![],
      vec![],
      0.0,
    )));
    (Grammar::new("g", trie, NonterminalMatcher::exact()), x, s)
  }

  #[test]
  fn test_e1_best_derivation_score() {
    let mut vocab = Vocabulary::new();
    let (grammar, _x, s) = xs_grammar(&mut vocab);
    let a = vocab.id("a").unwrap();
    let b = vocab.id("b").unwrap();
    let sentence = Sentence::new(0, Lattice::from_sentence(&[a, b]));
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];
    let config = ChartConfig {
      pop_limit: 0,
      ..Default::default()
    };

    let mut chart = Chart::new(&sentence, &vocab, vec![&grammar], functions, None, s, config);
    let hg = chart.expand().expect("derivation exists");
    let cell = chart.span.get(0, 2).unwrap();
    assert_eq!(cell.node(hg.root).best_score, -3.0);
    assert_eq!(hg.span, (0, 2));
  }

  #[test]
  fn test_e3_no_rule_for_terminal_is_no_derivation() {
    let mut vocab = Vocabulary::new();
    let x = vocab.intern("X");
    let s = vocab.intern("S");
    let mut trie = Trie::new();
    // X -> a only; sentence has an id with no matching rule.
    let a = vocab.intern("a");
    trie.insert(Rc::new(Rule::new(x, vec![P::Terminal(a)], vec![], vec![], -1.0)));
    let grammar = Grammar::new("g", trie, NonterminalMatcher::exact());

    let unmatched = vocab.intern("z");
    let sentence = Sentence::new(0, Lattice::from_sentence(&[unmatched]));
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];
    let config = ChartConfig::default();

    let mut chart = Chart::new(&sentence, &vocab, vec![&grammar], functions, None, s, config);
    assert!(chart.expand().is_none());
  }

  #[test]
  fn test_cky_and_cky_plus_agree_on_best_score() {
    let mut vocab = Vocabulary::new();
    let (grammar, _x, s) = xs_grammar(&mut vocab);
    let a = vocab.id("a").unwrap();
    let b = vocab.id("b").unwrap();

    let sentence = Sentence::new(0, Lattice::from_sentence(&[a, b]));
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];

    let mut dot_chart = Chart::new(
      &sentence,
      &vocab,
      vec![&grammar],
      functions.clone(),
      None,
      s,
      ChartConfig::default(),
    );
    let hg1 = dot_chart.expand().unwrap();
    let score1 = dot_chart.span.get(0, 2).unwrap().node(hg1.root).best_score;

    let mut no_dot_chart = Chart::new(&sentence, &vocab, vec![&grammar], functions, None, s, ChartConfig::default());
    let hg2 = no_dot_chart.expand_sans_dot_chart().unwrap();
    let score2 = no_dot_chart.span.get(0, 2).unwrap().node(hg2.root).best_score;

    assert_eq!(score1, score2);
  }

  #[test]
  fn test_add_axiom_out_of_bounds() {
    let mut vocab = Vocabulary::new();
    let x = vocab.intern("X");
    let grammar = Grammar::new("g", Trie::new(), NonterminalMatcher::exact());
    let sentence = Sentence::new(0, Lattice::from_sentence(&[1]));
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];
    let mut chart = Chart::new(&sentence, &vocab, vec![&grammar], functions, None, x, ChartConfig::default());
    let rule = Rc::new(Rule::new(x, vec![P::Terminal(1)], vec![], vec![], -1.0));
    assert!(matches!(
      chart.add_axiom(0, 5, rule, vec![]),
      Err(ChartError::SpanOutOfBounds { .. })
    ));
  }

  /// E4: a two-path lattice (two alternative words at the same position)
  /// where each path reaches the goal nonterminal through a different unary
  /// rule, merging into the single `S` node those two rules share.
  #[test]
  fn test_e4_lattice_merge_two_paths_into_one_node() {
    let mut vocab = Vocabulary::new();
    let a = vocab.intern("a");
    let b = vocab.intern("b");
    let x = vocab.intern("X");
    let y = vocab.intern("Y");
    let s = vocab.intern("S");

    let mut trie = Trie::new();
    trie.insert(Rc::new(Rule::new(x, vec![P::Terminal(a)], vec![], vec![], -1.0)));
    trie.insert(Rc::new(Rule::new(y, vec![P::Terminal(b)], vec![], vec![], -2.0)));
    trie.insert(Rc::new(Rule::new(s, vec![P::Nonterminal(x)], vec![], vec![], -0.1)));
    trie.insert(Rc::new(Rule::new(s, vec![P::Nonterminal(y)], vec![], vec![], -0.2)));
    let grammar = Grammar::new("g", trie, NonterminalMatcher::exact());

    // node 0 -a-> 1 and 0 -b-> 1: two alternative words spanning (0,1).
    let lattice = Lattice::from_edges(1, &[(0, a, 1), (0, b, 1)]);
    let sentence = Sentence::new(0, lattice);
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];

    let mut chart = Chart::new(&sentence, &vocab, vec![&grammar], functions, None, s, ChartConfig::default());
    let hg = chart.expand().expect("derivation exists");

    let cell = chart.span.get(0, 1).unwrap();
    let s_node = cell.super_node(s).unwrap().nodes[0];
    assert_eq!(cell.node(s_node).incoming.len(), 2);
    assert_eq!(cell.node(s_node).best_score, -1.1);
    assert_eq!(hg.span, (0, 1));
  }

  /// E6: a `StateConstraint` that rejects every candidate folds into
  /// `expand()` returning `None`, the same as a genuine no-derivation case.
  #[test]
  fn test_e6_constrained_decoding_rejects_everything() {
    let mut vocab = Vocabulary::new();
    let (grammar, _x, s) = xs_grammar(&mut vocab);
    let a = vocab.id("a").unwrap();
    let b = vocab.id("b").unwrap();
    let sentence = Sentence::new(0, Lattice::from_sentence(&[a, b]));
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];
    let constraint = crate::constraint::RejectAll;

    let mut chart = Chart::new(
      &sentence,
      &vocab,
      vec![&grammar],
      functions,
      Some(&constraint),
      s,
      ChartConfig::default(),
    );
    assert!(chart.expand().is_none());
  }

  /// A regexp-matched nonterminal edge (`NP.*`) completes a span the same
  /// way an exact-match edge would, exercised through the full dot-chart +
  /// cube-pruning path rather than `NonterminalMatcher` in isolation.
  #[test]
  fn test_regexp_grammar_completes_span() {
    let mut vocab = Vocabulary::new();
    let dog = vocab.intern("dog");
    let cat = vocab.intern("cat");
    let np_sg = vocab.intern("NP_sg");
    let np_pl = vocab.intern("NP_pl");
    let pattern = vocab.intern("NP.*");
    let top = vocab.intern("TOP");

    let mut trie = Trie::new();
    trie.insert(Rc::new(Rule::new(np_sg, vec![P::Terminal(dog)], vec![], vec![], -1.0)));
    trie.insert(Rc::new(Rule::new(np_pl, vec![P::Terminal(cat)], vec![], vec![], -2.0)));
    trie.insert(Rc::new(Rule::new(
      top,
      vec![P::Nonterminal(pattern), P::Nonterminal(pattern)],
      vec![],
      vec![],
      0.0,
    )));
    let grammar = Grammar::new("g", trie, NonterminalMatcher::regexp());

    let sentence = Sentence::new(0, Lattice::from_sentence(&[dog, cat]));
    let functions: Vec<Rc<dyn FeatureFunction>> = vec![Rc::new(RuleScoreFeature)];

    let mut chart = Chart::new(&sentence, &vocab, vec![&grammar], functions, None, top, ChartConfig::default());
    let hg = chart.expand().expect("derivation exists");

    let cell = chart.span.get(0, 2).unwrap();
    assert_eq!(cell.node(hg.root).best_score, -3.0);
    assert_eq!(hg.span, (0, 2));
  }
}
