//! Per-grammar partial-match accumulator: `DotNode`s representing "rule
//! prefix matched over `(i,j)` with antecedent SuperNodes".

use std::collections::HashMap;

use crate::chart_span::ChartSpan;
use crate::lattice::Sentence;
use crate::rule::Production;
use crate::scfg_grammar::Grammar;
use crate::trie::{EdgeLabel, TrieNodeId};
use crate::vocab::Vocabulary;

/// `(start, end, lhs)` of a consumed antecedent `SuperNode`; enough to look
/// it back up in the (by-now-immutable, lower-width) chart cell.
pub type AntecedentRef = (usize, usize, i32);

#[derive(Debug, Clone)]
pub struct DotNode {
  pub i: usize,
  pub j: usize,
  pub trie_node: TrieNodeId,
  pub antecedents: Vec<AntecedentRef>,
  pub source_path: Vec<Production>,
}

impl DotNode {
  fn root(i: usize, trie_node: TrieNodeId) -> Self {
    Self {
      i,
      j: i,
      trie_node,
      antecedents: Vec::new(),
      source_path: Vec::new(),
    }
  }

  fn extend_terminal(&self, j: usize, next: TrieNodeId, label: i32) -> Self {
    let mut source_path = self.source_path.clone();
    source_path.push(Production::Terminal(label));
    Self {
      i: self.i,
      j,
      trie_node: next,
      antecedents: self.antecedents.clone(),
      source_path,
    }
  }

  fn extend_nonterminal(&self, k: usize, j: usize, lhs: i32, next: TrieNodeId) -> Self {
    let mut source_path = self.source_path.clone();
    source_path.push(Production::Nonterminal(lhs));
    let mut antecedents = self.antecedents.clone();
    antecedents.push((k, j, lhs));
    Self {
      i: self.i,
      j,
      trie_node: next,
      antecedents,
      source_path,
    }
  }

  /// dedup / visited key, per the design doc: `(trieNode, antecedents)`.
  fn key(&self) -> (TrieNodeId, &[AntecedentRef]) {
    (self.trie_node, &self.antecedents)
  }
}

#[derive(Debug, Default)]
pub struct DotChart {
  cells: HashMap<(usize, usize), Vec<DotNode>>,
}

impl DotChart {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cell(&self, i: usize, j: usize) -> &[DotNode] {
    self.cells.get(&(i, j)).map(Vec::as_slice).unwrap_or(&[])
  }

  fn insert(&mut self, i: usize, j: usize, node: DotNode) {
    let entry = self.cells.entry((i, j)).or_default();
    if !entry.iter().any(|existing| existing.key() == node.key()) {
      entry.push(node);
    }
  }

  /// Registers the (idempotent) trie-root dot node anchored at `(i, i)`.
  pub fn start_dot_items(&mut self, i: usize, grammar: &Grammar) {
    self.insert(i, i, DotNode::root(i, grammar.trie_root()));
  }

  /// Extends every `DotNode` in `DotCell(i, k)`, `i <= k < j`, across either
  /// the terminal arc `(k, j)` or a `SuperNode` residing in `Cell(k, j)`,
  /// depositing results into `DotCell(i, j)`.
  pub fn expand_dot_cell(
    &mut self,
    chart: &ChartSpan,
    vocab: &Vocabulary,
    grammar: &Grammar,
    sentence: &Sentence,
    i: usize,
    j: usize,
  ) {
    for k in i..j {
      let pending = self.cell(i, k).to_vec();
      for dn in &pending {
        for arc in sentence.lattice().arcs(k) {
          if arc.head != j {
            continue;
          }
          if let Some(next) = grammar
            .trie()
            .matches(dn.trie_node, EdgeLabel::Terminal(arc.label))
          {
            self.insert(i, j, dn.extend_terminal(j, next, arc.label));
          }
        }

        if let Some(cell_kj) = chart.get(k, j) {
          for (edge_label, next) in grammar.trie().edges(dn.trie_node) {
            if let EdgeLabel::Nonterminal(nt_id) = edge_label {
              for sn in cell_kj.super_nodes() {
                if grammar.matcher().matches(vocab, nt_id, sn.lhs) {
                  self.insert(i, j, dn.extend_nonterminal(k, j, sn.lhs, next));
                }
              }
            }
          }
        }
      }
    }
  }

  /// Registers dot nodes in `DotCell(i,j)` that consume `Cell(i,j)` itself
  /// as their *first* antecedent -- the one case `expand_dot_cell` cannot
  /// cover, since at the time it runs for `(i,j)`, `Cell(i,j)` has not been
  /// populated yet (it's the span currently being completed). Call once
  /// `Cell(i,j)` holds its final `SuperNode`s for this pass.
  pub fn seed_after_cell(
    &mut self,
    chart: &ChartSpan,
    vocab: &Vocabulary,
    grammar: &Grammar,
    i: usize,
    j: usize,
  ) {
    let Some(cell_ij) = chart.get(i, j) else {
      return;
    };
    let root = DotNode::root(i, grammar.trie_root());
    for (edge_label, next) in grammar.trie().edges(root.trie_node) {
      if let EdgeLabel::Nonterminal(nt_id) = edge_label {
        for sn in cell_ij.super_nodes() {
          if grammar.matcher().matches(vocab, nt_id, sn.lhs) {
            self.insert(i, j, root.extend_nonterminal(i, j, sn.lhs, next));
          }
        }
      }
    }
  }

  /// `DotNode`s in `DotCell(i,j)` whose trie node holds a (non-empty)
  /// `RuleCollection`, i.e. candidates ready to seed cube pruning.
  pub fn completed(&self, grammar: &Grammar, i: usize, j: usize) -> Vec<&DotNode> {
    self
      .cell(i, j)
      .iter()
      .filter(|dn| {
        grammar
          .trie()
          .node(dn.trie_node)
          .rules
          .as_ref()
          .is_some_and(|rc| !rc.is_empty())
      })
      .collect()
  }
}
