//! The grammar trie: an arena of nodes reachable by walking terminal/
//! nonterminal edges, each optionally carrying the `RuleCollection` of rules
//! whose source RHS ends there.
//!
//! Building the trie from rule *files* is out of scope for this crate (see
//! the purpose/scope section of the design doc); this module only defines
//! the read side the chart algorithms walk, plus an `insert` used by the
//! text-DSL builder in [`crate::text_grammar`] and by tests.

use std::collections::HashMap;
use std::rc::Rc;

use crate::rule::{Production, Rule, RuleCollection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
  Terminal(i32),
  Nonterminal(i32),
}

impl From<Production> for EdgeLabel {
  fn from(p: Production) -> Self {
    match p {
      Production::Terminal(id) => EdgeLabel::Terminal(id),
      Production::Nonterminal(id) => EdgeLabel::Nonterminal(id),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrieNodeId(pub u32);

#[derive(Debug, Default)]
pub struct TrieNode {
  pub rules: Option<RuleCollection>,
  edges: HashMap<EdgeLabel, TrieNodeId>,
}

/// One grammar's trie. Trie nodes and the rules they reference outlive any
/// chart built over them; the chart only ever holds `TrieNodeId`s (or
/// `&Trie` borrows scoped to a single `expand` call).
#[derive(Debug)]
pub struct Trie {
  nodes: Vec<TrieNode>,
  /// shortest source RHS seen, a lower bound on the span width any rule
  /// could possibly complete (every RHS symbol consumes at least one source
  /// position); used by `has_rule_for_span`. `None` while the trie holds no
  /// rules.
  min_rhs_len: Option<usize>,
}

impl Default for Trie {
  fn default() -> Self {
    Self::new()
  }
}

impl Trie {
  pub fn new() -> Self {
    Self {
      nodes: vec![TrieNode::default()],
      min_rhs_len: None,
    }
  }

  pub fn root(&self) -> TrieNodeId {
    TrieNodeId(0)
  }

  pub fn node(&self, id: TrieNodeId) -> &TrieNode {
    &self.nodes[id.0 as usize]
  }

  fn node_mut(&mut self, id: TrieNodeId) -> &mut TrieNode {
    &mut self.nodes[id.0 as usize]
  }

  /// `O(1)` expected: look up the trie child reached from `node` by `label`.
  pub fn matches(&self, node: TrieNodeId, label: EdgeLabel) -> Option<TrieNodeId> {
    self.node(node).edges.get(&label).copied()
  }

  pub fn edges(&self, node: TrieNodeId) -> impl Iterator<Item = (EdgeLabel, TrieNodeId)> + '_ {
    self.node(node).edges.iter().map(|(&l, &n)| (l, n))
  }

  fn alloc(&mut self) -> TrieNodeId {
    let id = TrieNodeId(self.nodes.len() as u32);
    self.nodes.push(TrieNode::default());
    id
  }

  /// Walks/creates nodes for `rule.source_rhs` and registers `rule` in the
  /// `RuleCollection` at the terminal node. Multiple rules sharing a source
  /// RHS land in the same collection by construction.
  pub fn insert(&mut self, rule: Rc<Rule>) {
    let len = rule.source_rhs.len();
    self.min_rhs_len = Some(self.min_rhs_len.map_or(len, |min| min.min(len)));
    let mut cur = self.root();
    for &prod in &rule.source_rhs {
      let label = EdgeLabel::from(prod);
      cur = match self.node(cur).edges.get(&label) {
        Some(&next) => next,
        None => {
          let next = self.alloc();
          self.node_mut(cur).edges.insert(label, next);
          next
        }
      };
    }
    self
      .node_mut(cur)
      .rules
      .get_or_insert_with(RuleCollection::new)
      .push(rule);
  }

  pub fn min_rhs_len(&self) -> Option<usize> {
    self.min_rhs_len
  }
}
