use crate::matcher::NonterminalMatcher;
use crate::trie::{Trie, TrieNodeId};

/// The collaborator the chart driver queries: `trie_root()`,
/// `is_regexp_grammar()`, `has_rule_for_span()`.
#[derive(Debug)]
pub struct Grammar {
  pub name: String,
  trie: Trie,
  matcher: NonterminalMatcher,
}

impl Grammar {
  pub fn new(name: impl Into<String>, trie: Trie, matcher: NonterminalMatcher) -> Self {
    Self {
      name: name.into(),
      trie,
      matcher,
    }
  }

  pub fn trie(&self) -> &Trie {
    &self.trie
  }

  pub fn trie_root(&self) -> TrieNodeId {
    self.trie.root()
  }

  pub fn matcher(&self) -> &NonterminalMatcher {
    &self.matcher
  }

  pub fn is_regexp_grammar(&self) -> bool {
    self.matcher.is_regexp()
  }

  /// Loose reachability test: can any rule in this grammar possibly span
  /// `dist` source positions? Used to skip starting dot items for spans no
  /// rule could ever complete, not a precise emptiness check: a rule with
  /// `k` RHS symbols needs at least `k` source positions (every symbol,
  /// terminal or nonterminal, consumes at least one), but recursive
  /// nonterminals can consume arbitrarily more, so only the lower bound is
  /// safe to enforce.
  pub fn has_rule_for_span(&self, dist: f64) -> bool {
    match self.trie.min_rhs_len() {
      Some(min) => dist.is_finite() && dist >= 1.0 && dist as usize >= min,
      None => false,
    }
  }
}
