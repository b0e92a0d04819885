use std::cell::RefCell;
use std::collections::HashMap;

use regex::Regex;

use crate::vocab::Vocabulary;

/// Links trie nonterminal edges to chart items: either an exact integer-id
/// match, or a regex match against the textual form of the ids (needed by
/// grammars whose nonterminal edges are patterns like `NP.*` rather than a
/// single concrete symbol).
#[derive(Debug)]
pub enum NonterminalMatcher {
  Exact,
  Regexp {
    /// compiled-pattern cache keyed by the edge label's textual form, so a
    /// hot span doesn't recompile the same regex on every `DotChart` probe.
    cache: RefCell<HashMap<i32, Regex>>,
  },
}

impl NonterminalMatcher {
  pub fn exact() -> Self {
    Self::Exact
  }

  pub fn regexp() -> Self {
    Self::Regexp {
      cache: RefCell::new(HashMap::new()),
    }
  }

  pub fn is_regexp(&self) -> bool {
    matches!(self, Self::Regexp { .. })
  }

  /// `edge_label` is the nonterminal id written on a trie edge; `lhs` is the
  /// id of the antecedent `SuperNode` being tested against it.
  pub fn matches(&self, vocab: &Vocabulary, edge_label: i32, lhs: i32) -> bool {
    match self {
      Self::Exact => edge_label == lhs,
      Self::Regexp { cache } => {
        if edge_label == lhs {
          return true;
        }
        let mut cache = cache.borrow_mut();
        let re = cache.entry(edge_label).or_insert_with(|| {
          let pattern = vocab
            .string(edge_label)
            .unwrap_or("")
            .to_string();
          Regex::new(&pattern).unwrap_or_else(|_| Regex::new("$^").expect("empty-match regex"))
        });
        let lhs_str = vocab.string(lhs).unwrap_or("");
        re.is_match(lhs_str)
      }
    }
  }
}
