use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ChartError, Result};
use crate::rule::{Production, Rule};
use crate::trie::Trie;
use crate::vocab::Vocabulary;

lazy_static! {
  static ref RULE_RE: Regex = Regex::new(
    r#"^(?P<lhs>[A-Za-z_][\w-]*)\s*->\s*(?P<rhs>.+?)\s*;\s*(?P<score>-?[0-9]+(\.[0-9]+)?)$"#
  )
  .unwrap();
  static ref TOKEN_RE: Regex =
    Regex::new(r#""(?P<terminal>[^"]*)"|(?P<nonterminal>[A-Za-z_][\w-]*)"#).unwrap();
}

/// Builds a `Trie` from source like:
///
/// ```text
/// # comments and blank lines are ignored
/// S -> X X ; 0.0
/// X -> "a" ; -1.0
/// X -> "b" ; -2.0
/// ```
///
/// Bare identifiers are nonterminals, double-quoted tokens are terminals,
/// and the clause after `;` is the rule's estimated score. Interns every
/// symbol it sees into `vocab`.
pub fn build_trie(vocab: &mut Vocabulary, source: &str) -> Result<Trie> {
  let mut trie = Trie::new();
  for (lineno, raw_line) in source.lines().enumerate() {
    let line = raw_line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let rule = parse_line(vocab, line)
      .ok_or_else(|| ChartError::GrammarSyntax(format!("line {}: {}", lineno + 1, raw_line)))?;
    trie.insert(Rc::new(rule));
  }
  Ok(trie)
}

fn parse_line(vocab: &mut Vocabulary, line: &str) -> Option<Rule> {
  let caps = RULE_RE.captures(line)?;
  let lhs = vocab.intern(&caps["lhs"]);
  let score: f64 = caps["score"].parse().ok()?;

  let mut source_rhs = Vec::new();
  for tok in TOKEN_RE.captures_iter(&caps["rhs"]) {
    if let Some(t) = tok.name("terminal") {
      source_rhs.push(Production::Terminal(vocab.intern(t.as_str())));
    } else if let Some(nt) = tok.name("nonterminal") {
      source_rhs.push(Production::Nonterminal(vocab.intern(nt.as_str())));
    }
  }

  Some(Rule::new(lhs, source_rhs, Vec::new(), Vec::new(), score))
}
