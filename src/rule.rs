use std::fmt;
use std::rc::Rc;

/// One symbol on a rule's source right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Production {
  Terminal(i32),
  Nonterminal(i32),
}

impl Production {
  pub fn id(&self) -> i32 {
    match self {
      Self::Terminal(id) | Self::Nonterminal(id) => *id,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Terminal(_))
  }

  pub fn is_nonterminal(&self) -> bool {
    matches!(self, Self::Nonterminal(_))
  }
}

impl fmt::Display for Production {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Terminal(id) => write!(f, "t{}", id),
      Self::Nonterminal(id) => write!(f, "N{}", id),
    }
  }
}

/// An immutable synchronous rule: `lhs -> source_rhs / target_rhs`.
#[derive(Debug, PartialEq)]
pub struct Rule {
  pub lhs: i32,
  pub source_rhs: Vec<Production>,
  pub target_rhs: Vec<Production>,
  /// Precomputed per-feature weights, dotted against feature-function output
  /// elsewhere; here only the already-reduced estimate is needed for sorting.
  pub features: Vec<f64>,
  /// Stable estimated score, used to sort rules within a `RuleCollection`
  /// and to provide the terminal-rule fast path in cube pruning.
  pub estimated_score: f64,
}

impl Rule {
  pub fn new(
    lhs: i32,
    source_rhs: Vec<Production>,
    target_rhs: Vec<Production>,
    features: Vec<f64>,
    estimated_score: f64,
  ) -> Self {
    Self {
      lhs,
      source_rhs,
      target_rhs,
      features,
      estimated_score,
    }
  }

  /// Number of nonterminals in the source RHS.
  pub fn arity(&self) -> usize {
    self
      .source_rhs
      .iter()
      .filter(|p| p.is_nonterminal())
      .count()
  }

  pub fn is_terminal_rule(&self) -> bool {
    self.arity() == 0
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "N{} ->", self.lhs)?;
    for p in &self.source_rhs {
      write!(f, " {}", p)?;
    }
    write!(f, " / ")?;
    for p in &self.target_rhs {
      write!(f, " {}", p)?;
    }
    write!(f, " ({:.3})", self.estimated_score)
  }
}

/// All rules sharing a source RHS pattern, i.e. the rules reachable at one
/// trie node. `sorted_rules` is computed once and cached: highest
/// `estimated_score` first, ties broken by original insertion order (stable
/// sort), matching the deterministic tie-break required throughout cube
/// pruning.
#[derive(Debug, Default)]
pub struct RuleCollection {
  rules: Vec<Rc<Rule>>,
  sorted: std::cell::RefCell<Option<Rc<Vec<Rc<Rule>>>>>,
}

impl RuleCollection {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, rule: Rc<Rule>) {
    self.sorted.borrow_mut().take();
    self.rules.push(rule);
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  /// Arity shared by every rule in this collection (they all share one
  /// source RHS pattern, hence one arity).
  pub fn arity(&self) -> usize {
    self.rules.first().map(|r| r.arity()).unwrap_or(0)
  }

  /// Rules sorted by descending estimated score, ties broken by insertion
  /// order. Cached after the first call.
  pub fn sorted_rules(&self) -> Rc<Vec<Rc<Rule>>> {
    if let Some(cached) = self.sorted.borrow().as_ref() {
      return cached.clone();
    }
    let mut indexed: Vec<(usize, Rc<Rule>)> =
      self.rules.iter().cloned().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| {
      b.estimated_score
        .partial_cmp(&a.estimated_score)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then(ia.cmp(ib))
    });
    let sorted: Rc<Vec<Rc<Rule>>> = Rc::new(indexed.into_iter().map(|(_, r)| r).collect());
    *self.sorted.borrow_mut() = Some(sorted.clone());
    sorted
  }

  pub fn best_rule(&self) -> Rc<Rule> {
    self.sorted_rules()[0].clone()
  }
}
