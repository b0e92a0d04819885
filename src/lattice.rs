use std::collections::VecDeque;

/// One outgoing edge from a lattice node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
  pub label: i32,
  pub head: usize,
}

/// A DAG over nodes `0..size` (inclusive end node `size`). Node `0` is the
/// source, node `size` the sink that every complete path reaches.
#[derive(Debug, Clone)]
pub struct Lattice {
  size: usize,
  /// outgoing[k] = arcs leaving node k
  outgoing: Vec<Vec<Arc>>,
}

impl Lattice {
  /// A linear sentence: one arc per token, each spanning exactly one position.
  pub fn from_sentence(tokens: &[i32]) -> Self {
    let size = tokens.len();
    let mut outgoing = vec![Vec::new(); size + 1];
    for (k, &label) in tokens.iter().enumerate() {
      outgoing[k].push(Arc { label, head: k + 1 });
    }
    Self { size, outgoing }
  }

  /// Build an arbitrary DAG from explicit `(from, label, to)` edges. `size`
  /// is the sink node id; nodes `0..=size` must all exist in `outgoing`.
  pub fn from_edges(size: usize, edges: &[(usize, i32, usize)]) -> Self {
    let mut outgoing = vec![Vec::new(); size + 1];
    for &(from, label, to) in edges {
      outgoing[from].push(Arc { label, head: to });
    }
    Self { size, outgoing }
  }

  /// Number of source positions (i.e. the sentence length for a linear
  /// lattice); the chart's spans range over `0..=size`.
  pub fn size(&self) -> usize {
    self.size
  }

  pub fn arcs(&self, node: usize) -> &[Arc] {
    &self.outgoing[node]
  }

  /// Shortest number of arcs from `i` to `j`, or `+inf` if `j` is
  /// unreachable from `i`. Used by the chart driver to skip spans that no
  /// path actually covers (confusion-network lattices can have `distance(i,j)
  /// == +inf` for perfectly in-range `(i,j)` pairs).
  pub fn distance(&self, i: usize, j: usize) -> f64 {
    if i == j {
      return 0.0;
    }
    if i > j {
      return f64::INFINITY;
    }
    let mut dist = vec![f64::INFINITY; self.size + 1];
    dist[i] = 0.0;
    let mut queue = VecDeque::new();
    queue.push_back(i);
    while let Some(node) = queue.pop_front() {
      if node == j {
        break;
      }
      let d = dist[node];
      for arc in &self.outgoing[node] {
        if dist[arc.head].is_infinite() {
          dist[arc.head] = d + 1.0;
          queue.push_back(arc.head);
        }
      }
    }
    dist[j]
  }

  /// Whether any path at all connects `i` to `j`.
  pub fn has_path(&self, i: usize, j: usize) -> bool {
    self.distance(i, j).is_finite()
  }
}

/// Wraps a `Lattice` with the bookkeeping the chart driver needs per sentence.
#[derive(Debug, Clone)]
pub struct Sentence {
  pub id: usize,
  lattice: Lattice,
  /// forced target string for constrained decoding, if any.
  target: Option<Vec<i32>>,
}

impl Sentence {
  pub fn new(id: usize, lattice: Lattice) -> Self {
    Self {
      id,
      lattice,
      target: None,
    }
  }

  pub fn with_target(mut self, target: Vec<i32>) -> Self {
    self.target = Some(target);
    self
  }

  pub fn length(&self) -> usize {
    self.lattice.size()
  }

  pub fn lattice(&self) -> &Lattice {
    &self.lattice
  }

  pub fn has_path(&self, i: usize, j: usize) -> bool {
    self.lattice.has_path(i, j)
  }

  pub fn target(&self) -> Option<&[i32]> {
    self.target.as_deref()
  }

  pub fn is_constrained(&self) -> bool {
    self.target.is_some()
  }
}
