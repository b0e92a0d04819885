//! Two-dimensional sparse container holding at most one `Cell` per span
//! `(i, j)`, `0 <= i < j <= n`.

use crate::cell::Cell;

#[derive(Debug)]
pub struct ChartSpan {
  n: usize,
  /// triangular storage: `cells[i][j - i - 1]`, `None` until first write.
  cells: Vec<Vec<Option<Cell>>>,
}

impl ChartSpan {
  pub fn new(n: usize) -> Self {
    let cells = (0..n).map(|i| (0..(n - i)).map(|_| None).collect()).collect();
    Self { n, cells }
  }

  pub fn n(&self) -> usize {
    self.n
  }

  fn slot(&self, i: usize, j: usize) -> &Option<Cell> {
    assert!(i < j && j <= self.n, "span out of bounds: ({i}, {j})");
    &self.cells[i][j - i - 1]
  }

  fn slot_mut(&mut self, i: usize, j: usize) -> &mut Option<Cell> {
    assert!(i < j && j <= self.n, "span out of bounds: ({i}, {j})");
    &mut self.cells[i][j - i - 1]
  }

  pub fn get(&self, i: usize, j: usize) -> Option<&Cell> {
    self.slot(i, j).as_ref()
  }

  pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut Cell> {
    self.slot_mut(i, j).as_mut()
  }

  /// Lazily creates the cell at `(i, j)` if this is the first write.
  pub fn get_or_create(&mut self, i: usize, j: usize) -> &mut Cell {
    self.slot_mut(i, j).get_or_insert_with(|| Cell::new(i, j))
  }

  /// Temporarily removes the cell at `(i, j)` (creating an empty one if
  /// absent) so callers can mutate it while still holding immutable
  /// borrows of every other cell in the chart. Pair with [`Self::put`].
  pub fn take_or_create(&mut self, i: usize, j: usize) -> Cell {
    self.slot_mut(i, j).take().unwrap_or_else(|| Cell::new(i, j))
  }

  pub fn put(&mut self, i: usize, j: usize, cell: Cell) {
    *self.slot_mut(i, j) = Some(cell);
  }
}
