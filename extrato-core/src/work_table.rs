//! The editable in-memory table owned by a single action.

/// Rows the user is reviewing before export/upload.
///
/// Deleting a row re-indexes everything after it, the same way a displayed
/// grid renumbers after a removal.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkTable<R> {
    rows: Vec<R>,
}

impl<R> WorkTable<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self { rows }
    }

    /// Remove several rows addressed by their indices in the current view.
    ///
    /// Out-of-range and duplicate indices are ignored. Returns how many rows
    /// were removed.
    pub fn delete_many(&mut self, indices: &[usize]) -> usize {
        let mut idx: Vec<usize> = indices.iter().copied().filter(|i| *i < self.rows.len()).collect();
        idx.sort_unstable();
        idx.dedup();
        for i in idx.iter().rev() {
            self.rows.remove(*i);
        }
        idx.len()
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }
}
