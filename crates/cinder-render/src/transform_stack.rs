//! Hierarchical transform stack

use glam::Mat4;

/// Accumulated model matrices for the current traversal
///
/// The base entry is an identity sentinel that is never popped; the top is
/// the transform of whatever is being drawn right now.
#[derive(Debug, Clone)]
pub struct TransformStack {
    matrices: Vec<Mat4>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack {
    pub fn new() -> Self {
        Self {
            matrices: vec![Mat4::IDENTITY],
        }
    }

    /// Push `current * local`
    pub fn push(&mut self, local: Mat4) {
        let top = self.current();
        self.matrices.push(top * local);
    }

    /// Push `matrix` as-is, ignoring everything below it
    pub fn push_override(&mut self, matrix: Mat4) {
        self.matrices.push(matrix);
    }

    /// Pop the top matrix.
    ///
    /// # Panics
    ///
    /// Panics when only the sentinel is left; an unbalanced pop is a bug in
    /// the caller.
    pub fn pop(&mut self) {
        assert!(
            self.matrices.len() > 1,
            "transform stack underflow: pop without matching push"
        );
        self.matrices.pop();
    }

    pub fn current(&self) -> Mat4 {
        self.matrices.last().copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Entries above the sentinel
    pub fn depth(&self) -> usize {
        self.matrices.len() - 1
    }

    /// Drop back to `depth` entries above the sentinel
    pub fn truncate(&mut self, depth: usize) {
        self.matrices.truncate(depth + 1);
    }

    pub fn reset(&mut self) {
        self.truncate(0);
    }
}
