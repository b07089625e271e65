//! Ordered (x, y) point lists.

use serde::{Deserialize, Serialize};

/// A named list of points, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name.
    pub name: String,
    points: Vec<(f64, f64)>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), points: Vec::new() }
    }

    /// Create a graph from existing points.
    pub fn from_points(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self { name: name.into(), points }
    }

    /// Append a point.
    pub fn push(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }

    /// All points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the graph has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// x coordinates.
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.0).collect()
    }

    /// y coordinates.
    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.1).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_columns() {
        let mut g = Graph::new("cls_vs_mu");
        assert!(g.is_empty());
        g.push(0.5, 0.3);
        g.push(1.0, 0.1);
        assert_eq!(g.len(), 2);
        assert_eq!(g.xs(), vec![0.5, 1.0]);
        assert_eq!(g.ys(), vec![0.3, 0.1]);
    }
}
