//! Exact nearest-neighbor index over squared Euclidean distance

use serde::Serialize;

use crate::error::{Error, Result};

/// A search hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    /// Insertion position of the vector
    pub position: usize,
    /// Squared L2 distance to the query
    pub distance: f32,
}

/// In-memory flat index
///
/// Positions are insertion order, so a vector's position equals the position
/// of the extract it was computed from.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimensions` components
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::vector_db("Index dimension must be positive"));
        }
        Ok(Self {
            dimensions,
            vectors: Vec::new(),
        })
    }

    /// Build an index from vectors, taking the dimension from the first one
    pub fn from_vectors(vectors: &[Vec<f32>]) -> Result<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| Error::vector_db("Cannot build an index from no vectors"))?;
        let mut index = Self::new(first.len())?;
        index.vectors.reserve(vectors.len());
        for vector in vectors {
            index.add(vector.clone())?;
        }
        Ok(index)
    }

    /// Append a vector, returning its position
    pub fn add(&mut self, vector: Vec<f32>) -> Result<usize> {
        self.check_dimensions(&vector)?;
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    /// Vector dimension
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// The `k` nearest vectors, closest first, ties by position
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dimensions(query)?;

        let mut hits: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();

        // Stable sort keeps insertion order among equal distances
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::vector_db(format!(
                "Dimension mismatch: index has {}, vector has {}",
                self.dimensions,
                vector.len()
            )));
        }
        Ok(())
    }
}

/// Squared Euclidean distance
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_first() {
        let index = FlatIndex::from_vectors(&[
            vec![0.0, 0.0],
            vec![5.0, 5.0],
            vec![1.0, 0.0],
        ])
        .unwrap();

        let hits = index.search(&[0.9, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].position, 2);
        assert_eq!(hits[1].position, 0);
        assert!((hits[0].distance - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_ties_by_position_and_k_larger_than_len() {
        let index = FlatIndex::from_vectors(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
        ])
        .unwrap();

        let hits = index.search(&[0.0, 0.0], 10).unwrap();
        let positions: Vec<_> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = FlatIndex::new(3).unwrap();
        assert!(matches!(index.add(vec![1.0]), Err(Error::VectorDb(_))));
        assert!(matches!(
            FlatIndex::from_vectors(&[vec![1.0, 2.0], vec![1.0]]),
            Err(Error::VectorDb(_))
        ));
        index.add(vec![0.0; 3]).unwrap();
        assert!(matches!(index.search(&[0.0; 2], 1), Err(Error::VectorDb(_))));
        assert!(FlatIndex::from_vectors(&[]).is_err());
    }
}
