// In-memory index module
// Mirrors the Qdrant collection rules used by the ingestion workflow


use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Distance, Payload, Point, PointId, ScoredPoint, StoredPoint, VectorIndex};
use crate::{DescriptionsError, Result};

#[derive(Debug)]
struct Collection {
    dimension: usize,
    distance: Distance,
    // Insertion order is kept so reads are deterministic
    points: Vec<(PointId, Vec<f32>, Payload)>,
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collections currently held
    #[inline]
    pub fn collection_count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Dimension and distance of `name`, if it exists
    #[inline]
    pub fn collection_info(&self, name: &str) -> Result<Option<(usize, Distance)>> {
        Ok(self
            .read()?
            .get(name)
            .map(|collection| (collection.dimension, collection.distance)))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .read()
            .map_err(|_| DescriptionsError::Index("Memory index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections
            .write()
            .map_err(|_| DescriptionsError::Index("Memory index lock poisoned".to_string()))
    }
}

fn missing_collection(name: &str) -> DescriptionsError {
    DescriptionsError::Index(format!("Collection `{}` doesn't exist", name))
}

impl VectorIndex for MemoryIndex {
    fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.contains_key(name))
    }

    fn create_collection(&self, name: &str, dimension: usize, distance: Distance) -> Result<()> {
        let mut collections = self.write()?;
        if collections.contains_key(name) {
            return Err(DescriptionsError::Index(format!(
                "Collection `{}` already exists",
                name
            )));
        }
        collections.insert(
            name.to_string(),
            Collection {
                dimension,
                distance,
                points: Vec::new(),
            },
        );
        Ok(())
    }

    fn count(&self, name: &str, _exact: bool) -> Result<u64> {
        let collections = self.read()?;
        let collection = collections.get(name).ok_or_else(|| missing_collection(name))?;
        Ok(collection.points.len() as u64)
    }

    fn upsert(&self, name: &str, points: &[Point]) -> Result<()> {
        let mut collections = self.write()?;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| missing_collection(name))?;

        if let Some(point) = points
            .iter()
            .find(|point| point.vector.len() != collection.dimension)
        {
            return Err(DescriptionsError::Index(format!(
                "Vector dimension error: expected dim: {}, got {}",
                collection.dimension,
                point.vector.len()
            )));
        }

        for point in points {
            let entry = (point.id, point.vector.clone(), point.payload.clone());
            match collection.points.iter_mut().find(|(id, _, _)| *id == point.id) {
                Some(existing) => *existing = entry,
                None => collection.points.push(entry),
            }
        }
        Ok(())
    }

    fn retrieve(&self, name: &str, ids: &[PointId]) -> Result<Vec<StoredPoint>> {
        let collections = self.read()?;
        let collection = collections.get(name).ok_or_else(|| missing_collection(name))?;

        Ok(ids
            .iter()
            .filter_map(|wanted| {
                collection
                    .points
                    .iter()
                    .find(|(id, _, _)| id == wanted)
                    .map(|(id, _, payload)| StoredPoint {
                        id: *id,
                        payload: payload.clone(),
                    })
            })
            .collect())
    }

    fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let collections = self.read()?;
        let collection = collections.get(name).ok_or_else(|| missing_collection(name))?;

        if vector.len() != collection.dimension {
            return Err(DescriptionsError::Index(format!(
                "Vector dimension error: expected dim: {}, got {}",
                collection.dimension,
                vector.len()
            )));
        }

        let mut hits: Vec<ScoredPoint> = collection
            .points
            .iter()
            .map(|(id, stored, payload)| ScoredPoint {
                id: *id,
                score: score(collection.distance, vector, stored),
                payload: payload.clone(),
            })
            .collect();

        // Higher is better for every metric once euclid is negated
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    match distance {
        Distance::Cosine => cosine_similarity(a, b),
        Distance::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Distance::Euclid => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

/// Cosine similarity; zero-length vectors score 0
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, na, nb), (x, y)| {
            (x.mul_add(*y, dot), x.mul_add(*x, na), y.mul_add(*y, nb))
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
