// Ingestion module
// Embeds description text and writes it into the vector index


use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::database::{Distance, Point, PointId, VectorIndex, payload_text};
use crate::embeddings::Embedder;

/// A similarity search hit resolved to its description
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: PointId,
    pub score: f32,
    pub text: String,
}

/// Stores descriptions as embeddings in one collection.
///
/// The index and embedder are constructed once by the caller and borrowed
/// here, so a single connection serves every operation of a run.
pub struct DescriptionStore<'a> {
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
    collection: String,
    collection_ready: OnceLock<()>,
}

impl<'a> DescriptionStore<'a> {
    #[inline]
    pub fn new(
        index: &'a dyn VectorIndex,
        embedder: &'a dyn Embedder,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            index,
            embedder,
            collection: collection.into(),
            collection_ready: OnceLock::new(),
        }
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Creates the collection with the embedder's dimension and cosine
    /// distance unless it already exists. An existing collection is used as
    /// is, whatever its geometry.
    #[inline]
    pub fn ensure_collection(&self) -> Result<()> {
        let exists = self
            .index
            .collection_exists(&self.collection)
            .with_context(|| format!("Failed to check collection {}", self.collection))?;

        if exists {
            debug!("Collection {} already exists", self.collection);
        } else {
            info!("Creating collection {}", self.collection);
            let created = self.index.create_collection(
                &self.collection,
                self.embedder.dimension(),
                Distance::Cosine,
            );

            if let Err(e) = created {
                // Another writer may have created it between the check and the create
                let exists_now = self.index.collection_exists(&self.collection).unwrap_or(false);
                if !exists_now {
                    return Err(e)
                        .with_context(|| format!("Failed to create collection {}", self.collection));
                }
                debug!("Collection {} was created concurrently", self.collection);
            }
        }

        let _ = self.collection_ready.set(());
        Ok(())
    }

    /// Embeds `text` and writes it as a new point with a random UUID.
    #[inline]
    pub fn save(&self, text: &str) -> Result<PointId> {
        if text.trim().is_empty() {
            bail!("Description is empty, nothing to save");
        }

        if self.collection_ready.get().is_none() {
            self.ensure_collection()?;
        }

        let vector = self
            .embedder
            .embed(text)
            .context("Failed to embed description")?;

        let id = PointId::random();
        let point = Point::with_text(id, vector, text);

        self.index
            .upsert(&self.collection, std::slice::from_ref(&point))
            .with_context(|| format!("Failed to store description in {}", self.collection))?;

        info!("Saved description {} ({} chars)", id, text.chars().count());
        Ok(id)
    }

    /// Description text stored under `id`
    #[inline]
    pub fn get(&self, id: PointId) -> Result<Option<String>> {
        let points = self
            .index
            .retrieve(&self.collection, &[id])
            .with_context(|| format!("Failed to retrieve point {}", id))?;

        Ok(points
            .into_iter()
            .find(|point| point.id == id)
            .and_then(|point| payload_text(&point.payload).map(str::to_string)))
    }

    /// Exact number of stored descriptions
    #[inline]
    pub fn count(&self) -> Result<u64> {
        self.index
            .count(&self.collection, true)
            .with_context(|| format!("Failed to count points in {}", self.collection))
    }

    /// Descriptions closest to `query`, best first
    #[inline]
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            bail!("Search query is empty");
        }

        let vector = self.embedder.embed(query).context("Failed to embed query")?;
        let hits = self
            .index
            .search(&self.collection, &vector, limit)
            .with_context(|| format!("Failed to search {}", self.collection))?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                id: hit.id,
                score: hit.score,
                text: payload_text(&hit.payload).unwrap_or_default().to_string(),
            })
            .collect())
    }
}
