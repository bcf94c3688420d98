// Database module
// Vector index boundary with a Qdrant REST client and an in-memory store


pub mod memory;
pub mod qdrant;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use memory::MemoryIndex;
pub use qdrant::QdrantClient;

/// Payload key holding the description text
pub const TEXT_PAYLOAD_KEY: &str = "text";

/// Point identifier. New points always get a UUID; unsigned integers are
/// accepted so collections written with numeric ids stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(Uuid),
}

impl PointId {
    #[inline]
    pub fn random() -> Self {
        PointId::Uuid(Uuid::new_v4())
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<Uuid> for PointId {
    fn from(value: Uuid) -> Self {
        PointId::Uuid(value)
    }
}

impl From<u64> for PointId {
    fn from(value: u64) -> Self {
        PointId::Num(value)
    }
}

pub type Payload = HashMap<String, Value>;

/// Distance metric of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
}

/// A point to write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl Point {
    /// A point carrying only the description text as payload
    #[inline]
    pub fn with_text(id: PointId, vector: Vec<f32>, text: &str) -> Self {
        let mut payload = Payload::new();
        payload.insert(TEXT_PAYLOAD_KEY.to_string(), Value::String(text.to_string()));
        Self {
            id,
            vector,
            payload,
        }
    }
}

/// A point read back from the index
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredPoint {
    pub id: PointId,
    #[serde(default)]
    pub payload: Payload,
}

/// A similarity search hit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default)]
    pub payload: Payload,
}

/// Text stored under [`TEXT_PAYLOAD_KEY`], if any
#[inline]
pub fn payload_text(payload: &Payload) -> Option<&str> {
    payload.get(TEXT_PAYLOAD_KEY).and_then(Value::as_str)
}

/// Operations consumed from a vector index service
pub trait VectorIndex: Send + Sync {
    fn collection_exists(&self, name: &str) -> crate::Result<bool>;

    fn create_collection(&self, name: &str, dimension: usize, distance: Distance)
    -> crate::Result<()>;

    fn count(&self, name: &str, exact: bool) -> crate::Result<u64>;

    fn upsert(&self, name: &str, points: &[Point]) -> crate::Result<()>;

    fn retrieve(&self, name: &str, ids: &[PointId]) -> crate::Result<Vec<StoredPoint>>;

    fn search(&self, name: &str, vector: &[f32], limit: usize) -> crate::Result<Vec<ScoredPoint>>;
}
