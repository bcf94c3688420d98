
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::{Distance, Point, PointId, ScoredPoint, StoredPoint, VectorIndex};
use crate::config::{ConfigError, CredentialKind, Credentials, parse_service_url};
use crate::{DescriptionsError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Blocking client for the Qdrant REST API.
///
/// Built once per process from the run's credentials and shared by reference.
#[derive(Debug, Clone)]
pub struct QdrantClient {
    base_url: Url,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: u64,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct VectorParams {
    size: usize,
    distance: Distance,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    points: &'a [Point],
}

#[derive(Debug, Serialize)]
struct RetrieveRequest<'a> {
    ids: &'a [PointId],
    with_payload: bool,
    with_vector: bool,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

impl QdrantClient {
    /// Builds the client. Both the URL and the API key are required.
    #[inline]
    pub fn new(credentials: &Credentials) -> Result<Self> {
        if credentials.qdrant_url.trim().is_empty() {
            return Err(ConfigError::MissingCredential(CredentialKind::QdrantUrl).into());
        }
        if credentials.qdrant_api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential(CredentialKind::QdrantApiKey).into());
        }

        let base_url = parse_service_url(&credentials.qdrant_url)?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: credentials.qdrant_api_key.clone(),
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Lists collections to prove the service is reachable and the key is accepted
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        let url = self.url(&["collections"])?;
        debug!("Checking Qdrant at {}", url);

        self.agent
            .get(url.as_str())
            .header("api-key", &self.api_key)
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error("health check", e))?;

        info!("Qdrant reachable at {}", self.base_url);
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DescriptionsError::Index(format!("Qdrant URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get<T: DeserializeOwned>(&self, url: &Url, what: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .agent
            .get(url.as_str())
            .header("api-key", &self.api_key)
            .call()
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error(what, e))?;
        parse_result(&response, what)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, url: &Url, body: &B, what: &str) -> Result<T> {
        let request_json = serialize(body, what)?;
        debug!("POST {} ({} bytes)", url, request_json.len());
        let response = self
            .agent
            .post(url.as_str())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error(what, e))?;
        parse_result(&response, what)
    }

    fn put<B: Serialize>(&self, url: &Url, body: &B, what: &str) -> Result<()> {
        let request_json = serialize(body, what)?;
        debug!("PUT {} ({} bytes)", url, request_json.len());
        self.agent
            .put(url.as_str())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| request_error(what, e))?;
        Ok(())
    }
}

impl VectorIndex for QdrantClient {
    fn collection_exists(&self, name: &str) -> Result<bool> {
        let url = self.url(&["collections", name, "exists"])?;
        let result: ExistsResult = self.get(&url, "collection exists")?;
        Ok(result.exists)
    }

    fn create_collection(&self, name: &str, dimension: usize, distance: Distance) -> Result<()> {
        let url = self.url(&["collections", name])?;
        let request = CreateCollectionRequest {
            vectors: VectorParams {
                size: dimension,
                distance,
            },
        };
        self.put(&url, &request, "create collection")?;
        info!(
            "Created collection {} ({} dimensions, {:?})",
            name, dimension, distance
        );
        Ok(())
    }

    fn count(&self, name: &str, exact: bool) -> Result<u64> {
        let url = self.url(&["collections", name, "points", "count"])?;
        let result: CountResult = self.post(&url, &json!({ "exact": exact }), "count")?;
        Ok(result.count)
    }

    fn upsert(&self, name: &str, points: &[Point]) -> Result<()> {
        let mut url = self.url(&["collections", name, "points"])?;
        url.query_pairs_mut().append_pair("wait", "true");
        self.put(&url, &UpsertRequest { points }, "upsert")?;
        debug!("Upserted {} points into {}", points.len(), name);
        Ok(())
    }

    fn retrieve(&self, name: &str, ids: &[PointId]) -> Result<Vec<StoredPoint>> {
        let url = self.url(&["collections", name, "points"])?;
        let request = RetrieveRequest {
            ids,
            with_payload: true,
            with_vector: false,
        };
        self.post(&url, &request, "retrieve")
    }

    fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let url = self.url(&["collections", name, "points", "search"])?;
        let request = SearchRequest {
            vector,
            limit,
            with_payload: true,
        };
        self.post(&url, &request, "search")
    }
}

fn serialize<B: Serialize>(body: &B, what: &str) -> Result<String> {
    serde_json::to_string(body).map_err(|e| {
        DescriptionsError::Index(format!("Failed to serialize {} request: {}", what, e))
    })
}

fn parse_result<T: DeserializeOwned>(body: &str, what: &str) -> Result<T> {
    serde_json::from_str::<QdrantResponse<T>>(body)
        .map(|response| response.result)
        .map_err(|e| DescriptionsError::Index(format!("Failed to parse {} response: {}", what, e)))
}

fn request_error(what: &str, error: ureq::Error) -> DescriptionsError {
    match error {
        ureq::Error::StatusCode(status) => {
            DescriptionsError::Index(format!("Qdrant {} request failed: HTTP {}", what, status))
        }
        other => DescriptionsError::Index(format!("Qdrant {} request failed: {}", what, other)),
    }
}
