use crate::config::PhotoConfig;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// What the camera asks the photo archive for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRequest {
    pub camera_id: String,
    pub sol: u32,
    pub auth_key: String,
}

/// A photo plus the exchange that produced it, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct PhotoResponse {
    pub photo: Vec<u8>,
    pub query: String,
    pub response: String,
}

/// Photo archive boundary.
///
/// Implementations may block on the network; the rover bounds every call
/// with its own timeout, so an implementation that never returns cannot
/// wedge the state machine.
#[async_trait]
pub trait PhotoQuery: Send + Sync {
    async fn query(&self, request: &PhotoRequest) -> Result<PhotoResponse>;
}

#[derive(Debug, Deserialize)]
struct PhotoManifest {
    photos: Vec<PhotoRecord>,
}

#[derive(Debug, Deserialize)]
struct PhotoRecord {
    id: u64,
    img_src: String,
    earth_date: String,
    camera: PhotoCamera,
}

#[derive(Debug, Deserialize)]
struct PhotoCamera {
    name: String,
}

/// HTTP client for the Mars rover photo API.
///
/// Looks up the photos a camera took on a sol and downloads the first one.
pub struct HttpPhotoQuery {
    http_client: Client,
    base_url: String,
    rover_name: String,
}

impl HttpPhotoQuery {
    pub fn new(config: &PhotoConfig) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("rover-kernel/0.1")
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build photo archive HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rover_name: config.rover_name.clone(),
        })
    }

    async fn download(&self, img_src: &str) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .get(img_src)
            .send()
            .await
            .with_context(|| format!("Failed to download photo from '{}'", img_src))?;

        check_response_status(&response)?;
        let bytes = response
            .bytes()
            .await
            .context("Failed to read photo body")?;

        if bytes.is_empty() {
            bail!("Photo archive returned an empty image for '{}'", img_src);
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PhotoQuery for HttpPhotoQuery {
    async fn query(&self, request: &PhotoRequest) -> Result<PhotoResponse> {
        let url = format!("{}/rovers/{}/photos", self.base_url, self.rover_name);
        // Diagnostic form of the query; the auth key stays out of logs.
        let query = format!("{}?sol={}&camera={}", url, request.sol, request.camera_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("sol", request.sol.to_string()),
                ("camera", request.camera_id.clone()),
                ("api_key", request.auth_key.clone()),
            ])
            .send()
            .await
            .context("Failed to send photo query")?;

        check_response_status(&response)?;
        let body = response
            .text()
            .await
            .context("Failed to read photo query response")?;

        let manifest: PhotoManifest =
            serde_json::from_str(&body).context("Failed to parse photo query response")?;

        let record = manifest.photos.first().ok_or_else(|| {
            anyhow!(
                "No photos from camera {} on sol {}",
                request.camera_id,
                request.sol
            )
        })?;

        debug!(
            photo_id = record.id,
            camera = %record.camera.name,
            earth_date = %record.earth_date,
            "Downloading photo"
        );

        let photo = self.download(&record.img_src).await?;

        Ok(PhotoResponse {
            photo,
            query,
            response: body,
        })
    }
}

/// Map failing HTTP statuses to descriptive errors.
///
/// - 401/403 → auth key rejected
/// - 429 → rate limited
/// - Other non-2xx → generic archive error
fn check_response_status(response: &reqwest::Response) -> Result<()> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(anyhow!("Photo archive rejected the auth key"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let remaining = response
                .headers()
                .get("X-RateLimit-Remaining")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            Err(anyhow!(
                "Photo archive rate limit exceeded (X-RateLimit-Remaining: {})",
                remaining
            ))
        }
        s if !s.is_success() => Err(anyhow!("Photo archive error: {}", s)),
        _ => Ok(()),
    }
}
