//! Image generation client.
//!
//! Requests a single image for a text prompt and streams the result to a
//! local file.

use super::TransportError;
use crate::config::{ApiConfig, ImageConfig};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Client for the image generation endpoint.
pub struct ImageClient {
    client: Client,
    url: String,
    model: String,
    size: String,
    credential: String,
}

impl ImageClient {
    /// Create an image client from the resolved configuration.
    pub fn new(client: Client, api: &ApiConfig, image: &ImageConfig, credential: String) -> Self {
        Self {
            client,
            url: format!(
                "{}/v1/images/generations",
                api.endpoint.trim_end_matches('/')
            ),
            model: image.model.clone(),
            size: image.size.clone(),
            credential,
        }
    }

    /// Request one image for the prompt and return its URL, if the endpoint
    /// produced one. A response without a URL is logged, not an error.
    pub async fn generate(&self, prompt: &str) -> Result<Option<String>, TransportError> {
        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: &self.size,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.credential))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: self.url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, message });
        }

        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Request {
                url: self.url.clone(),
                source,
            })?;
        debug!(%body, "image response received");

        let url = extract_image_url(&body);
        if url.is_none() {
            warn!("image response carried no URL");
        }
        Ok(url)
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
}

/// Pull `data[0].url` out of the response envelope, degrading to `None` on
/// a malformed or empty document.
fn extract_image_url(body: &str) -> Option<String> {
    let envelope: ImageResponse = serde_json::from_str(body).ok()?;
    envelope.data.into_iter().next()?.url
}

/// Stream a URL to a local file, overwriting any existing file at the path.
pub async fn download_file(client: &Client, url: &str, dest: &Path) -> Result<(), TransportError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(TransportError::Status {
            status: response.status(),
            message: format!("download of {} failed", url),
        });
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|source| TransportError::Destination {
            path: dest.to_path_buf(),
            source,
        })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|source| TransportError::Request {
            url: url.to_string(),
            source,
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|source| TransportError::Destination {
                path: dest.to_path_buf(),
                source,
            })?;
    }

    file.flush()
        .await
        .map_err(|source| TransportError::Destination {
            path: dest.to_path_buf(),
            source,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_request_shape() {
        let request = ImageRequest {
            model: "dall-e-3",
            prompt: "a white siamese cat",
            n: 1,
            size: "1024x1024",
        };
        let json: Value = serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(json["model"], "dall-e-3");
        assert_eq!(json["prompt"], "a white siamese cat");
        assert_eq!(json["n"], 1);
        assert_eq!(json["size"], "1024x1024");
    }

    #[test]
    fn test_extract_image_url() {
        let body = r#"{"data":[{"url":"https://cdn.example/img.png"}]}"#;
        assert_eq!(
            extract_image_url(body),
            Some("https://cdn.example/img.png".to_string())
        );
    }

    #[test]
    fn test_extract_image_url_absent() {
        assert_eq!(extract_image_url(r#"{"data":[]}"#), None);
        assert_eq!(extract_image_url(r#"{"data":[{}]}"#), None);
        assert_eq!(extract_image_url(r#"{"error":{"message":"bad prompt"}}"#), None);
        assert_eq!(extract_image_url("not json"), None);
    }
}
