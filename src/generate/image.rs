//! Best-effort image derivation from a variant's auxiliary prompt. A failure
//! here never demotes an item; the artifact is simply absent.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::WatcherConfig;

#[async_trait]
pub trait ImageMaker: Send + Sync {
    /// Returns an artifact locator (URL) for the prompt.
    async fn create(&self, prompt: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// OpenAI images endpoint. Requires `OPENAI_API_KEY`.
pub struct OpenAiImageMaker {
    http: reqwest::Client,
    api_key: String,
}

impl OpenAiImageMaker {
    pub fn new() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        anyhow::ensure!(!api_key.is_empty(), "OPENAI_API_KEY is not set");
        let http = reqwest::Client::builder()
            .user_agent("market-watcher/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(120))
            .build()
            .context("building http client")?;
        Ok(Self { http, api_key })
    }
}

#[async_trait]
impl ImageMaker for OpenAiImageMaker {
    async fn create(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            prompt: &'a str,
            n: u32,
            size: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            data: Vec<Entry>,
        }
        #[derive(Deserialize)]
        struct Entry {
            url: Option<String>,
        }

        let req = Req {
            model: "dall-e-3",
            prompt,
            n: 1,
            size: "1024x1024",
        };
        let resp = self
            .http
            .post("https://api.openai.com/v1/images/generations")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("image request")?;
        anyhow::ensure!(
            resp.status().is_success(),
            "image endpoint returned {}",
            resp.status()
        );
        let body: Resp = resp.json().await.context("image response body")?;
        body.data
            .into_iter()
            .find_map(|e| e.url)
            .context("image response carried no url")
    }

    fn name(&self) -> &'static str {
        "openai-images"
    }
}

/// Build the optional image collaborator; `None` means the pipeline skips the
/// auxiliary stage entirely.
pub fn build_image_maker(cfg: &WatcherConfig) -> Option<Box<dyn ImageMaker>> {
    if !(cfg.ai.enabled && cfg.ai.image_enabled) {
        return None;
    }
    match cfg.ai.provider.as_str() {
        "openai" => match OpenAiImageMaker::new() {
            Ok(m) => Some(Box::new(m)),
            Err(e) => {
                tracing::warn!(error = %e, "image maker unavailable; continuing without images");
                None
            }
        },
        _ => None,
    }
}
