//! Generation providers: trait abstraction over the external text model, a
//! config-driven factory, and the prompt that requests every configured style
//! in one call.

pub mod image;
pub mod parser;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{StyleSpec, WatcherConfig};
use crate::source::SourcedItem;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Run one generation call. Errors are retried by the caller, so this must
    /// be safe to repeat.
    async fn generate(&self, prompt: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Render the single prompt that asks for all styles at once, with the marker
/// contract spelled out so the output is machine-splittable.
pub fn render_prompt(item: &SourcedItem, styles: &[StyleSpec]) -> String {
    let mut out = String::new();
    out.push_str(
        "You rewrite a news item into several styled briefs. \
         For EACH style below, output exactly this shape, markers on their own lines:\n\n",
    );
    for s in styles {
        out.push_str(&format!(
            "{}\n<the brief, written per the style guide>\n{}\n<one short scene description for an illustrative image>\n\n",
            parser::text_marker(&s.name),
            parser::prompt_marker(&s.name),
        ));
    }
    out.push_str("Style guides:\n");
    for s in styles {
        out.push_str(&format!("- {}: {}\n", s.name, s.guide));
    }
    out.push_str(&format!(
        "\nNews item:\nKeyword: {}\nHeadline: {}\nLink: {}\n\nOutput nothing outside the marker blocks.\n",
        item.keyword, item.title, item.url
    ));
    out
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

/// OpenAI chat-completions provider. Requires `OPENAI_API_KEY`.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(model: &str) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        anyhow::ensure!(!api_key.is_empty(), "OPENAI_API_KEY is not set");
        let http = reqwest::Client::builder()
            .user_agent("market-watcher/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building http client")?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: "You are a precise rewriting assistant. Follow the marker format exactly.",
                },
                Msg {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.7,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?;
        anyhow::ensure!(
            resp.status().is_success(),
            "openai returned {}",
            resp.status()
        );
        let body: Resp = resp.json().await.context("openai response body")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();
        anyhow::ensure!(!content.trim().is_empty(), "openai returned empty content");
        Ok(content.to_string())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic provider for tests and `AI_TEST_MODE=mock`: emits one valid
/// marker block pair per configured style.
pub struct MockGenerator {
    styles: Vec<String>,
}

impl MockGenerator {
    pub fn for_styles(styles: &[StyleSpec]) -> Self {
        Self {
            styles: styles.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        let mut out = String::new();
        for style in &self.styles {
            out.push_str(&format!(
                "{}\nMock {style} brief.\n{}\nA simple illustrative scene.\n",
                parser::text_marker(style),
                parser::prompt_marker(style),
            ));
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Always errors; used when generation is switched off. Every item then ends
/// the run in a failed state, which the binary warns about at startup.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("generation is disabled")
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Factory: build a generator according to config and environment.
///
/// * If `AI_TEST_MODE=mock`, returns the deterministic mock.
/// * Else if `ai.enabled == false`, returns the disabled provider.
/// * Else builds the real provider; an unusable one degrades to disabled.
pub fn build_generator(cfg: &WatcherConfig) -> Box<dyn Generator> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Box::new(MockGenerator::for_styles(&cfg.styles));
    }
    if !cfg.ai.enabled {
        return Box::new(DisabledGenerator);
    }
    match cfg.ai.provider.as_str() {
        "openai" => match OpenAiGenerator::new(&cfg.ai.model) {
            Ok(g) => Box::new(g),
            Err(e) => {
                tracing::warn!(error = %e, "openai generator unavailable; generation disabled");
                Box::new(DisabledGenerator)
            }
        },
        other => {
            tracing::warn!(provider = other, "unsupported generation provider; generation disabled");
            Box::new(DisabledGenerator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> SourcedItem {
        SourcedItem {
            keyword: "food tech".into(),
            title: "Food tech fund closes".into(),
            url: "https://news.example.com/ft".into(),
            published_at: 100,
        }
    }

    fn styles() -> Vec<StyleSpec> {
        vec![
            StyleSpec {
                name: "analysis".into(),
                guide: "measured".into(),
            },
            StyleSpec {
                name: "flash".into(),
                guide: "punchy".into(),
            },
        ]
    }

    #[test]
    fn prompt_carries_markers_guides_and_metadata() {
        let p = render_prompt(&item(), &styles());
        assert!(p.contains("---ANALYSIS_TEXT---"));
        assert!(p.contains("---FLASH_PROMPT---"));
        assert!(p.contains("punchy"));
        assert!(p.contains("https://news.example.com/ft"));
    }

    #[tokio::test]
    async fn mock_output_round_trips_through_the_parser() {
        let gen = MockGenerator::for_styles(&styles());
        let raw = gen.generate("ignored").await.unwrap();
        let names: Vec<String> = styles().iter().map(|s| s.name.clone()).collect();
        let v = parser::parse_styled_output(&raw, &names).unwrap();
        assert_eq!(v.len(), 2);
        assert!(v["flash"].image_prompt.is_some());
    }

    #[tokio::test]
    async fn disabled_generator_always_errors() {
        assert!(DisabledGenerator.generate("x").await.is_err());
    }
}
