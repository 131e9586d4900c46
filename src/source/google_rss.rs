//! Google News search-feed provider: one RSS query per keyword with a recency
//! window, parsed via quick-xml into `SourcedItem`s.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::source::{normalize_title, NewsSource, SourcedItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    // Feeds emit the obsolete "GMT"/"UT" zone tokens; the RFC2822 parser
    // wants a numeric offset.
    let ts = ts.trim();
    let ts = ts
        .strip_suffix("GMT")
        .or_else(|| ts.strip_suffix("UTC"))
        .or_else(|| ts.strip_suffix("UT"))
        .map(|head| format!("{head}+0000"))
        .unwrap_or_else(|| ts.to_string());
    OffsetDateTime::parse(&ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

pub struct GoogleNewsRss {
    mode: Mode,
    recency_hours: u64,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl GoogleNewsRss {
    pub fn from_http(recency_hours: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("market-watcher/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building http client")?;
        Ok(Self {
            mode: Mode::Http { client },
            recency_hours,
        })
    }

    /// Parse a canned feed body instead of fetching; for tests.
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
            recency_hours: 24,
        }
    }

    fn feed_url(&self, keyword: &str) -> Result<reqwest::Url> {
        reqwest::Url::parse_with_params(
            "https://news.google.com/rss/search",
            &[
                ("q", format!("{keyword} when:{}h", self.recency_hours)),
                ("hl", "ko".to_string()),
                ("gl", "KR".to_string()),
                ("ceid", "KR:ko".to_string()),
            ],
        )
        .context("building feed url")
    }

    fn parse_items(keyword: &str, xml: &str) -> Result<Vec<SourcedItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing news rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_title(it.title.as_deref().unwrap_or_default());
            let url = it.link.unwrap_or_default();
            if title.is_empty() || url.is_empty() {
                continue;
            }
            out.push(SourcedItem {
                keyword: keyword.to_string(),
                title,
                url,
                published_at: it
                    .pub_date
                    .as_deref()
                    .map(parse_rfc2822_to_unix)
                    .unwrap_or(0),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("watcher_source_parse_ms").record(ms);
        counter!("watcher_source_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl NewsSource for GoogleNewsRss {
    async fn fetch_latest(&self, keyword: &str, cap: usize) -> Result<Vec<SourcedItem>> {
        let mut items = match &self.mode {
            Mode::Fixture(s) => Self::parse_items(keyword, s)?,
            Mode::Http { client } => {
                let url = self.feed_url(keyword)?;
                let resp = match client.get(url).send().await {
                    Ok(resp) => resp,
                    Err(e) => {
                        counter!("watcher_source_errors_total").increment(1);
                        return Err(e).context("news feed get()");
                    }
                };
                anyhow::ensure!(
                    resp.status().is_success(),
                    "news feed returned {}",
                    resp.status()
                );
                let body = resp.text().await.context("news feed .text()")?;
                Self::parse_items(keyword, &body)?
            }
        };
        items.truncate(cap);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "google-news"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
