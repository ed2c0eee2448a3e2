use crate::config::Settings;
use crate::domain::article::{EnrichedArticle, NewsItem};
use anyhow::Context;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;

const TITLE_SELECTOR: &str = "h1";
const BODY_SELECTOR: &str = "div.caas-body";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Resolves the full text of a news item's linked article. Never fails: any
/// problem with the page degrades to the item's headline/summary.
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    http: reqwest::Client,
}

impl ArticleExtractor {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Self::new(settings.article_timeout)
    }

    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!timeout.is_zero(), "article fetch timeout must be non-zero");
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build article http client")?;
        Ok(Self { http })
    }

    pub async fn extract(&self, item: &NewsItem) -> EnrichedArticle {
        let mut article = EnrichedArticle::fallback(item);
        if item.article_url.is_empty() {
            return article;
        }

        let parsed = match self.fetch_page(&item.article_url).await {
            Ok(html) => parse_article_html(&html),
            Err(err) => {
                tracing::warn!(url = %item.article_url, error = %err, "article fetch failed; using summary");
                return article;
            }
        };

        match parsed.title {
            Some(title) => article.title = title,
            None => tracing::debug!(url = %item.article_url, "no article title; using headline"),
        }
        match parsed.body {
            Some(body) => article.content = body,
            None => tracing::debug!(url = %item.article_url, "no article body; using summary"),
        }
        article
    }

    async fn fetch_page(&self, url: &str) -> anyhow::Result<String> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .context("article request failed")?;

        let status = res.status();
        anyhow::ensure!(status.is_success(), "article HTTP {status}");

        res.text().await.context("failed to read article body")
    }
}

pub fn parse_article_html(html: &str) -> ParsedArticle {
    let document = Html::parse_document(html);

    ParsedArticle {
        title: first_text(&document, title_selector()),
        body: first_text(&document, body_selector()),
    }
}

fn first_text(document: &Html, selector: Option<&Selector>) -> Option<String> {
    let element = document.select(selector?).next()?;
    let text = element_text(element);
    (!text.is_empty()).then_some(text)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_selector() -> Option<&'static Selector> {
    static SELECTOR: OnceLock<Option<Selector>> = OnceLock::new();
    SELECTOR
        .get_or_init(|| Selector::parse(TITLE_SELECTOR).ok())
        .as_ref()
}

fn body_selector() -> Option<&'static Selector> {
    static SELECTOR: OnceLock<Option<Selector>> = OnceLock::new();
    SELECTOR
        .get_or_init(|| Selector::parse(BODY_SELECTOR).ok())
        .as_ref()
}
