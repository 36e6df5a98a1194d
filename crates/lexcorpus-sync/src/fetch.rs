//! Collaborator seams for page fetching and alternate-corpus lookup.
//!
//! Both return "no data" instead of errors: a failed fetch is an empty
//! [`FetchedPage`], a failed lookup is `None`. Callers decide what an empty
//! answer means.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Representation requested from the fetch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageFormat {
    /// Rendered HTML of the captured region.
    Html,
    /// Unprocessed HTML as served.
    RawHtml,
    Markdown,
}

/// How to render and capture a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Capture the whole page rather than the main-content region.
    pub full_page: bool,
    pub render_wait_ms: u64,
    pub formats: Vec<PageFormat>,
}

impl FetchOptions {
    /// Main-content capture as HTML and markdown.
    pub fn main_content(render_wait_ms: u64) -> Self {
        Self {
            full_page: false,
            render_wait_ms,
            formats: vec![PageFormat::Html, PageFormat::Markdown],
        }
    }

    /// Whole-page capture as HTML and markdown.
    pub fn full_page(render_wait_ms: u64) -> Self {
        Self {
            full_page: true,
            ..Self::main_content(render_wait_ms)
        }
    }

    /// Whole-page capture of the raw HTML plus markdown.
    pub fn raw_html(render_wait_ms: u64) -> Self {
        Self {
            full_page: true,
            render_wait_ms,
            formats: vec![PageFormat::RawHtml, PageFormat::Markdown],
        }
    }

    pub fn wants_raw(&self) -> bool {
        self.formats.contains(&PageFormat::RawHtml)
    }
}

/// Whatever the fetch service managed to return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: Option<String>,
    pub markdown: Option<String>,
}

impl FetchedPage {
    pub fn is_empty(&self) -> bool {
        self.html.as_deref().is_none_or(str::is_empty)
            && self.markdown.as_deref().is_none_or(str::is_empty)
    }

    /// HTML and markdown joined, for pattern mining and AI source windows.
    pub fn combined(&self) -> String {
        [self.html.as_deref(), self.markdown.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// The fetch service.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`. Failures come back as an empty page.
    async fn fetch(&self, url: &str, options: &FetchOptions) -> FetchedPage;
}

/// One article as published by the alternate corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusArticle {
    pub number: String,
    pub text: String,
}

/// A statute as published by the alternate corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStatute {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub articles: Vec<CorpusArticle>,
}

/// The alternate legal-corpus service.
#[async_trait]
pub trait CorpusLookup: Send + Sync {
    /// Look a statute up by name. Failures and misses are both `None`.
    async fn lookup(&self, statute: &str) -> Option<CorpusStatute>;
}
