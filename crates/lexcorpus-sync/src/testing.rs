//! In-memory collaborators for pipeline and recovery tests.

use std::sync::Mutex;

use async_trait::async_trait;

use lexcorpus_core::ArticleNumber;

use crate::fetch::{
    CorpusArticle, CorpusLookup, CorpusStatute, FetchOptions, FetchedPage, PageFetcher,
};

/// A small statute page containing exactly the articles in `numbers`.
pub fn statute_html(numbers: &[u32]) -> String {
    let mut html = String::from(
        "<html><body>\
         <p>LEI Nº 9.999, DE 1º DE JANEIRO DE 2020.</p>\
         <p>Dispõe sobre normas de teste para a ingestão de leis.</p>\
         <p>O PRESIDENTE DA REPÚBLICA Faço saber que o Congresso Nacional decreta e eu sanciono a seguinte Lei:</p>",
    );
    for &n in numbers {
        let body = format!("Texto do artigo número {n} desta Lei de teste.");
        let text = ArticleNumber::new(n).opener_with(&body);
        html.push_str(&format!("<p>{text}</p>"));
    }
    html.push_str(
        "<p>Brasília, 1º de janeiro de 2020; 199º da Independência e 132º da República.</p>\
         </body></html>",
    );
    html
}

/// Serves fixed pages chosen by the requested capture mode.
///
/// Full-page and raw requests fall back to the main page when not set.
#[derive(Default)]
pub struct StaticFetcher {
    main: Option<String>,
    full: Option<String>,
    raw: Option<String>,
    calls: Mutex<Vec<FetchOptions>>,
}

impl StaticFetcher {
    pub fn new(main: &str) -> Self {
        Self {
            main: Some(main.to_string()),
            ..Self::default()
        }
    }

    /// A fetcher whose every request fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_full_page(mut self, html: &str) -> Self {
        self.full = Some(html.to_string());
        self
    }

    pub fn with_raw(mut self, html: &str) -> Self {
        self.raw = Some(html.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, _url: &str, options: &FetchOptions) -> FetchedPage {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(options.clone());
        }
        let html = if options.wants_raw() {
            self.raw.as_ref().or(self.full.as_ref()).or(self.main.as_ref())
        } else if options.full_page {
            self.full.as_ref().or(self.main.as_ref())
        } else {
            self.main.as_ref()
        };
        FetchedPage {
            html: html.cloned(),
            markdown: None,
        }
    }
}

/// Answers every lookup with the same statute, if any.
#[derive(Default)]
pub struct StaticCorpus {
    statute: Option<CorpusStatute>,
    calls: Mutex<usize>,
}

impl StaticCorpus {
    pub fn with_articles(articles: impl IntoIterator<Item = CorpusArticle>) -> Self {
        Self {
            statute: Some(CorpusStatute {
                title: None,
                articles: articles.into_iter().collect(),
            }),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait]
impl CorpusLookup for StaticCorpus {
    async fn lookup(&self, _statute: &str) -> Option<CorpusStatute> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        self.statute.clone()
    }
}
