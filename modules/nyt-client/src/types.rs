use serde::{Deserialize, Serialize};

/// Article Search pages hold 10 documents; the API refuses page indexes past 100.
pub const PAGE_SIZE: usize = 10;
pub const MAX_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sort {
    #[default]
    Newest,
    Oldest,
    Relevance,
}

impl Sort {
    pub fn as_str(self) -> &'static str {
        match self {
            Sort::Newest => "newest",
            Sort::Oldest => "oldest",
            Sort::Relevance => "relevance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub text: String,
    /// `YYYYMMDD`
    pub begin_date: Option<String>,
    /// `YYYYMMDD`
    pub end_date: Option<String>,
    pub sort: Sort,
    /// Lucene filter query, e.g. `source:("The New York Times")`.
    pub filter: Option<String>,
    /// 0-indexed.
    pub page: u32,
}

impl ArticleQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            begin_date: None,
            end_date: None,
            sort: Sort::default(),
            filter: None,
            page: 0,
        }
    }

    pub fn dates(mut self, begin: Option<String>, end: Option<String>) -> Self {
        self.begin_date = begin;
        self.end_date = end;
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn filter(mut self, fq: impl Into<String>) -> Self {
        self.filter = Some(fq.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.min(MAX_PAGE);
        self
    }

    /// Query pairs without the API key.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.text.clone()),
            ("sort", self.sort.as_str().to_string()),
            ("page", self.page.to_string()),
        ];
        if let Some(ref begin) = self.begin_date {
            params.push(("begin_date", begin.clone()));
        }
        if let Some(ref end) = self.end_date {
            params.push(("end_date", end.clone()));
        }
        if let Some(ref fq) = self.filter {
            params.push(("fq", fq.clone()));
        }
        params
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse {
    pub response: ResponseBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponseBody {
    #[serde(default)]
    pub docs: Vec<Article>,
    #[serde(default)]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Meta {
    #[serde(default)]
    pub hits: u64,
}

/// One page of Article Search results.
#[derive(Debug, Clone, Default)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    pub total_hits: u64,
    pub page: u32,
}

impl ArticlePage {
    pub fn has_more(&self) -> bool {
        self.articles.len() >= PAGE_SIZE
            && ((self.page as u64 + 1) * PAGE_SIZE as u64) < self.total_hits
            && self.page < MAX_PAGE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub main: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub web_url: Option<String>,
    #[serde(default)]
    pub headline: Headline,
    #[serde(rename = "abstract")]
    pub summary: Option<String>,
    pub snippet: Option<String>,
    pub lead_paragraph: Option<String>,
    /// e.g. `2001-09-11T05:00:00+0000`
    pub pub_date: Option<String>,
    pub section_name: Option<String>,
    pub document_type: Option<String>,
}

impl Article {
    /// Best short text the API exposes: lead paragraph, then abstract, then snippet.
    pub fn excerpt(&self) -> String {
        [&self.lead_paragraph, &self.summary, &self.snippet]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_default()
    }
}
