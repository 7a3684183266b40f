use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    Newest,
    #[default]
    Oldest,
    Relevance,
}

impl OrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderBy::Newest => "newest",
            OrderBy::Oldest => "oldest",
            OrderBy::Relevance => "relevance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSearch {
    pub text: String,
    /// `YYYY-MM-DD`
    pub from_date: Option<String>,
    /// `YYYY-MM-DD`
    pub to_date: Option<String>,
    pub order_by: OrderBy,
    /// 1-indexed.
    pub page: u32,
    pub page_size: u32,
    /// Ask for `fields.bodyText` on every result.
    pub body_text: bool,
}

impl ContentSearch {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_date: None,
            to_date: None,
            order_by: OrderBy::default(),
            page: 1,
            page_size: MAX_PAGE_SIZE,
            body_text: true,
        }
    }

    pub fn dates(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from_date = from;
        self.to_date = to;
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn body_text(mut self, body_text: bool) -> Self {
        self.body_text = body_text;
        self
    }

    /// Query pairs without the API key.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.text.clone()),
            ("page", self.page.to_string()),
            ("page-size", self.page_size.to_string()),
            ("order-by", self.order_by.as_str().to_string()),
            ("format", "json".to_string()),
        ];
        if let Some(ref from) = self.from_date {
            params.push(("from-date", from.clone()));
        }
        if let Some(ref to) = self.to_date {
            params.push(("to-date", to.clone()));
        }
        if self.body_text {
            params.push(("show-fields", "bodyText".to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse {
    pub response: ResponseBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResponseBody {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub results: Vec<Content>,
}

/// One page of content search results.
#[derive(Debug, Clone, Default)]
pub struct ContentPage {
    pub results: Vec<Content>,
    pub total: u64,
    pub current_page: u32,
    pub pages: u32,
}

impl ContentPage {
    pub fn has_more(&self) -> bool {
        !self.results.is_empty() && self.current_page < self.pages
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFields {
    pub body_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub id: String,
    pub section_name: Option<String>,
    /// e.g. `2008-09-15T23:01:00Z`
    pub web_publication_date: Option<String>,
    pub web_title: Option<String>,
    pub web_url: Option<String>,
    #[serde(default)]
    pub fields: ContentFields,
}
