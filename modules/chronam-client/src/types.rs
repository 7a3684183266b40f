use serde::{Deserialize, Serialize};

/// Full-text search over digitized newspaper pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSearch {
    /// Words that must all appear in the OCR text.
    pub text: String,
    /// Lower bound, `MM/DD/YYYY`.
    pub date1: Option<String>,
    /// Upper bound, `MM/DD/YYYY`.
    pub date2: Option<String>,
    /// US state name, e.g. "Massachusetts".
    pub state: Option<String>,
    /// Language code; defaults to `eng`.
    pub language: Option<String>,
    pub rows: u32,
    /// 1-indexed.
    pub page: u32,
}

impl PageSearch {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            date1: None,
            date2: None,
            state: None,
            language: Some("eng".to_string()),
            rows: 50,
            page: 1,
        }
    }

    pub fn dates(mut self, date1: Option<String>, date2: Option<String>) -> Self {
        self.date1 = date1;
        self.date2 = date2;
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn language(mut self, language: Option<&str>) -> Self {
        self.language = language.map(String::from);
        self
    }

    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = rows.max(1);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("andtext", self.text.clone()),
            ("format", "json".to_string()),
            ("rows", self.rows.to_string()),
            ("page", self.page.to_string()),
        ];
        if self.date1.is_some() || self.date2.is_some() {
            params.push(("dateFilterType", "range".to_string()));
        }
        if let Some(ref d) = self.date1 {
            params.push(("date1", d.clone()));
        }
        if let Some(ref d) = self.date2 {
            params.push(("date2", d.clone()));
        }
        if let Some(ref state) = self.state {
            params.push(("state", state.clone()));
        }
        if let Some(ref language) = self.language {
            params.push(("language", language.clone()));
        }
        params
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(rename = "totalItems", default)]
    pub total_items: u64,
    #[serde(rename = "endIndex", default)]
    pub end_index: u64,
    #[serde(default)]
    pub items: Vec<PageMatch>,
}

impl SearchPage {
    pub fn has_more(&self) -> bool {
        !self.items.is_empty() && self.end_index < self.total_items
    }
}

/// A newspaper page whose OCR text matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMatch {
    /// Path identifier, e.g. `/lccn/sn83030272/1900-01-01/ed-1/seq-1/`.
    #[serde(default)]
    pub id: String,
    /// Newspaper title.
    pub title: Option<String>,
    /// Issue date, `YYYYMMDD`.
    pub date: Option<String>,
    /// OCR text of the whole page.
    pub ocr_eng: Option<String>,
    /// JSON metadata URL for the page.
    pub url: Option<String>,
    #[serde(default)]
    pub state: Vec<String>,
    pub sequence: Option<u32>,
}

impl PageMatch {
    /// Human-readable page viewer URL.
    pub fn page_url(&self) -> Option<String> {
        if self.id.is_empty() {
            return self.url.as_ref().map(|u| u.trim_end_matches(".json").to_string());
        }
        Some(format!("https://chroniclingamerica.loc.gov{}", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_with_range_and_state() {
        let search = PageSearch::new("civil war")
            .dates(Some("01/01/1860".into()), Some("12/31/1865".into()))
            .state("Massachusetts");
        let params = search.to_params();
        assert!(params.contains(&("andtext", "civil war".to_string())));
        assert!(params.contains(&("dateFilterType", "range".to_string())));
        assert!(params.contains(&("date1", "01/01/1860".to_string())));
        assert!(params.contains(&("date2", "12/31/1865".to_string())));
        assert!(params.contains(&("state", "Massachusetts".to_string())));
        assert!(params.contains(&("language", "eng".to_string())));
    }

    #[test]
    fn no_date_filter_without_dates() {
        let params = PageSearch::new("x").language(None).to_params();
        assert!(!params.iter().any(|(k, _)| *k == "dateFilterType"));
        assert!(!params.iter().any(|(k, _)| *k == "language"));
    }

    #[test]
    fn parses_results_page() {
        let page: SearchPage = serde_json::from_str(
            r#"{
                "totalItems": 120,
                "endIndex": 50,
                "startIndex": 1,
                "itemsPerPage": 50,
                "items": [{
                    "id": "/lccn/sn83030272/1900-01-01/ed-1/seq-1/",
                    "title": "The sun.",
                    "date": "19000101",
                    "ocr_eng": "THE SUN ... industrial revolution ...",
                    "url": "https://chroniclingamerica.loc.gov/lccn/sn83030272/1900-01-01/ed-1/seq-1.json",
                    "state": ["New York"],
                    "sequence": 1
                }]
            }"#,
        )
        .unwrap();
        assert!(page.has_more());
        assert_eq!(page.items[0].date.as_deref(), Some("19000101"));
        assert_eq!(
            page.items[0].page_url().unwrap(),
            "https://chroniclingamerica.loc.gov/lccn/sn83030272/1900-01-01/ed-1/seq-1/"
        );
    }

    #[test]
    fn tolerates_missing_fields() {
        let page: SearchPage = serde_json::from_str(r#"{"items":[{"title":"x"}]}"#).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.items[0].date.is_none());
        assert!(!page.has_more());
    }
}
