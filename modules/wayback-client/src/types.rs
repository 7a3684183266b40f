use serde::{Deserialize, Serialize};

use crate::error::{Result, WaybackError};

// --- CDX capture index ---

/// How the CDX server matches the `url` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    Exact,
    Prefix,
    Host,
    #[default]
    Domain,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Prefix => "prefix",
            MatchType::Host => "host",
            MatchType::Domain => "domain",
        }
    }
}

/// Parameters for one CDX index query. `from`/`to` are 1–14 digit
/// timestamp prefixes and are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdxQuery {
    pub url: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub match_type: MatchType,
    /// Field to collapse adjacent duplicates on, e.g. `digest`.
    pub collapse: Option<String>,
    /// Only keep captures with this HTTP status, e.g. `200`.
    pub status_filter: Option<String>,
    /// Restrict returned columns, e.g. `timestamp,original,statuscode`.
    pub fields: Vec<String>,
    /// Positive = first N captures, negative = last N captures.
    pub limit: Option<i64>,
}

impl CdxQuery {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            from: None,
            to: None,
            match_type: MatchType::default(),
            collapse: Some("digest".to_string()),
            status_filter: Some("200".to_string()),
            fields: Vec::new(),
            limit: None,
        }
    }

    pub fn range(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn collapse(mut self, field: Option<&str>) -> Self {
        self.collapse = field.map(String::from);
        self
    }

    pub fn status_filter(mut self, status: Option<&str>) -> Self {
        self.status_filter = status.map(String::from);
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs in the order the CDX server documents them.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("url", self.url.clone()),
            ("output", "json".to_string()),
            ("matchType", self.match_type.as_str().to_string()),
        ];
        if let Some(ref from) = self.from {
            params.push(("from", from.clone()));
        }
        if let Some(ref to) = self.to {
            params.push(("to", to.clone()));
        }
        if let Some(ref collapse) = self.collapse {
            params.push(("collapse", collapse.clone()));
        }
        if let Some(ref status) = self.status_filter {
            params.push(("filter", format!("statuscode:{status}")));
        }
        if !self.fields.is_empty() {
            params.push(("fl", self.fields.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// One row of the CDX index. Columns missing from a restricted `fl` are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdxCapture {
    pub urlkey: String,
    pub timestamp: String,
    pub original: String,
    pub mimetype: String,
    pub statuscode: String,
    pub digest: String,
    pub length: String,
}

/// Map CDX JSON rows onto captures. Row 0 is the column header; an empty
/// array means no captures.
pub fn parse_cdx_rows(rows: Vec<Vec<String>>) -> Result<Vec<CdxCapture>> {
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let column = |name: &str| header.iter().position(|h| h == name);
    let timestamp_col = column("timestamp")
        .ok_or_else(|| WaybackError::Parse("CDX header has no timestamp column".into()))?;
    let (urlkey_col, original_col, mimetype_col, status_col, digest_col, length_col) = (
        column("urlkey"),
        column("original"),
        column("mimetype"),
        column("statuscode"),
        column("digest"),
        column("length"),
    );

    let cell = |row: &[String], idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    Ok(rows
        .map(|row| CdxCapture {
            urlkey: cell(&row, urlkey_col),
            timestamp: cell(&row, Some(timestamp_col)),
            original: cell(&row, original_col),
            mimetype: cell(&row, mimetype_col),
            statuscode: cell(&row, status_col),
            digest: cell(&row, digest_col),
            length: cell(&row, length_col),
        })
        .collect())
}

// --- Availability API ---

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AvailabilityResponse {
    #[serde(default)]
    pub archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ArchivedSnapshots {
    pub closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ClosestSnapshot {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub status: String,
}

/// An archived capture that can be served to a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Replay URL on web.archive.org.
    pub url: String,
    /// 14-digit capture timestamp.
    pub timestamp: String,
    /// HTTP status recorded at capture time.
    pub status: String,
}
