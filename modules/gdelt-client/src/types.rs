use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GdeltError, Result};

pub const EVENTS_TABLE: &str = "gdelt-bq.full.events";

/// Columns selected from the events table, in order.
pub const COLUMNS: &[&str] = &[
    "GLOBALEVENTID",
    "SQLDATE",
    "Actor1Name",
    "Actor2Name",
    "EventCode",
    "SOURCEURL",
];

/// Filter over the GDELT 1.0 events table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub from_year: i32,
    pub to_year: i32,
    /// CAMEO codes, e.g. `0211`.
    pub event_codes: Vec<String>,
    /// Three-letter CAMEO country code for Actor1.
    pub actor_country: Option<String>,
    /// Case-insensitive substring matched against both actor names.
    pub keyword: Option<String>,
    pub limit: u32,
}

impl EventQuery {
    pub fn new(from_year: i32, to_year: i32) -> Self {
        Self {
            from_year,
            to_year,
            event_codes: Vec::new(),
            actor_country: None,
            keyword: None,
            limit: 100,
        }
    }

    pub fn event_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    pub fn actor_country(mut self, code: impl Into<String>) -> Self {
        self.actor_country = Some(code.into());
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        self.keyword = if keyword.trim().is_empty() {
            None
        } else {
            Some(keyword)
        };
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Standard SQL with named parameters. Only the column list, table and
    /// limit are inlined; every caller-supplied value is bound.
    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "SELECT {} FROM `{}` WHERE Year BETWEEN @from_year AND @to_year",
            COLUMNS.join(", "),
            EVENTS_TABLE
        );
        if !self.event_codes.is_empty() {
            sql.push_str(" AND EventCode IN UNNEST(@event_codes)");
        }
        if self.actor_country.is_some() {
            sql.push_str(" AND Actor1CountryCode = @actor_country");
        }
        if self.keyword.is_some() {
            sql.push_str(
                " AND (LOWER(Actor1Name) LIKE @keyword OR LOWER(Actor2Name) LIKE @keyword)",
            );
        }
        sql.push_str(&format!(" ORDER BY SQLDATE LIMIT {}", self.limit));
        sql
    }

    pub fn to_request(&self, timeout_ms: u64) -> QueryRequest {
        let mut params = vec![
            QueryParameter::scalar("from_year", "INT64", self.from_year.to_string()),
            QueryParameter::scalar("to_year", "INT64", self.to_year.to_string()),
        ];
        if !self.event_codes.is_empty() {
            params.push(QueryParameter::string_array(
                "event_codes",
                &self.event_codes,
            ));
        }
        if let Some(ref country) = self.actor_country {
            params.push(QueryParameter::scalar(
                "actor_country",
                "STRING",
                country.clone(),
            ));
        }
        if let Some(ref keyword) = self.keyword {
            params.push(QueryParameter::scalar(
                "keyword",
                "STRING",
                format!("%{}%", keyword.trim().to_lowercase()),
            ));
        }

        QueryRequest {
            query: self.to_sql(),
            use_legacy_sql: false,
            parameter_mode: "NAMED".to_string(),
            query_parameters: params,
            max_results: self.limit,
            timeout_ms,
        }
    }
}

/// Body of a `jobs.query` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub parameter_mode: String,
    pub query_parameters: Vec<QueryParameter>,
    pub max_results: u32,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    pub name: String,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

impl QueryParameter {
    fn scalar(name: &str, ty: &str, value: String) -> Self {
        Self {
            name: name.to_string(),
            parameter_type: ParameterType {
                kind: ty.to_string(),
                array_type: None,
            },
            parameter_value: ParameterValue {
                value: Some(value),
                array_values: None,
            },
        }
    }

    fn string_array(name: &str, values: &[String]) -> Self {
        Self {
            name: name.to_string(),
            parameter_type: ParameterType {
                kind: "ARRAY".to_string(),
                array_type: Some(Box::new(ParameterType {
                    kind: "STRING".to_string(),
                    array_type: None,
                })),
            },
            parameter_value: ParameterValue {
                value: None,
                array_values: Some(
                    values
                        .iter()
                        .map(|v| ParameterValue {
                            value: Some(v.clone()),
                            array_values: None,
                        })
                        .collect(),
                ),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_type: Option<Box<ParameterType>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_values: Option<Vec<ParameterValue>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub job_complete: bool,
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSchema {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

impl TableCell {
    fn text(&self) -> Option<String> {
        match &self.v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub global_event_id: String,
    /// `YYYYMMDD`; absent on malformed rows.
    pub sql_date: Option<String>,
    pub actor1_name: Option<String>,
    pub actor2_name: Option<String>,
    pub event_code: Option<String>,
    pub source_url: Option<String>,
}

impl EventRecord {
    /// Short label built from the actors and event code.
    pub fn label(&self) -> Option<String> {
        let actors: Vec<&str> = [&self.actor1_name, &self.actor2_name]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect();
        match (actors.is_empty(), &self.event_code) {
            (true, None) => None,
            (true, Some(code)) => Some(format!("CAMEO {code}")),
            (false, None) => Some(actors.join(" / ")),
            (false, Some(code)) => Some(format!("{} (CAMEO {code})", actors.join(" / "))),
        }
    }
}

/// Map positional row cells onto the consumed columns by schema name.
pub fn parse_rows(response: &QueryResponse) -> Result<Vec<EventRecord>> {
    if response.rows.is_empty() {
        return Ok(Vec::new());
    }
    let schema = response
        .schema
        .as_ref()
        .ok_or_else(|| GdeltError::Parse("rows returned without a schema".to_string()))?;

    let position = |name: &str| -> Result<usize> {
        schema
            .fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| GdeltError::Parse(format!("column {name} missing from schema")))
    };
    let id_at = position("GLOBALEVENTID")?;
    let date_at = position("SQLDATE")?;
    let actor1_at = position("Actor1Name")?;
    let actor2_at = position("Actor2Name")?;
    let code_at = position("EventCode")?;
    let url_at = position("SOURCEURL")?;

    let cell = |row: &TableRow, at: usize| row.f.get(at).and_then(TableCell::text);

    Ok(response
        .rows
        .iter()
        .map(|row| EventRecord {
            global_event_id: cell(row, id_at).unwrap_or_default(),
            sql_date: cell(row, date_at),
            actor1_name: cell(row, actor1_at),
            actor2_name: cell(row, actor2_at),
            event_code: cell(row, code_at),
            source_url: cell(row, url_at),
        })
        .collect())
}
