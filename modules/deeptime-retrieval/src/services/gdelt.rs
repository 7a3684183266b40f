use async_trait::async_trait;
use chrono::{Datelike, Utc};

use deeptime_common::ProviderKind;
use gdelt_client::{EventQuery, GdeltClient};

use super::{CallContext, ProviderAdapter};
use crate::error::ProviderFailure;
use crate::normalizer::RawResponse;

/// First year of the GDELT 1.0 back file.
const FIRST_YEAR: i32 = 1979;

pub struct GdeltAdapter {
    client: GdeltClient,
    event_codes: Vec<String>,
    actor_country: Option<String>,
}

impl GdeltAdapter {
    pub fn new(project: &str, token: &str) -> Self {
        Self {
            client: GdeltClient::new(project.to_string(), token.to_string()),
            event_codes: Vec::new(),
            actor_country: None,
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
}

fn year(param: Option<&str>) -> Option<i32> {
    param.and_then(|p| p.get(..4)).and_then(|y| y.parse().ok())
}

#[async_trait]
impl ProviderAdapter for GdeltAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GdeltEvents
    }

    async fn fetch(&self, ctx: &CallContext<'_>) -> Result<RawResponse, ProviderFailure> {
        let params = &ctx.call.params;
        let from_year = year(params.from.as_deref()).unwrap_or(FIRST_YEAR);
        let to_year = year(params.to.as_deref()).unwrap_or_else(|| Utc::now().year());

        let mut query = EventQuery::new(from_year, to_year)
            .event_codes(self.event_codes.iter().cloned())
            .keyword(params.text.clone())
            .limit(ctx.max_results.max(1) as u32);
        if let Some(ref country) = self.actor_country {
            query = query.actor_country(country.clone());
        }

        let events = ctx
            .send(|| async { Ok(self.client.query_events(&query).await?) })
            .await?;
        Ok(RawResponse::GdeltEvents(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_reads_leading_digits() {
        assert_eq!(year(Some("1999")), Some(1999));
        assert_eq!(year(Some("20010911")), Some(2001));
        assert_eq!(year(Some("19")), None);
        assert_eq!(year(None), None);
    }
}
