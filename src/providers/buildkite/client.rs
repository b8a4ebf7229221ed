use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{CistatError, Result};

use super::types::{Agent, Build};

pub(crate) const PER_PAGE: usize = 100;

/// Server-side predicates for a build listing.
#[derive(Debug, Clone, Default)]
pub struct BuildFilter {
    /// Only include builds in one of these states
    pub states: Vec<&'static str>,
    /// Only include builds that finished at or after this instant
    pub finished_from: Option<DateTime<Utc>>,
}

impl BuildFilter {
    /// Builds that have not reached a terminal state. No time bound: an
    /// unfinished build is counted no matter how old it is.
    pub fn unfinished() -> Self {
        Self {
            states: vec!["scheduled", "running", "canceling"],
            finished_from: None,
        }
    }

    /// Builds that finished at or after `cutoff`. Disjoint from
    /// `unfinished()`, so the two listings never overlap.
    pub fn finished_from(cutoff: DateTime<Utc>) -> Self {
        Self {
            states: vec!["passed", "failed", "canceled", "skipped", "not_run"],
            finished_from: Some(cutoff),
        }
    }
}

/// Buildkite REST API client for listing builds and agents.
#[derive(Clone)]
pub struct BuildkiteClient {
    /// HTTP client
    client: reqwest::Client,
    /// REST API base URL
    base_url: Url,
}

impl BuildkiteClient {
    /// Create a new API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - REST API base URL (e.g., "https://api.buildkite.com")
    /// * `token` - API access token
    pub fn new(base_url: &str, token: &Token) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("cistat/0.3"));

        let auth = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|e| CistatError::Config(format!("Invalid access token: {e}")))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(base_url)
            .map_err(|e| CistatError::Config(format!("Invalid API endpoint: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// List every build for the organization matching the filter,
    /// following pagination until the API runs out of pages.
    ///
    /// A fetch error on any page fails the whole listing: partial data
    /// would produce wrong totals, and the caller can retry next cycle.
    pub async fn list_builds(&self, org: &str, filter: &BuildFilter) -> Result<Vec<Build>> {
        let url = self.endpoint(&format!("v2/organizations/{org}/builds"))?;

        let mut all_builds = Vec::new();
        let mut page = 1;

        loop {
            let mut query = base_query(page);
            for state in &filter.states {
                query.push(("state[]".to_string(), (*state).to_string()));
            }
            if let Some(cutoff) = filter.finished_from {
                query.push((
                    "finished_from".to_string(),
                    cutoff.to_rfc3339_opts(SecondsFormat::Secs, true),
                ));
            }

            let batch: Vec<Build> = self.get_page(url.clone(), &query).await?;
            let batch_len = batch.len();
            all_builds.extend(batch);

            // A short page means the API has no further pages
            if batch_len < PER_PAGE {
                break;
            }

            page += 1;
        }

        Ok(all_builds)
    }

    /// List every agent registered with the organization.
    pub async fn list_agents(&self, org: &str) -> Result<Vec<Agent>> {
        let url = self.endpoint(&format!("v2/organizations/{org}/agents"))?;

        let mut all_agents = Vec::new();
        let mut page = 1;

        loop {
            let batch: Vec<Agent> = self.get_page(url.clone(), &base_query(page)).await?;
            let batch_len = batch.len();
            all_agents.extend(batch);

            if batch_len < PER_PAGE {
                break;
            }

            page += 1;
        }

        Ok(all_agents)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CistatError::Config(format!("Invalid API endpoint: {e}")))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(String, String)],
    ) -> Result<Vec<T>> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(CistatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

fn base_query(page: usize) -> Vec<(String, String)> {
    vec![
        ("page".to_string(), page.to_string()),
        ("per_page".to_string(), PER_PAGE.to_string()),
    ]
}
