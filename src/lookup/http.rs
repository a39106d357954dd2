//! `reqwest`-backed implementation of [`CaseLookup`].
//!
//! One client, two base URLs: the read-model (projections) service and the
//! primary case store. Every request carries an `x-request-id` and, when
//! the session has one, an `Authorization` header resolved through the
//! injected [`SessionProvider`].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, header};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use uuid::Uuid;

use crate::{
    config::{EndpointsConfig, LookupConfig},
    lookup::{
        CaseLookup,
        error::{LookupError, LookupErrorKind, ReadPath, decode_failure, map_http_error, network_failure},
        types::{CasePage, CaseRecord, UserProfile},
    },
    session::SessionProvider,
};

const CASE_STORE_SORT_FIELD: &str = "createdAt";
const CASE_STORE_SORT_DIRECTION: &str = "desc";

pub struct HttpCaseLookup {
    client: Client,
    endpoints: EndpointsConfig,
    lookup: LookupConfig,
    session: Arc<dyn SessionProvider>,
}

impl HttpCaseLookup {
    pub fn new(
        endpoints: EndpointsConfig,
        lookup: LookupConfig,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, LookupError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| {
                LookupError::new(
                    LookupErrorKind::Internal,
                    format!("failed to build http client: {}", err),
                )
                .with_retryable(false)
            })?;
        Ok(Self {
            client,
            endpoints,
            lookup,
            session,
        })
    }

    /// GET with the transient-5xx retry loop. A response other than 503
    /// in the 5xx range is retried up to `upstream_retry_limit` times with
    /// linear backoff before the error becomes final; everything else is
    /// returned to the caller on the first attempt.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: ReadPath,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, LookupError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.send_once::<T>(path, url, query).await {
                Ok(value) => return Ok(value),
                Err(err)
                    if err.kind == LookupErrorKind::UpstreamTransient
                        && attempt <= self.lookup.upstream_retry_limit =>
                {
                    let backoff = Duration::from_millis(
                        self.lookup.upstream_backoff_ms.saturating_mul(u64::from(attempt)),
                    );
                    tracing::debug!(
                        target: "lookup",
                        path = %path,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient_upstream_retry"
                    );
                    sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        path: ReadPath,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, LookupError> {
        let request_id = Uuid::now_v7().to_string();
        let mut builder = self
            .client
            .get(url)
            .timeout(Duration::from_millis(self.lookup.request_timeout_ms))
            .header("x-request-id", request_id)
            .query(query);

        if let Some(auth_header) = self.session.auth_header().await {
            builder = builder.header(header::AUTHORIZATION, auth_header);
        }

        let response = builder.send().await.map_err(|err| {
            let tag = if err.is_timeout() { "timed out" } else { "unreachable" };
            network_failure(format!("{} request {}: {}", path, tag, err)).with_path(path)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status.as_u16(), path, &body));
        }

        response.json::<T>().await.map_err(|err| {
            decode_failure(format!("{} response did not decode: {}", path, err)).with_path(path)
        })
    }
}

#[async_trait]
impl CaseLookup for HttpCaseLookup {
    async fn case_by_id(&self, case_id: &str) -> Result<CaseRecord, LookupError> {
        let url = format!(
            "{}/cases/{}",
            self.endpoints.read_model_url.trim_end_matches('/'),
            case_id
        );
        self.get_json(ReadPath::ReadModel, &url, &[]).await
    }

    async fn search_cases(
        &self,
        term: &str,
        partner_id: Option<&str>,
        take: usize,
    ) -> Result<Vec<CaseRecord>, LookupError> {
        let url = format!(
            "{}/cases",
            self.endpoints.read_model_url.trim_end_matches('/')
        );
        let mut query = vec![
            ("searchTerm", term.to_string()),
            ("take", take.to_string()),
        ];
        if let Some(partner_id) = partner_id {
            query.push(("partnerId", partner_id.to_string()));
        }
        let page: CasePage = self.get_json(ReadPath::ReadModel, &url, &query).await?;
        Ok(page.items)
    }

    async fn recent_cases(&self, take: usize) -> Result<Vec<CaseRecord>, LookupError> {
        let url = format!(
            "{}/cases",
            self.endpoints.case_store_url.trim_end_matches('/')
        );
        let query = vec![
            ("take", take.to_string()),
            ("sortBy", CASE_STORE_SORT_FIELD.to_string()),
            ("sortDirection", CASE_STORE_SORT_DIRECTION.to_string()),
        ];
        let page: CasePage = self.get_json(ReadPath::CaseStore, &url, &query).await?;
        Ok(page.items)
    }

    async fn current_profile(&self) -> Result<UserProfile, LookupError> {
        let url = format!("{}/users/me", self.endpoints.profile_url.trim_end_matches('/'));
        self.get_json(ReadPath::Profile, &url, &[]).await
    }

    async fn profile_by_id(&self, user_id: &str) -> Result<UserProfile, LookupError> {
        let url = format!(
            "{}/users/{}",
            self.endpoints.profile_url.trim_end_matches('/'),
            user_id
        );
        self.get_json(ReadPath::Profile, &url, &[]).await
    }
}
