use crate::domain::model::RenewalLikelihood;
use crate::domain::ports::OpportunityWriter;
use crate::utils::error::{RenewalError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRenewalOpportunityRequest<'a> {
    app_source: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloseLooseOpportunityRequest<'a> {
    app_source: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextCycleDateRequest<'a> {
    app_source: &'a str,
    renewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenewalLikelihoodRequest<'a> {
    app_source: &'a str,
    renewal_likelihood: RenewalLikelihood,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AmountRequest<'a> {
    app_source: &'a str,
    amount: Decimal,
    max_amount: Decimal,
}

/// 透過 HTTP/JSON 呼叫商機服務
#[derive(Debug, Clone)]
pub struct HttpOpportunityClient {
    client: Client,
    base_url: Url,
    app_source: String,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl HttpOpportunityClient {
    pub fn new(base_url: &str, app_source: impl Into<String>) -> Result<Self> {
        let invalid = |reason: String| RenewalError::InvalidConfigValueError {
            field: "opportunity_service.endpoint".to_string(),
            value: base_url.to_string(),
            reason,
        };
        let parsed = Url::parse(base_url).map_err(|e| invalid(format!("Invalid URL format: {}", e)))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path".to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url: parsed,
            app_source: app_source.into(),
            headers: HashMap::new(),
            timeout: None,
        })
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 每個 id 都是單一路徑片段，`/`、`?`、`#` 等字元會被編碼
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RenewalError::InvalidConfigValueError {
                field: "opportunity_service.endpoint".to_string(),
                value: self.base_url.to_string(),
                reason: "URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn opportunity_url(&self, tenant: &str, opportunity_id: &str, suffix: &[&str]) -> Result<Url> {
        let mut segments = vec!["tenants", tenant, "opportunities", opportunity_id];
        segments.extend_from_slice(suffix);
        self.endpoint(&segments)
    }

    fn prepare(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        request
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<()> {
        let response = self.prepare(request).send().await?;
        let status = response.status();
        tracing::debug!("{} response status: {}", operation, status);

        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(RenewalError::RpcFailure {
            operation: operation.to_string(),
            status: status.as_u16(),
            message,
            retryable: is_transient(status),
        })
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl OpportunityWriter for HttpOpportunityClient {
    async fn create_renewal_opportunity(&self, tenant: &str, contract_id: &str) -> Result<()> {
        let url = self.endpoint(&["tenants", tenant, "contracts", contract_id, "renewal-opportunity"])?;
        let body = CreateRenewalOpportunityRequest {
            app_source: &self.app_source,
        };
        self.send("CreateRenewalOpportunity", self.client.post(url).json(&body))
            .await
    }

    async fn close_loose_opportunity(&self, tenant: &str, opportunity_id: &str) -> Result<()> {
        let url = self.opportunity_url(tenant, opportunity_id, &["close"])?;
        let body = CloseLooseOpportunityRequest {
            app_source: &self.app_source,
        };
        self.send("CloseLooseOpportunity", self.client.post(url).json(&body))
            .await
    }

    async fn update_renewal_opportunity_next_cycle_date(
        &self,
        tenant: &str,
        opportunity_id: &str,
        renewed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let url = self.opportunity_url(tenant, opportunity_id, &["renewal", "next-cycle-date"])?;
        let body = NextCycleDateRequest {
            app_source: &self.app_source,
            renewed_at,
        };
        self.send(
            "UpdateRenewalOpportunityNextCycleDate",
            self.client.put(url).json(&body),
        )
        .await
    }

    async fn update_renewal_likelihood(
        &self,
        tenant: &str,
        opportunity_id: &str,
        likelihood: RenewalLikelihood,
    ) -> Result<()> {
        let url = self.opportunity_url(tenant, opportunity_id, &["renewal", "likelihood"])?;
        let body = RenewalLikelihoodRequest {
            app_source: &self.app_source,
            renewal_likelihood: likelihood,
        };
        self.send("UpdateRenewalOpportunity", self.client.put(url).json(&body))
            .await
    }

    async fn update_opportunity_amounts(
        &self,
        tenant: &str,
        opportunity_id: &str,
        amount: Decimal,
        max_amount: Decimal,
    ) -> Result<()> {
        let url = self.opportunity_url(tenant, opportunity_id, &["amount"])?;
        let body = AmountRequest {
            app_source: &self.app_source,
            amount,
            max_amount,
        };
        self.send("UpdateOpportunity", self.client.put(url).json(&body))
            .await
    }
}
