//! REST client for the console backend (`/api/v1/...`)

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::backend::{
    ConfigurationOperations, CustomerMatcher, Directory, NodeScanner, TicketOperations,
};
use super::error::RemoteError;
use super::payload::{ConfigurationPayload, TicketPayload};
use crate::config::BackendConfig;
use crate::search::{matches_term, SearchScope};
use crate::types::{
    attr, Credentials, CustomerSummary, Device, OperationResult, Subject, SubjectOrigin,
};

const DIRECTORY: &str = "directory";
const SCANNER: &str = "scanner";
const TICKETS: &str = "tickets";
const CONFIGURATION: &str = "configuration";

#[derive(Debug, Deserialize)]
struct CustomerRow {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    user_pppoe: Option<String>,
    #[serde(default, alias = "alamat")]
    address: Option<String>,
    #[serde(default, alias = "sn_modem")]
    onu_sn: Option<String>,
    #[serde(default)]
    olt_name: Option<String>,
    #[serde(default)]
    paket: Option<String>,
}

impl CustomerRow {
    fn into_subject(self) -> Subject {
        let id = self
            .user_pppoe
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.id.clone());
        Subject::new(id, self.name.unwrap_or_default(), SubjectOrigin::Customer)
            .with_attribute(attr::PPPOE_USER, self.user_pppoe.unwrap_or_default())
            .with_attribute(attr::ADDRESS, self.address.unwrap_or_default())
            .with_attribute(attr::ONU_SN, self.onu_sn.unwrap_or_default())
            .with_attribute(attr::OLT_NAME, self.olt_name.unwrap_or_default())
            .with_attribute(attr::PACKAGE, self.paket.unwrap_or_default())
    }
}

/// The customer endpoint matches its `query` as one substring, so only the
/// longest token is sent and the rest are applied locally.
fn backend_query(term: &str) -> &str {
    term.split_whitespace()
        .fold("", |best, token| if token.len() > best.len() { token } else { best })
}

#[derive(Debug, Deserialize)]
struct PendingRow {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    user_pppoe: Option<String>,
    #[serde(default)]
    pppoe_password: Option<String>,
    #[serde(default)]
    paket: Option<String>,
}

impl PendingRow {
    fn into_subject(self) -> Subject {
        let name = self.name.unwrap_or_default();
        let id = self
            .user_pppoe
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| name.clone());
        Subject::new(id, name, SubjectOrigin::PendingRegistration)
            .with_attribute(attr::ADDRESS, self.address.unwrap_or_default())
            .with_attribute(attr::PPPOE_USER, self.user_pppoe.unwrap_or_default())
            .with_attribute(attr::PPPOE_PASSWORD, self.pppoe_password.unwrap_or_default())
            .with_attribute(attr::PACKAGE, self.paket.unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: String,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Ticket body with the acting user's credentials merged in
#[derive(Serialize)]
struct AuthenticatedBody<'a> {
    #[serde(flatten)]
    payload: &'a TicketPayload,
    noc_username: &'a str,
    noc_password: &'a str,
}

/// HTTP implementation of every collaborator trait
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
    retry_attempts: usize,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        retry_attempts: usize,
    ) -> Result<Self, RemoteError> {
        if base_url.trim().is_empty() {
            return Err(RemoteError::not_configured(DIRECTORY));
        }
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| RemoteError::network(DIRECTORY, format!("invalid base URL: {e}")))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("netdesk/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::network(DIRECTORY, e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            retry_attempts,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, RemoteError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            config.retry_attempts,
        )
    }

    /// `{base}/api/v1/{segments...}` with each segment percent-encoded
    fn endpoint(&self, service: &str, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::network(service, "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments.iter().flat_map(|s| s.split('/')).filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn retry_strategy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(250))
            .with_max_delay(Duration::from_secs(4))
            .with_max_times(self.retry_attempts)
    }

    async fn check_status(service: &str, response: Response) -> Result<Response, RemoteError> {
        let status = response.status().as_u16();
        match status {
            200..=299 => Ok(response),
            401 => Err(RemoteError::unauthorized(service)),
            403 => Err(RemoteError::forbidden(service)),
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.detail)
                    .unwrap_or(body);
                Err(RemoteError::http(service, status, message))
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        service: &str,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| RemoteError::network(service, e.to_string()))?;
        let response = Self::check_status(service, response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::decode(service, e.to_string()))
    }

    /// Idempotent read with exponential backoff on transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        (|| async { self.get_once(service, url.clone(), query).await })
            .retry(self.retry_strategy())
            .when(RemoteError::is_transient)
            .notify(|err, dur| {
                warn!(service, error = %err, "Retrying backend read after {:?}", dur);
            })
            .await
    }

    /// Mutating call, never retried
    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        service: &str,
        url: Url,
        body: &B,
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::network(service, e.to_string()))?;
        let response = Self::check_status(service, response).await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::decode(service, e.to_string()))
    }

    async fn customers_matching(&self, term: &str) -> Result<Vec<CustomerRow>, RemoteError> {
        let url = self.endpoint(DIRECTORY, &["customer", "invoices"])?;
        self.get_json(DIRECTORY, url, &[("query", term)]).await
    }
}

#[async_trait]
impl Directory for HttpBackend {
    #[instrument(skip(self))]
    async fn query_directory(
        &self,
        scope: SearchScope,
        term: &str,
    ) -> Result<Vec<Subject>, RemoteError> {
        let subjects: Vec<Subject> = match scope {
            SearchScope::Customers => self
                .customers_matching(backend_query(term))
                .await?
                .into_iter()
                .map(CustomerRow::into_subject)
                .collect(),
            SearchScope::PendingRegistrations => {
                let url = self.endpoint(DIRECTORY, &["customer", "psb"])?;
                let rows: Vec<PendingRow> = self.get_json(DIRECTORY, url, &[]).await?;
                rows.into_iter().map(PendingRow::into_subject).collect()
            }
        };

        // Every token must match; the backend only saw one of them
        Ok(subjects
            .into_iter()
            .filter(|subject| matches_term(subject, term))
            .collect())
    }
}

#[async_trait]
impl NodeScanner for HttpBackend {
    #[instrument(skip(self))]
    async fn scan_node(&self, node: &str) -> Result<Vec<Device>, RemoteError> {
        let mut url = self.endpoint(SCANNER, &["config", "api", "olts"])?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::network(SCANNER, "base URL cannot carry a path"))?
            .push(node)
            .push("detect-onts");
        let devices: Vec<Device> = self.get_json(SCANNER, url, &[]).await?;
        debug!(node, count = devices.len(), "Scan returned devices");
        Ok(devices)
    }
}

#[async_trait]
impl CustomerMatcher for HttpBackend {
    #[instrument(skip(self))]
    async fn match_customer_by_serial(
        &self,
        serial: &str,
    ) -> Result<Option<CustomerSummary>, RemoteError> {
        let rows = self.customers_matching(serial).await?;
        Ok(rows.into_iter().next().map(|row| CustomerSummary {
            name: row.name.unwrap_or_default(),
            address: row.address.unwrap_or_default(),
            pppoe_user: row.user_pppoe.unwrap_or_default(),
        }))
    }
}

#[async_trait]
impl TicketOperations for HttpBackend {
    #[instrument(skip(self, payload, credentials), fields(operation = ?payload.operation()))]
    async fn execute_ticket_operation(
        &self,
        payload: &TicketPayload,
        credentials: &Credentials,
    ) -> Result<OperationResult, RemoteError> {
        let url = self.endpoint(TICKETS, &[payload.operation().endpoint()])?;
        let body = AuthenticatedBody {
            payload,
            noc_username: &credentials.username,
            noc_password: &credentials.password,
        };
        let response: TicketResponse = self.post_json(TICKETS, url, &body).await?;
        if !response.success {
            return Err(RemoteError::rejected(TICKETS, response.message));
        }
        Ok(OperationResult::new(response.message))
    }
}

#[async_trait]
impl ConfigurationOperations for HttpBackend {
    #[instrument(skip(self, payload))]
    async fn execute_configuration(
        &self,
        node: &str,
        payload: &ConfigurationPayload,
    ) -> Result<OperationResult, RemoteError> {
        let mut url = self.endpoint(CONFIGURATION, &["config", "api", "olts"])?;
        url.path_segments_mut()
            .map_err(|_| RemoteError::network(CONFIGURATION, "base URL cannot carry a path"))?
            .push(node)
            .push(payload.endpoint().trim_start_matches('/'));
        self.post_json(CONFIGURATION, url, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpBackend {
        HttpBackend::new("http://localhost:8002/", Duration::from_secs(5), 2).unwrap()
    }

    #[test]
    fn test_empty_base_url_is_not_configured() {
        let err = HttpBackend::new("", Duration::from_secs(5), 0).err().unwrap();
        assert!(matches!(err, RemoteError::NotConfigured { .. }));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let url = backend()
            .endpoint(TICKETS, &["/ticket/create-and-process"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8002/api/v1/ticket/create-and-process"
        );
    }

    #[test]
    fn test_authenticated_body_merges_credentials() {
        let payload = TicketPayload::Process(crate::api::ProcessTicketPayload {
            query: "ann01".into(),
        });
        let body = AuthenticatedBody {
            payload: &payload,
            noc_username: "noc.rina",
            noc_password: "secret",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["query"], "ann01");
        assert_eq!(json["noc_username"], "noc.rina");
        assert_eq!(json["noc_password"], "secret");
    }

    #[test]
    fn test_customer_row_carries_device_fields() {
        let row: CustomerRow = serde_json::from_str(
            r#"{"id": "17", "name": "Ann Lee", "user_pppoe": "ann01", "alamat": "Jl. Melati 4",
                "onu_sn": "ZTEG0042", "olt_name": "OLT-KALIBATA", "paket": "50M"}"#,
        )
        .unwrap();
        let subject = row.into_subject();
        assert_eq!(subject.attribute(attr::ONU_SN), Some("ZTEG0042"));
        assert_eq!(subject.attribute(attr::OLT_NAME), Some("OLT-KALIBATA"));
        assert_eq!(subject.attribute(attr::PACKAGE), Some("50M"));
        assert!(matches_term(&subject, "zteg0042"));
    }

    #[test]
    fn test_backend_query_sends_longest_token() {
        assert_eq!(backend_query("lee melati"), "melati");
        assert_eq!(backend_query("  ann  "), "ann");
        assert_eq!(backend_query("ab cd"), "ab");
        assert_eq!(backend_query(""), "");
    }

    #[test]
    fn test_tokens_split_across_fields_survive_local_filter() {
        let row: CustomerRow = serde_json::from_str(
            r#"{"id": "17", "name": "Ann Lee", "user_pppoe": "ann01", "address": "Jl. Melati 4"}"#,
        )
        .unwrap();
        let subject = row.into_subject();
        // the backend is asked for "melati" only; "lee" is matched on the name
        assert_eq!(backend_query("lee melati"), "melati");
        assert!(matches_term(&subject, "lee melati"));
    }

    #[test]
    fn test_pending_row_seeds_password() {
        let row: PendingRow = serde_json::from_str(
            r#"{"name": "Anna Putri", "user_pppoe": "anna07", "pppoe_password": "pw", "paket": "30M"}"#,
        )
        .unwrap();
        let subject = row.into_subject();
        assert_eq!(subject.id, "anna07");
        assert_eq!(subject.origin, SubjectOrigin::PendingRegistration);
        assert_eq!(subject.attribute(attr::PPPOE_PASSWORD), Some("pw"));
        assert_eq!(subject.attribute(attr::PACKAGE), Some("30M"));
    }
}
