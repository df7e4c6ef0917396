use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use staker_config::ProvisionerConfig;
use staker_types::CorrelationId;
use tracing::debug;
use url::Url;

use crate::ProvisioningApi;
use crate::error::ProvisionerError;
use crate::types::{CreateRequest, CreateResponse, DepositDataReport, StatusReport};

const REQUESTS_PATH: &str = "v1/provisioning/requests";

/// HTTP client for the provisioning service.
///
/// Endpoints, relative to the base URL:
/// - `POST v1/provisioning/requests`
/// - `GET  v1/provisioning/requests/{id}`
/// - `GET  v1/provisioning/requests/{id}/deposit-data`
pub struct HttpProvisioningApi {
  client: Client,
  base_url: Url,
  api_key: Option<String>,
}

impl HttpProvisioningApi {
  /// Create a client for the service at `base_url`.
  pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, ProvisionerError> {
    Self::with_client(Client::new(), base_url, api_key)
  }

  /// Create a client from configuration, resolving the API token from the
  /// environment variable it names.
  pub fn from_config(config: &ProvisionerConfig) -> Result<Self, ProvisionerError> {
    Self::new(&config.base_url, config.api_key()?)
  }

  /// Create a client reusing an existing `reqwest` client.
  pub fn with_client(
    client: Client,
    base_url: &str,
    api_key: Option<String>,
  ) -> Result<Self, ProvisionerError> {
    // A trailing slash makes `Url::join` append instead of replacing the last segment.
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    Ok(Self {
      client,
      base_url: Url::parse(&normalized)?,
      api_key,
    })
  }

  pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ProvisionerError> {
    Ok(self.base_url.join(path)?)
  }

  fn request_url(&self, id: &CorrelationId, suffix: Option<&str>) -> Result<Url, ProvisionerError> {
    let mut url = self.endpoint(REQUESTS_PATH)?;
    {
      let mut segments = url
        .path_segments_mut()
        .map_err(|_| ProvisionerError::invalid_response("base url cannot have path segments"))?;
      segments.push(id.as_str());
      if let Some(suffix) = suffix {
        segments.push(suffix);
      }
    }
    Ok(url)
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    match &self.api_key {
      Some(key) => request.bearer_auth(key),
      None => request,
    }
  }
}

#[async_trait]
impl ProvisioningApi for HttpProvisioningApi {
  async fn create(&self, request: &CreateRequest) -> Result<CorrelationId, ProvisionerError> {
    let url = self.endpoint(REQUESTS_PATH)?;
    debug!(url = %url, count = request.count, "provisioner_create");

    let response = self
      .authorize(self.client.post(url))
      .header("Idempotency-Key", &request.request_id)
      .json(request)
      .send()
      .await?;

    let created: CreateResponse = read_json(response).await?;
    if created.id.trim().is_empty() {
      return Err(ProvisionerError::invalid_response("create returned an empty id"));
    }
    Ok(CorrelationId::new(created.id))
  }

  async fn status(&self, id: &CorrelationId) -> Result<StatusReport, ProvisionerError> {
    let url = self.request_url(id, None)?;
    let response = self.authorize(self.client.get(url)).send().await?;
    read_json(response).await
  }

  async fn deposit_data(&self, id: &CorrelationId) -> Result<DepositDataReport, ProvisionerError> {
    let url = self.request_url(id, Some("deposit-data"))?;
    let response = self.authorize(self.client.get(url)).send().await?;
    read_json(response).await
  }
}

/// Turn a response into `T`, mapping non-success statuses to [`ProvisionerError::Api`].
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProvisionerError> {
  let status = response.status();
  let body = response.text().await?;

  if !status.is_success() {
    return Err(ProvisionerError::Api {
      status: status.as_u16(),
      body,
    });
  }

  parse_body(&body)
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ProvisionerError> {
  serde_json::from_str(body).map_err(|e| ProvisionerError::invalid_response(e.to_string()))
}
