//! Mail delivery module
//!
//! Defines the [`MailSender`] seam used by the submitter and an
//! [`EmailJsClient`] that talks to the hosted EmailJS REST API.
//!
//! A send takes three logical parameters: the service identifier, the
//! template identifier and the form payload, which becomes the template's
//! parameters. The service answers with a status and a short text body on
//! success; on failure the body text is the only diagnostic available.

use crate::form::FormPayload;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailResponse {
    pub status: u16,
    pub text: String,
}

/// Failed send. `text` is only set when the service itself explained the failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .text.as_deref().unwrap_or("mail service request failed"))]
pub struct MailError {
    pub status: Option<u16>,
    pub text: Option<String>,
}

impl MailError {
    pub fn new(status: Option<u16>, text: Option<String>) -> Self {
        Self { status, text }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self { status: None, text: Some(text.into()) }
    }
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        payload: &FormPayload,
    ) -> Result<MailResponse, MailError>;
}

/// Account credentials for the mail service
pub struct MailCredentials {
    pub user_id: SecretString,
    pub access_token: Option<SecretString>,
}

impl fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCredentials")
            .field("user_id", &"[REDACTED]")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: &'a FormPayload,
}

/// HTTP client for the EmailJS send endpoint
pub struct EmailJsClient {
    endpoint: Url,
    credentials: MailCredentials,
    client: Client,
}

impl fmt::Debug for EmailJsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailJsClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl EmailJsClient {
    pub fn new(endpoint: &str, credentials: MailCredentials) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("Invalid mail endpoint '{}': {}", endpoint, e))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { endpoint, credentials, client })
    }
}

#[async_trait]
impl MailSender for EmailJsClient {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        payload: &FormPayload,
    ) -> Result<MailResponse, MailError> {
        let request = SendRequest {
            service_id,
            template_id,
            user_id: self.credentials.user_id.expose_secret(),
            access_token: self.credentials.access_token.as_ref().map(|t| t.expose_secret()),
            template_params: payload,
        };
        debug!("Sending template '{}' via service '{}'", template_id, service_id);

        let response =
            self.client.post(self.endpoint.clone()).json(&request).send().await.map_err(|e| {
                error!("Mail service request failed: {}", e);
                MailError::new(None, None)
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            debug!("Mail service accepted request: {} {}", status.as_u16(), text);
            Ok(MailResponse { status: status.as_u16(), text })
        } else {
            error!("Mail service rejected request ({}): {}", status.as_u16(), text);
            let text = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            Err(MailError::new(Some(status.as_u16()), text))
        }
    }
}
