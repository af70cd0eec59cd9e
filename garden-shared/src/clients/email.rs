use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("email transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email API rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound plain-text email, used for alert digests.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_text(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Client for a Resend-compatible `POST {api_url}/emails` endpoint.
#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    endpoint: String,
    api_key: String,
    sender: String,
}

#[derive(Debug, Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

impl EmailClient {
    pub fn new(api_url: &str, api_key: &str, from_email: &str, from_name: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/emails", api_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            sender: format!("{from_name} <{from_email}>"),
        }
    }
}

#[async_trait]
impl Mailer for EmailClient {
    async fn send_text(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let message = OutboundEmail { from: &self.sender, to: [to], subject, text: body };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status: status.as_u16(), body });
        }

        tracing::debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}
