//! Remote collaborators for the pending attachment.
//!
//! Both endpoints take a multipart body with a `file` part and answer with JSON:
//! `{ "message": ... }` for send-email, `{ "summary": ... }` (or an error
//! `{ "message": ... }`) for summarize.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::WidgetError;
use crate::services::config::WidgetConfig;
use crate::services::retry::{RetryConfig, should_retry};

use super::types::Attachment;

pub const SEND_EMAIL_FALLBACK_ERROR: &str = "Error sending file";
pub const SUMMARIZE_FALLBACK_ERROR: &str = "Error summarizing the file";

#[async_trait]
pub trait AttachmentBackend: Send + Sync {
    /// Mail the attachment to `email`; returns the server's confirmation text.
    async fn send_email(&self, attachment: &Attachment, email: &str)
    -> Result<String, WidgetError>;

    /// Returns the summary text.
    async fn summarize(&self, attachment: &Attachment) -> Result<String, WidgetError>;
}

#[derive(Debug, Default, Deserialize)]
struct CollaboratorResponse {
    message: Option<String>,
    summary: Option<String>,
}

pub struct HttpBackend {
    http_client: reqwest::Client,
    send_email_url: String,
    summarize_url: String,
    retry: RetryConfig,
}

impl HttpBackend {
    pub fn new(config: &WidgetConfig, retry: RetryConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            send_email_url: config.send_email_url(),
            summarize_url: config.summarize_url(),
            retry,
        }
    }

    fn file_part(attachment: &Attachment) -> Result<Part, reqwest::Error> {
        Part::bytes(attachment.bytes.to_vec())
            .file_name(attachment.name.clone())
            .mime_str(&attachment.mime_type)
    }

    /// POST a freshly built form, retrying transport failures per `RetryConfig`.
    ///
    /// The body is `None` when the response was not JSON.
    async fn post_form<F>(
        &self,
        url: &str,
        idempotent: bool,
        build_form: F,
    ) -> Result<(reqwest::StatusCode, Option<CollaboratorResponse>), reqwest::Error>
    where
        F: Fn() -> Result<Form, reqwest::Error> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let sent = self
                .http_client
                .post(url)
                .multipart(build_form()?)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status();
                    let body = match response.json::<CollaboratorResponse>().await {
                        Ok(body) => Some(body),
                        Err(err) => {
                            log::warn!("Non-JSON response from {} ({}): {}", url, status, err);
                            None
                        }
                    };
                    return Ok((status, body));
                }
                Err(err)
                    if attempt < self.retry.max_attempts && should_retry(&err, idempotent) =>
                {
                    let delay = self.retry.backoff(attempt);
                    log::warn!(
                        "POST {} failed (attempt {}/{}), retrying in {:?}: {}",
                        url,
                        attempt,
                        self.retry.max_attempts,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl AttachmentBackend for HttpBackend {
    async fn send_email(
        &self,
        attachment: &Attachment,
        email: &str,
    ) -> Result<String, WidgetError> {
        let (status, body) = self
            .post_form(&self.send_email_url, false, || {
                Ok(Form::new()
                    .text("email", email.to_string())
                    .part("file", Self::file_part(attachment)?))
            })
            .await
            .map_err(|e| WidgetError::network(format!("{}: {}", SEND_EMAIL_FALLBACK_ERROR, e)))?;

        let message = body.and_then(|b| b.message);
        match message {
            Some(message) if status.is_success() => Ok(message),
            Some(message) => Err(WidgetError::server(message)),
            None => Err(WidgetError::server(SEND_EMAIL_FALLBACK_ERROR)),
        }
    }

    async fn summarize(&self, attachment: &Attachment) -> Result<String, WidgetError> {
        let (status, body) = self
            .post_form(&self.summarize_url, true, || {
                Ok(Form::new().part("file", Self::file_part(attachment)?))
            })
            .await
            .map_err(|e| WidgetError::network(format!("{}: {}", SUMMARIZE_FALLBACK_ERROR, e)))?;

        let body = body.unwrap_or_default();
        if status.is_success() {
            if let Some(summary) = body.summary {
                return Ok(summary);
            }
        }
        Err(WidgetError::server(
            body.message
                .unwrap_or_else(|| SUMMARIZE_FALLBACK_ERROR.to_string()),
        ))
    }
}
