use std::time::Duration;

use log::*;
use reqwest::{header::CONTENT_TYPE, Client};

use super::{NotificationVerifier, VerificationError, VerificationStatus};
use crate::notification::RawNotification;

pub const DEFAULT_VERIFY_URL: &str = "https://www.paypal.com/cgi-bin/webscr";
pub const VALIDATE_COMMAND: &str = "cmd=_notify-validate&";

/// Verifies notifications against PayPal's `_notify-validate` endpoint.
#[derive(Debug, Clone)]
pub struct PaypalVerifier {
    client: Client,
    url: String,
}

impl PaypalVerifier {
    pub fn new<S: Into<String>>(url: S, timeout: Duration) -> Result<Self, VerificationError> {
        let client =
            Client::builder().timeout(timeout).build().map_err(|e| VerificationError::Transport(e.to_string()))?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// The verification request body: the validate command followed by the notification bytes, untouched.
    pub fn request_body(notification: &RawNotification) -> Vec<u8> {
        let mut body = Vec::with_capacity(VALIDATE_COMMAND.len() + notification.as_bytes().len());
        body.extend_from_slice(VALIDATE_COMMAND.as_bytes());
        body.extend_from_slice(notification.as_bytes());
        body
    }
}

impl NotificationVerifier for PaypalVerifier {
    async fn verify(&self, notification: &RawNotification) -> Result<VerificationStatus, VerificationError> {
        let body = Self::request_body(notification);
        trace!("🔐️ Sending verification request to {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(classify_error)?;
        let status = response.status();
        if !status.is_success() {
            warn!("🔐️ Verification endpoint answered with {status}");
            return Err(VerificationError::UnexpectedStatus(status.as_u16()));
        }
        let text = response.text().await.map_err(classify_error)?;
        let result = VerificationStatus::from_response(&text);
        debug!("🔐️ Verification result: {result:?}");
        Ok(result)
    }
}

fn classify_error(e: reqwest::Error) -> VerificationError {
    if e.is_timeout() {
        VerificationError::Timeout
    } else {
        VerificationError::Transport(e.to_string())
    }
}
