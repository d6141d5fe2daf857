//! # WhatsApp Delivery
//!
//! Login codes are sent as the `otp_request` template through the WhatsApp
//! Cloud API. When no credentials are configured the [`Messenger::Log`]
//! variant writes the code to the log instead.

use crate::config::WhatsAppConfig;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Template holding the login code.
pub const OTP_TEMPLATE: &str = "otp_request";

/// Template language.
pub const OTP_LANGUAGE: &str = "fr";

/// Errors while delivering a message.
#[derive(Debug, Error)]
pub enum SendError {
    /// The request never got a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("WhatsApp API returned {status}: {body}")]
    Api { status: u16, body: String },
}

// =============================================================================
// CLOUD API CLIENT
// =============================================================================

/// Client for the Cloud API `messages` endpoint.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    country_code: String,
}

impl WhatsAppClient {
    /// Build a client, or `None` when credentials are missing.
    pub fn from_config(config: &WhatsAppConfig) -> Option<Self> {
        let (token, phone_number_id) = config.credentials()?;
        let endpoint = format!(
            "{}/{}/{}/messages",
            config.api_base.trim_end_matches('/'),
            config.version,
            phone_number_id
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Some(Self {
            client,
            endpoint,
            access_token: token.to_string(),
            country_code: config.country_code.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// International form of a stored phone number.
    ///
    /// Numbers already carrying the country code are left alone.
    #[must_use]
    pub fn recipient(&self, phone_number: &str) -> String {
        let local_len = menuqr_core::phone::SIGNIFICANT_DIGITS;
        if phone_number.len() > local_len && phone_number.starts_with(&self.country_code) {
            format!("+{phone_number}")
        } else {
            format!("+{}{}", self.country_code, phone_number)
        }
    }

    /// Template message carrying `code` in the body and the URL button.
    #[must_use]
    pub fn otp_payload(&self, phone_number: &str, code: &str) -> Value {
        json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": self.recipient(phone_number),
            "type": "template",
            "template": {
                "name": OTP_TEMPLATE,
                "language": { "code": OTP_LANGUAGE },
                "components": [
                    {
                        "type": "body",
                        "parameters": [{ "type": "text", "text": code }]
                    },
                    {
                        "type": "button",
                        "sub_type": "url",
                        "index": 0,
                        "parameters": [{ "type": "text", "text": code }]
                    }
                ]
            }
        })
    }

    pub async fn send_otp(&self, phone_number: &str, code: &str) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&self.otp_payload(phone_number, code))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!(phone_number, status = status.as_u16(), "WhatsApp message sent successfully");
        Ok(())
    }
}

// =============================================================================
// MESSENGER
// =============================================================================

/// How login codes reach the user.
#[derive(Debug, Clone)]
pub enum Messenger {
    WhatsApp(WhatsAppClient),
    /// Development fallback: the code is only logged.
    Log,
}

impl Messenger {
    pub fn from_config(config: &WhatsAppConfig) -> Self {
        match WhatsAppClient::from_config(config) {
            Some(client) => Self::WhatsApp(client),
            None => {
                warn!("WhatsApp credentials not configured, OTP codes will only be logged");
                Self::Log
            }
        }
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::WhatsApp(_))
    }

    pub async fn send_otp(&self, phone_number: &str, code: &str) -> Result<(), SendError> {
        match self {
            Self::WhatsApp(client) => client.send_otp(phone_number, code).await.inspect_err(|e| {
                error!(phone_number, template = OTP_TEMPLATE, error = %e, "Failed to send WhatsApp message");
            }),
            Self::Log => {
                info!(phone_number, otp_code = code, "OTP delivery skipped (log messenger)");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WhatsAppClient {
        let config = WhatsAppConfig {
            access_token: Some("secret".into()),
            phone_number_id: Some("1234".into()),
            ..WhatsAppConfig::default()
        };
        WhatsAppClient::from_config(&config).unwrap()
    }

    #[test]
    fn endpoint_follows_graph_layout() {
        assert_eq!(
            client().endpoint(),
            "https://graph.facebook.com/v18.0/1234/messages"
        );
    }

    #[test]
    fn recipient_gets_country_code_once() {
        let c = client();
        assert_eq!(c.recipient("0779136356"), "+2250779136356");
        assert_eq!(c.recipient("2250779136356"), "+2250779136356");
    }

    #[test]
    fn payload_carries_code_twice() {
        let payload = client().otp_payload("0779136356", "482913");
        assert_eq!(payload["to"], "+2250779136356");
        assert_eq!(payload["recipient_type"], "individual");
        assert_eq!(payload["template"]["name"], "otp_request");
        assert_eq!(payload["template"]["language"]["code"], "fr");
        let components = &payload["template"]["components"];
        assert_eq!(components[0]["parameters"][0]["text"], "482913");
        assert_eq!(components[1]["sub_type"], "url");
        assert_eq!(components[1]["index"], 0);
        assert_eq!(components[1]["parameters"][0]["text"], "482913");
    }

    #[test]
    fn missing_credentials_fall_back_to_log() {
        let messenger = Messenger::from_config(&WhatsAppConfig::default());
        assert!(!messenger.is_live());
    }
}
