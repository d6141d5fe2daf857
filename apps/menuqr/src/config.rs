//! # Configuration
//!
//! Command line flags with `MENUQR_*` environment fallbacks. Every value has
//! a default suitable for local development except the WhatsApp
//! credentials; without them OTP codes are only logged.

use clap::Args;
use menuqr_core::phone;
use std::path::PathBuf;

/// Default requests per minute a single phone number may make to `/login`.
pub const DEFAULT_OTP_PER_MINUTE: u32 = 5;

/// Where the records live.
#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// Path of the redb database file
    #[arg(long = "db", env = "MENUQR_DB", default_value = "menuqr.redb")]
    pub db_path: PathBuf,
}

/// Settings of the `serve` command.
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "MENUQR_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Directory holding uploaded menus and photos
    #[arg(long, env = "MENUQR_UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    /// Public base URL printed QR codes point at
    #[arg(long, env = "MENUQR_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Comma separated phone numbers that always receive OTP 000000
    #[arg(long, env = "MENUQR_TEST_PHONE_NUMBERS", default_value = "")]
    pub test_phone_numbers: String,

    /// OTP requests allowed per phone number per minute
    #[arg(long, env = "MENUQR_OTP_PER_MINUTE", default_value_t = DEFAULT_OTP_PER_MINUTE)]
    pub otp_per_minute: u32,

    /// Origins allowed by CORS (comma separated); none disables CORS headers
    #[arg(long, env = "MENUQR_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    #[command(flatten)]
    pub whatsapp: WhatsAppConfig,
}

impl ServerConfig {
    /// Parsed test phone numbers.
    #[must_use]
    pub fn test_numbers(&self) -> Vec<String> {
        phone::parse_test_numbers(&self.test_phone_numbers)
    }
}

/// WhatsApp Cloud API credentials.
#[derive(Debug, Clone, Args)]
pub struct WhatsAppConfig {
    /// Cloud API access token
    #[arg(long = "whatsapp-token", env = "MENUQR_WHATSAPP_TOKEN")]
    pub access_token: Option<String>,

    /// Sending phone number id
    #[arg(long = "whatsapp-phone-number-id", env = "MENUQR_WHATSAPP_PHONE_NUMBER_ID")]
    pub phone_number_id: Option<String>,

    /// Graph API version
    #[arg(long = "whatsapp-version", env = "MENUQR_WHATSAPP_VERSION", default_value = "v18.0")]
    pub version: String,

    /// Country calling code prepended to recipients
    #[arg(long = "whatsapp-country-code", env = "MENUQR_WHATSAPP_COUNTRY_CODE", default_value = "225")]
    pub country_code: String,

    /// Graph API root
    #[arg(
        long = "whatsapp-api-base",
        env = "MENUQR_WHATSAPP_API_BASE",
        default_value = "https://graph.facebook.com"
    )]
    pub api_base: String,
}

impl WhatsAppConfig {
    /// Token and phone number id, when both are set and non-blank.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.access_token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let id = self.phone_number_id.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some((token, id))
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            version: "v18.0".to_string(),
            country_code: "225".to_string(),
            api_base: "https://graph.facebook.com".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_need_both_values() {
        let mut config = WhatsAppConfig::default();
        assert!(config.credentials().is_none());

        config.access_token = Some("token".into());
        assert!(config.credentials().is_none());

        config.phone_number_id = Some("  ".into());
        assert!(config.credentials().is_none());

        config.phone_number_id = Some("12345".into());
        assert_eq!(config.credentials(), Some(("token", "12345")));
    }
}
