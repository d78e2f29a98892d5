//! Widget configuration loaded from `.env`/environment.
//!
//! Defaults: 1200 ms reply latency, 1000 ms delivery receipt, 1500 ms typing
//! quiet period, 5 MiB attachment cap.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_SEND_EMAIL_PATH: &str = "/api/send-email";
pub const DEFAULT_SUMMARIZE_PATH: &str = "/api/summarize";

pub const DEFAULT_REPLY_DELAY_MS: u64 = 1_200;
pub const DEFAULT_DELIVERY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_TYPING_QUIET_MS: u64 = 1_500;
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub api_base_url: String,
    pub send_email_path: String,
    pub summarize_path: String,
    pub reply_delay_ms: u64,
    pub delivery_delay_ms: u64,
    pub typing_quiet_ms: u64,
    pub max_attachment_bytes: u64,
    pub http_timeout_ms: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            send_email_path: DEFAULT_SEND_EMAIL_PATH.to_string(),
            summarize_path: DEFAULT_SUMMARIZE_PATH.to_string(),
            reply_delay_ms: DEFAULT_REPLY_DELAY_MS,
            delivery_delay_ms: DEFAULT_DELIVERY_DELAY_MS,
            typing_quiet_ms: DEFAULT_TYPING_QUIET_MS,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

impl WidgetConfig {
    /// Load configuration from `.env`/environment.
    ///
    /// Reads:
    /// - `CHATWIDGET_API_BASE_URL`
    /// - `CHATWIDGET_SEND_EMAIL_PATH`, `CHATWIDGET_SUMMARIZE_PATH`
    /// - `CHATWIDGET_REPLY_DELAY_MS`, `CHATWIDGET_DELIVERY_DELAY_MS`, `CHATWIDGET_TYPING_QUIET_MS`
    /// - `CHATWIDGET_MAX_ATTACHMENT_BYTES`, `CHATWIDGET_HTTP_TIMEOUT_MS`
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let base_url = std::env::var("CHATWIDGET_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        Self {
            api_base_url: normalize_base_url(&base_url),
            send_email_path: normalize_path(
                &std::env::var("CHATWIDGET_SEND_EMAIL_PATH")
                    .unwrap_or_else(|_| DEFAULT_SEND_EMAIL_PATH.to_string()),
            ),
            summarize_path: normalize_path(
                &std::env::var("CHATWIDGET_SUMMARIZE_PATH")
                    .unwrap_or_else(|_| DEFAULT_SUMMARIZE_PATH.to_string()),
            ),
            reply_delay_ms: env_u64("CHATWIDGET_REPLY_DELAY_MS", DEFAULT_REPLY_DELAY_MS)
                .clamp(1, 60_000),
            delivery_delay_ms: env_u64("CHATWIDGET_DELIVERY_DELAY_MS", DEFAULT_DELIVERY_DELAY_MS)
                .clamp(1, 60_000),
            typing_quiet_ms: env_u64("CHATWIDGET_TYPING_QUIET_MS", DEFAULT_TYPING_QUIET_MS)
                .clamp(1, 60_000),
            max_attachment_bytes: env_u64(
                "CHATWIDGET_MAX_ATTACHMENT_BYTES",
                DEFAULT_MAX_ATTACHMENT_BYTES,
            )
            .clamp(1, 64 * 1024 * 1024),
            http_timeout_ms: env_u64("CHATWIDGET_HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)
                .clamp(100, 600_000),
        }
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn delivery_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_delay_ms)
    }

    pub fn typing_quiet_period(&self) -> Duration {
        Duration::from_millis(self.typing_quiet_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn send_email_url(&self) -> String {
        join_url(&self.api_base_url, &self.send_email_path)
    }

    pub fn summarize_url(&self) -> String {
        join_url(&self.api_base_url, &self.summarize_path)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", normalize_base_url(base_url), normalize_path(path))
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}
