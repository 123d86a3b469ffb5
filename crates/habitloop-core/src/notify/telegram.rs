//! Telegram Bot API notifier.
//!
//! Sends reminders with `sendMessage`. The bot token comes from the
//! `HABITLOOP_TELEGRAM_TOKEN` environment variable or the OS keyring.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::NotifyError;
use crate::notify::{keyring_store, Notifier};
use crate::storage::config::TelegramConfig;

pub const TOKEN_ENV: &str = "HABITLOOP_TELEGRAM_TOKEN";
pub const TOKEN_KEY: &str = "telegram_bot_token";

const CHANNEL: &str = "telegram";

/// Where the active bot token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Env,
    Keyring,
}

pub struct TelegramNotifier {
    client: Client,
    api_base: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str, timeout: Duration) -> Result<Self, NotifyError> {
        if token.trim().is_empty() {
            return Err(not_configured("bot token is empty"));
        }
        let mut api_base = Url::parse(api_base)
            .map_err(|e| not_configured(&format!("invalid api_base '{api_base}': {e}")))?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base,
            token: token.trim().to_string(),
        })
    }

    /// Build from config, resolving the token from env or keyring.
    pub fn from_config(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let (token, source) = resolve_token()?.ok_or_else(|| {
            not_configured(&format!(
                "no bot token; set {TOKEN_ENV} or run `habitloop auth telegram login`"
            ))
        })?;
        debug!(?source, "telegram token resolved");
        Self::new(
            &config.api_base,
            &token,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Check the token with `getMe`; returns the bot username.
    pub fn bot_username(&self) -> Result<String, NotifyError> {
        let resp = self.client.get(self.endpoint("getMe")?).send()?;
        let data = read_response(resp)?;
        Ok(data
            .result
            .as_ref()
            .and_then(|r| r["username"].as_str())
            .unwrap_or("unknown")
            .to_string())
    }

    fn endpoint(&self, method: &str) -> Result<Url, NotifyError> {
        // "./" keeps the "bot<id>:" prefix from parsing as a URL scheme
        self.api_base
            .join(&format!("./bot{}/{method}", self.token))
            .map_err(|e| NotifyError::Transport(e.to_string()))
    }
}

impl Notifier for TelegramNotifier {
    fn channel(&self) -> &str {
        CHANNEL
    }

    fn send(&self, recipient: &str, text: &str) -> Result<(), NotifyError> {
        let body = json!({ "chat_id": recipient, "text": text });
        let resp = self
            .client
            .post(self.endpoint("sendMessage")?)
            .json(&body)
            .send()?;
        read_response(resp).map(|_| ())
    }
}

/// Env var first, then keyring. `None` if neither holds a token.
pub fn resolve_token() -> Result<Option<(String, TokenSource)>, NotifyError> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(Some((token, TokenSource::Env)));
        }
    }
    Ok(keyring_store::get(TOKEN_KEY)?
        .filter(|t| !t.trim().is_empty())
        .map(|t| (t, TokenSource::Keyring)))
}

fn read_response(resp: reqwest::blocking::Response) -> Result<ApiResponse, NotifyError> {
    let status = resp.status();
    let raw = resp.text()?;
    let parsed: Option<ApiResponse> = serde_json::from_str(&raw).ok();

    if !status.is_success() {
        let body = parsed.and_then(|p| p.description).unwrap_or(raw);
        return Err(NotifyError::Http {
            status: status.as_u16(),
            body,
        });
    }
    match parsed {
        Some(data) if data.ok => Ok(data),
        Some(data) => Err(NotifyError::Rejected(
            data.description.unwrap_or_else(|| "ok=false".to_string()),
        )),
        None => Err(NotifyError::Rejected(format!("unreadable response: {raw}"))),
    }
}

fn not_configured(message: &str) -> NotifyError {
    NotifyError::NotConfigured {
        channel: CHANNEL.to_string(),
        message: message.to_string(),
    }
}
