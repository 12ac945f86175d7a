//! Alert delivery.
//!
//! The [`Notifier`] trait is the outbound seam; [`TelegramNotifier`] posts
//! HTML-formatted messages through the Telegram Bot API.

use crate::error::{NotifyError, NotifyResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Longest message Telegram accepts.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Sends a formatted message to a configured channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> NotifyResult<()>;
}

/// Telegram Bot API notifier.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: TELEGRAM_API.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    /// Point at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn send_chunk(&self, text: &str) -> NotifyResult<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response: ApiResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(NotifyError::Rejected(
                response
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> NotifyResult<()> {
        let chunks: Vec<String> = split_message(message, TELEGRAM_MESSAGE_LIMIT)
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .collect();
        debug!("sending alert in {} message(s)", chunks.len());

        for chunk in &chunks {
            self.send_chunk(chunk).await?;
        }

        info!("alert delivered to chat {}", self.chat_id);
        Ok(())
    }
}

/// Split `text` into chunks of at most `limit` characters.
///
/// Breaks fall on line boundaries, so joining the chunks with `'\n'` gives
/// back `text`, blank lines included. A single line longer than `limit` is
/// cut, but never inside an HTML tag or entity unless the tag alone
/// exceeds `limit`.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut started = false;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let sep = usize::from(started);

        if current_len + sep + line_len <= limit {
            if started {
                current.push('\n');
            }
            current.push_str(line);
            current_len += sep + line_len;
            started = true;
            continue;
        }

        if started {
            chunks.push(std::mem::take(&mut current));
        }
        started = true;

        let mut rest = line;
        loop {
            let (head, tail) = cut_line(rest, limit);
            if tail.is_empty() {
                current = head.to_string();
                current_len = head.chars().count();
                break;
            }
            chunks.push(head.to_string());
            rest = tail;
        }
    }

    chunks.push(current);
    chunks
}

/// Split `line` after at most `limit` characters, backing off to the start
/// of an unterminated `<tag>` or `&entity;` in the window.
fn cut_line(line: &str, limit: usize) -> (&str, &str) {
    let end = line
        .char_indices()
        .nth(limit)
        .map_or(line.len(), |(i, _)| i);
    if end == line.len() {
        return (line, "");
    }

    let mut cut = end;
    for (open, close) in [('<', '>'), ('&', ';')] {
        let window = &line[..cut];
        if let Some(i) = window.rfind(open) {
            if i > 0 && !window[i..].contains(close) {
                cut = i;
            }
        }
    }

    line.split_at(cut)
}
