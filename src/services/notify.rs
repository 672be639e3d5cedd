// src/services/notify.rs

//! Notification sink for the rendered digest.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::error::{AppError, Result};

/// Destination for a finished digest.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver `text`; an error means it was not accepted.
    async fn publish(&self, text: &str) -> Result<()>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts messages to a Discord webhook.
pub struct DiscordWebhook {
    client: Client,
    url: String,
    max_message_len: usize,
}

impl DiscordWebhook {
    pub fn new(client: Client, url: impl Into<String>, max_message_len: usize) -> Self {
        Self {
            client,
            url: url.into(),
            max_message_len,
        }
    }

    async fn post(&self, content: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { content })
            .send()
            .await?;

        // Discord answers 204 for an accepted webhook message.
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => Err(AppError::publish(format!(
                "webhook answered {status}, expected 204"
            ))),
        }
    }
}

#[async_trait]
impl Publisher for DiscordWebhook {
    async fn publish(&self, text: &str) -> Result<()> {
        log::info!("Sending digest to Discord...");
        let parts = split_message(text, self.max_message_len);
        let total = parts.len();
        for (i, part) in parts.iter().enumerate() {
            self.post(part).await?;
            log::debug!("Sent part {}/{}", i + 1, total);
        }
        log::info!("Sent digest to Discord in {} message(s)", total);
        Ok(())
    }
}

/// Split `text` into pieces of at most `max_len` characters, breaking on
/// line boundaries where possible.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };

        if current_len + needed <= max_len {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            current_len += needed;
            continue;
        }

        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= max_len {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_len) {
                parts.push(piece.iter().collect());
            }
        }
    }

    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_split_short_message_is_untouched() {
        assert_eq!(split_message("a\nb", 2000), vec!["a\nb".to_string()]);
        assert_eq!(split_message("", 10), vec![String::new()]);
    }

    #[test]
    fn test_split_on_line_boundaries() {
        let parts = split_message("aaaa\nbbbb\ncccc", 9);
        assert_eq!(parts, vec!["aaaa\nbbbb".to_string(), "cccc".to_string()]);
        assert!(parts.iter().all(|p| p.chars().count() <= 9));
    }

    #[test]
    fn test_split_long_line() {
        let parts = split_message("abcdefghij\nxy", 4);
        assert_eq!(parts, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[tokio::test]
    async fn test_publish_accepts_204() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook"))
            .and(body_json(serde_json::json!({ "content": "hello" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let hook = DiscordWebhook::new(Client::new(), format!("{}/webhook", server.uri()), 2000);
        hook.publish("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_rejects_plain_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let hook = DiscordWebhook::new(Client::new(), server.uri(), 2000);
        let result = hook.publish("hello").await;
        assert!(matches!(result, Err(AppError::Publish(_))));
    }

    #[tokio::test]
    async fn test_publish_sends_every_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let hook = DiscordWebhook::new(Client::new(), server.uri(), 5);
        hook.publish("12345\n678").await.unwrap();
    }
}
