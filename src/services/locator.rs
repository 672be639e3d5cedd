// src/services/locator.rs

//! Snapshot locator.
//!
//! Snapshots are published under a date-stamped name on an irregular schedule,
//! so the locator walks back one day at a time from today until a probe
//! succeeds or the window is exhausted.

use chrono::{Days, Local, NaiveDate};
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{ArtifactReference, SourceConfig};
use crate::utils::pause;

/// Service that finds the most recent published snapshot.
pub struct ArtifactLocator {
    client: Client,
    source: SourceConfig,
}

impl ArtifactLocator {
    /// Create a locator probing the configured host.
    pub fn new(client: Client, source: SourceConfig) -> Self {
        Self { client, source }
    }

    /// Locate the latest snapshot, starting from the local calendar date.
    pub async fn locate(&self) -> Result<ArtifactReference> {
        self.locate_from(Local::now().date_naive()).await
    }

    /// Locate the latest snapshot published on or before `today`.
    ///
    /// Probes `today`, then each earlier day down to `max_days_back` days
    /// before it. A failed probe (network error or non-success status) moves
    /// on to the previous day.
    pub async fn locate_from(&self, today: NaiveDate) -> Result<ArtifactReference> {
        let max_days_back = self.source.max_days_back;

        for offset in 0..=max_days_back {
            let Some(day) = today.checked_sub_days(Days::new(u64::from(offset))) else {
                break;
            };
            let candidate = ArtifactReference::for_date(&self.source.base_url, day);
            log::debug!("Probing {}", candidate.remote_url);

            match self.probe(&candidate.remote_url).await {
                Ok(true) => {
                    log::info!("Found database file {}", candidate.local_file_name);
                    return Ok(candidate);
                }
                Ok(false) => log::info!("No snapshot published for {}", day),
                Err(e) => log::error!("Probe for {} failed: {}", day, e),
            }

            if offset < max_days_back {
                pause(self.source.probe_delay_ms).await;
            }
        }

        let earliest = today
            .checked_sub_days(Days::new(u64::from(max_days_back)))
            .unwrap_or(today);
        Err(AppError::NotFound {
            earliest: earliest.to_string(),
            latest: today.to_string(),
        })
    }

    /// Check whether `url` exists without reading its body.
    async fn probe(&self, url: &str) -> Result<bool> {
        let response = self.client.get(url).send().await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpConfig;
    use crate::utils::http::create_client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn locator(base_url: &str, max_days_back: u32) -> ArtifactLocator {
        let source = SourceConfig {
            base_url: base_url.to_string(),
            max_days_back,
            probe_delay_ms: 0,
            ..SourceConfig::default()
        };
        ArtifactLocator::new(create_client(&HttpConfig::default()).unwrap(), source)
    }

    async fn publish(server: &MockServer, day: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/extracts/GrantsDBExtract{day}v2.zip")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_locate_returns_latest_published_day() {
        let server = MockServer::start().await;
        publish(&server, "20240413").await;
        publish(&server, "20240410").await;

        let found = locator(&server.uri(), 6)
            .locate_from(date(2024, 4, 15))
            .await
            .unwrap();

        assert_eq!(found.snapshot_date, date(2024, 4, 13));
        assert_eq!(found.local_file_name, "GrantsDBExtract20240413v2.zip");
        assert!(found.remote_url.starts_with(&server.uri()));

        // 15th, 14th, 13th
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
    }

    #[tokio::test]
    async fn test_locate_accepts_oldest_day_in_window() {
        let server = MockServer::start().await;
        publish(&server, "20240409").await;

        let found = locator(&server.uri(), 6)
            .locate_from(date(2024, 4, 15))
            .await
            .unwrap();
        assert_eq!(found.snapshot_date, date(2024, 4, 9));
    }

    #[tokio::test]
    async fn test_locate_never_goes_past_window() {
        let server = MockServer::start().await;
        publish(&server, "20240408").await;

        let result = locator(&server.uri(), 6)
            .locate_from(date(2024, 4, 15))
            .await;
        assert!(matches!(result, Err(AppError::NotFound { .. })));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 7);
    }

    #[tokio::test]
    async fn test_locate_walks_past_network_errors() {
        // Nothing listens on the discard port, every probe errors out.
        let result = locator("http://127.0.0.1:9", 2)
            .locate_from(date(2024, 4, 15))
            .await;

        match result {
            Err(AppError::NotFound { earliest, latest }) => {
                assert_eq!(earliest, "2024-04-13");
                assert_eq!(latest, "2024-04-15");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
