//! Utility functions and helpers.

pub mod http;

use std::time::Duration;

/// Sleep for `millis`, skipping the await entirely when it is zero.
pub async fn pause(millis: u64) {
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
