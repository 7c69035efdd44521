//! [`Sleep`] implementation backed by the tokio timer.

use async_trait::async_trait;
use ddbkit_core::{Result, Sleep};
use std::time::Duration;

/// Sleep that waits on `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleep;

#[async_trait]
impl Sleep for TokioSleep {
    async fn sleep(&self, dur: Duration) -> Result<()> {
        tokio::time::sleep(dur).await;
        Ok(())
    }
}
