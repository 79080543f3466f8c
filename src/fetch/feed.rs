use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::{HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedMessage;
use crate::metrics::PtlaMetrics;
use crate::parser::parse_feed;

/// Hard upper bound on one fetch, transport and decode included.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// The two GTFS-RT feeds polled every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    VehiclePositions,
    TripUpdates,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::VehiclePositions => "vehicle_positions",
            FeedKind::TripUpdates => "trip_updates",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieves and decodes feeds, recording scrape status and latency.
///
/// [`FeedFetcher::fetch`] never fails: transport errors, timeouts, non-2xx
/// statuses and decode errors all come back as `None`.
pub struct FeedFetcher<C> {
    client: C,
    metrics: Arc<PtlaMetrics>,
    timeout: Duration,
}

impl<C: HttpClient> FeedFetcher<C> {
    pub fn new(client: C, metrics: Arc<PtlaMetrics>) -> Self {
        Self {
            client,
            metrics,
            timeout: FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetches one feed. An empty `url` means the feed is disabled: nothing
    /// is requested, status is set to 0 and no latency is observed.
    #[tracing::instrument(skip(self), fields(feed = %kind))]
    pub async fn fetch(&self, kind: FeedKind, url: &str) -> Option<FeedMessage> {
        if url.is_empty() {
            debug!("Feed URL not configured, skipping");
            self.metrics.set_scrape_status(kind, false);
            return None;
        }

        let start = Instant::now();
        let result = self.try_fetch(url).await;
        let elapsed = start.elapsed().as_secs_f64();

        self.metrics.set_scrape_status(kind, result.is_ok());
        self.metrics.observe_scrape_latency(kind, elapsed);

        match result {
            Ok(feed) => {
                debug!(entity_count = feed.entity.len(), elapsed, "Feed fetched");
                Some(feed)
            }
            Err(e) => {
                warn!(error = %e, elapsed, "Feed fetch failed");
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<FeedMessage> {
        let bytes = tokio::time::timeout(self.timeout, fetch_bytes(&self.client, url))
            .await
            .with_context(|| format!("timed out after {:?}", self.timeout))??;
        parse_feed(&bytes)
    }
}
