// SPDX-License-Identifier: GNU GENERAL PUBLIC LICENSE Version 3
//
// Copyleft (c) 2024 James Wong. This file is part of James Wong.
// is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the
// Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// James Wong is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with James Wong.  If not, see <https://www.gnu.org/licenses/>.
//
// IMPORTANT: Any software that fully or partially contains or uses materials
// covered by this license must also be released under the GNU GPL license.
// This includes modifications and derived works.

use crate::{
    extract::extract_ipv4_literals,
    fetcher_base::{FetchError, IFeedFetcher},
};
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use torwaf_types::{IPv4SetBuilder, PublishedBlocklist};

// Longest period the loop schedules with, longer ones are clamped to it.
const MAX_LOOP_PERIOD: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshState {
    Idle,
    Fetching,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshStats {
    /// Literals located in the document, duplicates and invalid ones included.
    pub located: usize,
    /// Distinct valid addresses published.
    pub accepted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    /// `Idle` or `Fetching`.
    pub state: RefreshState,
    /// `Succeeded` or `Failed` once the first cycle completed.
    pub last_outcome: Option<RefreshState>,
    pub last_stats: Option<RefreshStats>,
    pub last_error: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
}

impl Default for RefreshStatus {
    fn default() -> Self {
        Self {
            state: RefreshState::Idle,
            last_outcome: None,
            last_stats: None,
            last_error: None,
            last_attempt: None,
            last_success: None,
        }
    }
}

/// Keeps the published blocklist in sync with the remote address list.
///
/// A cycle fetches the list, builds a whole new set off to the side and publishes it
/// in one swap. A failed cycle leaves the published set untouched.
pub struct BlocklistUpdater {
    fetcher: Arc<dyn IFeedFetcher>,
    address_list_url: String,
    update_interval: Duration,
    blocklist: PublishedBlocklist,
    status: ArcSwap<RefreshStatus>,
    // Serializes cycles, readers of the blocklist never touch it.
    cycle: Mutex<()>,
}

impl BlocklistUpdater {
    pub fn new(
        fetcher: Arc<dyn IFeedFetcher>,
        address_list_url: impl Into<String>,
        update_interval: Duration,
        blocklist: PublishedBlocklist,
    ) -> Arc<Self> {
        Arc::new(Self {
            fetcher,
            address_list_url: address_list_url.into(),
            update_interval,
            blocklist,
            status: ArcSwap::from_pointee(RefreshStatus::default()),
            cycle: Mutex::new(()),
        })
    }

    pub fn blocklist(&self) -> &PublishedBlocklist {
        &self.blocklist
    }

    pub fn address_list_url(&self) -> &str {
        &self.address_list_url
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn status(&self) -> Arc<RefreshStatus> {
        self.status.load_full()
    }

    /// Runs one fetch, parse, build and publish cycle.
    pub async fn refresh(&self) -> Result<RefreshStats, FetchError> {
        let _cycle = self.cycle.lock().await;

        self.update_status(|status| {
            status.state = RefreshState::Fetching;
            status.last_attempt = Some(Utc::now());
        });
        tracing::info!("Refreshing blocked ip list from {} ...", self.address_list_url);

        let result = match self.fetcher.fetch(&self.address_list_url).await {
            Ok(document) => {
                let extraction = extract_ipv4_literals(&document);
                let mut builder = IPv4SetBuilder::with_capacity(extraction.addresses.len());
                for ip in extraction.addresses {
                    builder.add(ip);
                }
                let set = builder.build();
                let stats = RefreshStats {
                    located: extraction.located,
                    accepted: set.len(),
                };
                self.blocklist.publish(set);
                Ok(stats)
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(stats) => {
                tracing::info!(
                    located = stats.located,
                    accepted = stats.accepted,
                    "Updated blocked ip list (found {} ips)",
                    stats.located
                );
                self.update_status(|status| {
                    status.state = RefreshState::Idle;
                    status.last_outcome = Some(RefreshState::Succeeded);
                    status.last_stats = Some(*stats);
                    status.last_error = None;
                    status.last_success = status.last_attempt;
                });
            }
            Err(e) => {
                tracing::warn!("Failed to update blocked ip list, keeping the current one: {}", e);
                let cause = e.to_string();
                self.update_status(|status| {
                    status.state = RefreshState::Idle;
                    status.last_outcome = Some(RefreshState::Failed);
                    status.last_error = Some(cause.clone());
                });
            }
        }

        result
    }

    /// Spawns the refresh loop. The first tick fires one interval from now, each cycle
    /// finishes before the next wait begins. The loop ends only when the task is aborted.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let period = this.update_interval.clamp(Duration::from_millis(1), MAX_LOOP_PERIOD);
            let now = Instant::now();
            let start = now.checked_add(period).unwrap_or(now);
            let mut interval = time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!("Started blocked ip list updater with interval {:?}", period);
            loop {
                interval.tick().await;
                // Failures are already logged and retried on the next tick.
                let _ = this.refresh().await;
            }
        })
    }

    fn update_status(&self, f: impl Fn(&mut RefreshStatus)) {
        self.status.rcu(|current| {
            let mut next = RefreshStatus::clone(current);
            f(&mut next);
            next
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicUsize, Ordering},
    };
    use torwaf_types::{IPv4, IPv4Set};

    /// Replays scripted responses, then keeps failing with 503.
    #[derive(Default)]
    struct ScriptedFetcher {
        responses: std::sync::Mutex<VecDeque<Result<String, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<String, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: std::sync::Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IFeedFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Status(503)))
        }
    }

    fn ip(s: &str) -> IPv4 {
        IPv4::parse(s).unwrap()
    }

    fn updater(fetcher: Arc<ScriptedFetcher>, interval: Duration) -> Arc<BlocklistUpdater> {
        BlocklistUpdater::new(
            fetcher,
            "http://feed.invalid/exit-addresses",
            interval,
            PublishedBlocklist::default(),
        )
    }

    #[tokio::test]
    async fn test_refresh_publishes_new_set() {
        let fetcher = ScriptedFetcher::new(vec![Ok(
            "ExitAddress 176.10.99.200\nExitAddress 176.10.99.200\nExitAddress 10.0.0.1\n".to_string(),
        )]);
        let updater = updater(fetcher, Duration::from_secs(60));

        let stats = updater.refresh().await.unwrap();
        assert_eq!(stats, RefreshStats { located: 3, accepted: 2 });
        assert!(updater.blocklist().contains(ip("176.10.99.200")));
        assert!(updater.blocklist().contains(ip("10.0.0.1")));

        let status = updater.status();
        assert_eq!(status.state, RefreshState::Idle);
        assert_eq!(status.last_outcome, Some(RefreshState::Succeeded));
        assert_eq!(status.last_stats, Some(stats));
        assert!(status.last_success.is_some());
    }

    #[tokio::test]
    async fn test_refresh_replaces_rather_than_merges() {
        let fetcher = ScriptedFetcher::new(vec![Ok("1.1.1.1".to_string()), Ok("2.2.2.2".to_string())]);
        let updater = updater(fetcher, Duration::from_secs(60));

        updater.refresh().await.unwrap();
        let first = updater.blocklist().load();
        updater.refresh().await.unwrap();

        assert!(first.contains(ip("1.1.1.1")));
        assert!(!updater.blocklist().contains(ip("1.1.1.1")));
        assert!(updater.blocklist().contains(ip("2.2.2.2")));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_set() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok("176.10.99.200".to_string()),
            Err(FetchError::Status(500)),
            Err(FetchError::EmptyBody),
        ]);
        let updater = updater(fetcher, Duration::from_secs(60));

        updater.refresh().await.unwrap();
        assert!(matches!(updater.refresh().await, Err(FetchError::Status(500))));
        assert!(updater.blocklist().contains(ip("176.10.99.200")));

        assert!(matches!(updater.refresh().await, Err(FetchError::EmptyBody)));
        assert!(updater.blocklist().contains(ip("176.10.99.200")));

        let status = updater.status();
        assert_eq!(status.last_outcome, Some(RefreshState::Failed));
        assert_eq!(status.last_stats, Some(RefreshStats { located: 1, accepted: 1 }));
        assert!(status.last_error.as_deref().unwrap_or_default().contains("empty"));
    }

    #[tokio::test]
    async fn test_document_without_literals_publishes_empty_set() {
        let fetcher = ScriptedFetcher::new(vec![Ok("176.10.99.200".to_string()), Ok("nothing".to_string())]);
        let updater = updater(fetcher, Duration::from_secs(60));

        updater.refresh().await.unwrap();
        let stats = updater.refresh().await.unwrap();
        assert_eq!(stats, RefreshStats { located: 0, accepted: 0 });
        assert_eq!(*updater.blocklist().load(), IPv4Set::empty());
    }

    #[tokio::test]
    async fn test_loop_waits_one_interval_before_first_tick() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let updater = updater(fetcher.clone(), Duration::from_secs(60));

        let handle = updater.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_loop_survives_huge_interval() {
        let fetcher = ScriptedFetcher::new(vec![]);
        let updater = updater(fetcher.clone(), Duration::MAX);

        let handle = updater.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_loop_refreshes_on_every_tick() {
        let fetcher = ScriptedFetcher::new(vec![Ok("1.1.1.1".to_string()), Ok("2.2.2.2".to_string())]);
        let updater = updater(fetcher.clone(), Duration::from_millis(20));

        let handle = updater.start();
        let deadline = Instant::now() + Duration::from_secs(5);
        while fetcher.calls.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        // The scripted responses ran out, so later ticks failed and kept the last good set.
        assert!(fetcher.calls.load(Ordering::SeqCst) >= 3);
        assert!(updater.blocklist().contains(ip("2.2.2.2")));
        assert!(!updater.blocklist().contains(ip("1.1.1.1")));
    }
}
