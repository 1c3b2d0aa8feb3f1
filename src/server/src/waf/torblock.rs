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
    config::config::{ConfigError, TorBlockProperties},
    waf::ipfilter::ExitNodeIPFilter,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use torwaf_types::PublishedBlocklist;
use torwaf_updater::{BlocklistUpdater, HttpFeedFetcher, IFeedFetcher};

/// Owns the published blocklist, the filter reading it and the background refresh task.
/// Dropping it stops the refresh task.
pub struct TorBlock {
    filter: Arc<ExitNodeIPFilter>,
    updater: Arc<BlocklistUpdater>,
    worker: JoinHandle<()>,
}

impl TorBlock {
    /// Validates the settings, performs the first refresh and starts the periodic one.
    /// An unreachable list at this point is not fatal, the filter starts out empty.
    pub async fn new(props: &TorBlockProperties) -> Result<Self, ConfigError> {
        props.validate_all()?;
        let fetcher = HttpFeedFetcher::new()?;
        Self::with_fetcher(props, fetcher).await
    }

    pub async fn with_fetcher(props: &TorBlockProperties, fetcher: Arc<dyn IFeedFetcher>) -> Result<Self, ConfigError> {
        props.validate_all()?;

        let blocklist = PublishedBlocklist::default();
        let filter = Arc::new(ExitNodeIPFilter::new(props, blocklist.clone())?);
        let updater = BlocklistUpdater::new(
            fetcher,
            props.address_list_url.to_owned(),
            props.update_interval(),
            blocklist,
        );

        if !props.enabled {
            tracing::info!("Tor exit blocking is disabled, requests are never denied.");
        }

        // Failure is already logged by the updater, starting with an empty list.
        let _ = updater.refresh().await;

        let worker = updater.start();
        Ok(Self {
            filter,
            updater,
            worker,
        })
    }

    pub fn filter(&self) -> &Arc<ExitNodeIPFilter> {
        &self.filter
    }

    pub fn updater(&self) -> &Arc<BlocklistUpdater> {
        &self.updater
    }
}

impl Drop for TorBlock {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waf::ipfilter::{IPFilter, Verdict};
    use async_trait::async_trait;
    use torwaf_types::{IPv4, IncomingPeer};
    use torwaf_updater::FetchError;

    struct StaticFetcher(Option<&'static str>);

    #[async_trait]
    impl IFeedFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            self.0.map(String::from).ok_or(FetchError::Status(503))
        }
    }

    #[tokio::test]
    async fn test_construction_runs_first_refresh() {
        let fetcher = Arc::new(StaticFetcher(Some("ExitAddress 176.10.99.200 2021-04-01")));
        let torblock = TorBlock::with_fetcher(&TorBlockProperties::default(), fetcher)
            .await
            .unwrap();

        assert!(torblock.filter().blocklist().contains(IPv4::new(176, 10, 99, 200)));
        let peer = IncomingPeer::new(Some("176.10.99.200:1234".to_string()), None);
        assert!(torblock.filter().classify(&peer).is_denied());
    }

    #[tokio::test]
    async fn test_construction_tolerates_unreachable_list() {
        let torblock = TorBlock::with_fetcher(&TorBlockProperties::default(), Arc::new(StaticFetcher(None)))
            .await
            .unwrap();

        assert!(torblock.filter().blocklist().load().is_empty());
        let peer = IncomingPeer::new(Some("176.10.99.200:1234".to_string()), None);
        assert_eq!(torblock.filter().classify(&peer), Verdict::Allow);
    }

    #[tokio::test]
    async fn test_construction_rejects_invalid_settings() {
        let props = TorBlockProperties {
            update_interval_seconds: 1,
            ..Default::default()
        };
        let result = TorBlock::with_fetcher(&props, Arc::new(StaticFetcher(None))).await;
        assert!(matches!(result, Err(ConfigError::UpdateIntervalTooShort { .. })));
    }

    #[tokio::test]
    async fn test_construction_rejects_unbounded_interval() {
        let props = TorBlockProperties {
            update_interval_seconds: u64::MAX,
            ..Default::default()
        };
        let fetcher = Arc::new(StaticFetcher(Some("176.10.99.200")));
        let result = TorBlock::with_fetcher(&props, fetcher).await;
        assert!(matches!(result, Err(ConfigError::UpdateIntervalTooLong { .. })));
    }

    #[tokio::test]
    async fn test_disabled_still_refreshes() {
        let props = TorBlockProperties {
            enabled: false,
            ..Default::default()
        };
        let fetcher = Arc::new(StaticFetcher(Some("176.10.99.200")));
        let torblock = TorBlock::with_fetcher(&props, fetcher).await.unwrap();

        assert_eq!(torblock.filter().blocklist().load().len(), 1);
        let peer = IncomingPeer::new(Some("176.10.99.200:1234".to_string()), None);
        assert_eq!(torblock.filter().classify(&peer), Verdict::Allow);
    }
}
