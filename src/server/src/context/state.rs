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
    config::config::{AppConfig, ConfigError},
    forward::forwarder_http::HttpForwarder,
    waf::{ipfilter::IPFilter, torblock::TorBlock},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct TorwafState {
    pub config: Arc<AppConfig>,
    pub torblock: Arc<TorBlock>,
    pub ipfilter: Arc<dyn IPFilter>,
    pub forwarder: Option<Arc<HttpForwarder>>,
}

impl TorwafState {
    pub async fn new(config: &Arc<AppConfig>) -> Result<Self, ConfigError> {
        let torblock = TorBlock::new(&config.torblock).await?;
        Self::with_torblock(config, torblock)
    }

    /// Builds the state around an already constructed blocker, e.g. one fed by a custom fetcher.
    pub fn with_torblock(config: &Arc<AppConfig>, torblock: TorBlock) -> Result<Self, ConfigError> {
        let forwarder = HttpForwarder::new(&config.forward)?;
        let torblock = Arc::new(torblock);
        Ok(TorwafState {
            // Notice: Arc object clone only increments the reference counter, and does not copy the actual data block.
            config: config.clone(),
            ipfilter: torblock.filter().clone(),
            torblock,
            forwarder,
        })
    }
}
