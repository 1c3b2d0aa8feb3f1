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

use crate::config::config::{ConfigError, TorBlockProperties};
use axum::http::{HeaderName, StatusCode};
use torwaf_types::{IPv4, IncomingPeer, PublishedBlocklist};

/// The outcome of checking one request against the blocklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Carries the first candidate found in the blocklist.
    Deny(IPv4),
}

impl Verdict {
    pub fn is_denied(&self) -> bool {
        matches!(self, Verdict::Deny(_))
    }

    /// Status to answer with when the request must not reach the next handler.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny(_) => Some(StatusCode::FORBIDDEN),
        }
    }
}

pub trait IPFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Name of the request header carrying the forwarded address chain.
    fn forwarded_header_name(&self) -> &HeaderName;

    /// Decides on one request. Only string parsing and an in-memory lookup, never blocks.
    fn classify(&self, peer: &IncomingPeer) -> Verdict;
}

/// Denies requests whose peer or forwarded addresses are published exit nodes.
/// Anything it cannot parse is allowed through.
pub struct ExitNodeIPFilter {
    enabled: bool,
    trust_forwarded_header: bool,
    forwarded_header_name: HeaderName,
    blocklist: PublishedBlocklist,
}

impl ExitNodeIPFilter {
    pub const NAME: &'static str = "EXIT_NODE";

    pub fn new(props: &TorBlockProperties, blocklist: PublishedBlocklist) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: props.enabled,
            trust_forwarded_header: props.trust_forwarded_header,
            forwarded_header_name: props.header_name()?,
            blocklist,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn blocklist(&self) -> &PublishedBlocklist {
        &self.blocklist
    }

    /// All candidates are checked against the same snapshot, a concurrent publish
    /// never splits one decision across two lists.
    pub fn check_candidates(&self, candidates: &[IPv4]) -> Verdict {
        let snapshot = self.blocklist.load();
        candidates
            .iter()
            .find(|ip| snapshot.contains(**ip))
            .map_or(Verdict::Allow, |ip| Verdict::Deny(*ip))
    }
}

impl IPFilter for ExitNodeIPFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn forwarded_header_name(&self) -> &HeaderName {
        &self.forwarded_header_name
    }

    fn classify(&self, peer: &IncomingPeer) -> Verdict {
        if !self.enabled {
            return Verdict::Allow;
        }
        self.check_candidates(&peer.candidates(self.trust_forwarded_header))
    }
}
