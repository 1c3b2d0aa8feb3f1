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

use crate::ipv4::IPv4;
use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;

/// The per-request address material the IP filter decides on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingPeer {
    /// Transport peer as `host:port` or a bare host.
    pub remote_addr: Option<String>,
    /// Raw forwarded-address header value, multiple header lines joined by `,`.
    pub forwarded_for: Option<String>,
}

impl IncomingPeer {
    pub fn new(remote_addr: Option<String>, forwarded_for: Option<String>) -> Self {
        Self {
            remote_addr,
            forwarded_for,
        }
    }

    pub fn from_request<B>(req: &Request<B>, forwarded_header_name: &str) -> Self {
        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string());

        let values: Vec<&str> = req
            .headers()
            .get_all(forwarded_header_name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        let forwarded_for = (!values.is_empty()).then(|| values.join(","));

        Self {
            remote_addr,
            forwarded_for,
        }
    }

    /// Candidate addresses in check order: every parseable forwarded entry left to
    /// right (only when `trust_forwarded`), then the transport peer host.
    /// Entries that are not IPv4 literals are skipped.
    pub fn candidates(&self, trust_forwarded: bool) -> Vec<IPv4> {
        let mut candidates = Vec::new();
        if trust_forwarded {
            if let Some(forwarded) = &self.forwarded_for {
                candidates.extend(forwarded.split(',').filter_map(|entry| IPv4::parse(entry.trim()).ok()));
            }
        }
        if let Some(remote) = &self.remote_addr {
            if let Ok(ip) = IPv4::parse(host_part(remote)) {
                candidates.push(ip);
            }
        }
        candidates
    }
}

/// Strips the port from `host:port` or `[v6]:port`; bare hosts pass through.
pub fn host_part(addr: &str) -> &str {
    let addr = addr.trim();
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split_once(']').map(|(host, _)| host).unwrap_or(rest);
    }
    match addr.rsplit_once(':') {
        Some((host, _)) if !host.contains(':') => host,
        _ => addr,
    }
}
