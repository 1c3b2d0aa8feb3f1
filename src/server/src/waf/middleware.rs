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

use crate::{context::state::TorwafState, router::URI_HEALTHZ, waf::ipfilter::Verdict};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use torwaf_types::IncomingPeer;

pub const DENIED_BODY: &str = "Access denied by Torwaf IP Filter";

/// Short-circuits requests from published exit nodes with 403, everything else
/// goes to the next handler untouched.
pub async fn torwaf_middleware(State(state): State<TorwafState>, req: Request, next: Next) -> Response {
    if req.uri().path() == URI_HEALTHZ {
        return next.run(req).await;
    }

    let peer = IncomingPeer::from_request(&req, state.ipfilter.forwarded_header_name().as_str());
    match state.ipfilter.classify(&peer) {
        Verdict::Allow => next.run(req).await,
        verdict @ Verdict::Deny(ip) => {
            tracing::warn!(
                filter = state.ipfilter.name(),
                "Denied request from Tor exit node {} to {} {}",
                ip,
                req.method(),
                req.uri().path()
            );
            let status = verdict.status_code().unwrap_or(axum::http::StatusCode::FORBIDDEN);
            (status, DENIED_BODY).into_response()
        }
    }
}
