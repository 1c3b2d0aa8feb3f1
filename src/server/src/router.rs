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

use crate::{context::state::TorwafState, waf::middleware::torwaf_middleware};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use torwaf_updater::RefreshStatus;

pub const URI_HEALTHZ: &str = "/healthz";

#[derive(Serialize, Debug)]
pub struct HealthzResponse {
    pub status: &'static str,
    pub enabled: bool,
    pub filter: &'static str,
    pub address_list_url: String,
    pub blocklist_size: usize,
    pub refresh: RefreshStatus,
}

pub fn build_app_router(state: TorwafState) -> Router {
    Router::new()
        .route(URI_HEALTHZ, get(handle_healthz))
        .fallback(handle_forward)
        // Notice: Layers wrap what is registered before them, the middleware sees every route.
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                        )
                    }),
                )
                .layer(axum::middleware::from_fn_with_state(state.clone(), torwaf_middleware)),
        )
        .with_state(state)
}

async fn handle_healthz(State(state): State<TorwafState>) -> Json<HealthzResponse> {
    let updater = state.torblock.updater();
    Json(HealthzResponse {
        status: "UP",
        enabled: state.torblock.filter().is_enabled(),
        filter: state.ipfilter.name(),
        address_list_url: updater.address_list_url().to_string(),
        blocklist_size: updater.blocklist().load().len(),
        refresh: updater.status().as_ref().clone(),
    })
}

async fn handle_forward(State(state): State<TorwafState>, req: Request) -> Response {
    match &state.forwarder {
        Some(forwarder) => match forwarder.http_forward(req).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("Failed to forward request to {}: {}", forwarder.upstream_url(), e);
                e.status_code().into_response()
            }
        },
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
