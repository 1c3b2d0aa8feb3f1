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

use crate::config::config::{ConfigError, ForwardProperties};
use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, StatusCode},
    response::Response,
};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use torwaf_utils::httpclients::DEFAULT_USER_AGENT;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("failed to build response: {0}")]
    Response(#[from] axum::http::Error),
}

impl ForwardError {
    /// Status answered to the client, the request itself is at fault only when too large.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForwardError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ForwardError::Upstream(_) | ForwardError::Response(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Relays allowed requests to a fixed upstream.
pub struct HttpForwarder {
    client: reqwest::Client,
    upstream_url: String,
    max_body_bytes: usize,
}

impl HttpForwarder {
    pub const NAME: &'static str = "http_forward";

    /// Returns `None` when no upstream is configured.
    pub fn new(props: &ForwardProperties) -> Result<Option<Arc<Self>>, ConfigError> {
        let upstream_url = match &props.upstream_url {
            Some(url) => url.to_owned(),
            None => return Ok(None),
        };
        let client = reqwest::ClientBuilder::new()
            .user_agent(DEFAULT_USER_AGENT)
            .connect_timeout(Duration::from_secs(props.connect_timeout))
            .timeout(Duration::from_secs(props.total_timeout))
            .build()?;
        Ok(Some(Arc::new(Self {
            client,
            upstream_url,
            max_body_bytes: props.max_body_bytes,
        })))
    }

    pub fn upstream_url(&self) -> &str {
        &self.upstream_url
    }

    fn get_upstream_url(&self, path_and_query: &str) -> String {
        // If the upstream base URL ends with a slash and the path starts with a slash to prevent duplicate slash.
        let base = &self.upstream_url;
        if base.ends_with('/') && path_and_query.starts_with('/') {
            format!("{}{}", base, &path_and_query[1..])
        } else if !base.ends_with('/') && !path_and_query.starts_with('/') {
            format!("{}/{}", base, path_and_query)
        } else {
            format!("{}{}", base, path_and_query)
        }
    }

    /// Forward the request to the upstream server.
    pub async fn http_forward(&self, req: Request) -> Result<Response<Body>, ForwardError> {
        let (parts, body) = req.into_parts();
        let too_large = ForwardError::PayloadTooLarge {
            limit: self.max_body_bytes,
        };

        let declared_len = parts
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_len.is_some_and(|len| len > self.max_body_bytes) {
            return Err(too_large);
        }

        let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let url = self.get_upstream_url(path_and_query);

        tracing::debug!(
            forwarder = Self::NAME,
            "Forwarding request {} {} to upstream: {}",
            parts.method,
            path_and_query,
            url
        );

        let mut req_builder = self.client.request(parts.method.clone(), url.as_str());

        // Copy original request headers, but exclude connection related headers.
        for (name, value) in parts.headers.iter() {
            if name != header::HOST && name != header::CONNECTION && name != header::CONTENT_LENGTH {
                req_builder = req_builder.header(name, value);
            }
        }

        // Reading stops at the limit, also for bodies without a declared length.
        let bytes = to_bytes(body, self.max_body_bytes).await.map_err(|_| too_large)?;
        if !bytes.is_empty() {
            req_builder = req_builder.body(bytes);
        }

        let resp = req_builder.send().await?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;

        tracing::debug!("Forwarded response from upstream status: {}, url: {}", status, url);

        let mut response = Response::builder().status(status.as_u16()).body(Body::from(bytes))?;

        // Copy the headers from the upstream response.
        let resp_headers = response.headers_mut();
        for (name, value) in headers.iter() {
            if name != header::CONNECTION && name != header::TRANSFER_ENCODING && name != header::CONTENT_LENGTH {
                resp_headers.append(name, value.clone());
            }
        }

        Ok(response)
    }
}
