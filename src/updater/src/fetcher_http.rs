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

use crate::fetcher_base::{FetchError, IFeedFetcher};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::{sync::Arc, time::Duration};
use torwaf_utils::httpclients;

pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    pub const NAME: &'static str = "http";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new() -> Result<Arc<Self>, reqwest::Error> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Arc<Self>, reqwest::Error> {
        Ok(Self::with_client(httpclients::build_with_timeout(timeout)?))
    }

    pub fn with_client(client: reqwest::Client) -> Arc<Self> {
        Arc::new(Self { client })
    }
}

#[async_trait]
impl IFeedFetcher for HttpFeedFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await?;

        // Only a plain 200 carries a complete list.
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.text().await.map_err(FetchError::Body)?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        tracing::debug!(fetcher = Self::NAME, "Fetched address list of {} bytes", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn serve_feed() -> SocketAddr {
        let app = Router::new()
            .route(
                "/exit-addresses",
                get(|| async { "ExitNode 0011\nExitAddress 176.10.99.200 2021-04-01 10:00:00\n" }),
            )
            .route("/empty", get(|| async { "" }))
            .route("/unavailable", get(|| async { (AxumStatus::SERVICE_UNAVAILABLE, "down") }))
            .route("/accepted", get(|| async { (AxumStatus::ACCEPTED, "1.2.3.4") }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_fetch_ok() {
        let addr = serve_feed().await;
        let fetcher = HttpFeedFetcher::new().unwrap();

        let body = fetcher.fetch(&format!("http://{}/exit-addresses", addr)).await.unwrap();
        assert!(body.contains("176.10.99.200"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_200() {
        let addr = serve_feed().await;
        let fetcher = HttpFeedFetcher::new().unwrap();

        let err = fetcher.fetch(&format!("http://{}/unavailable", addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));

        let err = fetcher.fetch(&format!("http://{}/accepted", addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(202)));

        let err = fetcher.fetch(&format!("http://{}/nowhere", addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_body() {
        let addr = serve_feed().await;
        let fetcher = HttpFeedFetcher::new().unwrap();

        let err = fetcher.fetch(&format!("http://{}/empty", addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // Bind then drop to get a local port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFeedFetcher::with_timeout(Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch(&format!("http://{}/exit-addresses", addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
    }
}
