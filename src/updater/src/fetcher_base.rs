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

use async_trait::async_trait;
use thiserror::Error;

/// Every way a single address list retrieval can fail. All of them are recoverable,
/// the refresher keeps the current blocklist and retries on its next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to request address list: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to update address list: status code is {0}")]
    Status(u16),
    #[error("failed to read address list body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("address list body is empty")]
    EmptyBody,
}

#[async_trait]
pub trait IFeedFetcher: Send + Sync {
    /// Retrieves the raw address list document at `url`.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
