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

use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("torwaf/", env!("CARGO_PKG_VERSION"));

/// Builds a client whose every request (connect, headers and body read) is bounded by `timeout`.
pub fn build_with_timeout(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::ClientBuilder::new()
        .timeout(timeout)
        .user_agent(DEFAULT_USER_AGENT)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_timeout() {
        assert!(build_with_timeout(Duration::from_secs(10)).is_ok());
        assert!(build_with_timeout(Duration::from_millis(500)).is_ok());
    }
}
