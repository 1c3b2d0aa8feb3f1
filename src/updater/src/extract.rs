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

use once_cell::sync::Lazy;
use regex::Regex;
use torwaf_types::IPv4;

// Loose locator, every hit is re-validated by the strict parser.
static IPV4_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+\b").expect("invalid ipv4 literal pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedExtraction {
    /// Valid addresses in document order, duplicates included.
    pub addresses: Vec<IPv4>,
    /// Number of literals the locator matched, valid or not.
    pub located: usize,
}

/// Scans free-form text for dotted-quad literals.
pub fn extract_ipv4_literals(document: &str) -> FeedExtraction {
    let mut extraction = FeedExtraction::default();
    for literal in IPV4_LITERAL.find_iter(document) {
        extraction.located += 1;
        match IPv4::parse(literal.as_str()) {
            Ok(ip) => extraction.addresses.push(ip),
            Err(e) => tracing::trace!("Dropping literal '{}': {}", literal.as_str(), e),
        }
    }
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_prose() {
        let extraction = extract_ipv4_literals("exit node 176.10.99.200 seen at 2021, also 10.0.0.1!");
        assert_eq!(
            extraction.addresses,
            vec![IPv4::new(176, 10, 99, 200), IPv4::new(10, 0, 0, 1)]
        );
        assert_eq!(extraction.located, 2);
    }

    #[test]
    fn test_extract_tor_exit_addresses_format() {
        let document = "\
ExitNode 0011BD2485AD45D984EC4159C88FC066E5E3300E
Published 2021-04-01 11:05:44
LastStatus 2021-04-01 12:02:16
ExitAddress 162.247.74.201 2021-04-01 12:10:52
ExitNode 0091174DE56EA5E8B8F9CA8A6F6AD46CEB2F8C3D
Published 2021-04-01 03:09:06
LastStatus 2021-04-01 13:00:00
ExitAddress 185.220.101.21 2021-04-01 13:08:40
ExitAddress 162.247.74.201 2021-04-01 13:09:00
";
        let extraction = extract_ipv4_literals(document);
        assert_eq!(extraction.located, 3);
        assert_eq!(
            extraction.addresses,
            vec![
                IPv4::new(162, 247, 74, 201),
                IPv4::new(185, 220, 101, 21),
                IPv4::new(162, 247, 74, 201)
            ]
        );
    }

    #[test]
    fn test_extract_drops_invalid_candidates() {
        let extraction = extract_ipv4_literals("<li>1.2.3.256</li><li>1234.1.1.1</li><li>8.8.4.4</li>");
        assert_eq!(extraction.located, 3);
        assert_eq!(extraction.addresses, vec![IPv4::new(8, 8, 4, 4)]);
    }

    #[test]
    fn test_extract_requires_word_boundaries() {
        let extraction = extract_ipv4_literals("v1.2.3.4 build_9.9.9.9 1.2.3");
        assert_eq!(extraction, FeedExtraction::default());
    }

    #[test]
    fn test_extract_nothing() {
        assert_eq!(extract_ipv4_literals(""), FeedExtraction::default());
        assert_eq!(extract_ipv4_literals("no addresses here"), FeedExtraction::default());
    }
}
