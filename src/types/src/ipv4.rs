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

use serde::{Deserialize, Serialize};
use std::{fmt, net::Ipv4Addr, str::FromStr};
use thiserror::Error;

/// A comparable 32bit IPv4 address, `a.b.c.d` is stored as `a<<24 | b<<16 | c<<8 | d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct IPv4 {
    addr: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseIPv4Error {
    #[error("field has value >255")]
    FieldTooLarge,
    #[error("every field must have at least one digit")]
    MissingDigits,
    #[error("address too long")]
    TooLong,
    #[error("address too short")]
    TooShort,
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
}

impl IPv4 {
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self {
            addr: (a as u32) << 24 | (b as u32) << 16 | (c as u32) << 8 | d as u32,
        }
    }

    pub const fn from_bits(addr: u32) -> Self {
        Self { addr }
    }

    pub const fn to_bits(self) -> u32 {
        self.addr
    }

    pub const fn octets(self) -> [u8; 4] {
        self.addr.to_be_bytes()
    }

    /// Strictly parses a dotted-quad literal. Only `[0-9.]` is accepted, exactly four
    /// non-empty fields each within `0..=255`, leading zeros are allowed (`"01.2.3.4"`).
    pub fn parse(s: &str) -> Result<Self, ParseIPv4Error> {
        let bytes = s.as_bytes();
        let mut fields = [0u8; 3];
        let mut val: u32 = 0;
        let mut pos = 0;

        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'0'..=b'9' => {
                    val = val * 10 + u32::from(b - b'0');
                    if val > 255 {
                        return Err(ParseIPv4Error::FieldTooLarge);
                    }
                }
                b'.' => {
                    if i == 0 || i == bytes.len() - 1 || bytes[i - 1] == b'.' {
                        return Err(ParseIPv4Error::MissingDigits);
                    }
                    if pos == 3 {
                        return Err(ParseIPv4Error::TooLong);
                    }
                    fields[pos] = val as u8;
                    pos += 1;
                    val = 0;
                }
                _ => {
                    let ch = s[i..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                    return Err(ParseIPv4Error::UnexpectedChar(ch));
                }
            }
        }
        if pos < 3 {
            return Err(ParseIPv4Error::TooShort);
        }

        Ok(Self::new(fields[0], fields[1], fields[2], val as u8))
    }
}

impl FromStr for IPv4 {
    type Err = ParseIPv4Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IPv4 {
    type Error = ParseIPv4Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IPv4> for String {
    fn from(ip: IPv4) -> Self {
        ip.to_string()
    }
}

impl From<Ipv4Addr> for IPv4 {
    fn from(addr: Ipv4Addr) -> Self {
        Self::from_bits(u32::from(addr))
    }
}

impl From<IPv4> for Ipv4Addr {
    fn from(ip: IPv4) -> Self {
        Ipv4Addr::from(ip.addr)
    }
}

impl fmt::Display for IPv4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}
