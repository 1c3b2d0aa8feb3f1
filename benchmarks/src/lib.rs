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

use torwaf_types::IPv4;

/// Renders a document in the exit-addresses layout with `count` distinct entries.
pub fn synthetic_exit_list(count: u32) -> String {
    let mut document = String::with_capacity(count as usize * 96);
    for i in 0..count {
        let ip = IPv4::from_bits(0x0A00_0000 + i);
        document.push_str(&format!(
            "ExitNode {:040X}\nPublished 2021-04-01 11:05:44\nExitAddress {} 2021-04-01 12:10:52\n",
            i, ip
        ));
    }
    document
}
