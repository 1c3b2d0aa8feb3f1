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

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use torwaf_benchmarks::synthetic_exit_list;
use torwaf_types::{IPv4, IPv4Set, IncomingPeer, PublishedBlocklist};
use torwaf_updater::extract::extract_ipv4_literals;

fn bench_parse(c: &mut Criterion) {
    c.bench_function("ipv4_parse", |b| b.iter(|| IPv4::parse(black_box("176.10.99.200"))));
    c.bench_function("ipv4_parse_invalid", |b| b.iter(|| IPv4::parse(black_box("176.10.99.2000"))));
}

fn bench_extract(c: &mut Criterion) {
    let document = synthetic_exit_list(1500);
    c.bench_function("extract_1500_exit_addresses", |b| {
        b.iter(|| extract_ipv4_literals(black_box(&document)))
    });
}

fn bench_lookup(c: &mut Criterion) {
    let set: IPv4Set = extract_ipv4_literals(&synthetic_exit_list(1500)).addresses.into_iter().collect();
    let blocklist = PublishedBlocklist::new(set);
    let peer = IncomingPeer::new(
        Some("10.0.5.200:443".to_string()),
        Some("127.0.0.1, 192.168.1.1".to_string()),
    );

    c.bench_function("blocklist_contains", |b| {
        b.iter(|| blocklist.contains(black_box(IPv4::new(10, 0, 5, 200))))
    });
    c.bench_function("peer_candidates_lookup", |b| {
        b.iter(|| {
            let snapshot = blocklist.load();
            black_box(&peer).candidates(true).into_iter().any(|ip| snapshot.contains(ip))
        })
    });
}

criterion_group!(benches, bench_parse, bench_extract, bench_lookup);
criterion_main!(benches);
