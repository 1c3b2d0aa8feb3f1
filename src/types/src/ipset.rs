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

use crate::ipv4::IPv4;
use arc_swap::ArcSwap;
use std::{collections::HashSet, sync::Arc};

/// Read-only set of IPv4 addresses. Only obtainable through [`IPv4SetBuilder::build`],
/// so a finished set is never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IPv4Set {
    set: HashSet<IPv4>,
}

impl IPv4Set {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> IPv4SetBuilder {
        IPv4SetBuilder::default()
    }

    pub fn contains(&self, ip: IPv4) -> bool {
        self.set.contains(&ip)
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IPv4> {
        self.set.iter()
    }
}

#[derive(Debug, Default)]
pub struct IPv4SetBuilder {
    set: HashSet<IPv4>,
}

impl IPv4SetBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            set: HashSet::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, ip: IPv4) {
        self.set.insert(ip);
    }

    pub fn build(self) -> IPv4Set {
        IPv4Set { set: self.set }
    }
}

impl FromIterator<IPv4> for IPv4Set {
    fn from_iter<T: IntoIterator<Item = IPv4>>(iter: T) -> Self {
        let mut builder = IPv4Set::builder();
        for ip in iter {
            builder.add(ip);
        }
        builder.build()
    }
}

/// The single slot holding the currently active blocklist.
///
/// Cloning the handle shares the slot. Readers take a snapshot with [`load`](Self::load)
/// and keep using it even after a newer set is published; the writer replaces the whole
/// set with one pointer swap, so nobody ever observes a half-built set.
#[derive(Debug, Clone)]
pub struct PublishedBlocklist {
    inner: Arc<ArcSwap<IPv4Set>>,
}

impl PublishedBlocklist {
    pub fn new(initial: IPv4Set) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    pub fn load(&self) -> Arc<IPv4Set> {
        self.inner.load_full()
    }

    pub fn contains(&self, ip: IPv4) -> bool {
        self.inner.load().contains(ip)
    }

    pub fn publish(&self, set: IPv4Set) {
        self.inner.store(Arc::new(set));
    }
}

impl Default for PublishedBlocklist {
    fn default() -> Self {
        Self::new(IPv4Set::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IPv4 {
        IPv4::parse(s).unwrap()
    }

    #[test]
    fn test_builder_collapses_duplicates() {
        let mut builder = IPv4Set::builder();
        builder.add(ip("1.2.3.4"));
        builder.add(ip("1.2.3.4"));
        builder.add(ip("5.6.7.8"));
        let set = builder.build();

        assert_eq!(set.len(), 2);
        assert!(set.contains(ip("1.2.3.4")));
        assert!(set.contains(ip("5.6.7.8")));
        assert!(!set.contains(ip("9.9.9.9")));
    }

    #[test]
    fn test_empty_set() {
        let set = IPv4Set::empty();
        assert!(set.is_empty());
        assert!(!set.contains(ip("0.0.0.0")));
    }

    #[test]
    fn test_publish_keeps_old_snapshot_valid() {
        let blocklist = PublishedBlocklist::new([ip("1.2.3.4")].into_iter().collect());
        let old = blocklist.load();

        blocklist.publish([ip("5.6.7.8")].into_iter().collect());

        assert!(old.contains(ip("1.2.3.4")));
        assert!(!blocklist.contains(ip("1.2.3.4")));
        assert!(blocklist.contains(ip("5.6.7.8")));
    }

    #[test]
    fn test_clones_share_the_slot() {
        let blocklist = PublishedBlocklist::default();
        let reader = blocklist.clone();
        blocklist.publish([ip("176.10.99.200")].into_iter().collect());
        assert!(reader.contains(ip("176.10.99.200")));
    }

    #[test]
    fn test_concurrent_readers_see_whole_sets() {
        let first: IPv4Set = (0..=255u8).map(|d| IPv4::new(10, 0, 0, d)).collect();
        let second: IPv4Set = (0..=255u8).map(|d| IPv4::new(10, 0, 1, d)).collect();
        let blocklist = PublishedBlocklist::new(first.clone());

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reader = blocklist.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let snapshot = reader.load();
                        assert_eq!(snapshot.len(), 256);
                        let a = snapshot.contains(IPv4::new(10, 0, 0, 7));
                        let b = snapshot.contains(IPv4::new(10, 0, 1, 7));
                        assert!(a ^ b);
                    }
                })
            })
            .collect();

        for i in 0..200 {
            blocklist.publish(if i % 2 == 0 { second.clone() } else { first.clone() });
        }
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
