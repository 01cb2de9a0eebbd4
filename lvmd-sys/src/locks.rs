// SPDX-License-Identifier: GPL-3.0-only

//! Per-resource mutual exclusion
//!
//! LVM does its own metadata locking, but lvmd's guards are
//! read-check-then-mutate sequences spanning several tool runs. Holding the
//! resource's lock for the whole sequence keeps a concurrent request for
//! the same name (a second removal, a tag change racing a protection check,
//! an identical create) from interleaving with it inside this process.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Condvar, Mutex, PoisonError};

use lvmd_types::QualifiedName;

/// Name a lock is keyed on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    LogicalVolume(QualifiedName),
    VolumeGroup(String),
    /// Block device or file path
    Device(String),
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::LogicalVolume(name) => write!(f, "lv:{name}"),
            ResourceKey::VolumeGroup(name) => write!(f, "vg:{name}"),
            ResourceKey::Device(path) => write!(f, "dev:{path}"),
        }
    }
}

/// Registry of currently held resource locks
#[derive(Debug, Default)]
pub struct ResourceLocks {
    held: Mutex<HashSet<ResourceKey>>,
    released: Condvar,
}

impl ResourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `key` is free, then hold it until the guard drops
    pub fn lock(&self, key: ResourceKey) -> ResourceGuard<'_> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(&key) {
            tracing::debug!("Waiting for {key}");
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(key.clone());

        ResourceGuard { locks: self, key }
    }

    /// Whether `key` is currently held
    pub fn is_held(&self, key: &ResourceKey) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Holds a resource lock; releases it on drop
#[derive(Debug)]
pub struct ResourceGuard<'a> {
    locks: &'a ResourceLocks,
    key: ResourceKey,
}

impl ResourceGuard<'_> {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }
}

impl Drop for ResourceGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.key);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn lv_key(vg: &str, lv: &str) -> ResourceKey {
        ResourceKey::LogicalVolume(QualifiedName::new(vg, lv))
    }

    #[test]
    fn keys_render_with_kind_prefix() {
        assert_eq!(lv_key("vg0", "lv0").to_string(), "lv:vg0/lv0");
        assert_eq!(ResourceKey::VolumeGroup("vg0".into()).to_string(), "vg:vg0");
        assert_eq!(
            ResourceKey::Device("/dev/sdb".into()).to_string(),
            "dev:/dev/sdb"
        );
    }

    #[test]
    fn guard_releases_on_drop() {
        let locks = ResourceLocks::new();
        let key = lv_key("vg0", "lv0");

        {
            let guard = locks.lock(key.clone());
            assert_eq!(guard.key(), &key);
            assert!(locks.is_held(&key));
            assert!(!locks.is_held(&lv_key("vg0", "lv1")));
        }

        assert!(!locks.is_held(&key));
    }

    #[test]
    fn same_key_is_exclusive() {
        let locks = Arc::new(ResourceLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    let _guard = locks.lock(ResourceKey::VolumeGroup("vg0".into()));
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("worker panicked");
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }
}
