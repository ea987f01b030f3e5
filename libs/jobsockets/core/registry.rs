//! Reference-counted subscription registry
//!
//! One registry serves every topic. Entries are keyed by
//! `<listen type>:<id>` and hold the wire message that is replayed after
//! each reconnect.
//!
//! Per key:
//!
//! ```text
//! absent ──acquire──▶ active(1) ──acquire──▶ active(n+1)
//!   ▲                    │  ▲                   │
//!   └──release (sends)───┘  └──────release──────┘
//! ```
//!
//! The registry only does bookkeeping. It tells the caller what to put on
//! the wire through [`Acquired`] and [`Released`].

use super::message::WireMessage;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Entry {
    message: WireMessage,
    ref_count: usize,
}

/// Outcome of [`SubscriptionRegistry::acquire`]
#[derive(Debug, Clone, PartialEq)]
pub enum Acquired {
    /// New entry; the listen message must be sent
    First,
    /// Existing entry, reference count is now `ref_count`
    Shared { ref_count: usize },
}

/// Outcome of [`SubscriptionRegistry::release`]
#[derive(Debug, Clone, PartialEq)]
pub enum Released {
    /// No entry for this key
    Missing,
    /// Still referenced by `ref_count` callers
    Shared { ref_count: usize },
    /// Last reference gone; entry removed
    Removed(WireMessage),
}

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<String, Entry>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one reference on `key`, creating the entry if needed
    pub fn acquire(&mut self, key: String, message: WireMessage) -> Acquired {
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.ref_count += 1;
                Acquired::Shared {
                    ref_count: entry.ref_count,
                }
            }
            None => {
                self.entries.insert(key, Entry { message, ref_count: 1 });
                Acquired::First
            }
        }
    }

    /// Drop one reference on `key`
    pub fn release(&mut self, key: &str) -> Released {
        let Some(entry) = self.entries.get_mut(key) else {
            return Released::Missing;
        };

        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return Released::Shared {
                ref_count: entry.ref_count,
            };
        }

        match self.entries.remove(key) {
            Some(entry) => Released::Removed(entry.message),
            None => Released::Missing,
        }
    }

    /// Messages of every active entry, one each, in map order
    pub fn messages(&self) -> impl Iterator<Item = &WireMessage> {
        self.entries.values().map(|entry| &entry.message)
    }

    pub fn ref_count(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.ref_count)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
