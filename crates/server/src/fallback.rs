//! Tiered top-up to a fixed result size.
//!
//! Tiers are offered in priority order. The first occurrence of a show wins,
//! the result never grows past the target, and a failing tier is logged and
//! contributes nothing.

use data_loader::ShowId;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Anything the composer can deduplicate
pub trait HasShowId {
    fn show_id(&self) -> ShowId;
}

#[derive(Debug)]
pub struct FallbackComposer<T> {
    target: usize,
    items: Vec<T>,
    seen: HashSet<ShowId>,
}

impl<T: HasShowId> FallbackComposer<T> {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            items: Vec::with_capacity(target),
            seen: HashSet::new(),
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Slots still open
    pub fn remaining(&self) -> usize {
        self.target.saturating_sub(self.items.len())
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Show ids already placed, for excluding them from later tiers
    pub fn seen(&self) -> &HashSet<ShowId> {
        &self.seen
    }

    /// Append a tier's items; returns how many were kept
    pub fn extend(&mut self, tier: &str, items: impl IntoIterator<Item = T>) -> usize {
        let before = self.items.len();
        for item in items {
            if self.is_full() {
                break;
            }
            if self.seen.insert(item.show_id()) {
                self.items.push(item);
            }
        }
        let added = self.items.len() - before;
        debug!(
            "Tier {} added {} items ({}/{})",
            tier,
            added,
            self.items.len(),
            self.target
        );
        added
    }

    /// Like [`extend`](Self::extend), but a failed tier is logged and skipped
    pub fn extend_result<E>(&mut self, tier: &str, result: Result<Vec<T>, E>) -> usize
    where
        E: Into<anyhow::Error>,
    {
        match result {
            Ok(items) => self.extend(tier, items),
            Err(e) => {
                let error: anyhow::Error = e.into();
                warn!("Tier {} failed, skipping: {:#}", tier, error);
                0
            }
        }
    }

    pub fn finish(self) -> Vec<T> {
        self.items
    }
}
