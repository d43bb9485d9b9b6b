//! Minimum-waste pack selection.
//!
//! - A [`Plan`] pairs a descending snapshot of the registry with the memo
//!   built against it. Plans are never mutated in place; a size change swaps
//!   in a fresh plan with an empty memo.
//! - A calculation pins one plan for its whole decomposition, so a
//!   concurrent reload cannot mix sizes from two snapshots.

use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;

use super::entities::{OptimizationResult, PackSize};
use super::registry::{RegistryError, SizeRegistry};

/// First pack of the best covering plus the totals of the whole chain; the
/// rest of the chain is memoized under `remaining - pack`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Choice {
    pack: PackSize,
    total_items: u64,
    pack_count: u64,
}

impl Choice {
    fn beats(&self, other: &Choice) -> bool {
        self.total_items < other.total_items
            || (self.total_items == other.total_items && self.pack_count < other.pack_count)
    }
}

#[derive(Debug, Default)]
struct Plan {
    /// Strictly descending.
    sizes: Vec<PackSize>,
    memo: DashMap<u64, Option<Choice>>,
}

impl Plan {
    fn new(mut sizes: Vec<PackSize>) -> Self {
        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes.dedup();
        Self {
            sizes,
            memo: DashMap::new(),
        }
    }

    fn lookup(&self, remaining: u64) -> Option<Choice> {
        self.memo.get(&remaining).and_then(|entry| *entry)
    }

    // Post-order over an explicit stack; only reached counts get memoized.
    fn solve(&self, items: u64) -> Option<Choice> {
        let mut stack = vec![items];

        while let Some(&remaining) = stack.last() {
            if self.memo.contains_key(&remaining) {
                stack.pop();
                continue;
            }

            let pending: Vec<u64> = self
                .sizes
                .iter()
                .filter(|&&size| size < remaining)
                .map(|&size| remaining - size)
                .filter(|next| !self.memo.contains_key(next))
                .collect();

            if pending.is_empty() {
                let best = self.best_choice(remaining);
                self.memo.insert(remaining, best);
                stack.pop();
            } else {
                stack.extend(pending);
            }
        }

        self.lookup(items)
    }

    /// Requires every `remaining - size` below `remaining` to be memoized.
    fn best_choice(&self, remaining: u64) -> Option<Choice> {
        let mut best: Option<Choice> = None;

        for &size in &self.sizes {
            let candidate = if size >= remaining {
                Choice {
                    pack: size,
                    total_items: size,
                    pack_count: 1,
                }
            } else {
                let Some(rest) = self.lookup(remaining - size) else {
                    continue;
                };
                Choice {
                    pack: size,
                    total_items: size + rest.total_items,
                    pack_count: rest.pack_count + 1,
                }
            };

            // Ties keep the earlier (larger) first pack.
            best = match best {
                Some(current) if !candidate.beats(&current) => Some(current),
                _ => Some(candidate),
            };
        }

        best
    }

    fn calculate(&self, items_ordered: i64) -> OptimizationResult {
        if items_ordered <= 0 || self.sizes.is_empty() {
            return OptimizationResult::empty();
        }
        let items = items_ordered as u64;

        let Some(first) = self.solve(items) else {
            return OptimizationResult::empty();
        };

        let mut packs_used = Vec::with_capacity(first.pack_count as usize);
        let mut remaining = items;
        let mut step = Some(first);
        while let Some(choice) = step {
            packs_used.push(choice.pack);
            if choice.pack >= remaining {
                break;
            }
            remaining -= choice.pack;
            step = self.lookup(remaining);
        }

        OptimizationResult {
            packs_used,
            total_items: first.total_items,
            total_packs: first.pack_count,
        }
    }
}

/// Outcome of the snapshot reload that follows a successful size change.
#[derive(Debug)]
pub enum Reload {
    Fresh,
    /// The change was stored but calculations keep using the previous sizes.
    Stale(RegistryError),
}

pub struct PackOptimizer {
    registry: SizeRegistry,
    plan: RwLock<Arc<Plan>>,
    /// Serializes size changes together with the reload that follows them.
    admin: Mutex<()>,
}

impl PackOptimizer {
    /// Build an optimizer and load its first snapshot. A failed load is
    /// logged and leaves the optimizer with no sizes.
    pub fn new(registry: SizeRegistry) -> Self {
        let optimizer = Self {
            registry,
            plan: RwLock::new(Arc::new(Plan::default())),
            admin: Mutex::new(()),
        };
        if let Err(err) = optimizer.load() {
            tracing::warn!(error = %err, "failed to load pack sizes, starting empty");
        }
        optimizer
    }

    /// Replace the snapshot (and its memo) with the registry's current sizes.
    /// On failure the previous plan stays in place. Callers other than `new`
    /// must hold `admin`.
    fn load(&self) -> Result<(), RegistryError> {
        let plan = Arc::new(Plan::new(self.registry.sizes()?));
        tracing::info!(sizes = ?plan.sizes, "loaded pack size snapshot");

        let mut current = self.plan.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = plan;
        Ok(())
    }

    fn current_plan(&self) -> Arc<Plan> {
        self.plan
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn calculate(&self, items_ordered: i64) -> OptimizationResult {
        let result = self.current_plan().calculate(items_ordered);
        tracing::debug!(
            items_ordered,
            total_items = result.total_items,
            total_packs = result.total_packs,
            "calculated packs"
        );
        result
    }

    pub fn sizes(&self) -> Result<Vec<PackSize>, RegistryError> {
        self.registry.sizes()
    }

    /// Sizes the next calculation will use, descending.
    pub fn snapshot(&self) -> Vec<PackSize> {
        self.current_plan().sizes.clone()
    }

    pub fn add_size(&self, size: PackSize) -> Result<Reload, RegistryError> {
        let _guard = self.admin.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.registry.add(size)?;
        tracing::info!(size, "pack size added");
        Ok(self.reload())
    }

    pub fn remove_size(&self, size: PackSize) -> Result<Reload, RegistryError> {
        let _guard = self.admin.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.registry.remove(size)?;
        tracing::info!(size, "pack size removed");
        Ok(self.reload())
    }

    fn reload(&self) -> Reload {
        match self.load() {
            Ok(()) => Reload::Fresh,
            Err(err) => {
                tracing::warn!(error = %err, "failed to reload pack sizes, keeping previous snapshot");
                Reload::Stale(err)
            }
        }
    }
}
