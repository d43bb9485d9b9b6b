use serde::Serialize;

/// Number of items shipped in one pack.
pub type PackSize = u64;

/// Sizes seeded into an empty registry on first start.
pub const DEFAULT_PACK_SIZES: [PackSize; 5] = [250, 500, 1000, 2000, 5000];

/// Largest order the HTTP layer accepts. The memo holds one entry per
/// remaining count reached, so work and memory grow with the order size.
pub const MAX_ITEMS_ORDERED: i64 = 1_000_000;

/// The answer to an order: which packs to ship and how much that ships.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationResult {
    /// Chosen packs in selection order, largest decision first.
    #[serde(rename = "packs")]
    pub packs_used: Vec<PackSize>,
    pub total_items: u64,
    pub total_packs: u64,
}

impl OptimizationResult {
    /// The defined answer for a non-positive order or an empty size set.
    pub fn empty() -> Self {
        Self::default()
    }
}
