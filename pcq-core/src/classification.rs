use std::collections::BTreeMap;

use serde::Serialize;

/// Display name and color for one classification code.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClassEntry {
    pub name: &'static str,
    pub color: &'static str,
}

/// Static classification legend shared by every dataset.
pub const CLASS_LEGEND: &[(u8, ClassEntry)] = &[
    (1, ClassEntry { name: "Unclassified", color: "#9ca3af" }),
    (2, ClassEntry { name: "Ground", color: "#f97316" }),
    (3, ClassEntry { name: "Low Vegetation", color: "#84cc16" }),
    (4, ClassEntry { name: "Medium Vegetation", color: "#22c55e" }),
    (5, ClassEntry { name: "High Vegetation", color: "#166534" }),
    (6, ClassEntry { name: "Building", color: "#1d4ed8" }),
    (7, ClassEntry { name: "Low Point/Noise", color: "#facc15" }),
    (8, ClassEntry { name: "Model Key-point", color: "#f97316" }),
    (9, ClassEntry { name: "Water", color: "#0ea5e9" }),
    (17, ClassEntry { name: "Bridge/Culvert", color: "#f43f5e" }),
];

/// Legend keyed by the stringified code, in the shape written to
/// `products/classes.json`.
pub fn legend() -> BTreeMap<String, ClassEntry> {
    CLASS_LEGEND
        .iter()
        .map(|(code, entry)| (code.to_string(), *entry))
        .collect()
}
