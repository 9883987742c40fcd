//! Product shade catalogue used to suggest colour-profile names.

/// Shade family within the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadeKind {
    Single,
    Highlight,
    Rooted,
}

/// A named product shade with a representative swatch colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shade {
    pub name: &'static str,
    pub hex: &'static str,
    pub kind: ShadeKind,
}

const fn shade(name: &'static str, hex: &'static str, kind: ShadeKind) -> Shade {
    Shade { name, hex, kind }
}

use ShadeKind::{Highlight, Rooted, Single};

/// Every shade offered, in display order.
pub const SHADES: &[Shade] = &[
    shade("#1 Jet Black", "#0a0a0a", Single),
    shade("#1B Off Black", "#1c1c1c", Single),
    shade("#1C Expresso Brown", "#3b2f2f", Single),
    shade("#2B Dark Amber", "#4b2e2b", Single),
    shade("#2C Coco loco", "#4e3629", Single),
    shade("#3A Midnight Mocha", "#4a3f35", Single),
    shade("#4B Tosted Caramel", "#a56536", Single),
    shade("#4C Espresso Martini", "#5c3a2e", Single),
    shade("#5 Medium Ash Brown", "#8c756a", Single),
    shade("#5A Chestnut Charm", "#7b4a2e", Single),
    shade("#6 Brown", "#7a4f35", Single),
    shade("#6A Medium Ash", "#9c8f87", Single),
    shade("#8A Butterscotch Bliss", "#d4a96e", Single),
    shade("#10A Honeycomb Haze", "#e3c08b", Single),
    shade("#12 Copper Blonde", "#d78c4b", Single),
    shade("#13A Fudge", "#a86442", Single),
    shade("#14 Dark Blonde", "#c3a56b", Single),
    shade("#16 Beige Blonde", "#d8c5a2", Single),
    shade("#18 Honey Blonde", "#e4cfa3", Single),
    shade("#18A Cool honey Blonde", "#d4c6a1", Single),
    shade("#24 Golden Blonde", "#f0d28a", Single),
    shade("#27 Strawberry Blonde", "#d9895b", Single),
    shade("#30 Light Auburn", "#b35c3b", Single),
    shade("#30A Cranberry Kiss", "#a23f3f", Single),
    shade("#33 Copper Red", "#a43d1f", Single),
    shade("#50 Light Silver Grey", "#cfcfcf", Single),
    shade("#60A Light Platinum Ash Blonde", "#f2f2f2", Single),
    shade("#62 Light Ash Blonde", "#ebdfd1", Single),
    shade("#64 Champagne Blonde", "#edd7b5", Single),
    shade("#98J Mahogany", "#5b1e1e", Single),
    shade("#99J Burgundy", "#6b2333", Single),
    shade("#130 Red Ruby", "#b02020", Single),
    shade("#613L Light Bleach Blonde", "#fff2d6", Single),
    // Highlight
    shade("#4B/27 Tosted Caramel /Strawberry Blonde", "#c4884a", Highlight),
    shade("#4C/27 Espresso Martini/Strawberry Blonde", "#a06a52", Highlight),
    shade("#6/27 Brown / Strawberry Blonde", "#b57a52", Highlight),
    shade("#10A/16 Honeycomb Haze / Beige Blonde", "#e1caa7", Highlight),
    shade("#13A/16 Fudge/Beige Blonde", "#c09b75", Highlight),
    shade("#13A/24 Fudge/Golden blonde", "#d0a86c", Highlight),
    shade("#14/24 Dark Blonde / Golden Blonde", "#d9b67a", Highlight),
    shade("#60A/62 Light Platinum Ash Blonde/Light Ash Blonde", "#f4eee7", Highlight),
    shade("#613L/16 Light Bleach Blonde / Beige Blonde", "#f5e7c7", Highlight),
    shade("#613L/18A Light Bleach Blonde/ Cool honey Blonde", "#f4e3bd", Highlight),
    shade("#613L/27 Light Bleach Blonde / Strawberry Blonde", "#f2d1a3", Highlight),
    // Rooted
    shade("#2BT6 Dark Amber /Brown", "#4c342a", Rooted),
    shade("#2BT8A Dark Amber /Butterscotch Bliss", "#bc8c57", Rooted),
    shade("#2CT5 Coco loco/Medium Ash Brown", "#7b6252", Rooted),
];

/// Shades whose name contains `query`, ignoring case.
///
/// An empty or blank query suggests nothing.
pub fn suggest(query: &str) -> Vec<&'static Shade> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    SHADES
        .iter()
        .filter(|s| s.name.to_lowercase().contains(&needle))
        .collect()
}

/// Exact (case-insensitive) lookup by shade name.
pub fn find(name: &str) -> Option<&'static Shade> {
    let name = name.trim();
    SHADES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}
