//! Category → sizing-unit catalog.
//!
//! One process-wide static table; the factor ("43", "1.5", "8,128") only
//! means something next to its category's unit ("inch", "Tonnage", RAM/storage).

/// Unit label per product category. Lookup for an unknown category yields "".
pub const FACTOR_LABELS: &[(&str, &str)] = &[
    ("Home Audio", ""),
    ("Television", "inch"),
    ("Mobiles & Tablets", "RAM and Storage"),
    ("Fans", "MM"),
    ("Coolers", "L"),
    ("Mixer Grinders", "Watt"),
    ("Water Purifiers", "L"),
    ("Vacuum Cleaners", "Watts"),
    ("Air Fryers", "Watts"),
    ("Geysers", "L"),
    ("Irons", "Watt"),
    ("Kettles", "L"),
    ("Sandwich Makers", "Watt"),
    ("Dishwashers", "L"),
    ("Air Conditioners", "Tonnage"),
    ("Microwave Ovens", "L"),
    ("Refrigerators", "L"),
    ("Washing Machine", "Kg"),
    ("Chimneys", "m3/hr"),
];

/// Unit label for a category; unknown categories map to "".
pub fn factor_unit(category: &str) -> &'static str {
    FACTOR_LABELS
        .iter()
        .find(|(cat, _)| *cat == category)
        .map(|(_, unit)| *unit)
        .unwrap_or("")
}

/// Render the factor the way listings spell it.
///
/// "Mobiles & Tablets" carries a compound "ram,storage" factor that renders
/// as "8GB RAM 128GB Storage"; every other category is "{factor} {unit}".
pub fn format_factor(category: &str, factor: &str) -> String {
    if category == "Mobiles & Tablets" {
        if let Some((ram, storage)) = factor.split_once(',') {
            return format!("{}GB RAM {}GB Storage", ram.trim(), storage.trim());
        }
        return factor.to_string();
    }
    format!("{} {}", factor, factor_unit(category))
        .trim()
        .to_string()
}

/// Does a listing title mention the requested factor, either bare or as
/// "value unit"? Case-insensitive.
pub fn title_mentions_factor(title: &str, factor: &str, unit: &str) -> bool {
    if factor.is_empty() {
        return false;
    }
    let title = title.to_lowercase();
    let factor = factor.to_lowercase();
    if title.contains(&factor) {
        return true;
    }
    let with_unit = format!("{} {}", factor, unit.to_lowercase());
    title.contains(with_unit.trim())
}
