//! Canonical forms of natural keys. Every write path in the store runs names
//! through these before touching the database.

/// Item names: first character upper-cased, the rest lower-cased.
pub fn normalize_item_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// DataType names: upper-cased.
pub fn normalize_data_type_name(name: &str) -> String {
    name.to_uppercase()
}
