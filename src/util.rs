use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn format_amount(amount: f64) -> String {
    const UNITS: [&str; 4] = ["", "K", "M", "B"];

    if !amount.is_finite() {
        return "$0".to_owned();
    }

    let mut value = amount.abs();
    let mut unit = 0usize;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    if unit == 0 {
        format!("{sign}${value:.0}")
    } else {
        format!("{sign}${value:.2}{}", UNITS[unit])
    }
}

/// Deterministic pair in `[-1, 1]` derived from a key's hash.
pub fn stable_pair<T: Hash + ?Sized>(key: &T) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}
