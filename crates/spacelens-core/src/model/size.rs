/// Byte sizes: how a file's size is measured, and how it is formatted.
///
/// All internal sizes are `u64` bytes. Floating point is only used
/// at the display-formatting boundary.
use serde::Deserialize;
use std::fs::Metadata;

/// Which size of a file is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMetric {
    /// Logical length as reported by `stat`.
    #[default]
    Logical,
    /// Space allocated on disk. Falls back to the logical length on
    /// platforms that do not report allocation.
    Allocated,
}

impl SizeMetric {
    /// Measure a single non-directory entry.
    pub fn measure(self, meta: &Metadata) -> u64 {
        match self {
            Self::Logical => meta.len(),
            Self::Allocated => allocated_size(meta).unwrap_or_else(|| meta.len()),
        }
    }
}

#[cfg(unix)]
fn allocated_size(meta: &Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    // st_blocks is always counted in 512-byte units.
    Some(meta.blocks().saturating_mul(512))
}

#[cfg(not(unix))]
fn allocated_size(_meta: &Metadata) -> Option<u64> {
    None
}

/// Format a byte count into a human-readable string with appropriate unit.
///
/// Uses binary units (KiB = 1024) but labels them with common short forms
/// (KB, MB, GB, TB) because that is what users expect in a disk tool.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [(&str, usize); 4] = [("KB", 1), ("MB", 1), ("GB", 2), ("TB", 2)];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let (label, precision) = UNITS[unit];
    format!("{value:.precision$} {label}")
}

/// Format a count with thousand separators.
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Share of `part` in `whole` as a percentage (0.0–100.0).
pub fn percent_of(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 100.0) as f32
    }
}
