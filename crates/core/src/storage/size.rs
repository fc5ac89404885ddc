//! Human-readable size labels.

const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;

/// Format a byte count as `"<n> B"`, `"X.Y KB"`, `"X.Y MB"` or `"X.Y GB"`.
///
/// Fractional units carry one decimal, rounded half-up. The value is computed
/// in tenths with integer math.
#[must_use]
pub fn format_size(size: u64) -> String {
    let (unit, suffix) = match size {
        s if s < KIB => return format!("{s} B"),
        s if s < MIB => (KIB, "KB"),
        s if s < GIB => (MIB, "MB"),
        _ => (GIB, "GB"),
    };

    let unit = u128::from(unit);
    let tenths = (u128::from(size) * 10 + unit / 2) / unit;
    format!("{}.{} {suffix}", tenths / 10, tenths % 10)
}
