//! Integer percentage helpers shared by the read and transform phases

/// `round(100 * done / total)` with halves rounded up, capped at 100.
///
/// An empty workload is already complete.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = done.min(total) as u128;
    let total = total as u128;
    ((200 * done + total) / (2 * total)) as u8
}
