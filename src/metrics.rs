//! Pure derivations from raw counters: throughput, folder completion and the
//! status classifications the console shows next to folders and nodes.

use crate::rest::{FolderModel, RawConnection};

/// Bits per second between two cumulative byte counters.
///
/// Missing previous samples, counter resets (`prev > curr`) and a zero,
/// negative or non-finite interval all yield `0.0`.
pub fn rate(prev_total: Option<u64>, curr_total: u64, elapsed_secs: f64) -> f64 {
    let Some(prev_total) = prev_total else {
        return 0.0;
    };
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 || prev_total > curr_total {
        return 0.0;
    }
    let bits = 8.0 * (curr_total - prev_total) as f64;
    (bits / elapsed_secs).max(0.0)
}

/// Whole-percent completion of a folder. Unknown folders and folders with no
/// global data count as fully synced.
pub fn sync_percentage(model: Option<&FolderModel>) -> u8 {
    let Some(model) = model else {
        return 100;
    };
    if model.global_bytes == 0 {
        return 100;
    }
    let pct = (100u128 * model.in_sync_bytes as u128) / model.global_bytes as u128;
    pct.min(100) as u8
}

/// Number of decimals needed to show at least `min_significant` significant
/// digits of `value`.
pub fn significant_decimals(value: f64, min_significant: i32) -> usize {
    if value == 0.0 || !value.is_finite() {
        return 0;
    }
    let digits = value.abs().log10().floor() as i32;
    (min_significant - digits).max(0) as usize
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderStatus {
    /// No model has been received for the folder yet.
    Unknown,
    /// The daemon reports the folder as invalid.
    Stopped(String),
    Idle(u8),
    Syncing(u8),
    Other(String),
}

pub fn folder_status(model: Option<&FolderModel>) -> FolderStatus {
    let Some(model) = model else {
        return FolderStatus::Unknown;
    };
    if !model.invalid.is_empty() {
        return FolderStatus::Stopped(model.invalid.clone());
    }
    let pct = sync_percentage(Some(model));
    if model.state.eq_ignore_ascii_case("idle") {
        return FolderStatus::Idle(pct);
    }
    if model.state.eq_ignore_ascii_case("syncing") {
        return FolderStatus::Syncing(pct);
    }
    FolderStatus::Other(model.state.clone())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeStatus {
    Disconnected,
    UpToDate,
    Syncing(f64),
}

pub fn node_status(connection: Option<&RawConnection>) -> NodeStatus {
    match connection {
        None => NodeStatus::Disconnected,
        Some(conn) => match conn.completion {
            Some(pct) if pct >= 100.0 => NodeStatus::UpToDate,
            Some(pct) => NodeStatus::Syncing(pct.max(0.0)),
            None => NodeStatus::Syncing(0.0),
        },
    }
}
