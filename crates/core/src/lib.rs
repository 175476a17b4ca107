//! Core type aliases, identifiers, and constants for the deliberation engine.
//!
//! This crate provides the foundational vocabulary shared across every
//! other crate in the workspace: opaque typed identifiers, the small
//! set of numeric aliases the domain model is built from, and the
//! tuning constants that govern cell sizing, XP budgets, and
//! up-pollination thresholds.
#![allow(dead_code)]

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// XP points a voter allocates, or an idea accumulates, within a cell.
pub type Xp = u32;
/// A tier index; tier 1 partitions all submitted ideas.
pub type TierNo = u32;
/// A cohort index within a tier (cells sharing the same idea-pool slice).
pub type BatchNo = u32;
/// Number of challenge rounds a rolling-mode deliberation has run.
pub type ChallengeRound = u32;
/// Loss count at tier 1, used to bench repeat losers in rolling mode.
pub type Losses = u32;

// ============================================================================
// TRAITS
// ============================================================================
/// Types that expose their own identifier.
pub trait Unique<T = Self> {
    fn id(&self) -> Id<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic, type-tagged identifier wrapping a UUIDv7.
///
/// Two `Id<T>` and `Id<U>` with the same underlying UUID compare equal
/// only when `T == U` at the type level; the phantom marker prevents
/// mixing up, say, a cell ID and an idea ID at compile time even
/// though both are UUIDs underneath. IDs are v7 so they sort by
/// creation time, which `dlb-fingerprint` relies on for audit tags.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Id<T> {
    inner: uuid::Uuid,
    #[serde(skip)]
    marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Reinterprets this ID as belonging to a different marker type.
    /// Used sparingly, e.g. when an idea ID doubles as an audit key.
    pub fn cast<U>(self) -> Id<U> {
        Id {
            inner: self.inner,
            marker: PhantomData,
        }
    }
}

impl<T> From<Id<T>> for uuid::Uuid {
    fn from(id: Id<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for Id<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for Id<T> {}
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for Id<T> {}
impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for Id<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.inner).finish()
    }
}
impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

// ============================================================================
// TOURNAMENT PARAMETERS
// ============================================================================
/// Default number of voters and ideas per cell.
pub const DEFAULT_CELL_SIZE: usize = 5;
/// Default XP budget per voter per cell (cellSize × 2 in typical configs).
pub const DEFAULT_XP_BUDGET: Xp = 10;
/// Repeat-loss threshold at tier 1 before an idea is BENCHED in rolling mode.
pub const BENCH_AFTER_LOSSES: Losses = 2;
/// Fraction of cell size an up-pollination comment must clear, rounded up.
pub const UP_POLLINATION_THRESHOLD_RATIO: f64 = 0.6;
/// Cap on cross-cell comment reads performed by a single up-pollination pass.
pub const UP_POLLINATION_FANOUT_CAP: usize = 20;

// ============================================================================
// SCHEDULER CADENCE
// ============================================================================
/// Interval between Scheduler sweeps.
pub const SCHEDULER_TICK: std::time::Duration = std::time::Duration::from_secs(15);
/// Retry backoff schedule for Transient store errors (spec §7: up to 3 attempts).
pub const TRANSIENT_RETRY_BACKOFF: &[std::time::Duration] = &[
    std::time::Duration::from_millis(100),
    std::time::Duration::from_millis(400),
    std::time::Duration::from_millis(900),
];

/// Ceiling division, used for the up-pollination threshold and cell counts.
pub const fn ceil_div(numerator: usize, denominator: usize) -> usize {
    numerator.div_ceil(denominator)
}

/// Up-pollination upvote threshold for a given cell size, per spec §4.7.
pub fn up_pollination_threshold(cell_size: usize) -> usize {
    ((cell_size as f64) * UP_POLLINATION_THRESHOLD_RATIO).ceil() as usize
}

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initializes dual logging (terminal + timestamped file) under `logs/`.
#[cfg(feature = "server")]
pub fn init_logging() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves forward")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}

/// Registers a Ctrl+C handler that exits immediately, no draining.
#[cfg(feature = "server")]
pub fn install_hard_shutdown() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.unwrap();
        println!();
        log::warn!("interrupt received, exiting immediately");
        std::process::exit(0);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_of_different_markers_do_not_confuse_equality() {
        struct Idea;
        struct Cell;
        let raw = uuid::Uuid::now_v7();
        let a: Id<Idea> = Id::from(raw);
        let b: Id<Cell> = Id::from(raw);
        assert_eq!(a.inner(), b.inner());
    }

    #[test]
    fn up_pollination_threshold_matches_spec_example() {
        assert_eq!(up_pollination_threshold(5), 3);
    }

    #[test]
    fn ceil_div_rounds_up() {
        assert_eq!(ceil_div(10, 5), 2);
        assert_eq!(ceil_div(11, 5), 3);
        assert_eq!(ceil_div(0, 5), 0);
    }

    #[test]
    fn fresh_ids_are_time_ordered() {
        let a: Id<()> = Id::default();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b: Id<()> = Id::default();
        assert!(a < b);
    }
}
