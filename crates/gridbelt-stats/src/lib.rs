//! Throughput statistics for the gridbelt engine.
//!
//! Tracks per-item-kind production, consumption, and delivery over a rolling
//! window of per-tick samples. Listens to core events (`ItemProduced`,
//! `ItemConsumed`, `ItemDelivered`) and aggregates them into per-minute
//! rates using [`Fixed64`] arithmetic.
//!
//! # Usage
//!
//! ```ignore
//! let mut stats = ThroughputStats::new(StatsConfig::default());
//! // Feed drained events each tick:
//! for event in engine.drain_events() {
//!     stats.process_event(&event);
//! }
//! // Commit the tick:
//! stats.end_tick();
//! // Query metrics:
//! let rate = stats.production_per_minute(plate);
//! ```

use std::collections::BTreeMap;

use gridbelt_core::event::Event;
use gridbelt_core::fixed::Fixed64;
use gridbelt_core::id::ItemKindId;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Ticks per minute at the nominal tick rate: the default window size and
/// the scale factor for per-minute rates.
pub const TICKS_PER_MINUTE: usize = 600;

/// Configuration for the statistics module.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Window size in ticks for rolling totals. Capped samples: once the
    /// window is full the oldest tick falls out.
    pub window_size: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: TICKS_PER_MINUTE,
        }
    }
}

// ---------------------------------------------------------------------------
// Rolling window counter
// ---------------------------------------------------------------------------

/// A rolling window counter tracking a count over the most recent N ticks.
///
/// Stores per-tick counts in a ring buffer. The `committed_total` field is
/// the sum of all committed ticks in the window; `current` accumulates the
/// in-progress tick (not yet committed).
///
/// # Tick lifecycle
///
/// 1. Call [`add`](Self::add) zero or more times during the tick.
/// 2. Call [`commit`](Self::commit) exactly once at end-of-tick to write the
///    current tick into the ring buffer and prepare for the next tick.
///
/// [`total`](Self::total) includes the committed ticks **plus** any
/// in-progress tick data, so queries are accurate at any point in the tick.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    /// Committed per-tick counts in a ring buffer.
    tick_counts: Vec<u64>,
    /// Write position for the next commit.
    write_pos: usize,
    /// Running total of committed tick counts in the window.
    committed_total: u64,
    /// Accumulator for the current (uncommitted) tick.
    current: u64,
    /// Number of ticks committed so far, saturating at the window size.
    committed_ticks: usize,
}

impl RollingWindow {
    /// Create a window of the given size.
    ///
    /// # Panics
    ///
    /// Panics if `window_size` is zero.
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "RollingWindow size must be > 0");
        Self {
            tick_counts: vec![0; window_size],
            write_pos: 0,
            committed_total: 0,
            current: 0,
            committed_ticks: 0,
        }
    }

    /// Accumulate a count into the current tick.
    pub fn add(&mut self, count: u64) {
        self.current += count;
    }

    /// Commit the current tick into the ring, evicting the oldest sample
    /// once the window is full.
    pub fn commit(&mut self) {
        let evicted = self.tick_counts[self.write_pos];
        self.committed_total = self.committed_total - evicted + self.current;
        self.tick_counts[self.write_pos] = self.current;
        self.write_pos = (self.write_pos + 1) % self.tick_counts.len();
        self.current = 0;
        if self.committed_ticks < self.tick_counts.len() {
            self.committed_ticks += 1;
        }
    }

    /// Total count over the window, including the in-progress tick.
    pub fn total(&self) -> u64 {
        self.committed_total + self.current
    }

    /// Committed samples currently in the window.
    pub fn samples(&self) -> usize {
        self.committed_ticks
    }

    /// Window capacity in ticks.
    pub fn window_size(&self) -> usize {
        self.tick_counts.len()
    }

    /// Per-minute rate: the windowed total scaled from the observed span to
    /// [`TICKS_PER_MINUTE`]. Zero before any tick commits.
    pub fn per_minute(&self) -> Fixed64 {
        if self.committed_ticks == 0 {
            return Fixed64::ZERO;
        }
        // Multiply before dividing: counts are small and the scaled total
        // stays exact where the quotient alone would truncate.
        let total = Fixed64::from_num(self.total());
        let span = Fixed64::from_num(self.committed_ticks as u64);
        total * Fixed64::from_num(TICKS_PER_MINUTE as u64) / span
    }
}

// ---------------------------------------------------------------------------
// ThroughputStats
// ---------------------------------------------------------------------------

/// Per-item-kind rolling metrics fed by core events.
#[derive(Debug)]
pub struct ThroughputStats {
    config: StatsConfig,
    production: BTreeMap<ItemKindId, RollingWindow>,
    consumption: BTreeMap<ItemKindId, RollingWindow>,
    deliveries: BTreeMap<ItemKindId, RollingWindow>,
}

impl ThroughputStats {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            config,
            production: BTreeMap::new(),
            consumption: BTreeMap::new(),
            deliveries: BTreeMap::new(),
        }
    }

    fn window_mut<'a>(
        map: &'a mut BTreeMap<ItemKindId, RollingWindow>,
        config: &StatsConfig,
        kind: ItemKindId,
    ) -> &'a mut RollingWindow {
        map.entry(kind)
            .or_insert_with(|| RollingWindow::new(config.window_size))
    }

    /// Feed one drained core event into the counters.
    pub fn process_event(&mut self, event: &Event) {
        match event {
            Event::ItemProduced { kind, .. } => {
                Self::window_mut(&mut self.production, &self.config, *kind).add(1);
            }
            Event::ItemConsumed { kind, .. } => {
                Self::window_mut(&mut self.consumption, &self.config, *kind).add(1);
            }
            Event::ItemDelivered { kind, .. } => {
                Self::window_mut(&mut self.deliveries, &self.config, *kind).add(1);
            }
            _ => {}
        }
    }

    /// Commit the current tick across all windows. Call exactly once per
    /// engine tick, after feeding that tick's events.
    pub fn end_tick(&mut self) {
        for window in self.production.values_mut() {
            window.commit();
        }
        for window in self.consumption.values_mut() {
            window.commit();
        }
        for window in self.deliveries.values_mut() {
            window.commit();
        }
    }

    /// Windowed production total for an item kind.
    pub fn production_total(&self, kind: ItemKindId) -> u64 {
        self.production.get(&kind).map_or(0, |w| w.total())
    }

    /// Windowed consumption total for an item kind.
    pub fn consumption_total(&self, kind: ItemKindId) -> u64 {
        self.consumption.get(&kind).map_or(0, |w| w.total())
    }

    /// Windowed delivery total for an item kind.
    pub fn delivery_total(&self, kind: ItemKindId) -> u64 {
        self.deliveries.get(&kind).map_or(0, |w| w.total())
    }

    /// Per-minute production rate for an item kind.
    pub fn production_per_minute(&self, kind: ItemKindId) -> Fixed64 {
        self.production
            .get(&kind)
            .map_or(Fixed64::ZERO, |w| w.per_minute())
    }

    /// Per-minute consumption rate for an item kind.
    pub fn consumption_per_minute(&self, kind: ItemKindId) -> Fixed64 {
        self.consumption
            .get(&kind)
            .map_or(Fixed64::ZERO, |w| w.per_minute())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
