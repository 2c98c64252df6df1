//! Data-ready interrupt handoff
//!
//! The GPIO interrupt handler calls [`DataReadySignal::notify`]; the driver
//! consumes the edges from its service loop with [`DataReadySignal::take`].
//! The handler side never touches driver state.
//!
//! The edge count and the timestamp of the latest edge are updated and read
//! together inside a critical section, so a `take` never pairs the edges it
//! consumed with the time of a later one. The firmware supplies the
//! `critical-section` implementation (the HAL or a single-core cortex-m one).

use core::cell::Cell;
use core::fmt;
use critical_section::Mutex;

/// Edges observed since the last [`DataReadySignal::take`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataReady {
    /// Number of rising edges (1 unless the consumer fell behind)
    pub edges: u32,
    /// Timestamp of the most recent edge (ms)
    pub time_ms: u32,
}

const NO_EDGES: DataReady = DataReady {
    edges: 0,
    time_ms: 0,
};

/// Interrupt-to-driver data-ready flag
pub struct DataReadySignal {
    pending: Mutex<Cell<DataReady>>,
}

impl DataReadySignal {
    /// Create a signal with no pending edges, usable in a `static`
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(NO_EDGES)),
        }
    }

    /// Record one edge at `now_ms` (interrupt context)
    pub fn notify(&self, now_ms: u32) {
        critical_section::with(|cs| {
            let pending = self.pending.borrow(cs);
            let edges = pending.get().edges.saturating_add(1);
            pending.set(DataReady {
                edges,
                time_ms: now_ms,
            });
        });
    }

    /// Consume all pending edges
    pub fn take(&self) -> Option<DataReady> {
        let ready = critical_section::with(|cs| self.pending.borrow(cs).replace(NO_EDGES));
        (ready.edges != 0).then_some(ready)
    }

    /// Edges are waiting to be consumed
    pub fn is_pending(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).get().edges != 0)
    }

    /// Discard pending edges
    pub fn clear(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(NO_EDGES));
    }
}

impl Default for DataReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataReadySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataReadySignal")
            .field("pending", &self.is_pending())
            .finish()
    }
}
