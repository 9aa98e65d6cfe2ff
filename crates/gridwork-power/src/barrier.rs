//! Generation-tagged fan-out/fan-in barrier for modifier broadcasts.
//!
//! A broadcast applies a modifier to every static node immediately and then
//! waits for a known number of dynamic nodes to report that they have
//! applied it too. Once the last report arrives the barrier becomes
//! [`BarrierState::Ready`], which is the only point at which total
//! production is guaranteed to reflect the new modifier.
//!
//! # Generations
//!
//! Each broadcast carries a fresh [`Generation`]. Reports quote the
//! generation they answer; reports for a superseded broadcast are ignored
//! so they can never drain the counter of a newer one.
//!
//! # Limitations
//!
//! There is no timeout. A dynamic node that never reports leaves the
//! barrier in [`BarrierState::Broadcasting`] until the next broadcast
//! supersedes it, which is logged.

use gridwork_core::id::{Generation, ModifierId};
use tracing::{debug, info, warn};

use crate::modifier::Modifier;

/// Lifecycle of the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierState {
    /// No broadcast has been started yet.
    Idle,
    /// Waiting on `pending` dynamic nodes.
    Broadcasting,
    /// The latest broadcast has settled; Ready has fired for it.
    Ready,
}

/// A broadcast replaced while it was still waiting on reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superseded {
    pub generation: Generation,
    pub outstanding: u32,
}

/// Returned by [`BroadcastBarrier::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastTicket {
    pub generation: Generation,
    /// Reports still expected. Zero means Ready already fired.
    pub pending: u32,
    /// Ready fired inside the start call (no dynamic nodes to wait for).
    pub ready: bool,
    pub superseded: Option<Superseded>,
}

/// Result of a single completion report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Counted; more reports are still outstanding.
    Counted { remaining: u32 },
    /// This report was the last one; Ready fired.
    Ready,
    /// The report quoted an older (or unknown) generation and was ignored.
    Stale,
    /// The current broadcast has already settled; nothing changed.
    AlreadySettled,
}

/// Countdown barrier coordinating modifier settlement across nodes.
#[derive(Debug, Clone)]
pub struct BroadcastBarrier {
    generation: Generation,
    pending: u32,
    state: BarrierState,
    /// Modifier of the latest broadcast. Kept after settling so late
    /// joiners can adopt it.
    current: Option<Modifier>,
}

impl Default for BroadcastBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastBarrier {
    pub fn new() -> Self {
        Self {
            generation: Generation::default(),
            pending: 0,
            state: BarrierState::Idle,
            current: None,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn state(&self) -> BarrierState {
        self.state
    }

    /// `true` unless a broadcast is still waiting on reports.
    pub fn is_settled(&self) -> bool {
        self.state != BarrierState::Broadcasting
    }

    /// The modifier of the latest broadcast, settled or not.
    pub fn current(&self) -> Option<&Modifier> {
        self.current.as_ref()
    }

    /// The modifier still waiting on reports, if any.
    pub fn in_flight(&self) -> Option<&Modifier> {
        match self.state {
            BarrierState::Broadcasting => self.current.as_ref(),
            _ => None,
        }
    }

    /// Begin a broadcast expecting `dynamic_nodes` reports.
    ///
    /// Applying the modifier to static nodes is the caller's job; the
    /// barrier only tracks settlement. With zero dynamic nodes the returned
    /// ticket is already Ready.
    pub fn start(&mut self, modifier: Modifier, dynamic_nodes: u32) -> BroadcastTicket {
        let superseded = if self.state == BarrierState::Broadcasting {
            warn!(
                generation = %self.generation,
                outstanding = self.pending,
                "superseding a broadcast that never settled"
            );
            Some(Superseded {
                generation: self.generation,
                outstanding: self.pending,
            })
        } else {
            None
        };

        self.generation = self.generation.next();
        self.pending = dynamic_nodes;
        debug!(
            generation = %self.generation,
            modifier = modifier.id.0,
            pending = dynamic_nodes,
            "broadcast started"
        );
        self.current = Some(modifier);

        let ready = dynamic_nodes == 0;
        if ready {
            self.settle();
        } else {
            self.state = BarrierState::Broadcasting;
        }

        BroadcastTicket {
            generation: self.generation,
            pending: self.pending,
            ready,
            superseded,
        }
    }

    /// Record one dynamic node's completion for `generation`.
    pub fn report_complete(&mut self, generation: Generation) -> ReportOutcome {
        if generation != self.generation {
            warn!(
                reported = %generation,
                current = %self.generation,
                "ignoring stale completion report"
            );
            return ReportOutcome::Stale;
        }
        if self.state != BarrierState::Broadcasting {
            debug!(generation = %generation, "report after settlement ignored");
            return ReportOutcome::AlreadySettled;
        }

        self.pending = self.pending.saturating_sub(1);
        if self.pending == 0 {
            self.settle();
            ReportOutcome::Ready
        } else {
            debug!(generation = %generation, remaining = self.pending, "report counted");
            ReportOutcome::Counted {
                remaining: self.pending,
            }
        }
    }

    /// Id of the latest broadcast's modifier.
    pub fn current_modifier_id(&self) -> Option<ModifierId> {
        self.current.as_ref().map(|m| m.id)
    }

    fn settle(&mut self) {
        self.pending = 0;
        self.state = BarrierState::Ready;
        info!(generation = %self.generation, "broadcast ready");
    }
}

// ===========================================================================
// Tests
// ===========================================================================
