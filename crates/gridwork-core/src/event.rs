//! Typed event system with buffered, per-kind delivery.
//!
//! Network operations emit events into per-kind [`EventBuffer`] queues;
//! the owning service calls [`EventBus::deliver`] once the operation has run
//! to completion, so subscribers never observe a half-updated network.
//!
//! # Subscriptions
//!
//! Every subscription returns a [`SubscriptionId`] that can be passed to
//! [`EventBus::unsubscribe`]. Subscriptions may also be scoped to an owning
//! node via [`EventBus::subscribe_owned`]; [`EventBus::unsubscribe_owner`]
//! drops all of them at once when that node is despawned.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::fixed::Fixed64;
use crate::id::*;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A network event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Membership --
    NodeSpawned {
        node: NodeId,
    },
    NodeDespawned {
        node: NodeId,
    },

    // -- Topology --
    /// A link between `a` and `b` was created (`connected == true`) or
    /// destroyed.
    ConnectivityChanged {
        a: NodeId,
        b: NodeId,
        connected: bool,
    },
    /// A node's powered flag flipped during a recompute.
    PoweredChanged {
        node: NodeId,
        powered: bool,
    },
    /// A connectivity recompute finished.
    NetworkRecomputed {
        total_production: Fixed64,
        powered_nodes: usize,
    },

    // -- Modifier broadcasts --
    BroadcastStarted {
        generation: Generation,
        modifier: ModifierId,
        pending: u32,
    },
    /// A broadcast was replaced before all of its dynamic nodes reported.
    BroadcastSuperseded {
        generation: Generation,
        outstanding: u32,
    },
    /// Every node has settled on the modifier of `generation`.
    BroadcastReady {
        generation: Generation,
        modifier: ModifierId,
        total_production: Fixed64,
    },
}

/// Discriminant tag for event types, used for subscription and suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeSpawned,
    NodeDespawned,
    ConnectivityChanged,
    PoweredChanged,
    NetworkRecomputed,
    BroadcastStarted,
    BroadcastSuperseded,
    BroadcastReady,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 8;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::NodeSpawned { .. } => EventKind::NodeSpawned,
            Event::NodeDespawned { .. } => EventKind::NodeDespawned,
            Event::ConnectivityChanged { .. } => EventKind::ConnectivityChanged,
            Event::PoweredChanged { .. } => EventKind::PoweredChanged,
            Event::NetworkRecomputed { .. } => EventKind::NetworkRecomputed,
            Event::BroadcastStarted { .. } => EventKind::BroadcastStarted,
            Event::BroadcastSuperseded { .. } => EventKind::BroadcastSuperseded,
            Event::BroadcastReady { .. } => EventKind::BroadcastReady,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- per-operation queue
// ---------------------------------------------------------------------------

/// Queue of events emitted by one network operation. Starts with a
/// pre-allocated capacity and grows past it rather than dropping events;
/// it is drained on every [`EventBus::deliver`].
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Event>,
    /// Total events ever written.
    total_written: u64,
}

impl EventBuffer {
    /// Create a buffer with room for `capacity` events before reallocating.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events written since creation.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events in emission order, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Remove and return every buffered event, keeping the allocation.
    pub fn drain(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

/// A listener receives events read-only. It has no access to the network
/// that emitted them, so it cannot re-enter a running operation.
pub type Listener = Box<dyn FnMut(&Event)>;

/// Optional predicate that filters events for a subscriber.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

/// Priority level for event subscribers. Lower priorities run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberPriority {
    Pre = 0,
    Normal = 1,
    Post = 2,
}

struct SubscriberEntry {
    id: SubscriptionId,
    owner: Option<NodeId>,
    listener: Listener,
    priority: SubscriberPriority,
    filter: Option<EventFilter>,
}

impl std::fmt::Debug for SubscriberEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberEntry")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("priority", &self.priority)
            .field(
                "filter",
                &if self.filter.is_some() {
                    "Some(<fn>)"
                } else {
                    "None"
                },
            )
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// The central event bus. Holds one buffer per event kind, subscriber
/// lists, and suppression flags.
pub struct EventBus {
    /// One buffer per event kind, allocated on first emit.
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],

    /// Suppressed event kinds. Suppressed events are never buffered.
    suppressed: [bool; EVENT_KIND_COUNT],

    /// Subscribers indexed by event kind, kept sorted by (priority, id).
    subscribers: [Vec<SubscriberEntry>; EVENT_KIND_COUNT],

    /// Default buffer capacity for new event buffers.
    default_capacity: usize,

    /// Monotonic counter; doubles as the stable tie-breaker for ordering.
    next_subscription: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("subscribers", &self.subscriber_count())
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given default buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            subscribers: Default::default(),
            default_capacity,
            next_subscription: 0,
        }
    }

    /// Suppress an event kind. Buffered events of that kind are discarded.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    /// Re-enable a previously suppressed event kind.
    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Emit an event into its buffer. No-ops if the kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Subscribe a listener with Normal priority and no filter.
    pub fn subscribe(&mut self, kind: EventKind, listener: Listener) -> SubscriptionId {
        self.insert(kind, None, SubscriberPriority::Normal, None, listener)
    }

    /// Subscribe a listener whose lifetime is tied to `owner`. It is removed
    /// by [`unsubscribe_owner`](Self::unsubscribe_owner).
    pub fn subscribe_owned(
        &mut self,
        owner: NodeId,
        kind: EventKind,
        listener: Listener,
    ) -> SubscriptionId {
        self.insert(kind, Some(owner), SubscriberPriority::Normal, None, listener)
    }

    /// Subscribe with explicit priority and optional filter.
    pub fn subscribe_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) -> SubscriptionId {
        self.insert(kind, None, priority, filter, listener)
    }

    fn insert(
        &mut self,
        kind: EventKind,
        owner: Option<NodeId>,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        let list = &mut self.subscribers[kind.index()];
        list.push(SubscriberEntry {
            id,
            owner,
            listener,
            priority,
            filter,
        });
        list.sort_by_key(|entry| (entry.priority, entry.id));
        id
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in &mut self.subscribers {
            if let Some(pos) = list.iter().position(|entry| entry.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Remove every subscription owned by `owner`. Returns how many were removed.
    pub fn unsubscribe_owner(&mut self, owner: NodeId) -> usize {
        let mut removed = 0;
        for list in &mut self.subscribers {
            let before = list.len();
            list.retain(|entry| entry.owner != Some(owner));
            removed += before - list.len();
        }
        removed
    }

    /// Total number of live subscriptions across all kinds.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().map(Vec::len).sum()
    }

    /// Deliver all buffered events to subscribers, then clear the buffers.
    ///
    /// Kinds are delivered in declaration order; within a kind, subscribers
    /// run by `(priority, subscription order)` and see events oldest first.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }

            // Take the events out first so the buffer is free for the next
            // operation regardless of what subscribers do.
            let events = buffer.drain();

            for entry in &mut self.subscribers[idx] {
                for event in &events {
                    if let Some(ref filter) = entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }
        }
    }

    /// Get the event buffer for a specific kind (read-only).
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Count of events currently buffered for a kind.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// Total events ever emitted for a kind.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map(|b| b.total_written())
            .unwrap_or(0)
    }

    /// Clear all buffers. Does not remove subscribers or suppression settings.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
