//! The power network service.
//!
//! [`PowerNetwork`] owns the node arena, the registry, the connectivity
//! engine, the broadcast barrier and the event bus. It is created once by
//! the host and passed to whatever needs it; every mutation goes through
//! `&mut self` and runs to completion before events are delivered.

use gridwork_core::event::{
    Event, EventBus, EventFilter, EventKind, Listener, SubscriberPriority,
};
use gridwork_core::fixed::Fixed64;
use gridwork_core::id::{Generation, ModifierId, NodeId, SubscriptionId};
use slotmap::SlotMap;
use tracing::{debug, warn};

use crate::barrier::{BarrierState, BroadcastBarrier, BroadcastTicket, ReportOutcome};
use crate::connectivity::{ConnectivityEngine, ConnectivityReport};
use crate::edge::Edge;
use crate::modifier::Modifier;
use crate::node::{Neighbors, NodeSpec, PowerNode};
use crate::registry::NodeRegistry;

/// Initial buffer capacity per event kind; buffers grow past it.
const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct PowerNetwork {
    nodes: SlotMap<NodeId, PowerNode>,
    registry: NodeRegistry,
    engine: ConnectivityEngine,
    barrier: BroadcastBarrier,
    events: EventBus,
}

impl Default for PowerNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerNetwork {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            registry: NodeRegistry::new(),
            engine: ConnectivityEngine::new(),
            barrier: BroadcastBarrier::new(),
            events: EventBus::new(capacity),
        }
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Create a node from `spec` and register it.
    ///
    /// If a modifier has been broadcast the node adopts it straight away.
    /// A dynamic node spawned mid-broadcast counts as already settled: it
    /// was not part of the count the broadcast is waiting on.
    pub fn spawn_node(&mut self, spec: NodeSpec) -> NodeId {
        let mut node = PowerNode::new(spec);
        if let Some(modifier) = self.barrier.current() {
            node.apply_modifier(modifier);
            node.mark_settled(self.barrier.generation());
        }
        let id = self.nodes.insert(node);
        self.registry.register(id);
        debug!(node = ?id, "node spawned");

        self.events.emit(Event::NodeSpawned { node: id });
        self.events.deliver();
        id
    }

    /// Destroy a node: drop its links on both ends, unregister it, drop
    /// subscriptions it owns, and recompute. Returns `false` if unknown.
    pub fn despawn_node(&mut self, id: NodeId) -> bool {
        let Some(mut node) = self.nodes.remove(id) else {
            return false;
        };

        for other in node.take_neighbors() {
            if let Some(neighbor) = self.nodes.get_mut(other) {
                neighbor.unlink(id);
            }
            self.events.emit(Event::ConnectivityChanged {
                a: id,
                b: other,
                connected: false,
            });
        }

        if node.is_dynamic()
            && self.barrier.state() == BarrierState::Broadcasting
            && node.settled_generation() != Some(self.barrier.generation())
        {
            warn!(
                node = ?id,
                generation = %self.barrier.generation(),
                "despawned dynamic node before it reported; broadcast may never settle"
            );
        }

        self.registry.unregister(id);
        let dropped = self.events.unsubscribe_owner(id);
        if self.engine.root() == Some(id) {
            self.engine.set_root(None);
        }
        debug!(node = ?id, dropped_subscriptions = dropped, "node despawned");

        self.events.emit(Event::NodeDespawned { node: id });
        self.recompute_inner();
        self.events.deliver();
        true
    }

    /// Add a live node back into the registry. Returns whether membership
    /// changed.
    ///
    /// The node catches up on the latest broadcast it missed while out of
    /// the registry. Dynamic nodes count as settled on it, the same as a
    /// freshly spawned node.
    pub fn register(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(id) || !self.registry.register(id) {
            return false;
        }
        let generation = self.barrier.generation();
        if let Some(modifier) = self.barrier.current()
            && let Some(node) = self.nodes.get_mut(id)
            && node.settled_generation() != Some(generation)
        {
            node.apply_modifier(modifier);
            node.mark_settled(generation);
        }
        self.recompute_inner();
        self.events.deliver();
        true
    }

    /// Take a node out of connectivity and broadcasts without destroying
    /// it. Returns whether membership changed.
    pub fn unregister(&mut self, id: NodeId) -> bool {
        if !self.registry.unregister(id) {
            return false;
        }
        if let Some(node) = self.nodes.get(id)
            && node.is_dynamic()
            && self.barrier.in_flight().is_some()
            && node.settled_generation() != Some(self.barrier.generation())
        {
            warn!(
                node = ?id,
                generation = %self.barrier.generation(),
                "unregistered dynamic node before it reported; broadcast may never settle"
            );
        }
        if let Some(node) = self.nodes.get_mut(id)
            && node.powered()
        {
            node.set_powered(false);
            self.events.emit(Event::PoweredChanged {
                node: id,
                powered: false,
            });
        }
        self.recompute_inner();
        self.events.deliver();
        true
    }

    pub fn node(&self, id: NodeId) -> Option<&PowerNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PowerNode)> + '_ {
        self.nodes.iter()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// First node with the given name, in arena order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name() == name)
            .map(|(id, _)| id)
    }

    /// Registered dynamic nodes. Their count is what a broadcast waits on.
    pub fn dynamic_nodes(&self) -> Vec<NodeId> {
        self.registry
            .iter()
            .filter(|id| self.nodes.get(*id).is_some_and(PowerNode::is_dynamic))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// Link `a` and `b`. Returns `false` (and changes nothing) for unknown
    /// nodes, self-links, and links that already exist.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || !self.nodes.contains_key(a) || !self.nodes.contains_key(b) {
            return false;
        }
        let linked = match self.nodes.get_mut(a) {
            Some(node) => node.link(b),
            None => false,
        };
        if !linked {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(b) {
            node.link(a);
        }
        debug!(a = ?a, b = ?b, "link added");

        self.events.emit(Event::ConnectivityChanged {
            a,
            b,
            connected: true,
        });
        self.recompute_inner();
        self.events.deliver();
        true
    }

    /// Remove the link between `a` and `b` from both ends. Returns `false`
    /// if there was none.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let removed = match self.nodes.get_mut(a) {
            Some(node) => node.unlink(b),
            None => false,
        };
        let removed_back = match self.nodes.get_mut(b) {
            Some(node) => node.unlink(a),
            None => false,
        };
        if !removed && !removed_back {
            return false;
        }
        debug!(a = ?a, b = ?b, "link removed");

        self.events.emit(Event::ConnectivityChanged {
            a,
            b,
            connected: false,
        });
        self.recompute_inner();
        self.events.deliver();
        true
    }

    pub fn connected(&self, a: NodeId, b: NodeId) -> bool {
        self.nodes.contains_key(b) && self.nodes.get(a).is_some_and(|n| n.is_linked_to(b))
    }

    /// Live neighbors of `id`. Empty for unknown nodes.
    pub fn neighbors(&self, id: NodeId) -> Neighbors<'_> {
        match self.nodes.get(id) {
            Some(node) => Neighbors::new(node, &self.nodes),
            None => Neighbors::empty(&self.nodes),
        }
    }

    /// Snapshot of every link, each pair once, sorted.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .nodes
            .iter()
            .flat_map(|(id, node)| {
                Neighbors::new(node, &self.nodes)
                    .filter(move |other| id < *other)
                    .filter_map(move |other| Edge::new(id, other))
            })
            .collect();
        edges.sort();
        edges
    }

    // -----------------------------------------------------------------------
    // Connectivity
    // -----------------------------------------------------------------------

    pub fn root(&self) -> Option<NodeId> {
        self.engine.root()
    }

    /// Designate the consumer root and recompute.
    pub fn set_root(&mut self, root: Option<NodeId>) -> ConnectivityReport {
        self.engine.set_root(root);
        let report = self.recompute_inner();
        self.events.deliver();
        report
    }

    /// Recompute reachability and total production on demand.
    pub fn recompute(&mut self) -> ConnectivityReport {
        let report = self.recompute_inner();
        self.events.deliver();
        report
    }

    /// Sum of production over the powered set. Only guaranteed to reflect
    /// the latest modifier once the barrier is Ready.
    pub fn total_production(&self) -> Fixed64 {
        self.engine.total_production()
    }

    pub fn is_powered(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(PowerNode::powered)
    }

    pub fn powered_nodes(&self) -> Vec<NodeId> {
        self.engine.powered().to_vec()
    }

    fn recompute_inner(&mut self) -> ConnectivityReport {
        let report = self.engine.recompute(&mut self.nodes, &self.registry);
        for node in &report.newly_powered {
            self.events.emit(Event::PoweredChanged {
                node: *node,
                powered: true,
            });
        }
        for node in &report.newly_unpowered {
            self.events.emit(Event::PoweredChanged {
                node: *node,
                powered: false,
            });
        }
        self.events.emit(Event::NetworkRecomputed {
            total_production: report.total_production,
            powered_nodes: report.powered_nodes,
        });
        report
    }

    // -----------------------------------------------------------------------
    // Modifiers
    // -----------------------------------------------------------------------

    /// Apply `modifier` to a single node. Returns `false` if unknown.
    pub fn apply_modifier_to(&mut self, id: NodeId, modifier: &Modifier) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.apply_modifier(modifier);
        self.engine.refresh_total(&self.nodes);
        true
    }

    /// Reset a single node to neutral coefficients. Returns `false` if unknown.
    pub fn clear_modifier_on(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        node.clear_modifier();
        self.engine.refresh_total(&self.nodes);
        true
    }

    /// Broadcast `modifier` network-wide, waiting on `dynamic_nodes` reports.
    ///
    /// Every registered static node takes the modifier before this returns.
    /// Dynamic nodes pick it up on their next
    /// [`update_dynamic`](Self::update_dynamic). With `dynamic_nodes == 0`
    /// Ready fires before this returns.
    pub fn start_broadcast(&mut self, modifier: Modifier, dynamic_nodes: u32) -> BroadcastTicket {
        let generation = self.barrier.generation().next();
        for id in self.registry.all() {
            if let Some(node) = self.nodes.get_mut(id)
                && !node.is_dynamic()
            {
                node.apply_modifier(&modifier);
                node.mark_settled(generation);
            }
        }
        self.engine.refresh_total(&self.nodes);

        let modifier_id = modifier.id;
        let ticket = self.barrier.start(modifier, dynamic_nodes);
        debug_assert_eq!(ticket.generation, generation);
        if let Some(superseded) = ticket.superseded {
            self.events.emit(Event::BroadcastSuperseded {
                generation: superseded.generation,
                outstanding: superseded.outstanding,
            });
        }
        self.events.emit(Event::BroadcastStarted {
            generation: ticket.generation,
            modifier: modifier_id,
            pending: ticket.pending,
        });
        if ticket.ready {
            self.emit_ready();
        }
        self.events.deliver();
        ticket
    }

    /// [`start_broadcast`](Self::start_broadcast) with the count taken from
    /// the registered dynamic nodes.
    pub fn broadcast_modifier(&mut self, modifier: Modifier) -> BroadcastTicket {
        let count = u32::try_from(self.dynamic_nodes().len()).unwrap_or(u32::MAX);
        self.start_broadcast(modifier, count)
    }

    /// Network-wide reset: broadcast the neutral modifier.
    pub fn clear_modifier(&mut self, dynamic_nodes: u32) -> BroadcastTicket {
        self.start_broadcast(Modifier::neutral(), dynamic_nodes)
    }

    /// [`clear_modifier`](Self::clear_modifier) with the count taken from
    /// the registered dynamic nodes.
    pub fn broadcast_clear(&mut self) -> BroadcastTicket {
        self.broadcast_modifier(Modifier::neutral())
    }

    /// Record a completion report from a dynamic node driven outside
    /// [`update_dynamic`](Self::update_dynamic).
    pub fn report_complete(&mut self, generation: Generation) -> ReportOutcome {
        let outcome = self.report_inner(generation);
        self.events.deliver();
        outcome
    }

    /// Drive one update cycle of a dynamic node.
    ///
    /// If the node has not settled on the latest broadcast it applies the
    /// modifier first, then recomputes with `env_multiplier`. While that
    /// broadcast is still waiting on reports, settling also counts as a
    /// report; once it is Ready, extra nodes still adopt the modifier but
    /// report nothing. Returns the report outcome when a report was made;
    /// `None` for unknown, static, or unregistered nodes and for plain
    /// recomputes.
    pub fn update_dynamic(&mut self, id: NodeId, env_multiplier: Fixed64) -> Option<ReportOutcome> {
        let registered = self.registry.contains(id);
        let generation = self.barrier.generation();
        let waiting = self.barrier.in_flight().is_some();
        let node = self.nodes.get_mut(id)?;
        if !node.is_dynamic() {
            return None;
        }

        let mut report = false;
        if registered
            && node.settled_generation() != Some(generation)
            && let Some(modifier) = self.barrier.current()
        {
            node.apply_modifier(modifier);
            node.mark_settled(generation);
            report = waiting;
        }
        node.recompute_with_environment(env_multiplier);
        self.engine.refresh_total(&self.nodes);

        let outcome = report.then(|| self.report_inner(generation));
        self.events.deliver();
        outcome
    }

    pub fn barrier(&self) -> &BroadcastBarrier {
        &self.barrier
    }

    fn report_inner(&mut self, generation: Generation) -> ReportOutcome {
        let outcome = self.barrier.report_complete(generation);
        if outcome == ReportOutcome::Ready {
            self.emit_ready();
        }
        outcome
    }

    fn emit_ready(&mut self) {
        let total_production = self.engine.refresh_total(&self.nodes);
        self.events.emit(Event::BroadcastReady {
            generation: self.barrier.generation(),
            modifier: self
                .barrier
                .current_modifier_id()
                .unwrap_or(ModifierId::NEUTRAL),
            total_production,
        });
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self, kind: EventKind, listener: Listener) -> SubscriptionId {
        self.events.subscribe(kind, listener)
    }

    /// Subscribe on behalf of `owner`; the subscription is dropped when the
    /// owner is despawned. Returns `None` if `owner` is not live.
    pub fn subscribe_owned(
        &mut self,
        owner: NodeId,
        kind: EventKind,
        listener: Listener,
    ) -> Option<SubscriptionId> {
        if !self.nodes.contains_key(owner) {
            return None;
        }
        Some(self.events.subscribe_owned(owner, kind, listener))
    }

    /// Subscribe with an explicit priority and an optional filter. Within a
    /// kind, `Pre` listeners run before `Normal` ones and `Post` run last.
    pub fn subscribe_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) -> SubscriptionId {
        self.events.subscribe_filtered(kind, priority, filter, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Direct access to the bus for suppression and buffer inspection.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }
}

// ===========================================================================
// Tests
// ===========================================================================
