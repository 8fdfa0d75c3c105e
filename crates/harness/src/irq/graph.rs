//! Signal graph storage.
//!
//! Holds every IRQ node of a session: its name, last value, outgoing propagation edges,
//! and ordered subscriber list. Raising a signal needs mutable access to the whole
//! session (subscribers may raise further signals or schedule timers), so the raise
//! itself lives on [`crate::SimContext::raise`]; this module only latches values and
//! hands out snapshots of who must be notified.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use super::handle::{
    CallbackArg, CallbackId, ExternalIrq, IrqId, IrqValue, SessionId, Subscription,
};
use crate::sim::SimContext;

/// Subscriber callback: receives the session, the raised value, and its argument.
pub type SubscriberFn = dyn Fn(&mut SimContext, IrqValue, &CallbackArg);

/// Who owns a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Allocated by the session.
    Owned,
    /// View of a core signal.
    Core(ExternalIrq),
}

#[derive(Debug)]
struct IrqNode {
    name: String,
    value: IrqValue,
    edges: Vec<IrqId>,
    subscribers: Vec<(CallbackId, CallbackArg)>,
    origin: Origin,
    released: bool,
}

impl IrqNode {
    const fn new(name: String, origin: Origin) -> Self {
        Self {
            name,
            value: 0,
            edges: Vec::new(),
            subscribers: Vec::new(),
            origin,
            released: false,
        }
    }
}

/// Notifications produced by latching a value: subscribers first, then edges.
pub(crate) struct Fanout {
    pub subscribers: Vec<(Rc<SubscriberFn>, CallbackArg)>,
    pub edges: Vec<IrqId>,
}

/// All IRQ nodes of one session.
pub struct SignalGraph {
    session: SessionId,
    nodes: Vec<IrqNode>,
    by_handle: HashMap<ExternalIrq, IrqId>,
    callbacks: Vec<Rc<SubscriberFn>>,
    subscriptions: HashSet<Subscription>,
}

impl fmt::Debug for SignalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalGraph")
            .field("session", &self.session)
            .field("nodes", &self.nodes)
            .field("callbacks", &self.callbacks.len())
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl SignalGraph {
    /// Creates an empty graph issuing ids for `session`.
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            nodes: Vec::new(),
            by_handle: HashMap::new(),
            callbacks: Vec::new(),
            subscriptions: HashSet::new(),
        }
    }

    /// Session whose nodes this graph holds.
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Number of nodes ever created, released ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node was ever created.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn alloc(&mut self, name: &str) -> IrqId {
        let id = IrqId::new(self.session, self.nodes.len());
        self.nodes.push(IrqNode::new(name.to_owned(), Origin::Owned));
        id
    }

    /// Returns the node viewing `handle`, creating it with `name` on first use.
    pub(crate) fn attach(&mut self, handle: ExternalIrq, name: &str) -> IrqId {
        if let Some(&id) = self.by_handle.get(&handle) {
            return id;
        }
        let id = IrqId::new(self.session, self.nodes.len());
        self.nodes.push(IrqNode::new(name.to_owned(), Origin::Core(handle)));
        let _ = self.by_handle.insert(handle, id);
        id
    }

    /// Node viewing the core signal `handle`, if one was attached.
    pub fn lookup(&self, handle: ExternalIrq) -> Option<IrqId> {
        self.by_handle.get(&handle).copied()
    }

    /// Core handle behind `irq`, or `None` for session-owned signals.
    pub fn handle(&self, irq: IrqId) -> Option<ExternalIrq> {
        match self.node(irq).origin {
            Origin::Core(handle) => Some(handle),
            Origin::Owned => None,
        }
    }

    /// Returns `true` if the session allocated `irq` and must release it.
    pub fn is_owned(&self, irq: IrqId) -> bool {
        self.node(irq).origin == Origin::Owned
    }

    /// Returns `true` once an owned signal has been released.
    pub fn is_released(&self, irq: IrqId) -> bool {
        self.node(irq).released
    }

    /// Returns `true` if `irq` was issued by this graph.
    pub fn contains(&self, irq: IrqId) -> bool {
        self.get(irq).is_some()
    }

    /// Display name.
    ///
    /// # Panics
    ///
    /// Panics if `irq` belongs to another session.
    pub fn name(&self, irq: IrqId) -> &str {
        &self.node(irq).name
    }

    /// Display name, or `None` if `irq` belongs to another session.
    pub fn get_name(&self, irq: IrqId) -> Option<&str> {
        self.get(irq).map(|node| node.name.as_str())
    }

    /// Renames a signal.
    pub fn set_name(&mut self, irq: IrqId, name: &str) {
        name.clone_into(&mut self.node_mut(irq).name);
    }

    /// First live signal called `name`.
    pub fn find(&self, name: &str) -> Option<IrqId> {
        self.nodes
            .iter()
            .position(|n| !n.released && n.name == name)
            .map(|index| IrqId::new(self.session, index))
    }

    /// Last raised value (0 before the first raise).
    pub fn value(&self, irq: IrqId) -> IrqValue {
        self.node(irq).value
    }

    /// Adds a propagation edge; duplicates propagate twice.
    ///
    /// # Panics
    ///
    /// Panics if either end belongs to another session.
    pub fn connect(&mut self, source: IrqId, destination: IrqId) {
        let _ = self.checked_index(destination);
        self.node_mut(source).edges.push(destination);
    }

    /// Outgoing edges of `irq`, in connection order.
    pub fn edges(&self, irq: IrqId) -> &[IrqId] {
        &self.node(irq).edges
    }

    /// Stores a callback and returns its identity.
    pub fn register_callback(&mut self, callback: Rc<SubscriberFn>) -> CallbackId {
        let id = CallbackId(u32::try_from(self.callbacks.len()).unwrap_or(u32::MAX));
        self.callbacks.push(callback);
        id
    }

    /// Adds a subscriber; returns `false` if the identical triple already exists.
    pub fn subscribe(&mut self, subscription: Subscription) -> bool {
        if self.subscriptions.contains(&subscription) {
            return false;
        }
        self.node_mut(subscription.irq)
            .subscribers
            .push((subscription.callback, subscription.arg.clone()));
        self.subscriptions.insert(subscription)
    }

    /// Returns `true` if the triple is registered.
    pub fn is_subscribed(&self, subscription: &Subscription) -> bool {
        self.subscriptions.contains(subscription)
    }

    /// Number of subscribers of `irq`.
    pub fn subscriber_count(&self, irq: IrqId) -> usize {
        self.node(irq).subscribers.len()
    }

    /// Stores `value` and snapshots the subscribers and edges to notify.
    ///
    /// # Panics
    ///
    /// Panics if `irq` was released or belongs to another session.
    pub(crate) fn latch(&mut self, irq: IrqId, value: IrqValue) -> Fanout {
        let index = self.checked_index(irq);
        let node = &mut self.nodes[index];
        assert!(!node.released, "raise on released irq '{}'", node.name);
        node.value = value;
        let subscribers = node
            .subscribers
            .iter()
            .map(|(cb, arg)| (Rc::clone(&self.callbacks[cb.0 as usize]), arg.clone()))
            .collect();
        Fanout {
            subscribers,
            edges: node.edges.clone(),
        }
    }

    /// Detaches an owned node from the graph.
    pub(crate) fn release(&mut self, irq: IrqId) {
        let node = self.node_mut(irq);
        node.released = true;
        node.edges.clear();
        node.subscribers.clear();
        self.subscriptions.retain(|s| s.irq != irq);
        for other in &mut self.nodes {
            other.edges.retain(|&dst| dst != irq);
        }
    }

    fn get(&self, irq: IrqId) -> Option<&IrqNode> {
        if irq.session() == self.session {
            self.nodes.get(irq.index())
        } else {
            None
        }
    }

    fn checked_index(&self, irq: IrqId) -> usize {
        assert!(self.contains(irq), "{irq} belongs to another session");
        irq.index()
    }

    fn node(&self, irq: IrqId) -> &IrqNode {
        &self.nodes[self.checked_index(irq)]
    }

    fn node_mut(&mut self, irq: IrqId) -> &mut IrqNode {
        let index = self.checked_index(irq);
        &mut self.nodes[index]
    }
}
