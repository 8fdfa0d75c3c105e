//! Signal and callback handles.
//!
//! Graph nodes are addressed by the plain, copyable [`IrqId`]. Two wrapper types record
//! where a node came from:
//! * [`OwnedIrq`]: allocated by the session; not `Clone`, released by value exactly once.
//! * [`CoreIrq`]: a non-owning view of a signal the simulation core owns.
//!
//! All three carry the [`SessionId`] of the session that produced them.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Value carried by a signal. Digital lines use 0 and 1.
pub type IrqValue = u32;

/// Identity of one simulation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u32);

impl SessionId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A node in one session's signal graph.
///
/// Carries the session it was issued by, so a node of another session never compares
/// equal to one of ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrqId {
    session: SessionId,
    index: u32,
}

impl IrqId {
    pub(crate) fn new(session: SessionId, index: usize) -> Self {
        Self {
            session,
            index: u32::try_from(index).unwrap_or(u32::MAX),
        }
    }

    /// Raw node index within the owning session.
    pub const fn as_raw(self) -> u32 {
        self.index
    }

    /// Session that issued the node.
    pub const fn session(self) -> SessionId {
        self.session
    }

    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for IrqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "irq#{}", self.index)
    }
}

/// Opaque signal handle issued by the simulation core.
///
/// Stable for the lifetime of the core; the harness never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalIrq(pub u64);

/// Signal allocated by the session itself.
///
/// Must be handed back to [`crate::SimContext::release_irq`]; the handle is consumed
/// there, so a signal cannot be released twice.
#[derive(Debug, PartialEq, Eq)]
pub struct OwnedIrq {
    id: IrqId,
}

impl OwnedIrq {
    pub(crate) const fn new(id: IrqId) -> Self {
        Self { id }
    }

    /// Graph node of this signal.
    pub const fn id(&self) -> IrqId {
        self.id
    }

    /// Session that allocated the signal.
    pub const fn session(&self) -> SessionId {
        self.id.session()
    }
}

/// Non-owning reference to a signal owned by the simulation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoreIrq {
    id: IrqId,
    handle: ExternalIrq,
}

impl CoreIrq {
    pub(crate) const fn new(id: IrqId, handle: ExternalIrq) -> Self {
        Self { id, handle }
    }

    /// Graph node of this signal.
    pub const fn id(&self) -> IrqId {
        self.id
    }

    /// Handle the core uses for the signal.
    pub const fn handle(&self) -> ExternalIrq {
        self.handle
    }

    /// Session the view belongs to.
    pub const fn session(&self) -> SessionId {
        self.id.session()
    }
}

impl From<&OwnedIrq> for IrqId {
    fn from(irq: &OwnedIrq) -> Self {
        irq.id
    }
}

impl From<CoreIrq> for IrqId {
    fn from(irq: CoreIrq) -> Self {
        irq.id
    }
}

impl From<&CoreIrq> for IrqId {
    fn from(irq: &CoreIrq) -> Self {
        irq.id
    }
}

/// Identity of a registered subscriber callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub(crate) u32);

/// Opaque argument handed back to a callback on every invocation.
///
/// Part of the subscription identity: the same callback may be subscribed to one
/// signal several times with different arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CallbackArg {
    /// No argument.
    #[default]
    None,
    /// Integer argument.
    Int(i64),
    /// A signal, typically the one being observed.
    Irq(IrqId),
    /// Free-form text.
    Text(String),
}

impl From<i64> for CallbackArg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<IrqId> for CallbackArg {
    fn from(irq: IrqId) -> Self {
        Self::Irq(irq)
    }
}

impl From<&str> for CallbackArg {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for CallbackArg {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Subscription identity: `(signal, callback, argument)` compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    /// Observed signal.
    pub irq: IrqId,
    /// Callback to invoke.
    pub callback: CallbackId,
    /// Argument passed to the callback.
    pub arg: CallbackArg,
}
