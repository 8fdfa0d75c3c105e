//! Signal (IRQ) graph.
//!
//! 1. **Handles:** Typed ids for graph nodes, owned and core-owned signal wrappers,
//!    callback identities and arguments.
//! 2. **Sources:** Addresses the simulation core understands (peripheral, port pin, register bit).
//! 3. **Graph:** Node storage, propagation edges, and deduplicated subscriptions.

/// Signal graph storage.
pub mod graph;

/// Signal and callback handles.
pub mod handle;

/// Core signal addresses.
pub mod source;

pub use graph::{SignalGraph, SubscriberFn};
pub use handle::{
    CallbackArg, CallbackId, CoreIrq, ExternalIrq, IrqId, IrqValue, OwnedIrq, SessionId,
    Subscription,
};
pub use source::IrqSource;

/// Conversion of boolean-like and integer inputs into an [`IrqValue`].
///
/// `true`/`false` become 1/0. Signed integers are reinterpreted as two's complement,
/// so `-1` drives every bit of a multi-bit signal.
pub trait IntoIrqValue {
    /// Converts `self` into a signal value.
    fn into_irq_value(self) -> IrqValue;
}

impl IntoIrqValue for bool {
    fn into_irq_value(self) -> IrqValue {
        IrqValue::from(self)
    }
}

impl IntoIrqValue for u8 {
    fn into_irq_value(self) -> IrqValue {
        IrqValue::from(self)
    }
}

impl IntoIrqValue for u16 {
    fn into_irq_value(self) -> IrqValue {
        IrqValue::from(self)
    }
}

impl IntoIrqValue for u32 {
    fn into_irq_value(self) -> IrqValue {
        self
    }
}

impl IntoIrqValue for i32 {
    #[allow(clippy::cast_sign_loss)]
    fn into_irq_value(self) -> IrqValue {
        self as IrqValue
    }
}
