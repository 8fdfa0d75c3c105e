//! Signal tracing.
//!
//! This module records the values of selected signals over time. It provides:
//! 1. **Sink:** The `TraceSink` trait implemented by output formats.
//! 2. **VCD:** A value-change-dump sink with nanosecond timestamps.
//! 3. **Recorder:** `Trace`, a passive subscriber feeding a sink while it runs.
//!
//! Tracing never alters what the expectation engine observes.

use std::io;

use crate::irq::IrqValue;

/// Trace recorder.
pub mod recorder;

/// Value Change Dump output.
pub mod vcd;

pub use recorder::Trace;
pub use vcd::VcdSink;

/// Destination for traced signal values.
pub trait TraceSink {
    /// Declares a signal of `width` bits; returns the index used by [`Self::record`].
    ///
    /// # Errors
    ///
    /// Fails if the sink no longer accepts declarations.
    fn declare(&mut self, name: &str, width: u32) -> io::Result<usize>;

    /// Ends the declarations and opens the dump at `time_ns`.
    ///
    /// # Errors
    ///
    /// Any I/O error from the underlying writer.
    fn begin(&mut self, time_ns: u64) -> io::Result<()>;

    /// Records that signal `index` took `value` at `time_ns`.
    ///
    /// # Errors
    ///
    /// Any I/O error, or an unknown `index`.
    fn record(&mut self, time_ns: u64, index: usize, value: IrqValue) -> io::Result<()>;

    /// Pushes buffered output to its destination.
    ///
    /// # Errors
    ///
    /// Any I/O error from the underlying writer.
    fn flush(&mut self) -> io::Result<()>;

    /// Closes the dump at `time_ns`.
    ///
    /// # Errors
    ///
    /// Any I/O error from the underlying writer.
    fn finish(&mut self, time_ns: u64) -> io::Result<()>;
}
