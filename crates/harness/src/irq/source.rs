//! Addresses of hardware signals inside the simulation core.

use std::fmt;

/// Where a core-owned signal lives.
///
/// The core resolves a source to an [`super::ExternalIrq`]; the harness only uses the
/// source to build a default display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrqSource {
    /// Signal `index` of the peripheral identified by the control code `ctl`.
    Io {
        /// Peripheral control code.
        ctl: u32,
        /// Signal index within the peripheral.
        index: u32,
    },
    /// Pin `pin` of I/O port `port` (an upper-case letter).
    IoPort {
        /// Port letter.
        port: char,
        /// Pin number.
        pin: u8,
    },
    /// Bit `bit` of the I/O register at `register`.
    IoMem {
        /// Register address.
        register: u16,
        /// Bit number.
        bit: u8,
    },
}

impl IrqSource {
    /// Port pin source; the letter is normalised to upper case.
    pub const fn port(letter: char, pin: u8) -> Self {
        Self::IoPort {
            port: letter.to_ascii_uppercase(),
            pin,
        }
    }

    /// Name used when the caller does not supply one.
    pub fn default_name(&self) -> String {
        match *self {
            Self::Io { ctl, index } => format!("ctl{ctl}-{index}"),
            Self::IoPort { port, pin } => format!("ioport_{port}{pin}"),
            Self::IoMem { register, bit } => format!("iomem_0x{register:02x}_{bit}"),
        }
    }
}

impl fmt::Display for IrqSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Io { ctl, index } => write!(f, "io ctl {ctl:#x} index {index}"),
            Self::IoPort { port, pin } => write!(f, "port {port} pin {pin}"),
            Self::IoMem { register, bit } => write!(f, "register {register:#04x} bit {bit}"),
        }
    }
}
