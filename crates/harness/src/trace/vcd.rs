//! Value Change Dump (VCD) sink.
//!
//! Produces IEEE 1364 VCD text readable by GTKWave, Surfer, or other waveform viewers.
//! Timestamps are in nanoseconds. Identifier codes use printable ASCII starting at `!`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::TraceSink;
use crate::irq::IrqValue;

/// Scope all signals are declared in.
const SCOPE: &str = "logic";

#[derive(Debug)]
struct VcdVar {
    code: String,
    name: String,
    width: u32,
}

/// VCD writer over any [`Write`] implementation.
#[derive(Debug)]
pub struct VcdSink<W: Write> {
    writer: W,
    vars: Vec<VcdVar>,
    started: bool,
    current_time: Option<u64>,
}

impl VcdSink<BufWriter<File>> {
    /// Creates (or truncates) a VCD file at `path`.
    ///
    /// # Errors
    ///
    /// Any I/O error from creating the file.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> VcdSink<W> {
    /// Creates a sink writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            vars: Vec::new(),
            started: false,
            current_time: None,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Identifier code for the `index`-th variable.
    ///
    /// Multi-character codes are generated for indices >= 94.
    fn id_code(index: usize) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push(char::from(b'!' + (idx % 94) as u8));
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    fn write_time(&mut self, time_ns: u64) -> io::Result<()> {
        if self.current_time != Some(time_ns) {
            writeln!(self.writer, "#{time_ns}")?;
            self.current_time = Some(time_ns);
        }
        Ok(())
    }
}

impl<W: Write> TraceSink for VcdSink<W> {
    fn declare(&mut self, name: &str, width: u32) -> io::Result<usize> {
        if self.started {
            return Err(io::Error::other(format!(
                "cannot declare '{name}' after the dump started"
            )));
        }
        let index = self.vars.len();
        self.vars.push(VcdVar {
            code: Self::id_code(index),
            name: name.to_owned(),
            width: width.clamp(1, IrqValue::BITS),
        });
        Ok(index)
    }

    fn begin(&mut self, time_ns: u64) -> io::Result<()> {
        writeln!(self.writer, "$timescale 1ns $end")?;
        writeln!(self.writer, "$scope module {SCOPE} $end")?;
        for var in &self.vars {
            writeln!(
                self.writer,
                "$var wire {} {} {} $end",
                var.width, var.code, var.name
            )?;
        }
        writeln!(self.writer, "$upscope $end")?;
        writeln!(self.writer, "$enddefinitions $end")?;
        self.started = true;
        self.write_time(time_ns)
    }

    fn record(&mut self, time_ns: u64, index: usize, value: IrqValue) -> io::Result<()> {
        self.write_time(time_ns)?;
        let Some(var) = self.vars.get(index) else {
            return Err(io::Error::other(format!("unknown VCD variable {index}")));
        };
        if var.width == 1 {
            writeln!(self.writer, "{}{}", value & 1, var.code)
        } else {
            let width = var.width as usize;
            let mask = if var.width >= IrqValue::BITS {
                IrqValue::MAX
            } else {
                (1 << var.width) - 1
            };
            writeln!(self.writer, "b{:0width$b} {}", value & mask, var.code)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn finish(&mut self, time_ns: u64) -> io::Result<()> {
        if !self.started {
            self.begin(time_ns)?;
        }
        self.write_time(time_ns)?;
        self.writer.flush()
    }
}
