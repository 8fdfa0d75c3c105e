//! Firmware image intake.
//!
//! This module reads firmware files and checks them before a session hands them to
//! the core. It performs:
//! 1. **Classification:** Intel HEX by extension (`.hex`, `.ihex`), ELF by magic number.
//! 2. **Validation:** HEX files must consist of well-formed records; ELF files must parse.
//! 3. **Summary:** Record count for HEX, entry point and loadable segment count for ELF.
//!
//! Decoding the records into flash or EEPROM is left to the core.

use std::fs;
use std::path::{Path, PathBuf};

use object::{Object, ObjectSegment};

use crate::common::ConfigError;

/// ELF magic number.
const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Smallest HEX record: byte count, two address bytes, record type, checksum.
const IHEX_MIN_RECORD: usize = 5;

/// Intel HEX end-of-file record type.
const IHEX_EOF: u8 = 0x01;

/// Container format of a firmware image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareFormat {
    /// Intel HEX text records.
    IntelHex {
        /// Number of data and control records.
        records: usize,
    },
    /// ELF executable.
    Elf {
        /// Program entry point.
        entry: u64,
        /// Loadable segments with file data.
        segments: usize,
    },
}

/// A validated firmware image.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    /// Where the image was read from.
    pub path: PathBuf,
    /// Detected format and summary.
    pub format: FirmwareFormat,
    /// Raw file contents.
    pub data: Vec<u8>,
}

/// Reads and validates a firmware image.
///
/// # Arguments
///
/// * `path` - Path to an Intel HEX or ELF file.
///
/// # Errors
///
/// * [`ConfigError::FirmwareRead`] if the file cannot be read.
/// * [`ConfigError::MalformedFirmware`] if the file is empty or fails validation.
/// * [`ConfigError::UnsupportedFirmware`] if the file is neither HEX nor ELF.
pub fn load_firmware(path: impl AsRef<Path>) -> Result<FirmwareImage, ConfigError> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| ConfigError::FirmwareRead {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |reason: String| ConfigError::MalformedFirmware {
        path: path.to_path_buf(),
        reason,
    };
    if data.is_empty() {
        return Err(malformed("file is empty".to_owned()));
    }

    let format = if is_ihex_path(path) {
        let records = validate_ihex(&data).map_err(malformed)?;
        FirmwareFormat::IntelHex { records }
    } else if data.starts_with(ELF_MAGIC) {
        let elf = object::File::parse(data.as_slice()).map_err(|e| malformed(e.to_string()))?;
        FirmwareFormat::Elf {
            entry: elf.entry(),
            segments: elf.segments().filter(|s| s.file_range().1 > 0).count(),
        }
    } else {
        return Err(ConfigError::UnsupportedFirmware {
            path: path.to_path_buf(),
        });
    };

    tracing::debug!(path = %path.display(), ?format, "firmware loaded");
    Ok(FirmwareImage {
        path: path.to_path_buf(),
        format,
        data,
    })
}

fn is_ihex_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hex") || ext.eq_ignore_ascii_case("ihex"))
}

/// Checks every non-blank line is a well-formed record and returns the record count.
fn validate_ihex(data: &[u8]) -> Result<usize, String> {
    let text = std::str::from_utf8(data).map_err(|e| format!("not a text file: {e}"))?;
    let mut records = 0;
    let mut saw_eof = false;
    for (lineno, line) in text.lines().enumerate().map(|(i, l)| (i + 1, l.trim())) {
        if line.is_empty() {
            continue;
        }
        if saw_eof {
            return Err(format!("line {lineno}: record after end-of-file record"));
        }
        let bytes = decode_record(line).map_err(|e| format!("line {lineno}: {e}"))?;
        saw_eof = bytes[3] == IHEX_EOF;
        records += 1;
    }
    if records == 0 {
        return Err("no records".to_owned());
    }
    Ok(records)
}

fn decode_record(line: &str) -> Result<Vec<u8>, String> {
    let hex = line
        .strip_prefix(':')
        .ok_or_else(|| "record does not start with ':'".to_owned())?;
    if !hex.is_ascii() {
        return Err("invalid hex digit".to_owned());
    }
    if hex.len() % 2 != 0 {
        return Err("odd number of hex digits".to_owned());
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| "invalid hex digit".to_owned())?;
    if bytes.len() < IHEX_MIN_RECORD {
        return Err("record too short".to_owned());
    }
    if bytes.len() != IHEX_MIN_RECORD + usize::from(bytes[0]) {
        return Err(format!("byte count {} does not match record length", bytes[0]));
    }
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != 0 {
        return Err("checksum mismatch".to_owned());
    }
    Ok(bytes)
}
