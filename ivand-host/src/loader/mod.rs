//! Loader utilities for ivand-host.
//!
//! Responsibilities:
//! - Detect whether the provided bytes are a `.wasm` binary or `.wat` text.
//! - If it looks like WAT, convert it to WASM bytes (via the `wat` crate).
//! - Compile a wasmtime `Module` from the resulting WASM bytes.
//!
//! Notes:
//! - Extension sniffing is unreliable in some setups, so we sniff the bytes
//!   themselves.
//! - We accept leading whitespace/BOM for WAT as best-effort.

use wasmtime::{Engine, Module};

/// Error returned by [`crate::ModuleBridge::load`] and the loader helpers.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Could not read the module file.
    #[error("failed to read module: {0}")]
    Io(#[from] std::io::Error),
    /// The input was empty or otherwise not recognized as WASM/WAT.
    #[error("unrecognized module format (expected wasm or wat)")]
    UnrecognizedFormat,
    /// WAT parsing failed.
    #[error("failed to parse WAT: {0}")]
    Wat(#[from] wat::Error),
    /// Module compilation failed.
    #[error("failed to compile module: {0}")]
    Compile(anyhow::Error),
    /// Instantiation failed: a host import is missing or mismatched in arity,
    /// or the module's start logic trapped.
    #[error("failed to link module: {0}")]
    Link(anyhow::Error),
    /// The module does not export a required symbol.
    #[error("guest missing required export `{0}`")]
    MissingExport(&'static str),
    /// The bridge already holds an instance; the module handle is
    /// single-assignment.
    #[error("a module is already loaded")]
    AlreadyLoaded,
}

/// What kind of module the loader inferred from the bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DetectedFormat {
    Wasm,
    Wat,
}

/// Load: detect -> (optional) wat->wasm -> compile.
pub fn compile_module(engine: &Engine, bytes: &[u8]) -> Result<Module, LoadError> {
    let Detected { format, wasm_bytes } = normalize_to_wasm(bytes)?;
    let _ = format; // reserved for future logging/telemetry
    Module::new(engine, wasm_bytes.as_slice()).map_err(LoadError::Compile)
}

/// Detect format and normalize to valid WASM bytes.
pub fn normalize_to_wasm(bytes: &[u8]) -> Result<Detected, LoadError> {
    let format = detect_format(bytes).ok_or(LoadError::UnrecognizedFormat)?;

    match format {
        DetectedFormat::Wasm => Ok(Detected {
            format,
            wasm_bytes: bytes.to_vec(),
        }),
        DetectedFormat::Wat => {
            let wasm = wat::parse_bytes(bytes)?;
            Ok(Detected {
                format,
                wasm_bytes: wasm.into(),
            })
        }
    }
}

/// Result of normalizing (detecting + possibly converting) the input.
#[derive(Clone, Debug)]
pub struct Detected {
    pub format: DetectedFormat,
    /// Always valid WASM bytes (for WASM/WAT inputs).
    pub wasm_bytes: Vec<u8>,
}

/// Best-effort detection.
///
/// Rules:
/// - If the first 4 bytes are `\0asm`, treat as WASM.
/// - Else, after stripping UTF-8 BOM / leading whitespace, if the first
///   non-ws byte is `(`, treat as WAT (common WAT starts with `(module ...)`).
///
/// This intentionally avoids requiring valid UTF-8 for WAT; `wat::parse_bytes`
/// accepts bytes.
pub fn detect_format(bytes: &[u8]) -> Option<DetectedFormat> {
    if is_wasm_magic(bytes) {
        return Some(DetectedFormat::Wasm);
    }

    let i = skip_bom_and_leading_ws(bytes);
    if i < bytes.len() && bytes[i] == b'(' {
        return Some(DetectedFormat::Wat);
    }

    None
}

fn is_wasm_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0..4] == *b"\0asm"
}

fn skip_bom_and_leading_ws(bytes: &[u8]) -> usize {
    let mut i = 0;

    // UTF-8 BOM: EF BB BF
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        i = 3;
    }

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            _ => break,
        }
    }

    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_wasm_magic() {
        assert_eq!(
            detect_format(b"\0asm\x01\x00\x00\x00"),
            Some(DetectedFormat::Wasm)
        );
    }

    #[test]
    fn detects_wat_with_whitespace() {
        assert_eq!(detect_format(b"   \n\t(module)"), Some(DetectedFormat::Wat));
    }

    #[test]
    fn detects_wat_with_bom() {
        assert_eq!(
            detect_format(b"\xEF\xBB\xBF(module)"),
            Some(DetectedFormat::Wat)
        );
    }

    #[test]
    fn unrecognized_returns_none() {
        assert_eq!(detect_format(b"not wasm"), None);
        assert_eq!(detect_format(b""), None);
    }

    #[test]
    fn normalizes_wat_to_wasm_bytes() {
        let out = normalize_to_wasm(b"(module)").unwrap();
        assert_eq!(out.format, DetectedFormat::Wat);
        assert!(is_wasm_magic(&out.wasm_bytes));
    }
}
