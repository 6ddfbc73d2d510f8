//! Turns the compiler's raw result buffer into a loadable binary module.
//!
//! The buffer is one of: an error report, a binary module, or module text.
//! Errors short-circuit with the extracted diagnostic. Text is repaired
//! (missing host imports declared) and assembled. Anything else is passed
//! through as binary on a best-effort basis.

pub mod assembler;
pub mod diagnostics;
pub mod patches;
pub mod repair;

pub use assembler::{Assembler, NoAssembler, WatAssembler};
pub use diagnostics::{diagnose, extract_error, Diagnostic, DiagnosticSource};
pub use patches::{RuntimePatch, RUNTIME_PATCHES};
pub use repair::{repair_module_text, Repair};

use thiserror::Error;
use tracing::{info, warn};

/// Magic header of a binary wasm module.
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

const TEXT_MODULE_OPENER: &str = "(module";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("{0}")]
    Structured(String),
    #[error("{0}")]
    Heuristic(String),
    #[error(
        "Compiler output WAT but no assembler is available. Enable the assembler or update the compiler to output binary."
    )]
    AssemblerMissing,
    #[error("WAT assembly failed: {0}")]
    Assembly(String),
}

impl IngestError {
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Structured(_) => "E0501",
            IngestError::Heuristic(_) => "E0502",
            IngestError::AssemblerMissing => "E0503",
            IngestError::Assembly(_) => "E0504",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleFormat {
    Binary,
    Text,
    Unknown,
}

pub fn detect_format(buffer: &[u8]) -> ModuleFormat {
    if buffer.starts_with(&WASM_MAGIC) {
        return ModuleFormat::Binary;
    }
    if String::from_utf8_lossy(buffer).trim().starts_with(TEXT_MODULE_OPENER) {
        return ModuleFormat::Text;
    }
    ModuleFormat::Unknown
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub binary: Vec<u8>,
    pub format: ModuleFormat,
    /// Imports the repair pass declared, in catalog order.
    pub injected: Vec<&'static str>,
}

pub fn ingest(buffer: &[u8], assembler: &dyn Assembler) -> Result<Ingested, IngestError> {
    if let Some(diagnostic) = diagnose(buffer) {
        return Err(match diagnostic.source {
            DiagnosticSource::Structured => IngestError::Structured(diagnostic.message),
            DiagnosticSource::Heuristic => IngestError::Heuristic(diagnostic.message),
        });
    }
    match detect_format(buffer) {
        ModuleFormat::Binary => Ok(Ingested {
            binary: buffer.to_vec(),
            format: ModuleFormat::Binary,
            injected: Vec::new(),
        }),
        ModuleFormat::Text => {
            let text = String::from_utf8_lossy(buffer);
            let repair = repair_module_text(text.trim());
            if !repair.injected.is_empty() {
                info!(count = repair.injected.len(), "declared missing host imports");
            }
            let binary = assembler
                .assemble(&repair.text)
                .ok_or(IngestError::AssemblerMissing)??;
            info!(bytes = binary.len(), "assembled module text");
            Ok(Ingested {
                binary,
                format: ModuleFormat::Text,
                injected: repair.injected,
            })
        }
        ModuleFormat::Unknown => {
            let preview: String = String::from_utf8_lossy(buffer).chars().take(50).collect();
            warn!(%preview, "unknown compiler output format, using it as binary");
            Ok(Ingested {
                binary: buffer.to_vec(),
                format: ModuleFormat::Unknown,
                injected: Vec::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_errors_stop_ingestion() {
        let err = ingest(
            br#"{"error":true,"message":"unexpected token","line":4}"#,
            &WatAssembler,
        )
        .unwrap_err();
        assert_eq!(err, IngestError::Structured("[Line 4] unexpected token".to_string()));
        assert_eq!(err.to_string(), "[Line 4] unexpected token");
    }

    #[test]
    fn heuristic_errors_stop_ingestion() {
        let err = ingest(b"Error: bad thing on line 2", &WatAssembler).unwrap_err();
        assert_eq!(err.code(), "E0502");
        assert_eq!(err.to_string(), "[Line 2] bad thing on line 2");
    }

    #[test]
    fn binary_passes_through_untouched() {
        let binary = wat::parse_str("(module)").unwrap();
        let ingested = ingest(&binary, &WatAssembler).unwrap();
        assert_eq!(ingested.format, ModuleFormat::Binary);
        assert_eq!(ingested.binary, binary);
    }

    #[test]
    fn text_is_repaired_then_assembled() {
        let text = b"\n  (module (func (export \"main\") (drop (call $std_math_sqrt (i64.const 16)))))\n";
        let ingested = ingest(text, &WatAssembler).unwrap();
        assert_eq!(ingested.format, ModuleFormat::Text);
        assert_eq!(ingested.injected, ["std_math_sqrt"]);
        assert!(ingested.binary.starts_with(&WASM_MAGIC));
    }

    #[test]
    fn text_without_assembler_fails_descriptively() {
        let err = ingest(b"(module)", &NoAssembler).unwrap_err();
        assert_eq!(err, IngestError::AssemblerMissing);
        assert!(err.to_string().starts_with("Compiler output WAT"));
        assert!(!err.to_string().contains('\n'));
    }

    #[test]
    fn malformed_text_reports_assembly_failure() {
        let err = ingest(b"(module (func $f (i64.bogus)))", &WatAssembler).unwrap_err();
        assert!(matches!(err, IngestError::Assembly(_)));
    }

    #[test]
    fn unknown_bytes_fall_back_to_binary() {
        let ingested = ingest(b"\x01\x02garbage", &WatAssembler).unwrap();
        assert_eq!(ingested.format, ModuleFormat::Unknown);
        assert_eq!(ingested.binary, b"\x01\x02garbage");
    }

    #[test]
    fn detects_formats() {
        assert_eq!(detect_format(b"\0asm\x01\0\0\0"), ModuleFormat::Binary);
        assert_eq!(detect_format(b"   (module)"), ModuleFormat::Text);
        assert_eq!(detect_format(b""), ModuleFormat::Unknown);
    }
}
