use crate::IngestError;

/// Turns module text into a binary module.
pub trait Assembler {
    /// `None` when no assembler is installed.
    fn assemble(&self, text: &str) -> Option<Result<Vec<u8>, IngestError>>;
}

/// Assembler backed by the `wat` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatAssembler;

impl Assembler for WatAssembler {
    fn assemble(&self, text: &str) -> Option<Result<Vec<u8>, IngestError>> {
        Some(wat::parse_str(text).map_err(|err| IngestError::Assembly(err.to_string())))
    }
}

/// Stand-in used when assembly is switched off in configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssembler;

impl Assembler for NoAssembler {
    fn assemble(&self, _text: &str) -> Option<Result<Vec<u8>, IngestError>> {
        None
    }
}
