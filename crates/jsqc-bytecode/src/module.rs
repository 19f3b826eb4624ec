//! Top-level compiled program container.
//!
//! A compiled program is a single top-level [`BytecodeUnit`]; every nested
//! function or method reachable from it lives inside its constant pool as a
//! [`crate::constant::Constant::Function`] entry; there is no separate flat
//! function table or module import/export graph to track here — that is
//! either resolved before lowering (nested functions) or out of scope
//! entirely (ES module linkage is a VM/loader concern, not this crate's).

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::{BytecodeError, Result};
use crate::function::BytecodeUnit;
use crate::{BYTECODE_MAGIC, BYTECODE_VERSION};

/// A fully compiled program, ready to hand to a VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledProgram {
    /// Source URL or path, used for diagnostics and cache keys.
    pub source_url: String,
    /// SHA-256 hash of the source text, for cache invalidation.
    pub source_hash: [u8; 32],
    /// The program's top-level bytecode unit.
    pub top_level: BytecodeUnit,
    /// Whether the source was parsed as an ES module rather than a script.
    pub is_module: bool,
}

impl CompiledProgram {
    /// Construct a compiled program from its top-level unit.
    pub fn new(source_url: impl Into<String>, top_level: BytecodeUnit, is_module: bool) -> Self {
        Self {
            source_url: source_url.into(),
            source_hash: [0; 32],
            top_level,
            is_module,
        }
    }

    /// Attach a source hash, for cache invalidation by the host VM.
    pub fn with_source_hash(mut self, hash: [u8; 32]) -> Self {
        self.source_hash = hash;
        self
    }

    /// Serialize to bytes: magic, version, length-prefixed JSON payload.
    ///
    /// This crate never writes these bytes anywhere itself (see
    /// [`crate`]'s module docs); persistence is the embedding VM's concern.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&BYTECODE_MAGIC);
        bytes.extend_from_slice(&BYTECODE_VERSION.to_le_bytes());

        let data = serde_json::to_vec(self).map_err(|e| {
            BytecodeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&data);

        Ok(bytes)
    }

    /// Deserialize from the format written by [`CompiledProgram::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 16 {
            return Err(BytecodeError::UnexpectedEnd);
        }

        if bytes[0..8] != BYTECODE_MAGIC {
            return Err(BytecodeError::InvalidMagic);
        }

        let version = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        if version != BYTECODE_VERSION {
            return Err(BytecodeError::UnsupportedVersion(version));
        }

        let data_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        if bytes.len() < 16 + data_len {
            return Err(BytecodeError::UnexpectedEnd);
        }

        serde_json::from_slice(&bytes[16..16 + data_len]).map_err(|e| {
            BytecodeError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })
    }

    /// Write the serialized form to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Read the serialized form from a reader.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut unit = BytecodeUnit::empty();
        unit.constants.add_string("hello");
        unit.constants.add_number(42.0);
        unit.name = Some("<main>".to_string());

        let program = CompiledProgram::new("test.js", unit, false);
        let bytes = program.to_bytes().unwrap();
        let restored = CompiledProgram::from_bytes(&bytes).unwrap();

        assert_eq!(restored.source_url, "test.js");
        assert_eq!(restored.top_level.constants.len(), 2);
        assert!(!restored.is_module);
    }

    #[test]
    fn invalid_magic() {
        let bytes = b"INVALID\0........";
        let result = CompiledProgram::from_bytes(bytes);
        assert!(matches!(result, Err(BytecodeError::InvalidMagic)));
    }
}
