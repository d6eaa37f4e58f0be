// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod address;
pub mod compiler;
pub mod dma;
pub mod emit;
pub mod field;
pub mod program;
pub mod regs;
pub mod section;
pub mod switchbox;
pub mod tile;
pub mod write_log;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub use address::{address, is_boundary, Address, TileAddress};
pub use compiler::{CompileReport, Compiler};
pub use emit::{to_bytes, write_airbin, EmitError};
pub use program::{load_program, LoadError, ProgramImage, ProgramLoader, Segment};
pub use section::{group_sections, Section};
pub use write_log::WriteLog;

pub use airbin_config::CompileOptions;
pub use airbin_ir as ir;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Cannot load core program for tile {tile} from {path:?}")]
    ProgramLoad {
        tile: TileAddress,
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error("Failed to emit configuration image")]
    Emit(#[from] EmitError),
}

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    ProgramLoad,
    AbModeMismatch,
    Unimplemented,
    Contract,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ProgramLoad => "program-load",
            DiagnosticKind::AbModeMismatch => "ab-mode",
            DiagnosticKind::Unimplemented => "unimplemented",
            DiagnosticKind::Contract => "contract",
        };
        f.write_str(name)
    }
}

/// A recoverable problem; compilation carried on past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub tile: TileAddress,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] tile {}: {}", self.kind, self.tile, self.message)
    }
}

/// Collects diagnostics and logs each one as it is raised.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, tile: TileAddress, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            tile,
            message: message.into(),
        };
        match kind {
            DiagnosticKind::ProgramLoad | DiagnosticKind::Contract => {
                tracing::error!("{}", diagnostic)
            }
            DiagnosticKind::AbModeMismatch | DiagnosticKind::Unimplemented => {
                tracing::warn!("{}", diagnostic)
            }
        }
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Resolves a buffer name to the absolute address of its first byte.
pub trait BufferResolver {
    fn resolve(&self, buffer: &str) -> Option<u64>;
}

impl BufferResolver for ir::Device {
    fn resolve(&self, buffer: &str) -> Option<u64> {
        self.buffer(buffer).and_then(|b| b.address)
    }
}

impl BufferResolver for HashMap<String, u64> {
    fn resolve(&self, buffer: &str) -> Option<u64> {
        self.get(buffer).copied()
    }
}

impl<R: BufferResolver + ?Sized> BufferResolver for &R {
    fn resolve(&self, buffer: &str) -> Option<u64> {
        (**self).resolve(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_collect_in_order() {
        let mut diags = Diagnostics::new();
        let tile = TileAddress::new(3, 1);
        diags.report(DiagnosticKind::Unimplemented, tile, "bundle trace");
        diags.report(DiagnosticKind::Contract, tile, "slot 17");
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.count(DiagnosticKind::Contract), 1);
        let first = diags.iter().next().unwrap();
        assert_eq!(first.to_string(), "[unimplemented] tile <3,1>: bundle trace");
    }

    #[test]
    fn test_map_resolver() {
        let mut map = HashMap::new();
        map.insert("buf".to_string(), 0x1000u64);
        assert_eq!(map.resolve("buf"), Some(0x1000));
        assert_eq!((&map).resolve("nope"), None);
    }
}
