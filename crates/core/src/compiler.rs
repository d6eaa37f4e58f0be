// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::io::Write;

use airbin_config::CompileOptions;
use airbin_ir::Device;

use crate::emit::{to_bytes, write_airbin, EmitError};
use crate::program::ProgramLoader;
use crate::section::{group_sections, Section};
use crate::write_log::WriteLog;
use crate::{dma, switchbox, tile};
use crate::{BufferResolver, CompileResult, Diagnostic, Diagnostics};

/// Result of one compiler run.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub sections: Vec<Section>,
    pub diagnostics: Vec<Diagnostic>,
    /// Number of distinct words in the image.
    pub words: usize,
}

impl CompileReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EmitError> {
        to_bytes(&self.sections)
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> CompileResult<()> {
        write_airbin(&self.sections, out)?;
        Ok(())
    }
}

/// Compiles device descriptions into configuration images.
///
/// Each run owns a fresh [`WriteLog`]; nothing is kept between runs.
pub struct Compiler<'a> {
    loader: &'a dyn ProgramLoader,
    resolver: Option<&'a dyn BufferResolver>,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(loader: &'a dyn ProgramLoader) -> Self {
        Self {
            loader,
            resolver: None,
            options: CompileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve buffer addresses with `resolver` instead of the addresses in
    /// the description.
    pub fn with_resolver(mut self, resolver: &'a dyn BufferResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Run the three configuration phases and return the final register state.
    pub fn configure(&self, device: &Device) -> CompileResult<(WriteLog, Diagnostics)> {
        let mut log = WriteLog::new();
        let mut diags = Diagnostics::new();
        let resolver: &dyn BufferResolver = match self.resolver {
            Some(resolver) => resolver,
            None => device,
        };

        // DMA channels are cleared by the tile pass and enabled by the DMA pass.
        tile::configure_tiles(&mut log, device, self.loader, &self.options, &mut diags)?;
        switchbox::configure_switchboxes(&mut log, device, &mut diags);
        dma::configure_dmas(&mut log, device, resolver, &mut diags);

        Ok((log, diags))
    }

    pub fn compile(&self, device: &Device) -> CompileResult<CompileReport> {
        tracing::info!("Compiling device '{}'", device.name);
        let (log, diags) = self.configure(device)?;
        let sections = group_sections(&log);
        tracing::info!(
            "{} words in {} sections, {} diagnostics",
            log.len(),
            sections.len(),
            diags.len()
        );
        Ok(CompileReport {
            sections,
            diagnostics: diags.into_vec(),
            words: log.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::TileAddress;
    use crate::program::{LoadError, ProgramImage};
    use std::path::Path;

    fn none(path: &Path) -> Result<ProgramImage, LoadError> {
        Err(LoadError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }

    #[test]
    fn test_dma_pass_runs_after_tile_reset() {
        let device: Device = serde_yaml::from_str(
            r#"
name: d
tiles: [{ col: 7, row: 2 }]
buffers: [{ name: a, col: 7, row: 2, address: 0x400 }]
mems:
  - col: 7
    row: 2
    blocks: [{ label: bd0, transfers: [{ buffer: a, len: 4 }] }]
    starts: [{ direction: s2mm, channel: 1, block: bd0 }]
"#,
        )
        .unwrap();
        let (log, diags) = Compiler::new(&none).configure(&device).unwrap();
        assert!(diags.is_empty());
        let tile = TileAddress::new(7, 2);
        assert_eq!(log.read(tile, 0x1DE08), 1, "channel enabled after reset");
        assert_eq!(log.read(tile, 0x1D000), 0x100);
    }

    #[test]
    fn test_custom_resolver_wins() {
        let device: Device = serde_yaml::from_str(
            r#"
name: d
tiles: [{ col: 7, row: 2 }]
buffers: [{ name: a, col: 7, row: 2 }]
mems:
  - col: 7
    row: 2
    blocks: [{ label: bd0, transfers: [{ buffer: a, len: 4 }] }]
"#,
        )
        .unwrap();
        let mut map = std::collections::HashMap::new();
        map.insert("a".to_string(), 0x2000u64);
        let report = Compiler::new(&none)
            .with_resolver(&map)
            .compile(&device)
            .unwrap();
        assert!(report.is_clean());
        let bd = report
            .sections
            .iter()
            .find(|s| s.name() == Some(".sdma.bd"))
            .unwrap();
        assert_eq!(bd.data[0], 0x800);
    }
}
