// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use airbin_core::{LoadError, ProgramImage, ProgramLoader};
use goblin::elf::header::{EI_CLASS, EI_DATA, ELFCLASS32, ELFDATA2LSB, ELFMAG, SELFMAG};
use goblin::elf::program_header::{PF_X, PT_LOAD};
use goblin::elf::Elf;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Reads core programs from ELF32 little-endian files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElfProgramLoader;

impl ProgramLoader for ElfProgramLoader {
    fn load(&self, path: &Path) -> Result<ProgramImage, LoadError> {
        load_elf(path)
    }
}

pub fn load_elf(path: &Path) -> Result<ProgramImage, LoadError> {
    let buffer = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {:?}", buffer.len(), path);
    load_elf_bytes(&buffer)
}

fn check_ident(buffer: &[u8]) -> Result<(), LoadError> {
    if buffer.len() < 16 || &buffer[..SELFMAG] != ELFMAG {
        return Err(LoadError::Malformed("missing ELF magic".to_string()));
    }
    if buffer[EI_CLASS] != ELFCLASS32 {
        return Err(LoadError::WrongClass);
    }
    if buffer[EI_DATA] != ELFDATA2LSB {
        return Err(LoadError::WrongEndianness);
    }
    Ok(())
}

pub fn load_elf_bytes(buffer: &[u8]) -> Result<ProgramImage, LoadError> {
    check_ident(buffer)?;
    let elf = Elf::parse(buffer).map_err(|e| LoadError::Malformed(e.to_string()))?;

    let mut image = ProgramImage::new();
    for ph in &elf.program_headers {
        if ph.p_type != PT_LOAD {
            continue;
        }
        let size = ph.p_filesz as usize;
        let offset = ph.p_offset as usize;
        if size == 0 {
            continue;
        }

        let executable = ph.p_flags & PF_X != 0;
        debug!(
            "Loadable segment: vaddr={:#x} size={} offset={:#x} exec={}",
            ph.p_vaddr, size, offset, executable
        );

        let end = offset
            .checked_add(size)
            .filter(|&end| end <= buffer.len())
            .ok_or(LoadError::SegmentBounds { vaddr: ph.p_vaddr })?;
        image.add_segment(ph.p_vaddr, executable, buffer[offset..end].to_vec());
    }

    if image.segments.is_empty() {
        warn!("No loadable segments found in core program");
    }
    Ok(image)
}
