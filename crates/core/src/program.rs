// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::{Path, PathBuf};

use crate::address::{TileAddress, TILE_WINDOW_SIZE};
use crate::regs::{DATA_MEM_BASE, DATA_MEM_SIZE, PROG_MEM_BASE};
use crate::write_log::WriteLog;

/// One loadable segment of a core program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub vaddr: u64,
    pub executable: bool,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramImage {
    pub segments: Vec<Segment>,
}

impl ProgramImage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, vaddr: u64, executable: bool, data: Vec<u8>) {
        self.segments.push(Segment {
            vaddr,
            executable,
            data,
        });
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read program {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed program header: {0}")]
    Malformed(String),
    #[error("Program is not a 32-bit ELF")]
    WrongClass,
    #[error("Program is not little-endian")]
    WrongEndianness,
    #[error("Segment at {vaddr:#x} runs past the end of the file")]
    SegmentBounds { vaddr: u64 },
    #[error("Segment at {vaddr:#x} ({len} bytes) does not fit the tile window at {dest:#x}")]
    OutOfWindow { vaddr: u64, dest: u64, len: usize },
}

impl LoadError {
    /// Fatal errors mean the container itself cannot be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LoadError::Malformed(_) | LoadError::WrongClass | LoadError::WrongEndianness
        )
    }
}

/// Reads compiled core programs.
pub trait ProgramLoader {
    fn load(&self, path: &Path) -> Result<ProgramImage, LoadError>;
}

impl<F> ProgramLoader for F
where
    F: Fn(&Path) -> Result<ProgramImage, LoadError>,
{
    fn load(&self, path: &Path) -> Result<ProgramImage, LoadError> {
        self(path)
    }
}

/// Tile offset a segment is written to.
pub fn segment_destination(segment: &Segment) -> u64 {
    if segment.executable {
        PROG_MEM_BASE as u64 + segment.vaddr
    } else {
        DATA_MEM_BASE as u64 + (segment.vaddr & (DATA_MEM_SIZE as u64 - 1))
    }
}

/// Write every segment of `image` into the memories of `tile`.
///
/// All segments are checked against the tile window first, so a rejected
/// program leaves the log untouched. Returns the number of words written.
pub fn load_program(
    log: &mut WriteLog,
    tile: TileAddress,
    image: &ProgramImage,
) -> Result<usize, LoadError> {
    for segment in &image.segments {
        let dest = segment_destination(segment);
        let padded = segment.data.len().div_ceil(4) as u64 * 4;
        if dest + padded > TILE_WINDOW_SIZE as u64 {
            return Err(LoadError::OutOfWindow {
                vaddr: segment.vaddr,
                dest,
                len: segment.data.len(),
            });
        }
    }

    let mut written = 0;
    for segment in &image.segments {
        let dest = segment_destination(segment) as u32;
        tracing::debug!(
            "{}: {} segment {:#x} -> {:#07x} ({} bytes)",
            tile,
            if segment.executable { "text" } else { "data" },
            segment.vaddr,
            dest,
            segment.data.len()
        );
        for (i, chunk) in segment.data.chunks(4).enumerate() {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            log.write(tile, dest + 4 * i as u32, u32::from_le_bytes(word));
            written += 1;
        }
    }
    Ok(written)
}
