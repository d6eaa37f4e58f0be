// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::address::TILE_ADDR_OFF_WIDTH;
use crate::regs::*;
use crate::write_log::WriteLog;

/// Every name placed in the section name table, in table order. Sections
/// whose start matches no known region stay anonymous.
pub const SECTION_NAMES: [&str; 11] = [
    ".ssmast",
    ".ssslve",
    ".sspckt",
    ".sdma.bd",
    ".shmmux",
    ".sdma.ctl",
    ".prgm.mem",
    ".tdma.bd",
    ".tdma.ctl",
    "deprecated",
    ".data.mem",
];

/// Region base offsets and their section names. First match wins.
pub const REGION_NAMES: [(u32, &str); 9] = [
    (DATA_MEM_BASE, ".data.mem"),
    (SS_MASTER_BASE, ".ssmast"),
    (SS_SLAVE_BASE, ".ssslve"),
    (SS_SLOT_BASE, ".sspckt"),
    (bd_offset(0), ".sdma.bd"),
    (SHIM_MUX_BASE, ".shmmux"),
    (bd_offset(10), ".sdma.ctl"),
    (PROG_MEM_BASE, ".prgm.mem"),
    (DMA_S2MM_BASE, ".tdma.ctl"),
];

/// Section name for a run starting at `address`.
pub fn region_name(address: u64) -> Option<&'static str> {
    let offset = (address & ((1 << TILE_ADDR_OFF_WIDTH) - 1)) as u32;
    REGION_NAMES
        .iter()
        .find(|(base, _)| *base == offset)
        .map(|&(_, name)| name)
}

/// A run of consecutive words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub address: u64,
    pub data: Vec<u32>,
}

impl Section {
    pub fn new(address: u64) -> Self {
        Self {
            address,
            data: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&'static str> {
        region_name(self.address)
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len() * 4
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Next address after the section.
    pub fn end(&self) -> u64 {
        self.address + self.len() as u64
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

/// Coalesce the log into maximal runs of consecutive words.
pub fn group_sections(log: &WriteLog) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for (addr, value) in log.iter() {
        match sections.last_mut() {
            Some(current) if current.end() == addr => current.data.push(value),
            _ => {
                tracing::debug!("Starting new section @ {:#x}", addr);
                let mut section = Section::new(addr);
                section.data.push(value);
                sections.push(section);
            }
        }
    }
    sections
}
