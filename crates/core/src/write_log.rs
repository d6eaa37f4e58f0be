// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::collections::BTreeMap;

use crate::address::{TileAddress, TILE_WINDOW_SIZE};

/// Final register state of the array, keyed by global address.
///
/// Later writes to the same address replace earlier ones. Addresses that were
/// never written read back as zero, which is also the hardware reset value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteLog {
    words: BTreeMap<u64, u32>,
}

impl WriteLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, tile: TileAddress, offset: u32, value: u32) {
        debug_assert!(tile.column() > 0, "write to column 0 at {:#x}", offset);
        assert!(
            offset < TILE_WINDOW_SIZE,
            "{}: offset {:#x} is outside the tile window",
            tile,
            offset
        );
        self.words.insert(tile.full_address(offset), value);
    }

    pub fn read(&self, tile: TileAddress, offset: u32) -> u32 {
        self.read_global(tile.full_address(offset))
    }

    pub fn read_global(&self, global: u64) -> u32 {
        self.words.get(&global).copied().unwrap_or(0)
    }

    /// OR `bits` into the current value of a register.
    pub fn set_bits(&mut self, tile: TileAddress, offset: u32, bits: u32) {
        let current = self.read(tile, offset);
        self.write(tile, offset, current | bits);
    }

    /// Zero every word in `[start, start + length)`.
    pub fn clear_range(&mut self, tile: TileAddress, start: u32, length: u32) {
        assert!(
            start % 4 == 0,
            "clear start {:#x} is not word aligned",
            start
        );
        assert!(
            length % 4 == 0,
            "clear length {:#x} is not word aligned",
            length
        );
        tracing::debug!(
            "{}: clearing {:#x} bytes at {:#07x}",
            tile,
            length,
            start
        );
        for offset in (start..start + length).step_by(4) {
            self.write(tile, offset, 0);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.words.iter().map(|(&addr, &value)| (addr, value))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::address;
    use proptest::prelude::*;

    #[test]
    fn test_unwritten_reads_zero() {
        let log = WriteLog::new();
        assert_eq!(log.read(TileAddress::new(1, 1), 0x100), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let tile = TileAddress::new(2, 1);
        let mut log = WriteLog::new();
        log.write(tile, 0x10, 0xAAAA);
        log.write(tile, 0x14, 0x1);
        log.write(tile, 0x10, 0xBBBB);
        assert_eq!(log.read(tile, 0x10), 0xBBBB);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_set_bits_accumulates() {
        let tile = TileAddress::new(2, 0);
        let mut log = WriteLog::new();
        log.set_bits(tile, 0x1F000, 1 << 8);
        log.set_bits(tile, 0x1F000, 2 << 12);
        assert_eq!(log.read(tile, 0x1F000), (1 << 8) | (2 << 12));
    }

    #[test]
    fn test_iteration_is_address_ordered() {
        let mut log = WriteLog::new();
        log.write(TileAddress::new(4, 1), 0, 3);
        log.write(TileAddress::new(2, 1), 8, 2);
        log.write(TileAddress::new(2, 1), 4, 1);
        let values: Vec<u32> = log.iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "not word aligned")]
    fn test_unaligned_clear_panics() {
        WriteLog::new().clear_range(TileAddress::new(1, 1), 0x2, 0x10);
    }

    #[test]
    #[should_panic(expected = "outside the tile window")]
    fn test_write_past_window_panics() {
        // Would otherwise wrap onto offset 0x100 of the same tile.
        WriteLog::new().write(TileAddress::new(2, 1), TILE_WINDOW_SIZE + 0x100, 1);
    }

    proptest! {
        #[test]
        fn test_clear_range_is_complete_and_contained(
            start_word in 0u32..0x100,
            words in 0u32..0x40,
            outside in prop::collection::vec((0u32..0x200, any::<u32>()), 0..32),
        ) {
            let tile = TileAddress::new(5, 2);
            let start = start_word * 4;
            let length = words * 4;
            let mut log = WriteLog::new();
            for &(word, value) in &outside {
                log.write(tile, word * 4, value);
            }
            let before = log.clone();
            log.clear_range(tile, start, length);

            for word in 0u32..0x200 {
                let off = word * 4;
                if off >= start && off < start + length {
                    prop_assert_eq!(log.read_global(address(tile, off)), 0);
                } else {
                    prop_assert_eq!(log.read(tile, off), before.read(tile, off));
                }
            }
        }

        #[test]
        fn test_idempotent_overwrite(
            offset in (0u32..0x1000).prop_map(|w| w * 4),
            first in any::<u32>(),
            second in any::<u32>(),
            noise in prop::collection::vec(((0u32..0x1000).prop_map(|w| w * 4), any::<u32>()), 0..16),
        ) {
            let tile = TileAddress::new(9, 3);
            let mut log = WriteLog::new();
            log.write(tile, offset, first);
            for &(other, value) in &noise {
                if other != offset {
                    log.write(tile, other, value);
                }
            }
            log.write(tile, offset, second);
            prop_assert_eq!(log.read(tile, offset), second);
        }
    }
}
