// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Global address model.
//!
//! ```text
//! 63          30 29     23 22   18 17              0
//! +--------------+---------+-------+----------------+
//! | array offset | column  |  row  | register offset|
//! |   34 bits    | 7 bits  | 5 bits|    18 bits     |
//! +--------------+---------+-------+----------------+
//! ```

use std::fmt;

pub const TILE_ADDR_OFF_WIDTH: u32 = 18;
pub const TILE_ADDR_ROW_SHIFT: u32 = TILE_ADDR_OFF_WIDTH;
pub const TILE_ADDR_ROW_WIDTH: u32 = 5;
pub const TILE_ADDR_COL_SHIFT: u32 = TILE_ADDR_ROW_SHIFT + TILE_ADDR_ROW_WIDTH;
pub const TILE_ADDR_COL_WIDTH: u32 = 7;
pub const TILE_ADDR_ARR_SHIFT: u32 = TILE_ADDR_COL_SHIFT + TILE_ADDR_COL_WIDTH;
pub const TILE_ADDR_ARR_WIDTH: u32 = 34;

/// Size of the register window of one tile.
pub const TILE_WINDOW_SIZE: u32 = 1 << TILE_ADDR_OFF_WIDTH;

const OFFSET_MASK: u64 = (1 << TILE_ADDR_OFF_WIDTH) - 1;
const ROW_MASK: u8 = (1 << TILE_ADDR_ROW_WIDTH) - 1;
const COL_MASK: u8 = (1 << TILE_ADDR_COL_WIDTH) - 1;
const ARR_MASK: u64 = (1 << TILE_ADDR_ARR_WIDTH) - 1;

/// One tile of the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileAddress {
    array_offset: u64,
    column: u8,
    row: u8,
}

impl TileAddress {
    pub fn new(column: u8, row: u8) -> Self {
        Self::with_array_offset(column, row, 0)
    }

    pub fn with_array_offset(column: u8, row: u8, array_offset: u64) -> Self {
        debug_assert!(column <= COL_MASK, "column {} exceeds 7 bits", column);
        debug_assert!(row <= ROW_MASK, "row {} exceeds 5 bits", row);
        debug_assert!(array_offset <= ARR_MASK, "array offset exceeds 34 bits");
        Self {
            array_offset: array_offset & ARR_MASK,
            column: column & COL_MASK,
            row: row & ROW_MASK,
        }
    }

    /// The tile at (col, row) of the array `device` describes.
    pub fn in_device(device: &airbin_ir::Device, column: u8, row: u8) -> Self {
        Self::with_array_offset(column, row, device.array_offset)
    }

    pub fn column(&self) -> u8 {
        self.column
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn array_offset(&self) -> u64 {
        self.array_offset
    }

    /// Shim tiles live in row 0.
    pub fn is_shim(&self) -> bool {
        self.row == 0
    }

    /// Combine this tile with a register offset.
    pub fn full_address(&self, register_offset: u32) -> u64 {
        (self.array_offset << TILE_ADDR_ARR_SHIFT)
            | ((self.column as u64) << TILE_ADDR_COL_SHIFT)
            | ((self.row as u64) << TILE_ADDR_ROW_SHIFT)
            | (register_offset as u64 & OFFSET_MASK)
    }

    /// Split a global address back into tile and offset.
    pub fn decode(global: u64) -> (Self, u32) {
        let tile = Self {
            array_offset: (global >> TILE_ADDR_ARR_SHIFT) & ARR_MASK,
            column: ((global >> TILE_ADDR_COL_SHIFT) as u8) & COL_MASK,
            row: ((global >> TILE_ADDR_ROW_SHIFT) as u8) & ROW_MASK,
        };
        (tile, (global & OFFSET_MASK) as u32)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{}>", self.column, self.row)
    }
}

/// A register inside a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    tile: TileAddress,
    offset: u32,
}

impl Address {
    pub fn new(tile: TileAddress, offset: u32) -> Self {
        debug_assert!(
            offset < TILE_WINDOW_SIZE,
            "offset {:#x} is outside the tile window",
            offset
        );
        Self {
            tile,
            offset: offset & (TILE_WINDOW_SIZE - 1),
        }
    }

    pub fn global(&self) -> u64 {
        self.tile.full_address(self.offset)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:#07x}", self.tile, self.offset)
    }
}

/// Global address of `offset` inside `tile`.
pub fn address(tile: TileAddress, offset: u32) -> u64 {
    Address::new(tile, offset).global()
}

/// True for boundary (shim) tiles.
pub fn is_boundary(tile: TileAddress) -> bool {
    tile.is_shim()
}
