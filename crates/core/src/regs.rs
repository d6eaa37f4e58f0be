// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Register map of the AI Engine tiles.
//!
//! All offsets are relative to the 18-bit window of one tile.

use crate::field::{Bit, Field};

// Memories
pub const DATA_MEM_BASE: u32 = 0x0_0000;
pub const DATA_MEM_SIZE: u32 = 0x8000;
pub const PROG_MEM_BASE: u32 = 0x2_0000;
pub const PROG_MEM_SIZE: u32 = 0x4000;

// Tile DMA
pub const DMA_BD_BASE: u32 = 0x1_D000;
pub const DMA_BD_SIZE: u32 = 0x20;
pub const DMA_BD_COUNT: u32 = 16;
pub const DMA_S2MM_BASE: u32 = 0x1_DE00;
pub const DMA_MM2S_BASE: u32 = 0x1_DE10;
pub const DMA_CHANNEL_STRIDE: u32 = 0x8;
pub const DMA_CHANNEL_COUNT: u32 = 2;
pub const DMA_CHANNEL_QUEUE: u32 = 0x4;

// Word offsets inside one tile DMA descriptor
pub const BD_ADDR_A: u32 = 0x00;
pub const BD_ADDR_B: u32 = 0x04;
pub const BD_2D_X: u32 = 0x08;
pub const BD_2D_Y: u32 = 0x0C;
pub const BD_PACKET: u32 = 0x10;
pub const BD_INTERLEAVE: u32 = 0x14;
pub const BD_CONTROL: u32 = 0x18;

pub const BD_2D_X_DEFAULT: u32 = 0x00FF_0001;
pub const BD_2D_Y_DEFAULT: u32 = 0xFFFF_0100;

// Shim DMA and mux
pub const SHIM_DMA_BD_BASE: u32 = 0x1_D000;
pub const SHIM_DMA_BD_SIZE: u32 = 0x14;
pub const SHIM_DMA_BD_COUNT: u32 = 16;
pub const SHIM_MUX_BASE: u32 = 0x1_F000;
pub const SHIM_DEMUX_BASE: u32 = 0x1_F004;

// Stream switch
pub const SS_MASTER_BASE: u32 = 0x3_F000;
pub const SS_SLAVE_BASE: u32 = 0x3_F100;
pub const SS_SLOT_BASE: u32 = 0x3_F200;
pub const SS_SLOT_STRIDE: u32 = 0x10;
pub const SS_SLOTS_PER_PORT: usize = 4;

pub const ME_SS_MASTER_SIZE: u32 = 0x64;
pub const ME_SS_SLAVE_SIZE: u32 = 0x6C;
pub const ME_SS_SLOT_PORTS: u32 = 26;
pub const SHIM_SS_MASTER_SIZE: u32 = 0x5C;
pub const SHIM_SS_SLAVE_SIZE: u32 = 0x60;
pub const SHIM_SS_SLOT_PORTS: u32 = 24;

/// A descriptor slot that does not exist.
pub const INVALID_BD: u8 = 0xFF;
/// Lock value meaning "do not compare".
pub const LOCK_VALUE_ANY: u32 = 0xFF;

/// Buffer descriptor address word (A or B).
pub mod bd_addr {
    use super::*;

    pub type LockId = Field<25, 22>;
    pub type ReleaseEnable = Bit<21>;
    pub type ReleaseValue = Bit<20>;
    pub type ReleaseValueEnable = Bit<19>;
    pub type AcquireEnable = Bit<18>;
    pub type AcquireValue = Bit<17>;
    pub type AcquireValueEnable = Bit<16>;
    pub type Base = Field<12, 0>;
}

/// Buffer descriptor control word.
pub mod bd_control {
    use super::*;

    pub type Valid = Bit<31>;
    pub type AbMode = Bit<30>;
    pub type FifoMode = Bit<28>;
    pub type PacketEnable = Bit<27>;
    pub type NextEnable = Bit<17>;
    pub type NextBd = Field<16, 13>;
    pub type Length = Field<12, 0>;
}

/// Buffer descriptor packet word.
pub mod bd_packet {
    use super::*;

    pub type Type = Field<14, 12>;
    pub type Id = Field<4, 0>;
}

/// DMA channel control and start queue.
pub mod channel {
    use super::*;

    pub type Reset = Bit<1>;
    pub type Enable = Bit<0>;
    pub type StartBd = Field<4, 0>;
}

/// Stream switch master and slave port words.
pub mod stream {
    use super::*;

    pub type Enable = Bit<31>;
    pub type PacketEnable = Bit<30>;
    pub type DropHeader = Bit<7>;
    pub type Config = Field<6, 0>;
}

/// Stream switch packet slot word.
pub mod slot {
    use super::*;

    pub type Id = Field<28, 24>;
    pub type Mask = Field<20, 16>;
    pub type Enable = Bit<8>;
    pub type Msel = Field<5, 4>;
    pub type Arbiter = Field<2, 0>;
}

/// Offset of descriptor `index` in the tile DMA table.
pub const fn bd_offset(index: u32) -> u32 {
    DMA_BD_BASE + index * DMA_BD_SIZE
}

/// Offset of packet slot `slot` of slave port `port`.
pub const fn slot_offset(port: u32, slot: u32) -> u32 {
    SS_SLOT_BASE + SS_SLOT_STRIDE * port + 4 * slot
}
