//! Airbin Intermediate Representation (IR)
//!
//! This crate defines the serializable device description consumed by the
//! configuration compiler. It is a flat, already-materialized view of the
//! operation graph that describes an AI Engine array:
//!
//! 1. **Tiles**: shim (row 0) and compute tiles, optionally with a compiled core program.
//! 2. **Memory DMAs**: descriptor-chain blocks, lock usage and channel start commands.
//! 3. **Switchboxes**: circuit connections, master sets and packet routing tables.
//! 4. **Shim muxes**: south-bound mux/demux connections on boundary tiles.
//!
//! Cross references (buffers, locks, amsels, block labels) are by name.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Default schema version for descriptions that do not carry one.
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_element_bits() -> u32 {
    32
}

/// Shim columns that carry a NOC interface (traffic-capable boundary tiles)
/// on the reference array.
pub const NOC_COLUMNS: [u8; 16] = [2, 3, 6, 7, 10, 11, 18, 19, 26, 27, 34, 35, 42, 43, 46, 47];

/// The top-level root of a device description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Version of the description format.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// The name of the device (e.g., "xcvc1902").
    pub name: String,

    /// Offset of the array inside the global address space, in units of
    /// whole arrays.
    #[serde(default)]
    pub array_offset: u64,

    /// Every tile used by the design.
    pub tiles: Vec<Tile>,

    /// Buffers placed in tile data memory.
    #[serde(default)]
    pub buffers: Vec<Buffer>,

    /// Hardware locks referenced by DMA blocks.
    #[serde(default)]
    pub locks: Vec<Lock>,

    /// Memory-module DMA programs, one per tile.
    #[serde(default)]
    pub mems: Vec<MemDma>,

    /// Stream switch configurations.
    #[serde(default)]
    pub switchboxes: Vec<Switchbox>,

    /// Shim mux/demux configurations.
    #[serde(default)]
    pub shim_muxes: Vec<ShimMux>,
}

impl Device {
    /// Look up a tile declaration by coordinates.
    pub fn tile(&self, col: u8, row: u8) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.col == col && t.row == row)
    }

    /// Look up a buffer declaration by name.
    pub fn buffer(&self, name: &str) -> Option<&Buffer> {
        self.buffers.iter().find(|b| b.name == name)
    }

    /// Look up a lock declaration by name.
    pub fn lock(&self, name: &str) -> Option<&Lock> {
        self.locks.iter().find(|l| l.name == name)
    }
}

/// The role a tile plays in the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// Row-0 tile with a NOC interface and a shim DMA.
    ShimNoc,
    /// Row-0 tile bridging to programmable logic only.
    ShimPl,
    /// Core + data memory tile.
    Compute,
}

/// A single tile declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    /// Column index. Column 0 is never addressable.
    pub col: u8,
    /// Row index. Row 0 is the shim row.
    pub row: u8,
    /// Explicit tile kind; derived from the coordinates when absent.
    #[serde(default)]
    pub kind: Option<TileKind>,
    /// Core program attached to a compute tile.
    #[serde(default)]
    pub core: Option<Core>,
}

impl Tile {
    /// The declared kind, or the kind implied by the coordinates.
    pub fn kind(&self) -> TileKind {
        match self.kind {
            Some(kind) => kind,
            None if self.row > 0 => TileKind::Compute,
            None if NOC_COLUMNS.contains(&self.col) => TileKind::ShimNoc,
            None => TileKind::ShimPl,
        }
    }

    /// True for row-0 tiles, whatever their declared kind.
    pub fn is_shim(&self) -> bool {
        self.row == 0
    }
}

/// The compiled program attached to a compute tile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Core {
    /// Path of the compiled ELF. Defaults to `core_<col>_<row>.elf`.
    #[serde(default)]
    pub elf_file: Option<String>,
}

/// A buffer allocated in a tile's data memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buffer {
    /// Symbolic name referenced by DMA transfers.
    pub name: String,
    /// Owning tile column.
    pub col: u8,
    /// Owning tile row.
    pub row: u8,
    /// Resolved base address, when the allocation has already been done.
    #[serde(default)]
    pub address: Option<u64>,
    /// Width of one element in bits.
    #[serde(default = "default_element_bits")]
    pub element_bits: u32,
}

/// A hardware lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    /// Symbolic name referenced by lock uses.
    pub name: String,
    /// Owning tile column.
    pub col: u8,
    /// Owning tile row.
    pub row: u8,
    /// Hardware lock id (0-15).
    pub id: u8,
}

/// The DMA program of one tile's memory module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemDma {
    /// Tile column.
    pub col: u8,
    /// Tile row.
    pub row: u8,
    /// Descriptor-chain blocks in traversal order.
    #[serde(default)]
    pub blocks: Vec<DmaBlock>,
    /// Channel start commands.
    #[serde(default)]
    pub starts: Vec<DmaStart>,
}

/// One block of a descriptor chain. Blocks with at least one transfer
/// become a buffer descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmaBlock {
    /// Label used by successor links and start commands.
    pub label: String,
    /// Buffer transfers (at most one per buffer slot).
    #[serde(default)]
    pub transfers: Vec<BdTransfer>,
    /// Lock acquire/release operations guarding the transfer.
    #[serde(default)]
    pub locks: Vec<LockUse>,
    /// Packet header attached to the outgoing stream.
    #[serde(default)]
    pub packet: Option<PacketTag>,
    /// Label of the successor block.
    #[serde(default)]
    pub next: Option<String>,
}

/// Which of the two descriptor address registers a transfer uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferSlot {
    /// Address register A.
    #[default]
    A,
    /// Address register B.
    B,
}

/// A buffer transfer inside a DMA block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BdTransfer {
    /// Name of the transferred buffer.
    pub buffer: String,
    /// Address register used for the transfer.
    #[serde(default)]
    pub slot: BufferSlot,
    /// Byte offset added to the buffer base.
    #[serde(default)]
    pub offset: u32,
    /// Transfer length in elements.
    pub len: u32,
}

/// Lock operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockAction {
    /// Acquire before the transfer.
    Acquire,
    /// Release after the transfer.
    Release,
}

/// A lock operation inside a DMA block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockUse {
    /// Name of the lock.
    pub lock: String,
    /// Acquire or release.
    pub action: LockAction,
    /// Lock value; 0xFF matches any value.
    pub value: u32,
}

/// Packet header emitted by a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketTag {
    /// Packet id (5 bits).
    pub id: u8,
    /// Packet type (3 bits).
    #[serde(rename = "type")]
    pub r#type: u8,
}

/// Direction of a tile DMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelDir {
    /// Stream to memory.
    S2mm,
    /// Memory to stream.
    Mm2s,
}

/// Start a DMA channel on a block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmaStart {
    /// Channel direction.
    pub direction: ChannelDir,
    /// Channel index within the direction.
    pub channel: u8,
    /// Label of the first block.
    pub block: String,
}

/// Stream switch port group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireBundle {
    /// Core stream ports.
    Core,
    /// Tile DMA ports.
    Dma,
    /// Switch FIFOs.
    Fifo,
    /// Ports facing south.
    South,
    /// Ports facing west.
    West,
    /// Ports facing north.
    North,
    /// Ports facing east.
    East,
    /// Programmable logic I/O.
    Plio,
    /// Network on chip.
    Noc,
    /// Trace ports.
    Trace,
    /// Control ports.
    Ctrl,
}

/// Side of a stream switch a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    /// Input side: connection sources and packet rule tables.
    Slave,
    /// Output side: connection destinations and master sets.
    Master,
}

impl WireBundle {
    /// First stream switch port number of this bundle and how many ports it
    /// has, on one side of a shim or compute tile switch. `None` for bundles
    /// that have no stream switch mapping.
    pub fn switch_ports(self, direction: PortDirection, is_shim: bool) -> Option<(u32, u32)> {
        use PortDirection::{Master, Slave};
        use WireBundle::*;
        let ports = match (self, direction, is_shim) {
            (Dma, _, true) => (2, 1),
            (Dma, _, false) => (2, 2),
            (South, Slave, true) => (3, 8),
            (South, Master, true) => (3, 6),
            (South, Slave, false) => (7, 6),
            (South, Master, false) => (7, 4),
            (West, Slave, true) => (11, 4),
            (West, Master, true) => (9, 4),
            (West, Slave, false) => (13, 4),
            (West, Master, false) => (11, 4),
            (North, Slave, true) => (15, 4),
            (North, Master, true) => (13, 6),
            (North, Slave, false) => (17, 4),
            (North, Master, false) => (15, 6),
            (East, _, true) => (19, 4),
            (East, _, false) => (21, 4),
            _ => return None,
        };
        Some(ports)
    }
}

/// A bundle plus an index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port group.
    pub bundle: WireBundle,
    /// Index within the group.
    pub index: u8,
}

/// A circuit-switched connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Connect {
    /// Slave (input) side.
    pub source: Port,
    /// Master (output) side.
    pub dest: Port,
}

/// An arbiter / master-select pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amsel {
    /// Symbolic name.
    pub name: String,
    /// Arbiter index (0-5).
    pub arbiter: u8,
    /// Master select value (0-3).
    pub msel: u8,
}

/// A packet-switched master port fed by one or more amsels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterSet {
    /// Master port.
    pub dest: Port,
    /// Names of the amsels selecting into this master.
    pub amsels: Vec<String>,
}

/// One packet routing rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketRule {
    /// Packet id mask.
    pub mask: u8,
    /// Packet id match value.
    pub value: u8,
    /// Amsel the matching packets are routed to.
    pub amsel: String,
}

/// A routing table attached to one slave port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketRules {
    /// Slave port.
    pub source: Port,
    /// Rules in slot order.
    pub rules: Vec<PacketRule>,
}

/// Stream switch configuration of one tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Switchbox {
    /// Tile column.
    pub col: u8,
    /// Tile row.
    pub row: u8,
    /// Circuit connections.
    #[serde(default)]
    pub connects: Vec<Connect>,
    /// Amsels available to master sets and packet rules.
    #[serde(default)]
    pub amsels: Vec<Amsel>,
    /// Packet-switched masters.
    #[serde(default)]
    pub master_sets: Vec<MasterSet>,
    /// Packet routing tables.
    #[serde(default)]
    pub packet_rules: Vec<PacketRules>,
}

impl Switchbox {
    /// A switchbox with nothing to program.
    pub fn is_empty(&self) -> bool {
        self.connects.is_empty() && self.master_sets.is_empty() && self.packet_rules.is_empty()
    }

    /// Look up an amsel by name.
    pub fn amsel(&self, name: &str) -> Option<&Amsel> {
        self.amsels.iter().find(|a| a.name == name)
    }
}

/// Mux/demux configuration of a shim tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShimMux {
    /// Tile column.
    pub col: u8,
    /// Tile row (always the shim row).
    #[serde(default)]
    pub row: u8,
    /// Connections through the mux.
    #[serde(default)]
    pub connects: Vec<Connect>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_kind_defaults() {
        let yaml = r#"
name: "dev"
tiles:
  - { col: 3, row: 0 }
  - { col: 4, row: 0 }
  - { col: 4, row: 0, kind: shim_noc }
  - { col: 3, row: 2 }
"#;
        let dev: Device = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(dev.schema_version, "1.0");
        assert_eq!(dev.tiles[0].kind(), TileKind::ShimNoc);
        assert_eq!(dev.tiles[1].kind(), TileKind::ShimPl);
        assert_eq!(dev.tiles[2].kind(), TileKind::ShimNoc);
        assert_eq!(dev.tiles[3].kind(), TileKind::Compute);
        assert!(dev.tiles[0].is_shim());
        assert!(!dev.tiles[3].is_shim());
    }

    #[test]
    fn test_dma_block_parses() {
        let yaml = r#"
col: 7
row: 1
blocks:
  - label: bd0
    transfers:
      - { buffer: a, len: 256 }
      - { buffer: b, slot: b, offset: 16, len: 256 }
    locks:
      - { lock: lk, action: acquire, value: 0 }
    packet: { id: 3, type: 1 }
    next: bd1
starts:
  - { direction: mm2s, channel: 0, block: bd0 }
"#;
        let mem: MemDma = serde_yaml::from_str(yaml).unwrap();
        let block = &mem.blocks[0];
        assert_eq!(block.transfers[0].slot, BufferSlot::A);
        assert_eq!(block.transfers[1].slot, BufferSlot::B);
        assert_eq!(block.transfers[1].offset, 16);
        assert_eq!(block.locks[0].action, LockAction::Acquire);
        assert_eq!(block.packet.unwrap().r#type, 1);
        assert_eq!(block.next.as_deref(), Some("bd1"));
        assert_eq!(mem.starts[0].direction, ChannelDir::Mm2s);
    }

    #[test]
    fn test_switchbox_json() {
        let json = r#"{
            "col": 2, "row": 3,
            "connects": [{"source": {"bundle": "dma", "index": 0},
                          "dest": {"bundle": "north", "index": 1}}],
            "amsels": [{"name": "a0", "arbiter": 0, "msel": 1}]
        }"#;
        let sb: Switchbox = serde_json::from_str(json).unwrap();
        assert!(!sb.is_empty());
        assert_eq!(sb.connects[0].dest.bundle, WireBundle::North);
        assert_eq!(sb.amsel("a0").unwrap().msel, 1);
        assert!(sb.amsel("missing").is_none());
    }

    #[test]
    fn test_switch_port_ranges() {
        use PortDirection::{Master, Slave};
        // Compute tile: 27 slave and 25 master registers, the last two
        // slaves being trace ports.
        assert_eq!(WireBundle::East.switch_ports(Slave, false), Some((21, 4)));
        assert_eq!(WireBundle::North.switch_ports(Master, false), Some((15, 6)));
        assert_eq!(WireBundle::East.switch_ports(Master, false), Some((21, 4)));
        // Shim tile: 24 slave and 23 master registers.
        assert_eq!(WireBundle::South.switch_ports(Slave, true), Some((3, 8)));
        assert_eq!(WireBundle::East.switch_ports(Master, true), Some((19, 4)));
        assert_eq!(WireBundle::Trace.switch_ports(Slave, false), None);
        assert_eq!(WireBundle::Plio.switch_ports(Master, true), None);
    }
}
