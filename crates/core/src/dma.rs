// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Tile DMA: buffer descriptor chains and channel start commands.

use std::collections::HashMap;

use airbin_ir::{BufferSlot, ChannelDir, Device, DmaBlock, LockAction, MemDma, PacketTag};

use crate::address::TileAddress;
use crate::regs::*;
use crate::write_log::WriteLog;
use crate::{BufferResolver, DiagnosticKind, Diagnostics};

/// One side (A or B) of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BdBuffer {
    /// Absolute address of the first transferred byte.
    pub address: u64,
    /// Transfer length in elements.
    pub len: u32,
    pub element_bytes: u32,
}

/// Lock guarding a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BdLock {
    pub id: u8,
    pub acquire: Option<u32>,
    pub release: Option<u32>,
}

/// Everything needed to encode one descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BdInfo {
    pub a: Option<BdBuffer>,
    pub b: Option<BdBuffer>,
    pub lock: Option<BdLock>,
    pub packet: Option<PacketTag>,
    pub ab_mode: bool,
    pub fifo_mode: bool,
}

impl BdInfo {
    fn length(&self) -> u32 {
        self.a.or(self.b).map_or(0, |buf| buf.len)
    }
}

/// Register image of one tile DMA descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BdRegisters {
    pub addr_a: u32,
    pub addr_b: u32,
    pub x: u32,
    pub y: u32,
    pub packet: u32,
    pub interleave: u32,
    pub control: u32,
}

impl Default for BdRegisters {
    fn default() -> Self {
        Self {
            addr_a: 0,
            addr_b: 0,
            x: BD_2D_X_DEFAULT,
            y: BD_2D_Y_DEFAULT,
            packet: 0,
            interleave: 0,
            control: 0,
        }
    }
}

impl BdRegisters {
    /// (word offset, value) pairs in register order.
    pub fn words(&self) -> [(u32, u32); 7] {
        [
            (BD_ADDR_A, self.addr_a),
            (BD_ADDR_B, self.addr_b),
            (BD_2D_X, self.x),
            (BD_2D_Y, self.y),
            (BD_PACKET, self.packet),
            (BD_INTERLEAVE, self.interleave),
            (BD_CONTROL, self.control),
        ]
    }
}

fn lock_bits(lock: &BdLock) -> u32 {
    use bd_addr::*;

    // An action that is not used still compares against value 0.
    let acquire = lock.acquire.unwrap_or(0);
    let release = lock.release.unwrap_or(0);

    let mut word = LockId::set(lock.id as u32)
        | ReleaseEnable::flag(lock.release.is_some())
        | AcquireEnable::flag(lock.acquire.is_some());
    if release != LOCK_VALUE_ANY {
        word |= ReleaseValueEnable::flag(true) | ReleaseValue::set(release);
    }
    if acquire != LOCK_VALUE_ANY {
        word |= AcquireValueEnable::flag(true) | AcquireValue::set(acquire);
    }
    word
}

fn base_bits(buf: Option<BdBuffer>) -> u32 {
    buf.map_or(0, |b| bd_addr::Base::set((b.address >> 2) as u32))
}

/// Encode a descriptor. `next` is the slot of the successor block, if any.
pub fn encode_bd(info: &BdInfo, next: Option<u8>) -> BdRegisters {
    use bd_control::*;

    let mut regs = BdRegisters::default();

    if info.a.is_some() {
        if let Some(lock) = &info.lock {
            regs.addr_a = lock_bits(lock);
        }
    }
    regs.addr_a |= base_bits(info.a);
    regs.addr_b = base_bits(info.b);

    regs.control = Length::set(info.length().wrapping_sub(1))
        | FifoMode::flag(info.fifo_mode)
        | AbMode::flag(info.ab_mode);

    if let Some(slot) = next {
        if slot != INVALID_BD {
            regs.control |= NextEnable::flag(true) | NextBd::set(slot as u32);
        }
    }

    if let Some(packet) = info.packet {
        regs.packet =
            bd_packet::Id::set(packet.id as u32) | bd_packet::Type::set(packet.r#type as u32);
        regs.control |= PacketEnable::flag(true);
    }

    regs.control |= Valid::flag(true);
    regs
}

/// Gather the descriptor information of one block.
///
/// Returns `None` when the block produces no descriptor.
pub fn bd_info(
    device: &Device,
    resolver: &dyn BufferResolver,
    tile: TileAddress,
    block: &DmaBlock,
    diags: &mut Diagnostics,
) -> Option<BdInfo> {
    if block.transfers.is_empty() {
        return None;
    }

    let mut info = BdInfo::default();
    for transfer in &block.transfers {
        let Some(base) = resolver.resolve(&transfer.buffer) else {
            diags.report(
                DiagnosticKind::Contract,
                tile,
                format!(
                    "block '{}': buffer '{}' has no address",
                    block.label, transfer.buffer
                ),
            );
            return None;
        };
        let element_bits = device.buffer(&transfer.buffer).map_or(32, |b| b.element_bits);
        let buf = BdBuffer {
            address: base + transfer.offset as u64,
            len: transfer.len,
            element_bytes: element_bits / 8,
        };
        match transfer.slot {
            BufferSlot::A => info.a = Some(buf),
            BufferSlot::B => info.b = Some(buf),
        }
    }

    if let (Some(a), Some(b)) = (info.a, info.b) {
        info.ab_mode = true;
        if a.len != b.len {
            diags.report(
                DiagnosticKind::AbModeMismatch,
                tile,
                format!(
                    "block '{}': AB mode needs matching lengths ({} vs {})",
                    block.label, a.len, b.len
                ),
            );
        }
        if a.element_bytes != b.element_bytes {
            diags.report(
                DiagnosticKind::AbModeMismatch,
                tile,
                format!(
                    "block '{}': AB mode needs matching element types ({} vs {} bytes)",
                    block.label, a.element_bytes, b.element_bytes
                ),
            );
        }
    }

    if !block.locks.is_empty() {
        let mut lock = None;
        for use_lock in &block.locks {
            let Some(decl) = device.lock(&use_lock.lock) else {
                diags.report(
                    DiagnosticKind::Contract,
                    tile,
                    format!("block '{}': unknown lock '{}'", block.label, use_lock.lock),
                );
                lock = None;
                break;
            };
            let entry = lock.get_or_insert(BdLock {
                id: decl.id,
                acquire: None,
                release: None,
            });
            entry.id = decl.id;
            match use_lock.action {
                LockAction::Acquire => entry.acquire = Some(use_lock.value),
                LockAction::Release => entry.release = Some(use_lock.value),
            }
        }
        info.lock = lock;

        if info.b.is_some() {
            diags.report(
                DiagnosticKind::Unimplemented,
                tile,
                format!(
                    "block '{}': locks on buffer B are not supported, B carries its address only",
                    block.label
                ),
            );
        }
    }

    info.packet = block.packet;
    Some(info)
}

/// Number the blocks that produce a descriptor, in traversal order.
pub fn assign_slots<'a>(labels: impl IntoIterator<Item = &'a str>) -> HashMap<&'a str, u8> {
    labels
        .into_iter()
        .enumerate()
        .map(|(n, label)| (label, u8::try_from(n).unwrap_or(INVALID_BD)))
        .collect()
}

fn channel_registers(direction: ChannelDir, channel: u8) -> (u32, u32) {
    let base = match direction {
        ChannelDir::S2mm => DMA_S2MM_BASE,
        ChannelDir::Mm2s => DMA_MM2S_BASE,
    };
    let ctrl = base + DMA_CHANNEL_STRIDE * channel as u32;
    (ctrl, ctrl + DMA_CHANNEL_QUEUE)
}

fn reset_channels(log: &mut WriteLog, tile: TileAddress) {
    let idle = channel::Reset::flag(false) | channel::Enable::flag(false);
    for direction in [ChannelDir::S2mm, ChannelDir::Mm2s] {
        for ch in 0..DMA_CHANNEL_COUNT as u8 {
            let (ctrl, queue) = channel_registers(direction, ch);
            log.write(tile, ctrl, idle);
            log.write(tile, queue, 0);
        }
    }
}

fn configure_mem(
    log: &mut WriteLog,
    device: &Device,
    resolver: &dyn BufferResolver,
    mem: &MemDma,
    diags: &mut Diagnostics,
) {
    let tile = TileAddress::in_device(device, mem.col, mem.row);
    if tile.is_shim() {
        diags.report(DiagnosticKind::Contract, tile, "shim tiles have no memory DMA");
        return;
    }
    tracing::debug!("{}: DMA with {} blocks", tile, mem.blocks.len());

    reset_channels(log, tile);

    // Blocks that cannot be encoded get no slot, so links to them stay disabled.
    let descriptors: Vec<(&DmaBlock, BdInfo)> = mem
        .blocks
        .iter()
        .filter_map(|block| Some((block, bd_info(device, resolver, tile, block, diags)?)))
        .collect();
    let slots = assign_slots(descriptors.iter().map(|(block, _)| block.label.as_str()));
    let slot_of = |label: &str| slots.get(label).copied().unwrap_or(INVALID_BD);

    for (block, info) in &descriptors {
        let slot = slot_of(&block.label);
        if slot as u32 >= DMA_BD_COUNT {
            diags.report(
                DiagnosticKind::Contract,
                tile,
                format!("block '{}': no descriptor left (slot {})", block.label, slot),
            );
            continue;
        }

        let next = block.next.as_deref().map(slot_of);
        let regs = encode_bd(info, next);
        let base = bd_offset(slot as u32);
        for (offset, value) in regs.words() {
            log.write(tile, base + offset, value);
        }
        tracing::debug!(
            "{}: BD{} '{}' control={:#010x}",
            tile,
            slot,
            block.label,
            regs.control
        );
    }

    for start in &mem.starts {
        let slot = slot_of(&start.block);
        if slot == INVALID_BD {
            tracing::debug!("{}: start of '{}' has no descriptor", tile, start.block);
            continue;
        }
        if start.channel as u32 >= DMA_CHANNEL_COUNT {
            diags.report(
                DiagnosticKind::Contract,
                tile,
                format!("{:?} channel {} does not exist", start.direction, start.channel),
            );
            continue;
        }
        let (ctrl, queue) = channel_registers(start.direction, start.channel);
        log.write(tile, queue, channel::StartBd::set(slot as u32));
        log.write(
            tile,
            ctrl,
            channel::Enable::flag(true) | channel::Reset::flag(false),
        );
    }
}

/// Third configuration phase: program every memory DMA.
pub fn configure_dmas(
    log: &mut WriteLog,
    device: &Device,
    resolver: &dyn BufferResolver,
    diags: &mut Diagnostics,
) {
    tracing::info!("Configuring {} memory DMAs", device.mems.len());
    for mem in &device.mems {
        configure_mem(log, device, resolver, mem, diags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE: &str = r#"
name: d
tiles:
  - { col: 7, row: 1 }
buffers:
  - { name: a, col: 7, row: 1, address: 0x1000 }
  - { name: b, col: 7, row: 1, address: 0x2000 }
  - { name: half, col: 7, row: 1, address: 0x3000, element_bits: 16 }
  - { name: nowhere, col: 7, row: 1 }
locks:
  - { name: lk, col: 7, row: 1, id: 5 }
"#;

    fn device_with(mems: &str) -> Device {
        serde_yaml::from_str(&format!("{}mems:\n{}", DEVICE, mems)).unwrap()
    }

    fn compile(device: &Device) -> (WriteLog, Diagnostics) {
        let mut log = WriteLog::new();
        let mut diags = Diagnostics::new();
        configure_dmas(&mut log, device, device, &mut diags);
        (log, diags)
    }

    const TILE: (u8, u8) = (7, 1);

    fn tile() -> TileAddress {
        TileAddress::new(TILE.0, TILE.1)
    }

    #[test]
    fn test_single_locked_descriptor() {
        let dev = device_with(
            r#"
  - col: 7
    row: 1
    blocks:
      - label: bd0
        transfers: [{ buffer: a, offset: 16, len: 256 }]
        locks:
          - { lock: lk, action: acquire, value: 1 }
          - { lock: lk, action: release, value: 0 }
        next: bd0
    starts:
      - { direction: mm2s, channel: 1, block: bd0 }
"#,
        );
        let (log, diags) = compile(&dev);
        assert!(diags.is_empty());

        let addr_a = log.read(tile(), 0x1D000);
        assert_eq!(addr_a >> 22 & 0xF, 5, "lock id");
        assert_eq!(addr_a & (1 << 21), 1 << 21, "release enable");
        assert_eq!(addr_a & (1 << 20), 0, "release value 0");
        assert_eq!(addr_a & (1 << 19), 1 << 19, "release value enable");
        assert_eq!(addr_a & (0x7 << 16), 0x7 << 16, "acquire enable/value/value enable");
        assert_eq!(addr_a & 0x1FFF, (0x1010 >> 2) & 0x1FFF);

        assert_eq!(log.read(tile(), 0x1D008), 0x00FF_0001);
        assert_eq!(log.read(tile(), 0x1D00C), 0xFFFF_0100);
        let control = log.read(tile(), 0x1D018);
        assert_eq!(control & 0x1FFF, 255);
        assert_eq!(control & (1 << 17), 1 << 17, "self loop");
        assert_eq!(control >> 13 & 0xF, 0);
        assert_eq!(control & (1 << 31), 1 << 31);

        assert_eq!(log.read(tile(), 0x1DE1C), 0, "queue holds BD0");
        assert_eq!(log.read(tile(), 0x1DE18), 1);
        assert_eq!(log.read(tile(), 0x1DE10), 0);
        assert_eq!(log.len(), 7 + 8);
    }

    #[test]
    fn test_any_value_disables_compare() {
        let lock = BdLock {
            id: 2,
            acquire: Some(LOCK_VALUE_ANY),
            release: None,
        };
        let word = lock_bits(&lock);
        assert_eq!(word & (1 << 16), 0, "acquire value enable cleared");
        assert_eq!(word & (1 << 18), 1 << 18);
        assert_eq!(word & (1 << 21), 0, "no release");
        assert_eq!(word & (1 << 19), 1 << 19);
    }

    #[test]
    fn test_unlocked_block_has_no_lock_bits() {
        let info = BdInfo {
            a: Some(BdBuffer {
                address: 0x1000,
                len: 4,
                element_bytes: 4,
            }),
            ..Default::default()
        };
        let regs = encode_bd(&info, None);
        assert_eq!(regs.addr_a, 0x400);
        assert_eq!(regs.control, (1 << 31) | 3);
    }

    #[test]
    fn test_packet_tag() {
        let info = BdInfo {
            a: Some(BdBuffer {
                address: 0,
                len: 1,
                element_bytes: 4,
            }),
            packet: Some(PacketTag { id: 3, r#type: 5 }),
            ..Default::default()
        };
        let regs = encode_bd(&info, Some(INVALID_BD));
        assert_eq!(regs.packet, 3 | (5 << 12));
        assert_eq!(regs.control, (1 << 31) | (1 << 27));
    }

    #[test]
    fn test_ab_mode_mismatch_still_encodes() {
        let dev = device_with(
            r#"
  - col: 7
    row: 1
    blocks:
      - label: bd0
        transfers:
          - { buffer: a, len: 64 }
          - { buffer: half, slot: b, len: 32 }
"#,
        );
        let (log, diags) = compile(&dev);
        assert_eq!(diags.count(DiagnosticKind::AbModeMismatch), 2);
        let control = log.read(tile(), 0x1D018);
        assert_eq!(control & (1 << 30), 1 << 30);
        assert_eq!(log.read(tile(), 0x1D004), 0x3000 >> 2);
    }

    #[test]
    fn test_buffer_b_lock_is_unimplemented() {
        let dev = device_with(
            r#"
  - col: 7
    row: 1
    blocks:
      - label: bd0
        transfers:
          - { buffer: b, slot: b, len: 8 }
        locks:
          - { lock: lk, action: acquire, value: 0 }
"#,
        );
        let (log, diags) = compile(&dev);
        assert_eq!(diags.count(DiagnosticKind::Unimplemented), 1);
        assert_eq!(log.read(tile(), 0x1D004), 0x2000 >> 2);
        assert_eq!(log.read(tile(), 0x1D000), 0);
    }

    #[test]
    fn test_unresolved_buffer_skips_block() {
        let dev = device_with(
            r#"
  - col: 7
    row: 1
    blocks:
      - label: bd0
        transfers: [{ buffer: nowhere, len: 8 }]
"#,
        );
        let (log, diags) = compile(&dev);
        assert_eq!(diags.count(DiagnosticKind::Contract), 1);
        assert_eq!(log.len(), 8, "channel registers only");
    }

    #[test]
    fn test_start_on_empty_block_is_skipped() {
        let dev = device_with(
            r#"
  - col: 7
    row: 1
    blocks:
      - label: end
    starts:
      - { direction: s2mm, channel: 0, block: end }
"#,
        );
        let (log, diags) = compile(&dev);
        assert!(diags.is_empty());
        assert_eq!(log.read(tile(), 0x1DE00), 0);
        assert_eq!(log.read(tile(), 0x1DE04), 0);
        assert_eq!(log.len(), 8);
    }

    #[test]
    fn test_slots_skip_empty_blocks() {
        let dev = device_with(
            r#"
  - col: 7
    row: 1
    blocks:
      - label: first
        transfers: [{ buffer: a, len: 4 }]
        next: second
      - label: idle
      - label: second
        transfers: [{ buffer: b, len: 4 }]
        next: idle
"#,
        );
        let (log, _) = compile(&dev);
        let first = log.read(tile(), 0x1D018);
        assert_eq!(first >> 13 & 0xF, 1);
        assert_eq!(first & (1 << 17), 1 << 17);
        let second = log.read(tile(), 0x1D038);
        assert_eq!(second & (1 << 17), 0, "successor without descriptor");
    }

    #[test]
    fn test_mem_on_shim_writes_nothing() {
        let dev: Device = serde_yaml::from_str(
            r#"
name: d
tiles: [{ col: 2, row: 0 }]
buffers: [{ name: a, col: 2, row: 0, address: 0x1000 }]
mems:
  - col: 2
    row: 0
    blocks: [{ label: bd0, transfers: [{ buffer: a, len: 4 }] }]
    starts: [{ direction: s2mm, channel: 0, block: bd0 }]
"#,
        )
        .unwrap();
        let (log, diags) = compile(&dev);
        assert!(log.is_empty());
        assert_eq!(diags.count(DiagnosticKind::Contract), 1);
    }

    #[test]
    fn test_assign_slots_numbers_in_order() {
        let slots = assign_slots(["first", "second"]);
        assert_eq!(slots.get("first"), Some(&0));
        assert_eq!(slots.get("second"), Some(&1));
        assert_eq!(slots.get("idle"), None);
    }

    #[test]
    fn test_unresolved_block_gives_up_its_slot() {
        let dev = device_with(
            r#"
  - col: 7
    row: 1
    blocks:
      - label: first
        transfers: [{ buffer: a, len: 4 }]
        next: lost
      - label: lost
        transfers: [{ buffer: nowhere, len: 4 }]
        next: last
      - label: last
        transfers: [{ buffer: b, len: 4 }]
    starts:
      - { direction: mm2s, channel: 0, block: lost }
"#,
        );
        let (log, diags) = compile(&dev);
        assert_eq!(diags.count(DiagnosticKind::Contract), 1);

        let first = log.read(tile(), 0x1D018);
        assert_eq!(first & (1 << 17), 0, "link to an unwritten descriptor");
        // The next block moves up into slot 1.
        assert_eq!(log.read(tile(), 0x1D020), 0x2000 >> 2);
        assert_eq!(log.read(tile(), 0x1D040), 0);
        assert_eq!(log.read(tile(), 0x1DE14), 0, "start is skipped");
        assert_eq!(log.read(tile(), 0x1DE10), 0);
    }
}
