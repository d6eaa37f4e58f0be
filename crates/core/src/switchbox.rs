// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Stream switch routing and shim mux/demux.

use airbin_ir::{
    Connect, Device, MasterSet, PacketRules, Port, PortDirection, ShimMux, Switchbox, WireBundle,
};

use crate::address::TileAddress;
use crate::regs::*;
use crate::write_log::WriteLog;
use crate::{DiagnosticKind, Diagnostics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("{0:?} ports have no stream switch mapping")]
    Bundle(WireBundle),
    #[error("{bundle:?} port {index} does not exist (the bundle has {count})")]
    PortIndex {
        bundle: WireBundle,
        index: u8,
        count: u32,
    },
    #[error("shim mux index {0} is not routable")]
    MuxIndex(u8),
    #[error("{0:?} cannot drive the shim mux")]
    MuxInput(WireBundle),
}

impl RouteError {
    /// Bad port indices are contract violations, everything else is unsupported.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            RouteError::PortIndex { .. } => DiagnosticKind::Contract,
            _ => DiagnosticKind::Unimplemented,
        }
    }
}

fn switch_port(
    bundle: WireBundle,
    index: u8,
    direction: PortDirection,
    is_shim: bool,
) -> Result<u32, RouteError> {
    let (base, count) = bundle
        .switch_ports(direction, is_shim)
        .ok_or(RouteError::Bundle(bundle))?;
    if index as u32 >= count {
        return Err(RouteError::PortIndex {
            bundle,
            index,
            count,
        });
    }
    Ok(base + index as u32)
}

/// Stream switch number of an input port.
pub fn slave_port(bundle: WireBundle, index: u8, is_shim: bool) -> Result<u32, RouteError> {
    switch_port(bundle, index, PortDirection::Slave, is_shim)
}

/// Stream switch number of an output port.
pub fn master_port(bundle: WireBundle, index: u8, is_shim: bool) -> Result<u32, RouteError> {
    switch_port(bundle, index, PortDirection::Master, is_shim)
}

/// Master word of a circuit connection fed by `slave`.
pub fn circuit_master_word(slave: u32) -> u32 {
    use stream::*;
    let drop_header = (slave & 0x80) >> 7;
    Enable::flag(true)
        | PacketEnable::flag(false)
        | DropHeader::set(drop_header)
        | Config::set(slave)
}

pub fn circuit_slave_word() -> u32 {
    stream::Enable::flag(true) | stream::PacketEnable::flag(false)
}

/// Master word of a packet-switched master.
pub fn master_set_word(msel_mask: u32, arbiter: u32, drop_header: bool) -> u32 {
    use stream::*;
    Enable::flag(true)
        | PacketEnable::flag(true)
        | DropHeader::flag(drop_header)
        | Config::set((msel_mask << 3) | arbiter)
}

pub fn packet_slave_word() -> u32 {
    stream::Enable::flag(true) | stream::PacketEnable::flag(true)
}

pub fn packet_slot_word(id: u8, mask: u8, msel: u8, arbiter: u8) -> u32 {
    slot::Id::set(id as u32)
        | slot::Mask::set(mask as u32)
        | slot::Enable::flag(true)
        | slot::Msel::set(msel as u32)
        | slot::Arbiter::set(arbiter as u32)
}

fn mux_input(bundle: WireBundle, shift: u32) -> Result<u32, RouteError> {
    let select = match bundle {
        WireBundle::Plio => 0,
        WireBundle::Dma => 1,
        WireBundle::Noc => 2,
        other => return Err(RouteError::MuxInput(other)),
    };
    Ok(select << shift)
}

/// Bits a connection contributes to the mux or demux register.
pub fn shim_mux_bits(connect: &Connect) -> Result<Option<(u32, u32)>, RouteError> {
    if connect.source.bundle == WireBundle::North {
        let shift = match connect.source.index {
            2 => 4,
            3 => 6,
            6 => 8,
            7 => 10,
            other => return Err(RouteError::MuxIndex(other)),
        };
        Ok(Some((SHIM_DEMUX_BASE, mux_input(connect.dest.bundle, shift)?)))
    } else if connect.dest.bundle == WireBundle::North {
        let shift = match connect.dest.index {
            2 => 8,
            3 => 10,
            6 => 12,
            7 => 14,
            other => return Err(RouteError::MuxIndex(other)),
        };
        Ok(Some((SHIM_MUX_BASE, mux_input(connect.source.bundle, shift)?)))
    } else {
        Ok(None)
    }
}

fn describe(port: &Port) -> String {
    format!("{:?}{}", port.bundle, port.index).to_lowercase()
}

fn connect_circuit(
    log: &mut WriteLog,
    tile: TileAddress,
    connect: &Connect,
) -> Result<(), RouteError> {
    let shim = tile.is_shim();
    let slave = slave_port(connect.source.bundle, connect.source.index, shim)?;
    let master = master_port(connect.dest.bundle, connect.dest.index, shim)?;

    log.write(tile, SS_MASTER_BASE + 4 * master, circuit_master_word(slave));
    log.write(tile, SS_SLAVE_BASE + 4 * slave, circuit_slave_word());
    tracing::debug!(
        "{}: {} -> {} (slave {} master {})",
        tile,
        describe(&connect.source),
        describe(&connect.dest),
        slave,
        master
    );
    Ok(())
}

fn configure_master_set(
    log: &mut WriteLog,
    tile: TileAddress,
    sb: &Switchbox,
    set: &MasterSet,
    diags: &mut Diagnostics,
) {
    let master = match master_port(set.dest.bundle, set.dest.index, tile.is_shim()) {
        Ok(port) => port,
        Err(err) => {
            diags.report(err.kind(), tile, err.to_string());
            return;
        }
    };

    let mut mask = 0u32;
    let mut arbiter = None;
    for name in &set.amsels {
        let Some(amsel) = sb.amsel(name) else {
            diags.report(
                DiagnosticKind::Contract,
                tile,
                format!("master set on {} uses unknown amsel '{}'", describe(&set.dest), name),
            );
            return;
        };
        mask |= 1 << amsel.msel;
        arbiter = Some(amsel.arbiter);
    }
    let Some(arbiter) = arbiter else {
        diags.report(
            DiagnosticKind::Contract,
            tile,
            format!("master set on {} has no amsel", describe(&set.dest)),
        );
        return;
    };

    let drop_header = set.dest.bundle == WireBundle::Dma;
    log.write(
        tile,
        SS_MASTER_BASE + 4 * master,
        master_set_word(mask, arbiter as u32, drop_header),
    );
}

fn configure_packet_rules(
    log: &mut WriteLog,
    tile: TileAddress,
    sb: &Switchbox,
    table: &PacketRules,
    diags: &mut Diagnostics,
) {
    let slave = match slave_port(table.source.bundle, table.source.index, tile.is_shim()) {
        Ok(port) => port,
        Err(err) => {
            diags.report(err.kind(), tile, err.to_string());
            return;
        }
    };

    for (slot, rule) in table.rules.iter().enumerate() {
        if slot >= SS_SLOTS_PER_PORT {
            diags.report(
                DiagnosticKind::Contract,
                tile,
                format!(
                    "{} has more than {} packet rules",
                    describe(&table.source),
                    SS_SLOTS_PER_PORT
                ),
            );
            break;
        }
        let Some(amsel) = sb.amsel(&rule.amsel) else {
            diags.report(
                DiagnosticKind::Contract,
                tile,
                format!("packet rule uses unknown amsel '{}'", rule.amsel),
            );
            continue;
        };
        log.write(tile, SS_SLAVE_BASE + 4 * slave, packet_slave_word());
        log.write(
            tile,
            slot_offset(slave, slot as u32),
            packet_slot_word(rule.value, rule.mask, amsel.msel, amsel.arbiter),
        );
    }
}

fn configure_switchbox(
    log: &mut WriteLog,
    tile: TileAddress,
    sb: &Switchbox,
    diags: &mut Diagnostics,
) {
    for connect in &sb.connects {
        if let Err(err) = connect_circuit(log, tile, connect) {
            diags.report(err.kind(), tile, err.to_string());
        }
    }
    for set in &sb.master_sets {
        configure_master_set(log, tile, sb, set, diags);
    }
    for table in &sb.packet_rules {
        configure_packet_rules(log, tile, sb, table, diags);
    }
}

fn configure_shim_mux(
    log: &mut WriteLog,
    tile: TileAddress,
    mux: &ShimMux,
    diags: &mut Diagnostics,
) {
    for connect in &mux.connects {
        match shim_mux_bits(connect) {
            Ok(Some((reg, bits))) => log.set_bits(tile, reg, bits),
            Ok(None) => tracing::debug!(
                "{}: {} -> {} does not cross the mux",
                tile,
                describe(&connect.source),
                describe(&connect.dest)
            ),
            Err(err) => diags.report(err.kind(), tile, err.to_string()),
        }
    }
}

/// Second configuration phase: stream switches, then shim muxes.
pub fn configure_switchboxes(log: &mut WriteLog, device: &Device, diags: &mut Diagnostics) {
    tracing::info!(
        "Configuring {} switchboxes and {} shim muxes",
        device.switchboxes.len(),
        device.shim_muxes.len()
    );
    for sb in device.switchboxes.iter().filter(|sb| !sb.is_empty()) {
        let tile = TileAddress::in_device(device, sb.col, sb.row);
        configure_switchbox(log, tile, sb, diags);
    }
    for mux in &device.shim_muxes {
        let tile = TileAddress::in_device(device, mux.col, mux.row);
        configure_shim_mux(log, tile, mux, diags);
    }
}
