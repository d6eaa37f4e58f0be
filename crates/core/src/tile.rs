// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Per-tile reset and program loading.

use airbin_config::CompileOptions;
use airbin_ir::{Device, Tile, TileKind};

use crate::address::TileAddress;
use crate::program::{load_program, ProgramLoader};
use crate::regs::*;
use crate::write_log::WriteLog;
use crate::{CompileError, CompileResult, DiagnosticKind, Diagnostics};

/// Clear the registers owned by a shim tile.
pub fn reset_shim(log: &mut WriteLog, tile: TileAddress, kind: TileKind) {
    if kind == TileKind::ShimNoc {
        log.clear_range(
            tile,
            SHIM_DMA_BD_BASE,
            SHIM_DMA_BD_COUNT * SHIM_DMA_BD_SIZE,
        );
    }
    log.clear_range(tile, SS_MASTER_BASE, SHIM_SS_MASTER_SIZE);
    log.clear_range(tile, SS_SLAVE_BASE, SHIM_SS_SLAVE_SIZE);
    log.clear_range(tile, SS_SLOT_BASE, SHIM_SS_SLOT_PORTS * SS_SLOT_STRIDE);
}

/// Clear memories, DMA and stream switch of a compute tile.
pub fn reset_compute(log: &mut WriteLog, tile: TileAddress) {
    log.clear_range(tile, PROG_MEM_BASE, PROG_MEM_SIZE);
    log.clear_range(tile, DATA_MEM_BASE, DATA_MEM_SIZE);
    log.clear_range(tile, DMA_BD_BASE, DMA_BD_COUNT * DMA_BD_SIZE);
    log.clear_range(tile, DMA_S2MM_BASE, DMA_CHANNEL_COUNT * DMA_CHANNEL_STRIDE);
    log.clear_range(tile, DMA_MM2S_BASE, DMA_CHANNEL_COUNT * DMA_CHANNEL_STRIDE);
    log.clear_range(tile, SS_MASTER_BASE, ME_SS_MASTER_SIZE);
    log.clear_range(tile, SS_SLAVE_BASE, ME_SS_SLAVE_SIZE);
    log.clear_range(tile, SS_SLOT_BASE, ME_SS_SLOT_PORTS * SS_SLOT_STRIDE);
}

fn load_core(
    log: &mut WriteLog,
    addr: TileAddress,
    tile: &Tile,
    loader: &dyn ProgramLoader,
    options: &CompileOptions,
    diags: &mut Diagnostics,
) -> CompileResult<()> {
    let Some(core) = &tile.core else {
        return Ok(());
    };
    let path = options.program_path(tile.col, tile.row, core.elf_file.as_deref());

    let result = loader
        .load(&path)
        .and_then(|image| load_program(log, addr, &image));
    match result {
        Ok(words) => {
            tracing::info!("{}: loaded {} words from {:?}", addr, words, path);
            Ok(())
        }
        Err(source) if source.is_fatal() => Err(CompileError::ProgramLoad {
            tile: addr,
            path,
            source,
        }),
        Err(err) => {
            diags.report(
                DiagnosticKind::ProgramLoad,
                addr,
                format!("cannot load {:?}: {}", path, err),
            );
            Ok(())
        }
    }
}

/// First configuration phase: reset every declared tile and load its program.
pub fn configure_tiles(
    log: &mut WriteLog,
    device: &Device,
    loader: &dyn ProgramLoader,
    options: &CompileOptions,
    diags: &mut Diagnostics,
) -> CompileResult<()> {
    tracing::info!("Configuring {} tiles", device.tiles.len());
    for tile in &device.tiles {
        let addr = TileAddress::in_device(device, tile.col, tile.row);
        match tile.kind() {
            kind @ (TileKind::ShimNoc | TileKind::ShimPl) => {
                tracing::debug!("{}: reset {:?}", addr, kind);
                reset_shim(log, addr, kind);
            }
            TileKind::Compute => {
                tracing::debug!("{}: reset compute tile", addr);
                reset_compute(log, addr);
                load_core(log, addr, tile, loader, options, diags)?;
            }
        }
    }
    Ok(())
}
