// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use airbin_ir::{BufferSlot, Device, Port, PortDirection, TileKind, WireBundle};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub use airbin_ir as ir;

const SUPPORTED_SCHEMA: &str = "1.0";

const MAX_COLUMN: u8 = 0x7F;
const MAX_ROW: u8 = 0x1F;
const MAX_LOCK_ID: u8 = 15;
const MAX_BD_BLOCKS: usize = 16;
const MAX_CHANNEL: u8 = 1;

/// Options for one compiler run that do not belong to the device itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Directory used to resolve relative core program paths.
    #[serde(default = "default_program_dir")]
    pub program_dir: PathBuf,
}

fn default_program_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            program_dir: default_program_dir(),
        }
    }
}

impl CompileOptions {
    pub fn with_program_dir<P: Into<PathBuf>>(program_dir: P) -> Self {
        Self {
            program_dir: program_dir.into(),
        }
    }

    /// Resolve the program file of the compute tile at (col, row).
    pub fn program_path(&self, col: u8, row: u8, elf_file: Option<&str>) -> PathBuf {
        let name = match elf_file {
            Some(file) => PathBuf::from(file),
            None => PathBuf::from(format!("core_{}_{}.elf", col, row)),
        };
        if name.is_absolute() {
            name
        } else {
            self.program_dir.join(name)
        }
    }
}

/// Load a device description from YAML, or JSON when the file extension says so.
pub fn load_device<P: AsRef<Path>>(path: P) -> Result<Device> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read device description at {:?}", path))?;

    let device: Device = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse device description JSON from {:?}", path))?
    } else {
        serde_yaml::from_str(&content).context("Failed to parse device description YAML")?
    };

    tracing::debug!(
        "Loaded device '{}': {} tiles, {} mems, {} switchboxes, {} shim muxes",
        device.name,
        device.tiles.len(),
        device.mems.len(),
        device.switchboxes.len(),
        device.shim_muxes.len()
    );
    Ok(device)
}

/// Load and validate in one step.
pub fn load_validated_device<P: AsRef<Path>>(path: P) -> Result<Device> {
    let device = load_device(&path)?;
    validate(&device)
        .with_context(|| format!("Invalid device description {:?}", path.as_ref()))?;
    Ok(device)
}

/// A single structural problem in a device description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unsupported schema_version '{0}' (supported: '1.0')")]
    SchemaVersion(String),
    #[error("tile ({col},{row}) is out of range")]
    TileOutOfRange { col: u8, row: u8 },
    #[error("tile ({col},{row}) is in column 0, which is not addressable")]
    ColumnZero { col: u8, row: u8 },
    #[error("tile ({col},{row}) is declared more than once")]
    DuplicateTile { col: u8, row: u8 },
    #[error("tile ({col},{row}) is declared as {kind:?} but its row disagrees")]
    KindMismatch { col: u8, row: u8, kind: TileKind },
    #[error("{what} refers to undeclared tile ({col},{row})")]
    UndeclaredTile { what: String, col: u8, row: u8 },
    #[error("shim mux on tile ({col},{row}) is not in the shim row")]
    MuxOffShimRow { col: u8, row: u8 },
    #[error("lock '{name}' has id {id}, above the maximum of 15")]
    LockId { name: String, id: u8 },
    #[error("tile ({col},{row}): block label '{label}' is used more than once")]
    DuplicateLabel { col: u8, row: u8, label: String },
    #[error("tile ({col},{row}): '{label}' refers to unknown block '{target}'")]
    UnknownBlock {
        col: u8,
        row: u8,
        label: String,
        target: String,
    },
    #[error("tile ({col},{row}): block '{label}' transfers unknown buffer '{buffer}'")]
    UnknownBuffer {
        col: u8,
        row: u8,
        label: String,
        buffer: String,
    },
    #[error("tile ({col},{row}): block '{label}' uses unknown lock '{lock}'")]
    UnknownLock {
        col: u8,
        row: u8,
        label: String,
        lock: String,
    },
    #[error("tile ({col},{row}): block '{label}' has two transfers in slot {slot:?}")]
    DuplicateSlot {
        col: u8,
        row: u8,
        label: String,
        slot: BufferSlot,
    },
    #[error("tile ({col},{row}): block '{label}' uses more than one lock")]
    MixedLocks { col: u8, row: u8, label: String },
    #[error("tile ({col},{row}): {count} descriptor blocks exceed the 16 available")]
    TooManyDescriptors { col: u8, row: u8, count: usize },
    #[error("tile ({col},{row}): DMA channel {channel} does not exist")]
    Channel { col: u8, row: u8, channel: u8 },
    #[error("tile ({col},{row}) is a shim tile and has no memory DMA")]
    MemOnShim { col: u8, row: u8 },
    #[error("switchbox ({col},{row}): {bundle:?} {direction:?} port {index} does not exist")]
    PortIndex {
        col: u8,
        row: u8,
        bundle: WireBundle,
        direction: PortDirection,
        index: u8,
    },
    #[error("switchbox ({col},{row}) refers to unknown amsel '{name}'")]
    UnknownAmsel { col: u8, row: u8, name: String },
    #[error("switchbox ({col},{row}): master set has no amsel")]
    EmptyMasterSet { col: u8, row: u8 },
}

/// Every problem found in a description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} problem(s) in device description: {}", .issues.len(), join_issues(.issues))]
pub struct InvalidDescription {
    pub issues: Vec<ValidationError>,
}

fn join_issues(issues: &[ValidationError]) -> String {
    issues
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Structural checks that the compiler relies on as preconditions.
pub fn validate(device: &Device) -> std::result::Result<(), InvalidDescription> {
    let mut issues = Vec::new();

    if device.schema_version != SUPPORTED_SCHEMA {
        issues.push(ValidationError::SchemaVersion(device.schema_version.clone()));
    }

    let mut seen = HashSet::new();
    for tile in &device.tiles {
        let (col, row) = (tile.col, tile.row);
        if col > MAX_COLUMN || row > MAX_ROW {
            issues.push(ValidationError::TileOutOfRange { col, row });
        }
        if col == 0 {
            issues.push(ValidationError::ColumnZero { col, row });
        }
        if !seen.insert((col, row)) {
            issues.push(ValidationError::DuplicateTile { col, row });
        }
        let kind = tile.kind();
        if (kind == TileKind::Compute) == tile.is_shim() {
            issues.push(ValidationError::KindMismatch { col, row, kind });
        }
    }

    let require_tile = |what: &str, col: u8, row: u8, issues: &mut Vec<ValidationError>| {
        if !seen.contains(&(col, row)) {
            issues.push(ValidationError::UndeclaredTile {
                what: what.to_string(),
                col,
                row,
            });
        }
    };

    for buffer in &device.buffers {
        require_tile(&format!("buffer '{}'", buffer.name), buffer.col, buffer.row, &mut issues);
    }
    for lock in &device.locks {
        require_tile(&format!("lock '{}'", lock.name), lock.col, lock.row, &mut issues);
        if lock.id > MAX_LOCK_ID {
            issues.push(ValidationError::LockId {
                name: lock.name.clone(),
                id: lock.id,
            });
        }
    }
    for sb in &device.switchboxes {
        require_tile("switchbox", sb.col, sb.row, &mut issues);
    }
    for mux in &device.shim_muxes {
        require_tile("shim mux", mux.col, mux.row, &mut issues);
        if mux.row != 0 {
            issues.push(ValidationError::MuxOffShimRow {
                col: mux.col,
                row: mux.row,
            });
        }
    }
    for mem in &device.mems {
        require_tile("mem", mem.col, mem.row, &mut issues);
        validate_mem(device, mem, &mut issues);
    }
    for sb in &device.switchboxes {
        validate_switchbox(sb, &mut issues);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(InvalidDescription { issues })
    }
}

fn validate_mem(device: &Device, mem: &ir::MemDma, issues: &mut Vec<ValidationError>) {
    let (col, row) = (mem.col, mem.row);
    if row == 0 {
        issues.push(ValidationError::MemOnShim { col, row });
    }

    let mut labels = HashSet::new();
    for block in &mem.blocks {
        if !labels.insert(block.label.as_str()) {
            issues.push(ValidationError::DuplicateLabel {
                col,
                row,
                label: block.label.clone(),
            });
        }
    }

    let descriptors = mem.blocks.iter().filter(|b| !b.transfers.is_empty()).count();
    if descriptors > MAX_BD_BLOCKS {
        issues.push(ValidationError::TooManyDescriptors {
            col,
            row,
            count: descriptors,
        });
    }

    for block in &mem.blocks {
        if let Some(next) = &block.next {
            if !labels.contains(next.as_str()) {
                issues.push(ValidationError::UnknownBlock {
                    col,
                    row,
                    label: block.label.clone(),
                    target: next.clone(),
                });
            }
        }

        let mut slots = HashSet::new();
        for transfer in &block.transfers {
            if device.buffer(&transfer.buffer).is_none() {
                issues.push(ValidationError::UnknownBuffer {
                    col,
                    row,
                    label: block.label.clone(),
                    buffer: transfer.buffer.clone(),
                });
            }
            if !slots.insert(transfer.slot) {
                issues.push(ValidationError::DuplicateSlot {
                    col,
                    row,
                    label: block.label.clone(),
                    slot: transfer.slot,
                });
            }
        }

        let mut lock_names = HashSet::new();
        for use_lock in &block.locks {
            if device.lock(&use_lock.lock).is_none() {
                issues.push(ValidationError::UnknownLock {
                    col,
                    row,
                    label: block.label.clone(),
                    lock: use_lock.lock.clone(),
                });
            }
            lock_names.insert(use_lock.lock.as_str());
        }
        if lock_names.len() > 1 {
            issues.push(ValidationError::MixedLocks {
                col,
                row,
                label: block.label.clone(),
            });
        }
    }

    for start in &mem.starts {
        if !labels.contains(start.block.as_str()) {
            issues.push(ValidationError::UnknownBlock {
                col,
                row,
                label: format!("{:?}{}", start.direction, start.channel).to_lowercase(),
                target: start.block.clone(),
            });
        }
        if start.channel > MAX_CHANNEL {
            issues.push(ValidationError::Channel {
                col,
                row,
                channel: start.channel,
            });
        }
    }
}

fn validate_switchbox(sb: &ir::Switchbox, issues: &mut Vec<ValidationError>) {
    let (col, row) = (sb.col, sb.row);
    let check = |name: &str, issues: &mut Vec<ValidationError>| {
        if sb.amsel(name).is_none() {
            issues.push(ValidationError::UnknownAmsel {
                col,
                row,
                name: name.to_string(),
            });
        }
    };

    // Bundles with no switch mapping are reported by the compiler instead.
    let check_port = |port: &Port, direction: PortDirection, issues: &mut Vec<ValidationError>| {
        if let Some((_, count)) = port.bundle.switch_ports(direction, row == 0) {
            if port.index as u32 >= count {
                issues.push(ValidationError::PortIndex {
                    col,
                    row,
                    bundle: port.bundle,
                    direction,
                    index: port.index,
                });
            }
        }
    };

    for connect in &sb.connects {
        check_port(&connect.source, PortDirection::Slave, issues);
        check_port(&connect.dest, PortDirection::Master, issues);
    }
    for master in &sb.master_sets {
        check_port(&master.dest, PortDirection::Master, issues);
        if master.amsels.is_empty() {
            issues.push(ValidationError::EmptyMasterSet { col, row });
        }
        for name in &master.amsels {
            check(name, issues);
        }
    }
    for table in &sb.packet_rules {
        check_port(&table.source, PortDirection::Slave, issues);
        for rule in &table.rules {
            check(&rule.amsel, issues);
        }
    }
}
