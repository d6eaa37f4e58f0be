// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

use airbin_config::{load_validated_device, CompileOptions};
use airbin_core::{CompileReport, Compiler, TileAddress};
use airbin_loader::ElfProgramLoader;

const EXIT_PASS: u8 = 0;
const EXIT_DIAGNOSTICS: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_COMPILE_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "AI Engine array configuration compiler",
    long_about = None
)]
struct Cli {
    /// Path to the device description (YAML or JSON)
    #[arg(short, long)]
    device: PathBuf,

    /// Where to write the airbin ELF image
    #[arg(short, long)]
    output: PathBuf,

    /// Directory searched for core programs (default: the description's directory)
    #[arg(long)]
    elf_dir: Option<PathBuf>,

    /// Treat any diagnostic as a failure
    #[arg(long)]
    strict: bool,

    /// Enable debug logging
    #[arg(short, long)]
    trace: bool,

    /// Print the section table after compiling
    #[arg(long)]
    dump_sections: bool,
}

fn program_dir(cli: &Cli) -> PathBuf {
    if let Some(dir) = &cli.elf_dir {
        return dir.clone();
    }
    match cli.device.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn dump_sections(report: &CompileReport) {
    println!(
        "{:>4}  {:<10} {:>14} {:>16} {:>8}",
        "idx", "name", "address", "tile", "size"
    );
    for (i, section) in report.sections.iter().enumerate() {
        let (tile, offset) = TileAddress::decode(section.address);
        println!(
            "{:>4}  {:<10} {:#014x} {:>16} {:#8x}",
            i + 2,
            section.name().unwrap_or("-"),
            section.address,
            format!("{}+{:#x}", tile, offset),
            section.len()
        );
    }
}

fn write_image(report: &CompileReport, path: &Path) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create output {:?}", path))?;
    let mut out = BufWriter::new(file);
    report
        .write_to(&mut out)
        .with_context(|| format!("Failed to write airbin image to {:?}", path))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    info!("Loading device description: {:?}", cli.device);
    let device = match load_validated_device(&cli.device) {
        Ok(device) => device,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let options = CompileOptions::with_program_dir(program_dir(&cli));
    let loader = ElfProgramLoader;
    let compiler = Compiler::new(&loader).with_options(options);
    let report = match compiler.compile(&device) {
        Ok(report) => report,
        Err(e) => {
            error!("{:#}", anyhow::Error::new(e));
            return ExitCode::from(EXIT_COMPILE_ERROR);
        }
    };

    if cli.dump_sections {
        dump_sections(&report);
    }

    if let Err(e) = write_image(&report, &cli.output) {
        error!("{:#}", e);
        return ExitCode::from(EXIT_COMPILE_ERROR);
    }
    info!(
        "Wrote {} sections ({} words) to {:?}",
        report.sections.len(),
        report.words,
        cli.output
    );

    if !report.is_clean() {
        warn!("{} diagnostic(s) reported", report.diagnostics.len());
        if cli.strict {
            return ExitCode::from(EXIT_DIAGNOSTICS);
        }
    }
    ExitCode::from(EXIT_PASS)
}
