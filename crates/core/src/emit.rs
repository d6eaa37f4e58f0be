// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! ELF container for the configuration image.
//!
//! Layout: the null section, `.shstrtab`, then one allocated `PROGBITS`
//! section per coalesced run whose `sh_addr` is the run's global address.
//! Runs outside the known regions get name offset 0, the empty string.

use std::io::Write;

use object::elf;
use object::write::elf::{FileHeader, SectionHeader, Writer};
use object::Endianness;

use crate::section::{Section, SECTION_NAMES};

/// Machine number of AI Engine array configuration images.
pub const EM_AMDAIR: u16 = 225;

#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("Failed to build the ELF container")]
    Build(#[from] object::write::Error),
    #[error("Failed to write the configuration image")]
    Io(#[from] std::io::Error),
}

/// Serialize `sections` into an in-memory ELF image.
pub fn to_bytes(sections: &[Section]) -> Result<Vec<u8>, EmitError> {
    let mut buffer = Vec::new();
    {
        let mut writer = Writer::new(Endianness::Little, true, &mut buffer);

        writer.reserve_file_header();
        writer.reserve_null_section_index();
        writer.reserve_shstrtab_section_index();
        for name in SECTION_NAMES {
            writer.add_section_name(name.as_bytes());
        }

        let mut layout = Vec::with_capacity(sections.len());
        for section in sections {
            writer.reserve_section_index();
            // Names are interned, so this returns the id added above.
            let name = section
                .name()
                .map(|name| writer.add_section_name(name.as_bytes()));
            layout.push((name, section.address, section.bytes()));
        }
        let offsets: Vec<usize> = layout
            .iter()
            .map(|(_, _, bytes)| writer.reserve(bytes.len(), 1))
            .collect();
        writer.reserve_shstrtab();
        writer.reserve_section_headers();

        writer.write_file_header(&FileHeader {
            os_abi: elf::ELFOSABI_GNU,
            abi_version: 0,
            e_type: elf::ET_NONE,
            e_machine: EM_AMDAIR,
            e_entry: 0,
            e_flags: 0,
        })?;

        for (_, _, bytes) in &layout {
            writer.write(bytes);
        }
        writer.write_shstrtab();

        writer.write_null_section_header();
        writer.write_shstrtab_section_header();
        for ((name, address, bytes), offset) in layout.iter().zip(offsets) {
            writer.write_section_header(&SectionHeader {
                name: *name,
                sh_type: elf::SHT_PROGBITS,
                sh_flags: elf::SHF_ALLOC as u64,
                sh_addr: *address,
                sh_offset: offset as u64,
                sh_size: bytes.len() as u64,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 1,
                sh_entsize: 0,
            });
        }
    }

    tracing::debug!(
        "Built airbin image: {} sections, {} bytes",
        sections.len(),
        buffer.len()
    );
    Ok(buffer)
}

/// Serialize `sections` and write the image to `out`.
pub fn write_airbin<W: Write>(sections: &[Section], out: &mut W) -> Result<(), EmitError> {
    let bytes = to_bytes(sections)?;
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(())
}
