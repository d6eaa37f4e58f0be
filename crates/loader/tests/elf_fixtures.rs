// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use airbin_core::{load_program, LoadError, ProgramLoader, TileAddress, WriteLog};
use airbin_loader::{load_elf, load_elf_bytes, ElfProgramLoader};
use object::elf;
use object::write::elf::{FileHeader, ProgramHeader, Writer};
use object::Endianness;
use std::io::Write;

struct Seg {
    vaddr: u64,
    flags: u32,
    data: Vec<u8>,
}

fn build_elf(endian: Endianness, is_64: bool, segments: &[Seg]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut writer = Writer::new(endian, is_64, &mut buffer);
        writer.reserve_file_header();
        writer.reserve_program_headers(segments.len() as u32);
        let offsets: Vec<usize> = segments
            .iter()
            .map(|s| writer.reserve(s.data.len(), 4))
            .collect();

        writer
            .write_file_header(&FileHeader {
                os_abi: elf::ELFOSABI_NONE,
                abi_version: 0,
                e_type: elf::ET_EXEC,
                e_machine: 264,
                e_entry: 0,
                e_flags: 0,
            })
            .unwrap();
        writer.write_align_program_headers();
        for (seg, &offset) in segments.iter().zip(&offsets) {
            writer.write_program_header(&ProgramHeader {
                p_type: elf::PT_LOAD,
                p_flags: seg.flags,
                p_offset: offset as u64,
                p_vaddr: seg.vaddr,
                p_paddr: seg.vaddr,
                p_filesz: seg.data.len() as u64,
                p_memsz: seg.data.len() as u64,
                p_align: 4,
            });
        }
        for (seg, &offset) in segments.iter().zip(&offsets) {
            writer.pad_until(offset);
            writer.write(&seg.data);
        }
    }
    buffer
}

fn kernel() -> Vec<u8> {
    build_elf(
        Endianness::Little,
        false,
        &[
            Seg {
                vaddr: 0x0,
                flags: elf::PF_R | elf::PF_X,
                data: vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66],
            },
            Seg {
                vaddr: 0x7_0020,
                flags: elf::PF_R | elf::PF_W,
                data: vec![0xAA, 0xBB, 0xCC, 0xDD],
            },
        ],
    )
}

#[test]
fn test_segments_and_permissions() {
    let image = load_elf_bytes(&kernel()).unwrap();
    assert_eq!(image.segments.len(), 2);
    assert!(image.segments[0].executable);
    assert_eq!(image.segments[0].data, vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    assert!(!image.segments[1].executable);
    assert_eq!(image.segments[1].vaddr, 0x7_0020);
}

#[test]
fn test_placement_in_tile() {
    let image = load_elf_bytes(&kernel()).unwrap();
    let tile = TileAddress::new(4, 3);
    let mut log = WriteLog::new();
    assert_eq!(load_program(&mut log, tile, &image).unwrap(), 3);
    assert_eq!(log.read(tile, 0x20000), 0x4433_2211);
    assert_eq!(log.read(tile, 0x20004), 0x0000_6655);
    assert_eq!(log.read(tile, 0x20), 0xDDCC_BBAA);
}

#[test]
fn test_loader_reads_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".elf").tempfile().unwrap();
    file.write_all(&kernel()).unwrap();
    let image = ElfProgramLoader.load(file.path()).unwrap();
    assert_eq!(image.segments.len(), 2);
}

#[test]
fn test_wrong_class_and_endianness() {
    let seg = || Seg {
        vaddr: 0,
        flags: elf::PF_X,
        data: vec![0; 4],
    };
    let wide = build_elf(Endianness::Little, true, &[seg()]);
    assert!(matches!(load_elf_bytes(&wide), Err(LoadError::WrongClass)));
    let big = build_elf(Endianness::Big, false, &[seg()]);
    assert!(matches!(load_elf_bytes(&big), Err(LoadError::WrongEndianness)));
}

#[test]
fn test_missing_file_is_recoverable() {
    let err = load_elf(std::path::Path::new("/nonexistent/core_1_1.elf")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
    assert!(!err.is_fatal());
}

#[test]
fn test_segment_past_end_of_file() {
    let mut bytes = kernel();
    // Cut the data of the last segment.
    bytes.truncate(bytes.len() - 2);
    let err = load_elf_bytes(&bytes).unwrap_err();
    assert!(matches!(err, LoadError::SegmentBounds { vaddr: 0x7_0020 }));
}
