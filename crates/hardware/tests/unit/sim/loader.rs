//! Boot image tests: format detection, placement and load errors.

use std::io::Write;
use std::path::Path;

use pretty_assertions::assert_eq;
use rstest::rstest;

use rvemu_core::common::{AccessType, LoadError};
use rvemu_core::config::Config;
use rvemu_core::core::units::lsu::MemWidth;
use rvemu_core::sim::loader::{load_elf, load_flat, load_hex, parse_hex};
use rvemu_core::sim::{Image, ImageFormat, LoadedImage};
use rvemu_core::soc::System;

use crate::common::builder::elf::{self, PT_NOTE, Segment};

const ROM: u64 = 0x8000_0000;

fn machine() -> (System, Config) {
    let config = Config::default();
    let system = System::from_config(&config).unwrap();
    (system, config)
}

fn read_word(system: &mut System, addr: u64) -> u64 {
    let mut mip = 0;
    system.bus.read(addr, MemWidth::Word, AccessType::Read, &mut mip).unwrap()
}

// ══════════════════════════════════════════════════════════
// 1. Detection and parsing
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::elf_magic_wins("prog.hex", b"\x7fELF\x02\x01", ImageFormat::Elf)]
#[case::hex_extension("prog.hex", b"00000013", ImageFormat::Hex)]
#[case::upper_case_extension("PROG.HEX", b"00000013", ImageFormat::Hex)]
#[case::anything_else_is_flat("prog.bin", b"\x13\x00\x00\x00", ImageFormat::Flat)]
#[case::no_extension("prog", b"", ImageFormat::Flat)]
fn detects_format(#[case] name: &str, #[case] bytes: &[u8], #[case] expected: ImageFormat) {
    assert_eq!(ImageFormat::detect(Path::new(name), bytes), expected);
}

#[test]
fn hex_accepts_prefixes_and_surrounding_space() {
    let words = parse_hex("  0X00A00513 \n\n0x00000013\nfff00093\n").unwrap();
    assert_eq!(words, vec![0x00A0_0513, 0x0000_0013, 0xFFF0_0093]);
}

#[rstest]
#[case::not_hex("00000013\nxyz\n", 2, "xyz")]
#[case::too_wide("\n123456789\n", 2, "123456789")]
#[case::bare_prefix("0x\n", 1, "0x")]
fn hex_errors_name_the_line(#[case] text: &str, #[case] line: usize, #[case] bad: &str) {
    match parse_hex(text) {
        Err(LoadError::Hex { line: l, text: t }) => {
            assert_eq!(l, line);
            assert_eq!(t, bad);
        }
        other => panic!("expected a hex error, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════
// 2. Hex and flat placement
// ══════════════════════════════════════════════════════════

#[test]
fn hex_words_are_stored_little_endian_from_the_base() {
    let (mut system, _) = machine();
    let end = load_hex(&mut system, ROM, 0x2000, "00a00513\n00000013\n").unwrap();

    assert_eq!(end, ROM + 8);
    assert_eq!(read_word(&mut system, ROM), 0x00A0_0513);
    assert_eq!(read_word(&mut system, ROM + 4), 0x0000_0013);
}

#[test]
fn flat_bytes_are_copied_verbatim() {
    let (mut system, _) = machine();
    let end = load_flat(&mut system, ROM, 0x2000, &[0x13, 0x05, 0xA0, 0x00, 0xFF]).unwrap();

    assert_eq!(end, ROM + 5);
    assert_eq!(read_word(&mut system, ROM), 0x00A0_0513);
}

#[test]
fn oversized_images_are_rejected_before_loading() {
    let (mut system, _) = machine();
    let result = load_flat(&mut system, ROM, 0x10, &[1; 0x11]);
    assert!(matches!(result, Err(LoadError::TooLarge { size: 0x11, capacity: 0x10 })));
    assert_eq!(read_word(&mut system, ROM), 0);

    let hex = "00000013\n".repeat(5);
    let result = load_hex(&mut system, ROM, 0x10, &hex);
    assert!(matches!(result, Err(LoadError::TooLarge { size: 20, capacity: 0x10 })));
}

#[test]
fn image_fills_the_code_region_exactly() {
    let (mut system, config) = machine();
    let image = Image::new(ImageFormat::Flat, vec![0xAB; 0x2000]);
    let loaded = image.load_into(&mut system, &config).unwrap();

    assert_eq!(loaded, LoadedImage { entry: None, end: ROM + 0x2000 });
}

#[test]
fn flat_image_into_an_unmapped_region_fails() {
    let (mut system, _) = machine();
    let result = load_flat(&mut system, 0x4000_0000, 0x1000, &[1, 2, 3]);
    assert!(matches!(result, Err(LoadError::Unmapped(0x4000_0000))));
}

// ══════════════════════════════════════════════════════════
// 3. ELF
// ══════════════════════════════════════════════════════════

#[test]
fn elf_segments_land_at_their_physical_addresses() {
    let (mut system, config) = machine();
    let bytes = elf::build(
        ROM + 4,
        &[
            Segment::load(ROM, vec![0x13, 0, 0, 0, 0x93, 0x00, 0x50, 0x00]),
            Segment::load(0xc000_0010, vec![0xEF, 0xBE, 0xAD, 0xDE]),
        ],
    );
    let image = Image::new(ImageFormat::detect(Path::new("kernel"), &bytes), bytes);
    assert_eq!(image.format, ImageFormat::Elf);

    let loaded = image.load_into(&mut system, &config).unwrap();
    assert_eq!(loaded.entry, Some(ROM + 4));
    assert_eq!(read_word(&mut system, ROM + 4), 0x0050_0093);
    assert_eq!(read_word(&mut system, 0xc000_0010), 0xDEAD_BEEF);
}

#[test]
fn elf_bss_is_zero_filled() {
    let (mut system, _) = machine();
    system.bus.load_bytes(ROM, &[0xFF; 16]).unwrap();

    let bytes = elf::build(ROM, &[Segment::load(ROM, vec![1, 2, 3, 4]).with_memsz(12)]);
    let entry = load_elf(&mut system, &bytes).unwrap();

    assert_eq!(entry, ROM);
    assert_eq!(read_word(&mut system, ROM), 0x0403_0201);
    assert_eq!(read_word(&mut system, ROM + 4), 0);
    assert_eq!(read_word(&mut system, ROM + 8), 0);
    assert_eq!(read_word(&mut system, ROM + 12), 0xFFFF_FFFF);
}

#[test]
fn elf_skips_non_load_segments() {
    let (mut system, _) = machine();
    let mut note = Segment::load(ROM, vec![0xAA; 4]);
    note.kind = PT_NOTE;
    let bytes = elf::build(ROM, &[note]);

    assert_eq!(load_elf(&mut system, &bytes).unwrap(), ROM);
    assert_eq!(read_word(&mut system, ROM), 0);
}

#[test]
fn elf_segment_outside_memory_is_unmapped() {
    let (mut system, _) = machine();
    let bytes = elf::build(0, &[Segment::load(0x4000_0000, vec![1])]);
    assert!(matches!(load_elf(&mut system, &bytes), Err(LoadError::Unmapped(0x4000_0000))));
}

#[test]
fn truncated_elf_is_malformed() {
    let (mut system, _) = machine();
    let bytes = elf::build(ROM, &[Segment::load(ROM, vec![1, 2, 3, 4])]);
    let truncated = &bytes[..bytes.len() - 2];
    assert!(matches!(load_elf(&mut system, truncated), Err(LoadError::Elf(_))));
    assert!(matches!(load_elf(&mut system, b"\x7fELF"), Err(LoadError::Elf(_))));
}

// ══════════════════════════════════════════════════════════
// 4. Files and readers
// ══════════════════════════════════════════════════════════

#[test]
fn image_from_a_hex_file() {
    let mut file = tempfile::Builder::new().suffix(".hex").tempfile().unwrap();
    writeln!(file, "00a00513").unwrap();
    file.flush().unwrap();

    let image = Image::from_file(file.path()).unwrap();
    assert_eq!(image.format, ImageFormat::Hex);
    assert_eq!(image.bytes, b"00a00513\n".to_vec());
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.bin");
    match Image::from_file(&path) {
        Err(LoadError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn hex_from_a_reader_is_always_hex() {
    let image = Image::hex_from_reader(&b"00000013\n"[..], Path::new("-")).unwrap();
    assert_eq!(image.format, ImageFormat::Hex);
    assert_eq!(image.bytes.len(), 9);
}
