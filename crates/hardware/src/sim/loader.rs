//! Boot Image Loading.
//!
//! This module places a boot image into guest memory before the first step. It supports:
//! 1. **Hex text:** One 32-bit instruction word per line, stored little-endian from the
//!    code region base. Used by simple mode.
//! 2. **Flat binary:** Raw bytes copied to the code region base.
//! 3. **ELF:** `PT_LOAD` segments copied to their physical addresses; the entry point
//!    becomes the start PC.
//!
//! An [`Image`] keeps its bytes so a rebooted machine can be loaded again.

use std::fs;
use std::io::Read;
use std::path::Path;

use object::Endianness;
use object::elf::PT_LOAD;
use object::read::elf::{ElfFile64, FileHeader, ProgramHeader};

use crate::common::LoadError;
use crate::config::Config;
use crate::soc::System;

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Encoding of a boot image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    /// Hexadecimal instruction words, one per line.
    Hex,
    /// Raw bytes.
    Flat,
    /// 64-bit ELF executable.
    Elf,
}

impl ImageFormat {
    /// Picks a format from the ELF magic, then from a `.hex` extension, else flat.
    pub fn detect(path: &Path, bytes: &[u8]) -> Self {
        if bytes.starts_with(ELF_MAGIC) {
            return Self::Elf;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("hex") => Self::Hex,
            _ => Self::Flat,
        }
    }
}

/// Where a loaded image landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadedImage {
    /// Start PC requested by the image (ELF entry point), if any.
    pub entry: Option<u64>,
    /// First byte after the image in the code region (hex and flat images).
    pub end: u64,
}

/// A boot image held in host memory.
#[derive(Clone, Debug)]
pub struct Image {
    /// Encoding of `bytes`.
    pub format: ImageFormat,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl Image {
    /// Wraps bytes already in memory.
    pub fn new(format: ImageFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    /// Reads an image from disk, detecting its format.
    ///
    /// # Errors
    ///
    /// `LoadError::Io` when the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let bytes = fs::read(path)
            .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        Ok(Self::new(ImageFormat::detect(path, &bytes), bytes))
    }

    /// Reads a hex image from any reader (simple mode reads stdin with `-`).
    pub fn hex_from_reader(mut reader: impl Read, name: &Path) -> Result<Self, LoadError> {
        let mut bytes = Vec::new();
        let _ = reader
            .read_to_end(&mut bytes)
            .map_err(|source| LoadError::Io { path: name.to_path_buf(), source })?;
        Ok(Self::new(ImageFormat::Hex, bytes))
    }

    /// Copies the image into `system`.
    ///
    /// Hex and flat images go to `config.memory.rom_base` and must fit in the code region.
    ///
    /// # Errors
    ///
    /// `Hex` for a malformed line, `Elf` for a malformed ELF file, `TooLarge` when the
    /// image exceeds the code region, `Unmapped` when a destination is not RAM.
    pub fn load_into(
        &self,
        system: &mut System,
        config: &Config,
    ) -> Result<LoadedImage, LoadError> {
        let base = config.memory.rom_base;
        let capacity = config.memory.rom_size;
        let loaded = match self.format {
            ImageFormat::Hex => {
                let text = String::from_utf8_lossy(&self.bytes);
                let end = load_hex(system, base, capacity, &text)?;
                LoadedImage { entry: None, end }
            }
            ImageFormat::Flat => {
                let end = load_flat(system, base, capacity, &self.bytes)?;
                LoadedImage { entry: None, end }
            }
            ImageFormat::Elf => {
                let entry = load_elf(system, &self.bytes)?;
                LoadedImage { entry: Some(entry), end: base.wrapping_add(capacity) }
            }
        };
        tracing::info!("loaded {:?} image of {} bytes", self.format, self.bytes.len());
        Ok(loaded)
    }
}

/// Parses hex text into instruction words.
///
/// Blank lines are skipped and an optional `0x` prefix is accepted. Line numbers in
/// errors are 1-based.
pub fn parse_hex(text: &str) -> Result<Vec<u32>, LoadError> {
    let mut words = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let word = u32::from_str_radix(digits, 16)
            .map_err(|_| LoadError::Hex { line: idx + 1, text: trimmed.to_owned() })?;
        words.push(word);
    }
    Ok(words)
}

/// Stores hex instruction words little-endian from `base`.
///
/// # Returns
///
/// The address after the last word.
pub fn load_hex(
    system: &mut System,
    base: u64,
    capacity: u64,
    text: &str,
) -> Result<u64, LoadError> {
    let words = parse_hex(text)?;
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    load_flat(system, base, capacity, &bytes)
}

/// Copies raw bytes to `base`.
///
/// # Returns
///
/// The address after the last byte.
pub fn load_flat(
    system: &mut System,
    base: u64,
    capacity: u64,
    bytes: &[u8],
) -> Result<u64, LoadError> {
    let size = bytes.len() as u64;
    if size > capacity {
        return Err(LoadError::TooLarge { size, capacity });
    }
    system.bus.load_bytes(base, bytes)?;
    Ok(base.wrapping_add(size))
}

/// Copies the `PT_LOAD` segments of a 64-bit ELF file to their physical addresses.
///
/// The part of a segment beyond its file size is zero-filled.
///
/// # Returns
///
/// The ELF entry point.
pub fn load_elf(system: &mut System, bytes: &[u8]) -> Result<u64, LoadError> {
    let elf = ElfFile64::<Endianness>::parse(bytes).map_err(|e| LoadError::Elf(e.to_string()))?;
    let endian = elf.endian();
    for phdr in elf.elf_program_headers() {
        if phdr.p_type(endian) != PT_LOAD {
            continue;
        }
        let paddr = phdr.p_paddr(endian);
        let data = phdr
            .data(endian, bytes)
            .map_err(|()| LoadError::Elf(format!("segment at {paddr:#x} exceeds the file")))?;
        system.bus.load_bytes(paddr, data)?;

        let memsz = phdr.p_memsz(endian);
        let filesz = data.len() as u64;
        if memsz > filesz {
            let zeros = vec![0u8; (memsz - filesz) as usize];
            system.bus.load_bytes(paddr.wrapping_add(filesz), &zeros)?;
        }
        tracing::debug!("ELF segment {paddr:#x}: {filesz:#x} bytes, {memsz:#x} in memory");
    }
    Ok(elf.elf_header().e_entry(endian))
}
