//! NES Cartridge Mapper Implementations.
//!
//! This crate provides mapper implementations for NES cartridge emulation.
//! Mappers handle memory banking for PRG-ROM, CHR-ROM/RAM, and provide
//! various hardware features like IRQ generation.
//!
//! # Supported Mappers
//!
//! | Mapper | Name | Description |
//! |--------|------|-------------|
//! | 0 | NROM | No banking, simplest mapper |
//! | 1 | MMC1 | Nintendo's first bank-switching mapper |
//! | 2 | UxROM | PRG-ROM banking only |
//! | 3 | CNROM | CHR-ROM banking only |
//! | 4 | MMC3 | Most popular, fine-grained banking + IRQ |
//!
//! # Example
//!
//! ```no_run
//! use rambo_mappers::{Rom, create_mapper};
//!
//! // Load ROM from file
//! let rom_data = std::fs::read("game.nes").expect("Failed to read ROM");
//! let rom = Rom::load(&rom_data).expect("Failed to parse ROM");
//!
//! // Create appropriate mapper
//! let mut mapper = create_mapper(&rom).expect("Unsupported mapper");
//!
//! // Use mapper for memory access
//! let opcode = mapper.read_prg(0x8000);
//! let tile = mapper.read_chr(0x0000);
//! ```
//!
//! # no_std Support
//!
//! This crate supports `no_std` environments with the `alloc` feature.
//! Disable the default `std` feature for embedded use.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod mapper;
pub mod rom;

mod cnrom;
mod mmc1;
mod mmc3;
mod nrom;
mod uxrom;

pub use cnrom::Cnrom;
pub use mapper::{Mapper, Mirroring};
pub use mmc1::Mmc1;
pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use rom::{Rom, RomError, RomFormat, RomHeader};
pub use uxrom::Uxrom;

/// Closed set of supported cartridge mappers, dispatched by `match` instead
/// of a `dyn Mapper` trait object.
///
/// The NES mapper space is open-ended in general, but this emulator only
/// ever instantiates one of these five board types, so a tagged union gives
/// the bus a concrete, inlinable type instead of a vtable indirection on
/// every PRG/CHR access (the hottest path in the whole emulator).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CartridgeMapper {
    /// Mapper 0 (NROM).
    Nrom(Nrom),
    /// Mapper 1 (MMC1).
    Mmc1(Mmc1),
    /// Mapper 2 (UxROM).
    Uxrom(Uxrom),
    /// Mapper 3 (CNROM).
    Cnrom(Cnrom),
    /// Mapper 4 (MMC3).
    Mmc3(Mmc3),
}

macro_rules! dispatch {
    ($self:expr, $m:ident => $body:expr) => {
        match $self {
            CartridgeMapper::Nrom($m) => $body,
            CartridgeMapper::Mmc1($m) => $body,
            CartridgeMapper::Uxrom($m) => $body,
            CartridgeMapper::Cnrom($m) => $body,
            CartridgeMapper::Mmc3($m) => $body,
        }
    };
}

impl CartridgeMapper {
    /// Read a byte from PRG memory (CPU address space).
    #[inline]
    #[must_use]
    pub fn read_prg(&self, addr: u16) -> u8 {
        dispatch!(self, m => m.read_prg(addr))
    }

    /// Write a byte to PRG memory (CPU address space).
    #[inline]
    pub fn write_prg(&mut self, addr: u16, val: u8) {
        dispatch!(self, m => m.write_prg(addr, val));
    }

    /// Read a byte from CHR memory (PPU address space).
    #[inline]
    #[must_use]
    pub fn read_chr(&self, addr: u16) -> u8 {
        dispatch!(self, m => m.read_chr(addr))
    }

    /// Write a byte to CHR memory (PPU address space).
    #[inline]
    pub fn write_chr(&mut self, addr: u16, val: u8) {
        dispatch!(self, m => m.write_chr(addr, val));
    }

    /// Get the current nametable mirroring mode.
    #[inline]
    #[must_use]
    pub fn mirroring(&self) -> Mirroring {
        dispatch!(self, m => m.mirroring())
    }

    /// Check if the mapper has a pending IRQ.
    #[inline]
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        dispatch!(self, m => m.irq_pending())
    }

    /// Acknowledge/clear the mapper IRQ.
    #[inline]
    pub fn irq_acknowledge(&mut self) {
        dispatch!(self, m => m.irq_acknowledge());
    }

    /// Clock the mapper (called every CPU cycle).
    #[inline]
    pub fn clock(&mut self, cycles: u8) {
        dispatch!(self, m => m.clock(cycles));
    }

    /// Notify the mapper of a scanline (called every PPU scanline).
    #[inline]
    pub fn scanline(&mut self) {
        dispatch!(self, m => m.scanline());
    }

    /// Notify the mapper of a PPU A12 rising edge.
    #[inline]
    pub fn ppu_a12_rising(&mut self) {
        dispatch!(self, m => m.ppu_a12_rising());
    }

    /// Get the mapper number (iNES mapper ID).
    #[inline]
    #[must_use]
    pub fn mapper_number(&self) -> u16 {
        dispatch!(self, m => m.mapper_number())
    }

    /// Get the mapper name.
    #[inline]
    #[must_use]
    pub fn mapper_name(&self) -> &'static str {
        dispatch!(self, m => m.mapper_name())
    }

    /// Check if the ROM has battery-backed RAM.
    #[inline]
    #[must_use]
    pub fn has_battery(&self) -> bool {
        dispatch!(self, m => m.has_battery())
    }

    /// Get a reference to the battery-backed RAM for saving.
    #[inline]
    #[must_use]
    pub fn battery_ram(&self) -> Option<&[u8]> {
        dispatch!(self, m => m.battery_ram())
    }

    /// Set the battery-backed RAM content (for loading saves).
    #[inline]
    pub fn set_battery_ram(&mut self, data: &[u8]) {
        dispatch!(self, m => m.set_battery_ram(data));
    }

    /// Reset the mapper to its initial state.
    #[inline]
    pub fn reset(&mut self) {
        dispatch!(self, m => m.reset());
    }
}

/// Create a mapper instance from ROM data.
///
/// Returns the appropriate mapper implementation based on the ROM header's
/// mapper number. Returns an error if the mapper is not supported.
///
/// # Errors
///
/// Returns `RomError::UnsupportedMapper` if the mapper number is not
/// implemented in this crate.
///
/// # Example
///
/// ```no_run
/// use rambo_mappers::{Rom, create_mapper};
///
/// let rom_data = std::fs::read("game.nes").expect("Failed to read ROM");
/// let rom = Rom::load(&rom_data).expect("Failed to parse ROM");
/// let mapper = create_mapper(&rom).expect("Unsupported mapper");
///
/// println!("Mapper: {} ({})", mapper.mapper_name(), mapper.mapper_number());
/// ```
pub fn create_mapper(rom: &Rom) -> Result<CartridgeMapper, RomError> {
    match rom.header.mapper {
        0 => Ok(CartridgeMapper::Nrom(Nrom::new(rom))),
        1 => Ok(CartridgeMapper::Mmc1(Mmc1::new(rom))),
        2 => Ok(CartridgeMapper::Uxrom(Uxrom::new(rom))),
        3 => Ok(CartridgeMapper::Cnrom(Cnrom::new(rom))),
        4 => Ok(CartridgeMapper::Mmc3(Mmc3::new(rom))),
        n => {
            log::warn!("unsupported mapper number {n}, cannot create a mapper for this ROM");
            Err(RomError::UnsupportedMapper(n))
        }
    }
}

/// Get a list of supported mapper numbers.
#[must_use]
pub fn supported_mappers() -> &'static [u16] {
    &[0, 1, 2, 3, 4]
}

/// Check if a mapper number is supported.
#[must_use]
pub fn is_mapper_supported(mapper: u16) -> bool {
    supported_mappers().contains(&mapper)
}

/// Get the name of a mapper by number.
#[must_use]
pub fn mapper_name(mapper: u16) -> Option<&'static str> {
    match mapper {
        0 => Some("NROM"),
        1 => Some("MMC1"),
        2 => Some("UxROM"),
        3 => Some("CNROM"),
        4 => Some("MMC3"),
        _ => None,
    }
}
