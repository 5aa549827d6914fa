//! NES 2C02 PPU (Picture Processing Unit) emulation.
//!
//! This crate provides a cycle-accurate implementation of the NES PPU,
//! responsible for all graphics rendering.
//!
//! # Overview
//!
//! The PPU operates at 3x the CPU clock rate and generates a 256x240 pixel
//! image. It consists of several subsystems:
//!
//! - **Registers**: Control, Mask, Status, OAM Address, Scroll, Address, Data
//! - **Background rendering**: Nametables, pattern tables, attribute tables
//! - **Sprite rendering**: OAM, sprite evaluation, sprite 0 hit detection
//! - **Palette**: 32-byte palette RAM with mirroring
//!
//! # Timing
//!
//! NTSC timing (the primary target):
//! - Master clock: 21.477272 MHz
//! - PPU clock: 5.369318 MHz (master / 4)
//! - 341 dots per scanline
//! - 262 scanlines per frame
//! - 89,341-89,342 dots per frame (odd frame skip)
//!
//! # Usage
//!
//! ```no_run
//! use rambo_ppu::{Mirroring, Ppu};
//!
//! let mut ppu = Ppu::new(Mirroring::Horizontal);
//! ppu.set_warmed_up(true); // skip the ~29658-cycle power-on warm-up gate
//!
//! // Step the PPU one dot at a time (3 dots per CPU cycle for NTSC),
//! // with a closure the caller wires up to CHR-ROM/RAM through the mapper.
//! let (frame_complete, nmi) = ppu.step_with_chr(|_addr| 0);
//! if nmi {
//!     // Trigger NMI in CPU
//! }
//! let _ = frame_complete;
//!
//! // Access registers from CPU, routing CHR accesses through the same closure.
//! ppu.write_register(0x2000, 0x80, |_addr, _value| {}); // Enable NMI
//! let _status = ppu.read_register(0x2002, |_addr| 0);
//! ```
//!
//! # Features
//!
//! - `serde`: Enable serialization support for save states

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod background;
mod ledger;
mod oam;
mod ppu;
mod registers;
mod scroll;
mod sprites;
mod timing;
mod vram;

pub use ledger::VBlankLedger;
pub use ppu::{FRAME_HEIGHT, FRAME_SIZE, FRAME_WIDTH, Ppu};
pub use registers::{PpuCtrl, PpuMask, PpuStatus};
pub use scroll::ScrollRegisters;
pub use timing::Timing;
pub use vram::{Mirroring, Vram};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ppu_integration() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        ppu.set_warmed_up(true);

        // Basic register operations
        ppu.write_register(0x2000, 0x80, |_, _| {}); // Enable NMI
        ppu.write_register(0x2001, 0x1E, |_, _| {}); // Enable rendering

        // $2002 exposes VBlank/sprite-0-hit/overflow in bits 7-5.
        let status = ppu.read_register(0x2002, |_| 0);
        assert_eq!(status & 0x1F, 0); // bits 4-0 are open bus, decayed to 0 here
    }

    #[test]
    fn test_frame_completion() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);

        let mut completed = false;
        for _ in 0..200_000 {
            let (frame_complete, _nmi) = ppu.step_with_chr(|_| 0);
            if frame_complete {
                completed = true;
                break;
            }
        }

        assert!(completed, "a full frame should have completed");
    }

    #[test]
    fn test_vblank_nmi() {
        let mut ppu = Ppu::new(Mirroring::Horizontal);
        ppu.set_warmed_up(true);

        // Enable NMI
        ppu.write_register(0x2000, 0x80, |_, _| {});

        // Step until we get NMI
        let mut nmi_triggered = false;
        for _ in 0..100_000 {
            let (_, nmi) = ppu.step_with_chr(|_| 0);
            if nmi {
                nmi_triggered = true;
                break;
            }
        }

        assert!(nmi_triggered, "NMI should have been triggered");
    }
}
