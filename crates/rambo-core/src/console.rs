//! NES Console Implementation.
//!
//! The Console struct provides the high-level emulation API, managing the
//! CPU, PPU, APU, and mapper integration with proper timing.
//!
//! Emulation advances one PPU dot at a time (see [`MasterClock`]). Every dot
//! steps the PPU; on the dots `MasterClock::is_cpu_tick` marks, the bus's DMA
//! coordinator gets first refusal on the cycle, then the CPU ticks (or
//! doesn't, if DMA took it), then the APU clocks. This ordering - PPU, DMA,
//! CPU, APU - mirrors the real hardware's fixed phase relationship between
//! the three clocks rather than stepping each component for a whole
//! instruction at a time.

use crate::bus::NesBus;
use crate::clock::MasterClock;
use crate::controller::{Button, ControllerPort};
use rambo_cpu::Cpu;
use rambo_mappers::{CartridgeMapper, Rom, RomError, create_mapper};

#[cfg(not(feature = "std"))]
use alloc::{boxed::Box, string::String, vec, vec::Vec};

/// NES emulation timing constants.
pub mod timing {
    /// Master clock frequency (NTSC).
    pub const MASTER_CLOCK_NTSC: u32 = 21_477_272;
    /// CPU clock frequency (NTSC).
    pub const CPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 12;
    /// PPU clock frequency (NTSC).
    pub const PPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 4;
    /// CPU cycles per frame (NTSC).
    pub const CPU_CYCLES_PER_FRAME: u32 = 29_780;
    /// PPU dots per scanline.
    pub const PPU_DOTS_PER_SCANLINE: u16 = 341;
    /// Total scanlines (including vblank).
    pub const PPU_SCANLINES: u16 = 262;
    /// Target frame rate (NTSC).
    pub const FRAME_RATE_NTSC: f64 = 60.0988;
}

/// Console error type.
#[derive(Debug, Clone)]
pub enum ConsoleError {
    /// ROM loading error.
    RomError(RomError),
    /// Invalid state.
    InvalidState(String),
}

impl From<RomError> for ConsoleError {
    fn from(err: RomError) -> Self {
        Self::RomError(err)
    }
}

impl core::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RomError(e) => write!(f, "ROM error: {e}"),
            Self::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConsoleError {}

/// Per-instance machine configuration.
///
/// `initial_phase` pins the hardware's power-on CPU/PPU clock alignment,
/// which real hardware leaves to capacitor-charge randomness, so
/// deterministic tests can reproduce a specific phase instead of relying on
/// the seed-derived default. `four_player_adapter` reserves the second
/// controller port pair for a four-player adapter (NES Satellite/Four
/// Score); `NesBus` always models two ports, so this only affects which
/// port pair a frontend should surface to a second player.
#[derive(Debug, Clone, Copy, Default)]
pub struct MachineConfig {
    /// Fixed CPU/PPU phase (0..3) to start the master clock at, overriding
    /// the seed-derived default. `None` lets the seed decide.
    pub initial_phase: Option<u8>,
    /// Whether a four-player adapter is attached.
    pub four_player_adapter: bool,
}

/// Derive a CPU/PPU phase (0..3) from a caller-supplied seed.
///
/// Not used on any hot path — called once at construction, never on `tick`.
fn phase_from_seed(seed: u64) -> u8 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z % 3) as u8
}

/// NES console emulator.
pub struct Console {
    /// 6502 CPU.
    cpu: Cpu,
    /// System bus (PPU, APU, mapper, RAM).
    bus: NesBus,
    /// Frame buffer (256x240 RGBA).
    framebuffer: Vec<u8>,
    /// Audio sample buffer.
    audio_buffer: Vec<f32>,
    /// Total CPU cycles executed (excludes cycles spent stalled on DMA).
    total_cycles: u64,
    /// Frame counter.
    frame_count: u64,
    /// Is emulation running?
    running: bool,
    /// Whether a four-player adapter is configured.
    four_player_adapter: bool,
}

impl Console {
    /// Create a new console with the given ROM.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn new(rom_data: &[u8]) -> Result<Self, ConsoleError> {
        let rom = Rom::load(rom_data)?;
        let mapper = create_mapper(&rom)?;
        Self::with_mapper(mapper)
    }

    /// Create a new console from ROM bytes (alias for `new`).
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn from_rom_bytes(rom_data: &[u8]) -> Result<Self, ConsoleError> {
        Self::new(rom_data)
    }

    /// Create a new console from ROM bytes with sample rate configuration.
    ///
    /// Note: The sample rate is currently unused as the bus handles
    /// resampling internally.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn from_rom_bytes_with_sample_rate(
        rom_data: &[u8],
        _sample_rate: u32,
    ) -> Result<Self, ConsoleError> {
        Self::new(rom_data)
    }

    /// Create a console with a pre-created mapper.
    ///
    /// # Errors
    ///
    /// Returns an error if the console cannot be initialized.
    pub fn with_mapper(mapper: CartridgeMapper) -> Result<Self, ConsoleError> {
        Self::with_mapper_and_config(mapper, MachineConfig::default(), 0)
    }

    /// Create a console from ROM bytes with an explicit [`MachineConfig`]
    /// and power-on seed.
    ///
    /// `seed` derives the master clock's initial CPU/PPU phase when
    /// `config.initial_phase` is `None`; it is otherwise unused.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM cannot be loaded or uses an unsupported mapper.
    pub fn with_config(
        rom_data: &[u8],
        config: MachineConfig,
        seed: u64,
    ) -> Result<Self, ConsoleError> {
        let rom = Rom::load(rom_data)?;
        let mapper = create_mapper(&rom)?;
        Self::with_mapper_and_config(mapper, config, seed)
    }

    /// Create a console with a pre-created mapper, an explicit
    /// [`MachineConfig`], and a power-on seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the console cannot be initialized.
    pub fn with_mapper_and_config(
        mapper: CartridgeMapper,
        config: MachineConfig,
        seed: u64,
    ) -> Result<Self, ConsoleError> {
        let phase = config.initial_phase.unwrap_or_else(|| phase_from_seed(seed));
        let bus = NesBus::with_phase(mapper, phase);
        let cpu = Cpu::new();

        Ok(Self {
            cpu,
            bus,
            framebuffer: vec![0; 256 * 240 * 4],
            audio_buffer: Vec::with_capacity(2048),
            total_cycles: 0,
            frame_count: 0,
            running: true,
            four_player_adapter: config.four_player_adapter,
        })
    }

    /// Whether a four-player adapter is configured for this console.
    #[must_use]
    pub fn four_player_adapter(&self) -> bool {
        self.four_player_adapter
    }

    /// Reset the console to initial state.
    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
        self.bus.reset();
        self.total_cycles = 0;
        self.running = true;
    }

    /// Power on the console (cold boot).
    pub fn power_on(&mut self) {
        self.reset();
    }

    /// Advance emulation by exactly one PPU dot.
    ///
    /// Returns `true` if this dot completed a frame. This is the building
    /// block `step()`/`step_frame()` are written in terms of; callers
    /// driving their own loop (e.g. a debugger single-stepping dots) can use
    /// it directly.
    pub fn tick_dot(&mut self) -> bool {
        // The PPU dot is stepped before any CPU bus access below, but the
        // VBlank-race property (a $2002 read landing on the exact set dot
        // reads 0 and suppresses that NMI) does not depend on that ordering:
        // `Ppu::read_register` gates the returned flag through
        // `VBlankLedger::is_flag_visible()`, which checks the PPU's current
        // scanline/dot against the set event, not wall-clock order within
        // this function. A read serviced here, while the PPU still reports
        // the exact set dot, is suppressed regardless of step order.
        let (frame_complete, _nmi) = self.bus.step_ppu_dot();

        if self.bus.clock().is_cpu_tick() {
            self.bus.mark_cpu_cycle();

            if self.bus.service_dma() {
                // DMA owns this cycle; the CPU does not see it.
            } else {
                if self.bus.nmi_pending() {
                    self.bus.acknowledge_nmi();
                    self.cpu.trigger_nmi();
                }
                self.cpu.set_irq(self.bus.irq_pending());

                self.cpu.tick(&mut self.bus);
                self.total_cycles += 1;
            }

            if let Some(sample) = self.bus.step_apu() {
                self.audio_buffer.push(sample);
            }
        }

        self.bus.advance_clock();
        frame_complete
    }

    /// Run emulation for one CPU instruction's worth of cycles (i.e. until
    /// the CPU returns to `FetchOpcode` after at least one tick), stepping
    /// the PPU/APU/DMA alongside it.
    ///
    /// Returns the number of CPU cycles consumed (excludes cycles spent on
    /// DMA, which are not CPU instruction cycles).
    pub fn step(&mut self) -> u8 {
        if !self.running {
            return 0;
        }

        let start_cycles = self.total_cycles;
        loop {
            let cpu_cycles_before = self.total_cycles;
            self.tick_dot();
            if self.total_cycles > cpu_cycles_before && self.cpu.get_state() == rambo_cpu::CpuState::FetchOpcode {
                break;
            }
        }

        (self.total_cycles - start_cycles) as u8
    }

    /// Run emulation for one frame (approximately 29,780 CPU cycles).
    ///
    /// Returns the actual number of CPU cycles executed.
    pub fn step_frame(&mut self) -> u64 {
        let start_cycles = self.total_cycles;

        if !self.running {
            return 0;
        }

        loop {
            let frame_complete = self.tick_dot();
            if frame_complete {
                break;
            }
        }

        self.update_framebuffer();
        self.frame_count += 1;

        self.total_cycles - start_cycles
    }

    /// Run emulation for one frame with cycle-accurate timing.
    ///
    /// This is an alias for `step_frame()` for API compatibility.
    /// Returns the actual number of CPU cycles executed.
    pub fn step_frame_accurate(&mut self) -> u64 {
        self.step_frame()
    }

    /// Update the framebuffer from PPU output.
    fn update_framebuffer(&mut self) {
        let ppu_buffer = self.bus.ppu.frame_buffer();

        // Convert PPU palette indices to RGBA
        for (i, &palette_idx) in ppu_buffer.iter().enumerate() {
            let rgb = crate::palette::NES_PALETTE[palette_idx as usize & 0x3F];
            let offset = i * 4;
            self.framebuffer[offset] = rgb.0; // R
            self.framebuffer[offset + 1] = rgb.1; // G
            self.framebuffer[offset + 2] = rgb.2; // B
            self.framebuffer[offset + 3] = 255; // A
        }
    }

    /// Get the current framebuffer (256x240 RGBA).
    #[must_use]
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Take the audio buffer (drains accumulated samples).
    pub fn take_audio(&mut self) -> Vec<f32> {
        core::mem::take(&mut self.audio_buffer)
    }

    /// Get the audio buffer without draining.
    #[must_use]
    pub fn audio_buffer(&self) -> &[f32] {
        &self.audio_buffer
    }

    /// Get audio samples (alias for `audio_buffer`).
    #[must_use]
    pub fn audio_samples(&self) -> &[f32] {
        &self.audio_buffer
    }

    /// Clear the audio sample buffer.
    pub fn clear_audio_samples(&mut self) {
        self.audio_buffer.clear();
    }

    /// Set controller 1's full button state from a bit field (see [`Button`]).
    pub fn set_controller_1(&mut self, buttons: u8) {
        self.bus.controller1.set_buttons(buttons);
    }

    /// Set controller 2's full button state from a bit field (see [`Button`]).
    pub fn set_controller_2(&mut self, buttons: u8) {
        self.bus.controller2.set_buttons(buttons);
    }

    /// Set or clear a single button on controller 1.
    pub fn set_button_1(&mut self, button: Button, pressed: bool) {
        self.bus.controller1.set_button(button, pressed);
    }

    /// Set or clear a single button on controller 2.
    pub fn set_button_2(&mut self, button: Button, pressed: bool) {
        self.bus.controller2.set_button(button, pressed);
    }

    /// Get controller 1's current button state.
    #[must_use]
    pub fn controller1(&self) -> ControllerPort {
        self.bus.controller1
    }

    /// Get controller 2's current button state.
    #[must_use]
    pub fn controller2(&self) -> ControllerPort {
        self.bus.controller2
    }

    /// Get the total CPU cycles executed.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Get the frame count.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Check if emulation is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pause emulation.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume emulation.
    pub fn resume(&mut self) {
        self.running = true;
    }

    /// Get a reference to the CPU for debugging.
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Get a reference to the PPU for debugging.
    #[must_use]
    pub fn ppu(&self) -> &rambo_ppu::Ppu {
        &self.bus.ppu
    }

    /// Get a reference to the APU for debugging.
    #[must_use]
    pub fn apu(&self) -> &rambo_apu::Apu {
        &self.bus.apu
    }

    /// Get the total CPU cycles (alias for `total_cycles`).
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.total_cycles
    }

    /// Peek at memory without side effects.
    ///
    /// This is useful for debugging/display purposes where we don't want
    /// to trigger PPU register side effects or mapper state changes.
    #[must_use]
    pub fn peek_memory(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Get a reference to the bus for debugging.
    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    /// Get a mutable reference to the bus.
    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    /// Get the master clock driving CPU/PPU/APU phase alignment.
    #[must_use]
    pub fn clock(&self) -> &MasterClock {
        self.bus.clock()
    }

    /// Get the mapper number.
    #[must_use]
    pub fn mapper_number(&self) -> u16 {
        self.bus.mapper.mapper_number()
    }

    /// Get the mapper name.
    #[must_use]
    pub fn mapper_name(&self) -> &'static str {
        self.bus.mapper.mapper_name()
    }

    /// Check if the ROM has battery-backed RAM.
    #[must_use]
    pub fn has_battery(&self) -> bool {
        self.bus.mapper.has_battery()
    }

    /// Get battery-backed RAM for saving.
    #[must_use]
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.bus.mapper.battery_ram()
    }

    /// Load battery-backed RAM.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        self.bus.mapper.set_battery_ram(data);
    }
}
