//! Timestamp-only ledgers.
//!
//! Entities named "ledger" store only timestamps and flags, and expose only
//! predicate readers plus a single `reset` method. All mutation happens in
//! the bus coordination code, never inside these types — keeping state
//! machines out of data structures makes the race conditions they record
//! auditable from one place.
//!
//! The PPU's equivalent ledger (`VBlankLedger`) lives in `rambo-ppu`, not
//! here: it is read and written from inside `Ppu`'s own register/timing
//! code, and `rambo-ppu` cannot depend back on this crate.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A cycle number that hasn't happened yet; used as the "never" sentinel for
/// ledger timestamp fields so comparisons don't need an `Option`.
const NEVER: u64 = u64::MAX;

/// Pure timestamps recording how OAM DMA and DMC DMA interleave on the bus
/// when both are active at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DmaInteractionLedger {
    /// Master cycle DMC DMA most recently became active.
    pub dmc_active_cycle: u64,
    /// Master cycle DMC DMA most recently completed.
    pub dmc_inactive_cycle: u64,
    /// Master cycle OAM DMA most recently paused for DMC time-sharing.
    pub oam_pause_cycle: u64,
    /// Master cycle OAM DMA most recently resumed after a DMC pause.
    pub oam_resume_cycle: u64,
    /// True while OAM DMA is currently paused mid-byte for a DMC fetch.
    pub interrupted_state: bool,
    /// True when the byte OAM was transferring at the moment of
    /// interruption must be written twice (once before the pause, once
    /// again after OAM resumes) to match the hardware's behavior.
    pub duplication_pending: bool,
}

impl DmaInteractionLedger {
    /// Create a ledger in its power-on state (no interaction has occurred).
    #[must_use]
    pub fn new() -> Self {
        Self {
            dmc_active_cycle: NEVER,
            dmc_inactive_cycle: NEVER,
            oam_pause_cycle: NEVER,
            oam_resume_cycle: NEVER,
            interrupted_state: false,
            duplication_pending: false,
        }
    }

    /// Reset to power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for DmaInteractionLedger {
    fn default() -> Self {
        Self::new()
    }
}
