//! Timestamp-only record of VBlank set/clear/read events.
//!
//! Stores only timestamps and flags, and exposes only predicate readers plus
//! a single `reset` method. Mutation of the ledger's fields happens at the
//! PPU's own VBlank set/clear/read call sites, never inside this type
//! itself — keeping the state machine out of the data structure makes the
//! race condition it records auditable from one place.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A cycle number that hasn't happened yet; used as the "never" sentinel for
/// ledger timestamp fields so comparisons don't need an `Option`.
const NEVER: u64 = u64::MAX;

/// Pure timestamp record of VBlank set/clear/read events.
///
/// This is the single source of truth for "is the readable VBlank flag
/// currently visible to a `$2002` read", expressed as a predicate over
/// timestamps rather than a stored bool, so the exact race-condition rule
/// (read-vs-set ordering within the same master cycle) falls out of field
/// comparisons instead of ad hoc flag juggling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VBlankLedger {
    /// PPU dot count of the most recent VBlank flag set (scanline 241, dot 1).
    pub last_set_cycle: u64,
    /// PPU dot count of the most recent VBlank flag clear (scanline 261, dot 1).
    pub last_clear_cycle: u64,
    /// PPU dot count of the most recent `$2002` read.
    pub last_read_cycle: u64,
    /// PPU dot count for which the imminent VBlank set was suppressed by the
    /// read-race rule. Compared against `last_set_cycle` to decide whether
    /// that particular set was honored.
    pub prevent_vbl_set_cycle: u64,
    /// True while an NMI driven by the current `last_set_cycle` has already
    /// fired, so a spurious low->high re-trigger (e.g. software toggling
    /// NMI-enable mid-VBlank) is not treated as a new edge.
    pub race_hold: bool,
    /// True while the current VBlank span (set but not yet cleared) is open.
    pub span_active: bool,
}

impl VBlankLedger {
    /// Create a ledger in its power-on state (no span ever opened).
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_set_cycle: NEVER,
            last_clear_cycle: NEVER,
            last_read_cycle: NEVER,
            prevent_vbl_set_cycle: NEVER,
            race_hold: false,
            span_active: false,
        }
    }

    /// Whether the VBlank flag would read as set right now.
    ///
    /// True iff the span is active, the most recent set is newer than the
    /// most recent clear, no read has intervened since that set, and the
    /// set itself was not suppressed by the race rule.
    #[must_use]
    pub fn is_flag_visible(&self) -> bool {
        self.span_active
            && self.last_set_cycle > self.last_clear_cycle
            && self.last_read_cycle < self.last_set_cycle
            && self.prevent_vbl_set_cycle != self.last_set_cycle
    }

    /// Reset to power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for VBlankLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vblank_ledger_visible_after_set() {
        let mut ledger = VBlankLedger::new();
        ledger.span_active = true;
        ledger.last_set_cycle = 100;
        ledger.last_clear_cycle = 50;
        assert!(ledger.is_flag_visible());
    }

    #[test]
    fn test_vblank_ledger_hidden_after_read() {
        let mut ledger = VBlankLedger::new();
        ledger.span_active = true;
        ledger.last_set_cycle = 100;
        ledger.last_clear_cycle = 50;
        ledger.last_read_cycle = 150;
        assert!(!ledger.is_flag_visible());
    }

    #[test]
    fn test_vblank_ledger_race_suppression() {
        let mut ledger = VBlankLedger::new();
        ledger.span_active = true;
        ledger.last_set_cycle = 100;
        ledger.last_clear_cycle = 50;
        ledger.prevent_vbl_set_cycle = 100;
        assert!(!ledger.is_flag_visible());
    }

    #[test]
    fn test_vblank_ledger_reset() {
        let mut ledger = VBlankLedger::new();
        ledger.span_active = true;
        ledger.last_set_cycle = 100;
        ledger.reset();
        assert!(!ledger.span_active);
        assert_eq!(ledger.last_set_cycle, NEVER);
    }
}
