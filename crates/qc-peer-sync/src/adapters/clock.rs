//! Wall-clock slot timing.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::ports::SlotClock;

/// Slots of fixed length counted from a network epoch.
///
/// Forging is allowed during the first half of a slot, so a block forged late
/// in its slot cannot land in the next one.
#[derive(Debug, Clone, Copy)]
pub struct EpochSlotClock {
    epoch_unix_secs: u64,
    slot_interval_secs: u64,
}

impl EpochSlotClock {
    pub fn new(epoch_unix_secs: u64, slot_interval_secs: u64) -> Self {
        Self {
            epoch_unix_secs,
            slot_interval_secs: slot_interval_secs.max(1),
        }
    }

    /// Slot containing `unix_secs`; 0 before the epoch.
    pub fn slot_at(&self, unix_secs: u64) -> u64 {
        unix_secs.saturating_sub(self.epoch_unix_secs) / self.slot_interval_secs
    }

    pub fn forging_allowed_at(&self, unix_secs: u64) -> bool {
        if unix_secs < self.epoch_unix_secs {
            return false;
        }
        let into_slot = (unix_secs - self.epoch_unix_secs) % self.slot_interval_secs;
        into_slot < self.slot_interval_secs.div_ceil(2)
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

impl SlotClock for EpochSlotClock {
    fn is_forging_allowed(&self) -> bool {
        self.forging_allowed_at(Self::now())
    }

    fn current_slot(&self) -> u64 {
        self.slot_at(Self::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots() {
        let clock = EpochSlotClock::new(1_000, 10);
        assert_eq!(clock.slot_at(999), 0);
        assert_eq!(clock.slot_at(1_000), 0);
        assert_eq!(clock.slot_at(1_025), 2);
        assert!(clock.forging_allowed_at(1_020));
        assert!(clock.forging_allowed_at(1_024));
        assert!(!clock.forging_allowed_at(1_025));
        assert!(!clock.forging_allowed_at(500));
    }
}
