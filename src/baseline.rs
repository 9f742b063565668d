//! Persistence of the VOC baseline and temperature compensation.
//!
//! The storage medium belongs to the host; this module only decides what to
//! restore at start-up and when a read-back may be written out again.

use fugit::MillisDurationU64;

use crate::types::TemperatureCompensation;
use crate::Instant;

/// Non-volatile storage supplied by the host.
pub trait BaselineStore {
    fn load_baseline(&mut self) -> Option<u16>;

    fn save_baseline(&mut self, baseline: u16);

    fn load_temperature_compensation(&mut self) -> Option<TemperatureCompensation> {
        None
    }

    fn save_temperature_compensation(&mut self, _compensation: TemperatureCompensation) {}
}

/// Store for hosts without persistent storage.
impl BaselineStore for () {
    fn load_baseline(&mut self) -> Option<u16> {
        None
    }

    fn save_baseline(&mut self, _baseline: u16) {}
}

/// RAM-backed store, keeping a count of writes.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoryStore {
    pub baseline: Option<u16>,
    pub compensation: Option<TemperatureCompensation>,
    pub baseline_writes: usize,
    pub compensation_writes: usize,
}

impl BaselineStore for MemoryStore {
    fn load_baseline(&mut self) -> Option<u16> {
        self.baseline
    }

    fn save_baseline(&mut self, baseline: u16) {
        self.baseline = Some(baseline);
        self.baseline_writes += 1;
    }

    fn load_temperature_compensation(&mut self) -> Option<TemperatureCompensation> {
        self.compensation
    }

    fn save_temperature_compensation(&mut self, compensation: TemperatureCompensation) {
        self.compensation = Some(compensation);
        self.compensation_writes += 1;
    }
}

/// Schedules baseline read-backs and writes changed values to the store.
#[derive(Debug, Clone)]
pub(crate) struct BaselineKeeper {
    interval: MillisDurationU64,
    next_check: Option<Instant>,
    /// Last value known to be in the store (or written to the device from config).
    persisted: Option<u16>,
}

impl BaselineKeeper {
    pub(crate) fn new(interval: MillisDurationU64) -> Self {
        BaselineKeeper {
            interval,
            next_check: None,
            persisted: None,
        }
    }

    /// Baseline to write to the device at start-up: stored value first, then configured.
    pub(crate) fn restore<S: BaselineStore>(
        &mut self,
        store: &mut S,
        configured: Option<u16>,
    ) -> Option<u16> {
        let baseline = store.load_baseline().or(configured);
        self.persisted = baseline;
        baseline
    }

    /// Starts the read-back schedule; the first check is one interval out.
    pub(crate) fn arm(&mut self, now: Instant) {
        self.next_check = Some(now + self.interval);
    }

    pub(crate) fn disarm(&mut self) {
        self.next_check = None;
    }

    pub(crate) fn is_due(&self, now: Instant) -> bool {
        self.next_check.is_some_and(|at| now >= at)
    }

    /// Records a read-back. Returns true when the store was written.
    pub(crate) fn update<S: BaselineStore>(
        &mut self,
        now: Instant,
        baseline: u16,
        store: &mut S,
    ) -> bool {
        self.next_check = Some(now + self.interval);
        if self.persisted == Some(baseline) {
            return false;
        }
        store.save_baseline(baseline);
        self.persisted = Some(baseline);
        true
    }

    /// A failed read-back waits for the next interval as well.
    pub(crate) fn postpone(&mut self, now: Instant) {
        self.next_check = Some(now + self.interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::at;

    #[test]
    fn stored_baseline_beats_configured() {
        let mut keeper = BaselineKeeper::new(MillisDurationU64::hours(1));
        let mut store = MemoryStore {
            baseline: Some(0x4321),
            ..Default::default()
        };
        assert_eq!(keeper.restore(&mut store, Some(0x1234)), Some(0x4321));

        let mut empty = MemoryStore::default();
        assert_eq!(keeper.restore(&mut empty, Some(0x1234)), Some(0x1234));
        assert_eq!(keeper.restore(&mut (), None), None);
    }

    #[test]
    fn writes_only_changes_and_never_before_the_interval() {
        let mut keeper = BaselineKeeper::new(MillisDurationU64::hours(1));
        let mut store = MemoryStore::default();
        keeper.restore(&mut store, Some(0x1234));
        assert!(!keeper.is_due(at(0)));

        keeper.arm(at(0));
        assert!(!keeper.is_due(at(3599)));
        assert!(keeper.is_due(at(3600)));

        assert!(!keeper.update(at(3600), 0x1234, &mut store));
        assert_eq!(store.baseline_writes, 0);
        assert!(!keeper.is_due(at(7199)));

        assert!(keeper.update(at(7200), 0x1300, &mut store));
        assert_eq!(store.baseline, Some(0x1300));
        assert_eq!(store.baseline_writes, 1);
    }
}
