//! On-demand actions triggered by the host's automation layer.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::baseline::BaselineStore;
use crate::error::Error;
use crate::poller::{Phase, Poller};
use crate::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Start a poll cycle now, and resume ticks after a stop.
    StartMeasurement,
    /// Stop measuring and ignore poll ticks until started again.
    StopMeasurement,
    /// Clean the fan; deferred to the next `Idle` while a cycle is in flight.
    StartFanCleaning,
}

impl<I2C, D, S> Poller<I2C, D, S>
where
    I2C: I2c,
    D: DelayNs,
    S: BaselineStore,
{
    /// Runs `action`. Rejected with [`Error::InvalidState`] until the module
    /// has started, and after the poller gave up.
    pub fn trigger(&mut self, action: Action, now: Instant) -> Result<(), Error<I2C::Error>> {
        if matches!(
            self.state.phase,
            Phase::Uninitialized | Phase::Starting | Phase::Error
        ) {
            log::warn!("sen6x: {:?} rejected in {:?}", action, self.state.phase);
            return Err(Error::InvalidState);
        }
        match action {
            Action::StartMeasurement => self.handle_start(now),
            Action::StopMeasurement => self.handle_stop(now),
            Action::StartFanCleaning => self.handle_fan_cleaning(now),
        }
    }

    pub fn start_measurement(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        self.trigger(Action::StartMeasurement, now)
    }

    pub fn stop_measurement(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        self.trigger(Action::StopMeasurement, now)
    }

    pub fn start_fan_cleaning(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        self.trigger(Action::StartFanCleaning, now)
    }

    fn handle_start(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        self.state.suppressed = false;
        if self.state.phase != Phase::Idle {
            return Ok(());
        }
        if self.fan_busy(now) {
            // Starts on the first tick after the cleaning.
            self.state.next_poll = Some(now);
            return Ok(());
        }
        self.begin_measurement(now).map_err(|err| {
            self.record_failure(&err);
            err
        })
    }

    fn handle_stop(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        if let Err(err) = self.device.stop_measurement() {
            self.record_failure(&err);
            return Err(err);
        }
        self.state.measurement_running = false;
        self.state.suppressed = true;
        self.enter_idle(now);
        Ok(())
    }

    fn handle_fan_cleaning(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        if self.state.phase != Phase::Idle {
            self.state.pending_fan_cleaning = true;
            return Ok(());
        }
        self.run_fan_cleaning(now).map_err(|err| {
            self.record_failure(&err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::MemoryStore;
    use crate::config::DeviceConfig;
    use crate::test_util::{at, cmd, startup, words, ADDR};
    use crate::types::Channel;
    use embedded_hal_mock::eh1::delay::NoopDelay as DelayMock;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    type TestPoller = Poller<I2cMock, DelayMock, ()>;

    fn poller(expectations: &[Transaction]) -> TestPoller {
        let config = DeviceConfig::new().with_store_baseline(false);
        Poller::new(I2cMock::new(expectations), DelayMock::new(), config, ()).unwrap()
    }

    fn finish(poller: TestPoller) {
        let (mut i2c, _, _) = poller.release();
        i2c.done();
    }

    fn ignore(_: Channel, _: f32) {}

    #[test]
    fn rejected_before_start_up() {
        let mut poller = poller(&[]);
        for action in [
            Action::StartMeasurement,
            Action::StopMeasurement,
            Action::StartFanCleaning,
        ] {
            assert!(matches!(
                poller.trigger(action, at(0)),
                Err(Error::InvalidState)
            ));
        }
        finish(poller);
    }

    #[test]
    fn stop_suppresses_ticks_until_started_again() {
        let mut expectations = startup("SEN66");
        expectations.extend([
            Transaction::write(ADDR, cmd(0x0021)),
            Transaction::write(ADDR, cmd(0x0104)),
            Transaction::write(ADDR, cmd(0x0021)),
        ]);
        let mut poller = poller(&expectations);
        let mut outputs = ignore;

        poller.enable(at(0)).unwrap();
        assert_eq!(poller.tick(at(0), &mut outputs), Phase::Measuring);

        poller.stop_measurement(at(0)).unwrap();
        assert_eq!(poller.phase(), Phase::Idle);
        assert!(poller.state().is_suppressed());
        assert_eq!(poller.tick(at(60), &mut outputs), Phase::Idle);
        assert_eq!(poller.tick(at(120), &mut outputs), Phase::Idle);

        poller.start_measurement(at(130)).unwrap();
        assert_eq!(poller.phase(), Phase::Measuring);
        assert!(!poller.state().is_suppressed());
        finish(poller);
    }

    #[test]
    fn start_bypasses_the_poll_interval() {
        let mut expectations = startup("SEN66");
        expectations.extend([
            Transaction::write(ADDR, cmd(0x0021)),
            Transaction::write(ADDR, cmd(0x0202)),
            Transaction::read(ADDR, words(&[0x0001])),
            Transaction::write(ADDR, cmd(0x0300)),
            Transaction::read(ADDR, words(&[0; 9])),
        ]);
        let mut poller = poller(&expectations);
        let mut outputs = ignore;

        poller.enable(at(0)).unwrap();
        poller.tick(at(0), &mut outputs);
        poller.tick(at(1), &mut outputs);
        assert_eq!(poller.tick(at(2), &mut outputs), Phase::Idle);
        assert_eq!(poller.tick(at(10), &mut outputs), Phase::Idle);

        poller.start_measurement(at(10)).unwrap();
        assert_eq!(poller.phase(), Phase::Measuring);
        // Already measuring: nothing to do.
        poller.start_measurement(at(10)).unwrap();
        finish(poller);
    }

    #[test]
    fn fan_cleaning_in_idle_runs_immediately() {
        let mut expectations = startup("SEN66");
        expectations.extend([
            Transaction::write(ADDR, cmd(0x5607)),
            Transaction::write(ADDR, cmd(0x0021)),
        ]);
        let mut poller = poller(&expectations);
        let mut outputs = ignore;

        poller.enable(at(0)).unwrap();
        poller.start_fan_cleaning(at(0)).unwrap();
        // Busy cleaning: the due poll waits.
        assert_eq!(poller.tick(at(5), &mut outputs), Phase::Idle);
        assert_eq!(poller.tick(at(10), &mut outputs), Phase::Measuring);
        finish(poller);
    }

    #[test]
    fn start_during_fan_cleaning_waits_for_the_cleaning() {
        let mut expectations = startup("SEN66");
        expectations.extend([
            Transaction::write(ADDR, cmd(0x0104)),
            Transaction::write(ADDR, cmd(0x5607)),
            Transaction::write(ADDR, cmd(0x0021)),
        ]);
        let mut poller = poller(&expectations);
        let mut outputs = ignore;

        poller.enable(at(0)).unwrap();
        poller.stop_measurement(at(0)).unwrap();
        poller.start_fan_cleaning(at(0)).unwrap();

        poller.start_measurement(at(1)).unwrap();
        assert_eq!(poller.phase(), Phase::Idle);
        assert!(!poller.state().is_suppressed());

        assert_eq!(poller.tick(at(9), &mut outputs), Phase::Idle);
        assert_eq!(poller.tick(at(10), &mut outputs), Phase::Measuring);
        finish(poller);
    }

    #[test]
    fn fan_cleaning_during_measurement_runs_once_at_next_idle() {
        let mut expectations = startup("SEN66");
        expectations.extend([
            Transaction::write(ADDR, cmd(0x0021)),
            Transaction::write(ADDR, cmd(0x0202)),
            Transaction::read(ADDR, words(&[0x0001])),
            Transaction::write(ADDR, cmd(0x0300)),
            Transaction::read(ADDR, words(&[0; 9])),
            Transaction::write(ADDR, cmd(0x0104)),
            Transaction::write(ADDR, cmd(0x5607)),
            Transaction::write(ADDR, cmd(0x0021)),
        ]);
        let mut poller = poller(&expectations);
        let mut outputs = ignore;

        poller.enable(at(0)).unwrap();
        assert_eq!(poller.tick(at(0), &mut outputs), Phase::Measuring);

        poller.start_fan_cleaning(at(0)).unwrap();
        poller.start_fan_cleaning(at(0)).unwrap();
        assert!(poller.state().fan_cleaning_pending());

        assert_eq!(poller.tick(at(1), &mut outputs), Phase::ReadingData);
        assert!(poller.state().fan_cleaning_pending());
        assert_eq!(poller.tick(at(2), &mut outputs), Phase::Idle);
        assert!(!poller.state().fan_cleaning_pending());

        assert_eq!(poller.tick(at(3), &mut outputs), Phase::Idle);
        assert_eq!(poller.tick(at(60), &mut outputs), Phase::Measuring);
        finish(poller);
    }

    #[test]
    fn rejected_after_the_poller_gave_up() {
        let mut expectations = startup("SEN66");
        expectations.push(
            Transaction::write(ADDR, cmd(0x0021))
                .with_error(embedded_hal::i2c::ErrorKind::Other),
        );
        let config = DeviceConfig::new()
            .with_store_baseline(false)
            .with_error_threshold(1);
        let mut poller =
            Poller::new(I2cMock::new(&expectations), DelayMock::new(), config, MemoryStore::default())
                .unwrap();
        let mut outputs = ignore;

        poller.enable(at(0)).unwrap();
        assert_eq!(poller.tick(at(0), &mut outputs), Phase::Error);
        assert!(matches!(
            poller.start_fan_cleaning(at(1)),
            Err(Error::InvalidState)
        ));

        let (mut i2c, _, _) = poller.release();
        i2c.done();
    }
}
