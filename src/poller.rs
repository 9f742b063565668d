//! Cooperative polling state machine.
//!
//! The host calls [`Poller::tick`] from its control loop with the current
//! time. Every tick performs at most one step of the cycle
//! `Idle -> Measuring -> ReadingData -> Idle`; waiting for the poll interval or
//! the data-ready flag is expressed as re-entering `Idle` or `Measuring` on the
//! next tick, never as a blocking wait.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use fugit::MillisDurationU64;

use crate::baseline::{BaselineKeeper, BaselineStore};
use crate::config::DeviceConfig;
use crate::device::Sen6x;
use crate::error::{ConfigError, Error};
use crate::init;
use crate::output::Publish;
use crate::types::{Channel, Model};
use crate::Instant;

/// How long the module is busy after a fan cleaning was started.
pub const FAN_CLEANING_DURATION: MillisDurationU64 = MillisDurationU64::secs(10);

/// Lifecycle phase of the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Uninitialized,
    Starting,
    /// Waiting for the next poll tick.
    Idle,
    /// Measurement started, waiting for the data-ready flag.
    Measuring,
    /// Data ready, the next tick reads it.
    ReadingData,
    /// Sticky; only [`Poller::reinitialize`] leaves it.
    Error,
}

/// Mutable per-module state, owned by the poller.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub(crate) phase: Phase,
    pub(crate) consecutive_errors: u8,
    pub(crate) voc_baseline: Option<u16>,
    pub(crate) last_read: Option<Instant>,
    pub(crate) model: Option<Model>,
    pub(crate) poll_interval: MillisDurationU64,
    pub(crate) data_ready_wait: MillisDurationU64,
    pub(crate) measuring_since: Option<Instant>,
    pub(crate) next_poll: Option<Instant>,
    /// Continuous measurement is running on the module.
    pub(crate) measurement_running: bool,
    /// Poll ticks are ignored after a stop request.
    pub(crate) suppressed: bool,
    pub(crate) pending_fan_cleaning: bool,
    pub(crate) fan_busy_until: Option<Instant>,
}

impl DeviceState {
    fn new() -> Self {
        DeviceState {
            phase: Phase::Uninitialized,
            consecutive_errors: 0,
            voc_baseline: None,
            last_read: None,
            model: None,
            poll_interval: MillisDurationU64::secs(60),
            data_ready_wait: MillisDurationU64::secs(5),
            measuring_since: None,
            next_poll: None,
            measurement_running: false,
            suppressed: false,
            pending_fan_cleaning: false,
            fan_busy_until: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn consecutive_errors(&self) -> u8 {
        self.consecutive_errors
    }

    /// Last VOC baseline written to or read from the module.
    pub fn voc_baseline(&self) -> Option<u16> {
        self.voc_baseline
    }

    /// Time of the last successful read.
    pub fn last_read(&self) -> Option<Instant> {
        self.last_read
    }

    pub fn model(&self) -> Option<Model> {
        self.model
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn fan_cleaning_pending(&self) -> bool {
        self.pending_fan_cleaning
    }
}

/// Polls one SEN6x module and publishes its values.
pub struct Poller<I2C, D, S> {
    pub(crate) device: Sen6x<I2C, D>,
    pub(crate) config: DeviceConfig,
    pub(crate) store: S,
    pub(crate) keeper: BaselineKeeper,
    pub(crate) state: DeviceState,
}

impl<I2C, D, S> Poller<I2C, D, S>
where
    I2C: I2c,
    D: DelayNs,
    S: BaselineStore,
{
    pub fn new(i2c: I2C, delay: D, config: DeviceConfig, store: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Poller {
            device: Sen6x::new(i2c, config.address, delay),
            keeper: BaselineKeeper::new(config.baseline_interval),
            config,
            store,
            state: DeviceState::new(),
        })
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn release(self) -> (I2C, D, S) {
        let (i2c, delay) = self.device.release();
        (i2c, delay, self.store)
    }

    /// Starts the module: `Uninitialized -> Starting -> Idle`.
    ///
    /// A transient failure leaves the poller in `Starting` and the next tick
    /// retries; a fatal one moves it to `Error`.
    pub fn enable(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        if self.state.phase != Phase::Uninitialized {
            return Err(Error::InvalidState);
        }
        self.state.phase = Phase::Starting;
        self.start(now)
    }

    /// Forgets all state and starts again, as after a restart.
    pub fn reinitialize(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        self.state = DeviceState::new();
        self.keeper.disarm();
        self.device.clear_model();
        self.enable(now)
    }

    /// Runs one step of the poll cycle and returns the resulting phase.
    pub fn tick<P: Publish>(&mut self, now: Instant, outputs: &mut P) -> Phase {
        match self.state.phase {
            Phase::Uninitialized | Phase::Error => {}
            Phase::Starting => {
                if let Err(err) = self.start(now) {
                    log::debug!("sen6x start-up retry failed: {}", err);
                }
            }
            Phase::Idle => self.idle(now),
            Phase::Measuring => self.measuring(now),
            Phase::ReadingData => self.read_data(now, outputs),
        }
        self.state.phase
    }

    fn start(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        let result = init::initialize(
            &mut self.device,
            &self.config,
            &mut self.store,
            &mut self.keeper,
        );
        let init = match result {
            Ok(init) => init,
            Err(err) if err.is_transient() => {
                self.record_failure(&err);
                return Err(err);
            }
            Err(err) => {
                log::error!("sen6x start-up failed: {}", err);
                self.state.phase = Phase::Error;
                return Err(err);
            }
        };

        let model = init.model;
        self.state.model = Some(model);
        self.state.voc_baseline = init.baseline;
        self.state.consecutive_errors = 0;
        self.state.measurement_running = false;
        self.state.poll_interval = self.config.poll_interval_for(model);
        self.state.data_ready_wait = model.max_data_ready_wait();
        self.state.next_poll = Some(now);
        if self.config.store_baseline && model.supports(Channel::Voc) {
            self.keeper.arm(now);
        }
        log::info!("sen6x {:?} ready", model);
        self.enter_idle(now);
        Ok(())
    }

    /// Counts a transient failure; crossing the threshold is fatal.
    pub(crate) fn record_failure(&mut self, err: &Error<I2C::Error>) {
        self.state.consecutive_errors = self.state.consecutive_errors.saturating_add(1);
        log::debug!(
            "sen6x failure {}/{}: {}",
            self.state.consecutive_errors,
            self.config.error_threshold,
            err
        );
        if self.state.consecutive_errors >= self.config.error_threshold {
            log::error!("sen6x: {}", Error::<I2C::Error>::ErrorThreshold);
            self.state.phase = Phase::Error;
        }
    }

    /// Counts the failure and drops back to `Idle` unless it was the last straw.
    fn fail(&mut self, now: Instant, err: Error<I2C::Error>) {
        self.record_failure(&err);
        if self.state.phase != Phase::Error {
            self.enter_idle(now);
        }
    }

    pub(crate) fn enter_idle(&mut self, now: Instant) {
        self.state.phase = Phase::Idle;
        self.state.measuring_since = None;
        if self.state.pending_fan_cleaning {
            if let Err(err) = self.run_fan_cleaning(now) {
                self.record_failure(&err);
            }
        }
    }

    fn idle(&mut self, now: Instant) {
        if self.keeper.is_due(now) {
            self.refresh_baseline(now);
            if self.state.phase == Phase::Error {
                return;
            }
        }
        if self.state.suppressed {
            return;
        }
        if self.fan_busy(now) {
            return;
        }
        if self.state.next_poll.map_or(true, |at| now >= at) {
            if let Err(err) = self.begin_measurement(now) {
                self.record_failure(&err);
            }
        }
    }

    /// The module is still cleaning its fan and must not be started.
    pub(crate) fn fan_busy(&self, now: Instant) -> bool {
        self.state.fan_busy_until.is_some_and(|until| now < until)
    }

    /// `Idle -> Measuring`; the start command is only sent when not already running.
    pub(crate) fn begin_measurement(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        self.state.next_poll = Some(now + self.state.poll_interval);
        if !self.state.measurement_running {
            self.device.start_continuous_measurement()?;
            self.state.measurement_running = true;
        }
        self.state.phase = Phase::Measuring;
        self.state.measuring_since = Some(now);
        Ok(())
    }

    fn measuring(&mut self, now: Instant) {
        match self.device.is_data_ready() {
            Ok(true) => self.state.phase = Phase::ReadingData,
            Ok(false) => {
                let since = self.state.measuring_since.unwrap_or(now);
                if now >= since + self.state.data_ready_wait {
                    self.fail(now, Error::DataNotReady);
                }
            }
            Err(err) => self.fail(now, err),
        }
    }

    fn read_data<P: Publish>(&mut self, now: Instant, outputs: &mut P) {
        let Some(model) = self.state.model else {
            self.fail(now, Error::InvalidState);
            return;
        };
        let channels = self.config.channels.intersection(model.channels());
        match self.device.read_frame(channels) {
            Ok(frame) => {
                self.state.consecutive_errors = 0;
                self.state.last_read = Some(now);
                for (channel, value) in frame.iter() {
                    if channels.contains(channel) {
                        outputs.publish(channel, value);
                    }
                }
                self.enter_idle(now);
            }
            // Outputs keep their previous values.
            Err(err) => self.fail(now, err),
        }
    }

    fn refresh_baseline(&mut self, now: Instant) {
        match self.device.voc_baseline() {
            Ok(baseline) => {
                if self.keeper.update(now, baseline, &mut self.store) {
                    log::debug!("sen6x baseline stored: {:#06x}", baseline);
                }
                self.state.voc_baseline = Some(baseline);
            }
            Err(err) => {
                self.keeper.postpone(now);
                if err.is_transient() {
                    self.record_failure(&err);
                }
            }
        }
    }

    /// Stops measuring if needed and starts the fan cleaning.
    pub(crate) fn run_fan_cleaning(&mut self, now: Instant) -> Result<(), Error<I2C::Error>> {
        self.state.pending_fan_cleaning = false;
        if self.state.measurement_running {
            self.device.stop_measurement()?;
            self.state.measurement_running = false;
        }
        self.device.start_fan_cleaning()?;
        self.state.fan_busy_until = Some(now + FAN_CLEANING_DURATION);
        Ok(())
    }
}
