use fugit::MillisDurationU64;

use crate::error::ConfigError;
use crate::transport::DEFAULT_ADDRESS;
use crate::types::{Channel, ChannelSet, GasTuning, Model, ModelSelection, TemperatureCompensation};

/// Shortest interval between two baseline writes to the store.
pub const MIN_BASELINE_INTERVAL: MillisDurationU64 = MillisDurationU64::hours(1);

/// Static configuration of one module, fixed before the poller is built.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub address: u8,
    /// `None` picks the model's default.
    pub poll_interval: Option<MillisDurationU64>,
    pub model: ModelSelection,
    /// Channels with an output attached.
    pub channels: ChannelSet,
    pub voc_tuning: Option<GasTuning>,
    pub nox_tuning: Option<GasTuning>,
    pub temperature_compensation: Option<TemperatureCompensation>,
    pub store_baseline: bool,
    /// Used when the store holds no baseline yet.
    pub voc_baseline: Option<u16>,
    /// Consecutive transient failures after which the poller gives up.
    pub error_threshold: u8,
    pub baseline_interval: MillisDurationU64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            address: DEFAULT_ADDRESS,
            poll_interval: None,
            model: ModelSelection::Auto,
            channels: ChannelSet::empty(),
            voc_tuning: None,
            nox_tuning: None,
            temperature_compensation: None,
            store_baseline: true,
            voc_baseline: None,
            error_threshold: 5,
            baseline_interval: MIN_BASELINE_INTERVAL,
        }
    }
}

impl DeviceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_poll_interval(mut self, interval: MillisDurationU64) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_model(mut self, model: ModelSelection) -> Self {
        self.model = model;
        self
    }

    pub fn with_channels(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.insert(channel);
        self
    }

    pub fn with_voc_tuning(mut self, tuning: GasTuning) -> Self {
        self.voc_tuning = Some(tuning);
        self
    }

    pub fn with_nox_tuning(mut self, tuning: GasTuning) -> Self {
        self.nox_tuning = Some(tuning);
        self
    }

    pub fn with_temperature_compensation(mut self, compensation: TemperatureCompensation) -> Self {
        self.temperature_compensation = Some(compensation);
        self
    }

    pub fn with_store_baseline(mut self, store: bool) -> Self {
        self.store_baseline = store;
        self
    }

    pub fn with_voc_baseline(mut self, baseline: u16) -> Self {
        self.voc_baseline = Some(baseline);
        self
    }

    pub fn with_error_threshold(mut self, threshold: u8) -> Self {
        self.error_threshold = threshold;
        self
    }

    pub fn with_baseline_interval(mut self, interval: MillisDurationU64) -> Self {
        self.baseline_interval = interval;
        self
    }

    /// Poll interval for `model`.
    pub fn poll_interval_for(&self, model: Model) -> MillisDurationU64 {
        self.poll_interval
            .unwrap_or_else(|| model.default_poll_interval())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(interval) = self.poll_interval {
            if interval < MillisDurationU64::secs(1) {
                return Err(ConfigError::PollInterval);
            }
        }
        if self.error_threshold == 0 {
            return Err(ConfigError::ErrorThreshold);
        }
        if self.baseline_interval < MIN_BASELINE_INTERVAL {
            return Err(ConfigError::BaselineInterval);
        }
        for tuning in [&self.voc_tuning, &self.nox_tuning].into_iter().flatten() {
            validate_tuning(tuning)?;
        }
        Ok(())
    }
}

// `std_initial` is passed through unchecked.
fn validate_tuning(tuning: &GasTuning) -> Result<(), ConfigError> {
    let checks: [(Option<i16>, i16, i16, &'static str); 5] = [
        (tuning.index_offset, 1, 250, "index_offset"),
        (tuning.learning_time_offset_hours, 1, 1000, "learning_time_offset_hours"),
        (tuning.learning_time_gain_hours, 1, 1000, "learning_time_gain_hours"),
        (tuning.gating_max_duration_minutes, 0, 3000, "gating_max_duration_minutes"),
        (tuning.gain_factor, 1, 1000, "gain_factor"),
    ];
    for (value, min, max, field) in checks {
        if let Some(value) = value {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::OutOfRange { field });
            }
        }
    }
    Ok(())
}
