//! Platform agnostic Rust driver for the Sensirion SEN6x environmental sensor
//! node family based on the [`embedded-hal`](https://github.com/rust-embedded/embedded-hal)
//! traits.
//!
//! ## Sensirion SEN6x
//!
//! The SEN6x modules measure particulate matter together with, depending on
//! the model, temperature and humidity (SEN63C/65/66/68), VOC and NOx indices
//! (SEN65/66/68), CO2 (SEN63C/66) and formaldehyde (SEN68). The SEN60 is the
//! compact particulate-only member and speaks its own command set.
//!
//! The crate has two layers:
//!
//! - [`Sen6x`], a blocking command API: one method per device command, with
//!   the Sensirion CRC-8 framing and the per-model payload layouts.
//! - [`Poller`], a cooperative state machine the host drives from its control
//!   loop. It detects the model at start-up, applies tuning and compensation,
//!   polls the module on an interval, publishes decoded values through
//!   [`Publish`], persists the VOC baseline through [`BaselineStore`] and
//!   serves the on-demand [`Action`]s.
//!
//! ## Usage
//!
//! ```ignore
//! use linux_embedded_hal::{Delay, I2cdev};
//! use sen6x_rs::{Channel, ChannelSet, DeviceConfig, Instant, Poller};
//!
//! let dev = I2cdev::new("/dev/i2c-1").unwrap();
//! let config = DeviceConfig::new()
//!     .with_channels(ChannelSet::PM_MASS.with(Channel::Co2).with(Channel::Voc));
//! let mut poller = Poller::new(dev, Delay, config, ()).unwrap();
//!
//! let mut print = |channel: Channel, value: f32| println!("{channel:?}: {value}");
//! let start = std::time::Instant::now();
//! let now = || Instant::from_ticks(start.elapsed().as_millis() as u64);
//!
//! poller.enable(now()).unwrap();
//! loop {
//!     poller.tick(now(), &mut print);
//!     std::thread::sleep(std::time::Duration::from_millis(250));
//! }
//! ```
#![cfg_attr(not(test), no_std)]

mod actions;
mod baseline;
mod codec;
mod command;
mod config;
mod crc;
mod device;
mod error;
mod init;
mod output;
mod poller;
mod transport;
mod types;

#[cfg(test)]
mod test_util;

pub use actions::Action;
pub use baseline::{BaselineStore, MemoryStore};
pub use config::{DeviceConfig, MIN_BASELINE_INTERVAL};
pub use device::Sen6x;
pub use error::{ConfigError, Error, ProtocolError};
pub use init::resolve_model;
pub use output::Publish;
pub use poller::{DeviceState, Phase, Poller, FAN_CLEANING_DURATION};
pub use transport::{Transport, DEFAULT_ADDRESS};
pub use types::{
    Channel, ChannelSet, DeviceStatus, GasTuning, MeasurementFrame, Model, ModelSelection,
    ProductName, TemperatureCompensation,
};

/// Monotonic millisecond timestamp supplied by the host.
pub type Instant = fugit::TimerInstantU64<1000>;
