//! Start-up handshake: identify the module, apply tuning and compensation,
//! restore the VOC baseline.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::baseline::{BaselineKeeper, BaselineStore};
use crate::config::DeviceConfig;
use crate::device::Sen6x;
use crate::error::Error;
use crate::types::{Channel, DeviceStatus, Model, ModelSelection};

/// Result of a successful start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Initialized {
    pub model: Model,
    pub status: DeviceStatus,
    /// Baseline written to the device, if any.
    pub baseline: Option<u16>,
}

/// Resolves the configured selection against the product the device reports.
pub fn resolve_model<E>(
    selection: ModelSelection,
    detected: Option<Model>,
) -> Result<Model, Error<E>> {
    match (selection, detected) {
        (ModelSelection::Auto, Some(model)) => Ok(model),
        (ModelSelection::Auto, None) => Err(Error::UnknownProduct),
        (ModelSelection::Fixed(configured), Some(model)) if configured == model => Ok(model),
        (ModelSelection::Fixed(configured), detected) => Err(Error::ModelMismatch {
            configured,
            detected,
        }),
    }
}

/// Runs the start-up sequence. The module is left idle (not measuring).
pub(crate) fn initialize<I2C, D, S>(
    device: &mut Sen6x<I2C, D>,
    config: &DeviceConfig,
    store: &mut S,
    keeper: &mut BaselineKeeper,
) -> Result<Initialized, Error<I2C::Error>>
where
    I2C: I2c,
    D: DelayNs,
    S: BaselineStore,
{
    // The product-name opcode is shared by both command families, so the
    // module is identified before anything family specific is sent.
    device.clear_model();
    let name = device.product_name()?;
    let model = resolve_model(config.model, name.model())?;
    device.set_model(model);
    log::info!(
        "sen6x at {:#04x}: {}",
        config.address,
        name.as_str().unwrap_or("?")
    );

    // The module may still be measuring from before a warm restart.
    device.stop_measurement()?;

    let status = device.read_and_clear_device_status()?;
    if status.has_error() || status.fan_speed_warning() {
        log::warn!("sen6x status flags set: {:#010x}", status.0);
    }

    if let Some(tuning) = &config.voc_tuning {
        if model.supports(Channel::Voc) {
            device.apply_gas_tuning(true, tuning)?;
        }
    }
    if let Some(tuning) = &config.nox_tuning {
        if model.supports(Channel::Nox) {
            device.apply_gas_tuning(false, tuning)?;
        }
    }

    if model.supports(Channel::Temperature) {
        let compensation = match config.temperature_compensation {
            Some(compensation) => {
                if store.load_temperature_compensation() != Some(compensation) {
                    store.save_temperature_compensation(compensation);
                }
                Some(compensation)
            }
            None => store.load_temperature_compensation(),
        };
        if let Some(compensation) = compensation {
            device.set_temperature_compensation(compensation)?;
        }
    }

    let mut baseline = None;
    if config.store_baseline && model.supports(Channel::Voc) {
        baseline = keeper.restore(store, config.voc_baseline);
        if let Some(value) = baseline {
            device.set_voc_baseline(value)?;
        }
    }

    Ok(Initialized {
        model,
        status,
        baseline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::MemoryStore;
    use crate::test_util::{cmd, cmd_args, name_words, startup, words, ADDR};
    use crate::types::{GasTuning, TemperatureCompensation};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay as DelayMock;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
    use fugit::MillisDurationU64;

    type Device = Sen6x<I2cMock, DelayMock>;

    fn run(
        expectations: &[Transaction],
        config: &DeviceConfig,
        store: &mut MemoryStore,
    ) -> Result<Initialized, Error<ErrorKind>> {
        let mut device: Device = Sen6x::new(I2cMock::new(expectations), ADDR, DelayMock::new());
        let mut keeper = BaselineKeeper::new(MillisDurationU64::hours(1));
        let result = initialize(&mut device, config, store, &mut keeper);
        let (mut i2c, _) = device.release();
        i2c.done();
        result
    }

    #[test]
    fn resolve() {
        assert_eq!(
            resolve_model::<()>(ModelSelection::Auto, Some(Model::Sen65)).unwrap(),
            Model::Sen65
        );
        assert!(matches!(
            resolve_model::<()>(ModelSelection::Auto, None),
            Err(Error::UnknownProduct)
        ));
        assert!(matches!(
            resolve_model::<()>(ModelSelection::Fixed(Model::Sen66), Some(Model::Sen68)),
            Err(Error::ModelMismatch {
                configured: Model::Sen66,
                detected: Some(Model::Sen68)
            })
        ));
    }

    #[test]
    fn auto_detects_sen66() {
        let config = DeviceConfig::new().with_store_baseline(false);
        let init = run(&startup("SEN66"), &config, &mut MemoryStore::default()).unwrap();
        assert_eq!(init.model, Model::Sen66);
        assert_eq!(init.baseline, None);
    }

    #[test]
    fn explicit_model_mismatch_is_fatal() {
        let expectations = [
            Transaction::write(ADDR, cmd(0xd014)),
            Transaction::read(ADDR, words(&name_words("SEN68"))),
        ];
        let config = DeviceConfig::new().with_model(ModelSelection::Fixed(Model::Sen66));
        let err = run(&expectations, &config, &mut MemoryStore::default()).unwrap_err();
        assert!(matches!(err, Error::ModelMismatch { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn configured_baseline_is_written_once() {
        let mut expectations = startup("SEN66");
        expectations.push(Transaction::write(ADDR, cmd_args(0x6181, &[0x1234])));

        let config = DeviceConfig::new().with_voc_baseline(0x1234);
        let mut store = MemoryStore::default();
        let init = run(&expectations, &config, &mut store).unwrap();
        assert_eq!(init.baseline, Some(0x1234));
        assert_eq!(store.baseline_writes, 0);
    }

    #[test]
    fn tuning_and_compensation_are_applied() {
        let mut expectations = startup("SEN65");
        expectations.extend([
            Transaction::write(ADDR, cmd(0x60d0)),
            Transaction::read(ADDR, words(&[100, 12, 12, 180, 50, 230])),
            Transaction::write(ADDR, cmd_args(0x60d0, &[100, 12, 12, 180, 50, 300])),
            Transaction::write(ADDR, cmd_args(0x60b2, &[200, 0, 0, 0])),
        ]);

        let compensation = TemperatureCompensation {
            offset: 1.0,
            ..Default::default()
        };
        let config = DeviceConfig::new()
            .with_store_baseline(false)
            .with_voc_tuning(GasTuning {
                gain_factor: Some(300),
                ..Default::default()
            })
            .with_temperature_compensation(compensation);
        let mut store = MemoryStore::default();
        run(&expectations, &config, &mut store).unwrap();
        assert_eq!(store.compensation, Some(compensation));
        assert_eq!(store.compensation_writes, 1);

        // Same value on the next start-up: written to the device, not the store.
        run(&expectations, &config, &mut store).unwrap();
        assert_eq!(store.compensation_writes, 1);
    }

    #[test]
    fn auto_detects_sen60_with_its_own_stop_command() {
        let config = DeviceConfig::new()
            .with_voc_baseline(0x1234)
            .with_temperature_compensation(TemperatureCompensation::default());
        let init = run(&startup("SEN60"), &config, &mut MemoryStore::default()).unwrap();
        assert_eq!(init.model, Model::Sen60);
        assert_eq!(init.baseline, None);
    }

    #[test]
    fn stored_compensation_is_restored() {
        let mut expectations = startup("SEN63C");
        expectations.push(Transaction::write(ADDR, cmd_args(0x60b2, &[0, 100, 60, 0])));

        let mut store = MemoryStore {
            compensation: Some(TemperatureCompensation {
                offset: 0.0,
                normalized_offset_slope: 0.01,
                time_constant: 60,
            }),
            ..Default::default()
        };
        let config = DeviceConfig::new().with_voc_baseline(0x1234);
        let init = run(&expectations, &config, &mut store).unwrap();
        assert_eq!(init.model, Model::Sen63c);
        assert_eq!(init.baseline, None);
    }
}
