//! Blocking command API for one SEN6x module.
//!
//! Every command is written as its opcode (plus CRC-framed argument words),
//! followed by the command's execution time before the bus is touched again.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::codec;
use crate::command::Command;
use crate::crc::{self, WORD_LEN};
use crate::error::Error;
use crate::transport::Transport;
use crate::types::{
    Channel, ChannelSet, DeviceStatus, Family, GasTuning, MeasurementFrame, Model, ProductName,
    TemperatureCompensation,
};

/// Longest response: product name / serial number.
const MAX_RX_WORDS: usize = 16;
/// Opcode plus the longest argument list (tuning parameters).
const MAX_TX_BYTES: usize = 2 + 6 * WORD_LEN;

/// Driver for one SEN6x module.
pub struct Sen6x<I2C, D> {
    transport: Transport<I2C>,
    delay: D,
    model: Option<Model>,
    family: Family,
}

impl<I2C, D> Sen6x<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, address: u8, delay: D) -> Self {
        Sen6x {
            transport: Transport::new(i2c, address),
            delay,
            model: None,
            family: Family::Sen6x,
        }
    }

    /// Model whose command layout is used, once known.
    pub fn model(&self) -> Option<Model> {
        self.model
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = Some(model);
        self.family = model.family();
    }

    pub(crate) fn clear_model(&mut self) {
        self.model = None;
        self.family = Family::Sen6x;
    }

    pub fn release(self) -> (I2C, D) {
        (self.transport.release(), self.delay)
    }

    fn known_model(&self) -> Result<Model, Error<I2C::Error>> {
        self.model.ok_or(Error::InvalidState)
    }

    fn require(&self, supported: bool) -> Result<(), Error<I2C::Error>> {
        if supported {
            Ok(())
        } else {
            Err(Error::NotSupported)
        }
    }

    /// Writes a command without arguments.
    fn write_command(&mut self, cmd: Command) -> Result<(), Error<I2C::Error>> {
        self.write_command_with_args(cmd, &[])
    }

    /// Writes a command followed by CRC-framed argument words.
    fn write_command_with_args(
        &mut self,
        cmd: Command,
        args: &[u16],
    ) -> Result<(), Error<I2C::Error>> {
        let (opcode, delay) = cmd.as_tuple(self.family);
        let mut buf = [0u8; MAX_TX_BYTES];
        if 2 + args.len() * WORD_LEN > buf.len() {
            return Err(Error::MalformedFrame);
        }
        buf[..2].copy_from_slice(&opcode.to_be_bytes());
        let len = 2 + crc::encode_words(args, &mut buf[2..]);

        self.transport.write(&buf[..len]).map_err(Error::Io)?;
        self.delay.delay_ms(delay);
        Ok(())
    }

    /// Writes a command and reads its response into `words`.
    fn delayed_read_cmd(
        &mut self,
        cmd: Command,
        words: &mut [u16],
    ) -> Result<(), Error<I2C::Error>> {
        if words.len() != cmd.response_words() || words.len() > MAX_RX_WORDS {
            return Err(Error::MalformedFrame);
        }
        self.write_command(cmd)?;

        let mut buf = [0u8; MAX_RX_WORDS * WORD_LEN];
        let len = words.len() * WORD_LEN;
        self.transport.read(&mut buf[..len]).map_err(Error::Io)?;
        crc::decode_words(&buf[..len], words)?;
        Ok(())
    }

    /// Reads the product name, e.g. "SEN66".
    pub fn product_name(&mut self) -> Result<ProductName, Error<I2C::Error>> {
        let mut words = [0u16; 16];
        self.delayed_read_cmd(Command::ProductName, &mut words)?;
        Ok(ProductName::from_words(&words))
    }

    /// Reads the serial number string into `buffer`.
    pub fn serial_number<'a>(
        &mut self,
        buffer: &'a mut [u8; 32],
    ) -> Result<&'a [u8], Error<I2C::Error>> {
        let mut words = [0u16; 16];
        self.delayed_read_cmd(Command::SerialNumber, &mut words)?;

        let mut len = 0;
        for byte in words.iter().flat_map(|w| w.to_be_bytes()) {
            if byte == 0 {
                break;
            }
            buffer[len] = byte;
            len += 1;
        }
        Ok(&buffer[..len])
    }

    pub fn start_continuous_measurement(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_command(Command::StartContinuousMeasurement)
    }

    pub fn stop_measurement(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_command(Command::StopMeasurement)
    }

    /// Whether a new measurement can be read.
    pub fn is_data_ready(&mut self) -> Result<bool, Error<I2C::Error>> {
        let mut words = [0u16; 1];
        self.delayed_read_cmd(Command::GetDataReady, &mut words)?;
        Ok(words[0] & 0x00ff == 0x01)
    }

    /// Reads the measured values and keeps only the channels in `channels`.
    ///
    /// Number concentrations are fetched with an extra command on the models
    /// that do not include them in the measured values, and only when asked for.
    pub fn read_frame(
        &mut self,
        channels: ChannelSet,
    ) -> Result<MeasurementFrame, Error<I2C::Error>> {
        let model = self.known_model()?;
        let mut frame = self.read_measured_values()?;
        if model != Model::Sen60 && channels.intersects(ChannelSet::NUMBER_CONCENTRATION) {
            self.read_number_concentrations(&mut frame)?;
        }
        frame.retain(channels.intersection(model.channels()));
        Ok(frame)
    }

    /// Reads the measured values in the layout of the current model.
    pub fn read_measured_values(&mut self) -> Result<MeasurementFrame, Error<I2C::Error>> {
        let model = self.known_model()?;
        let cmd = Command::ReadMeasuredValues(model);
        let mut words = [0u16; 9];
        let len = cmd.response_words();
        self.delayed_read_cmd(cmd, &mut words[..len])?;
        Ok(codec::decode_measured_values(model, &words[..len])?)
    }

    /// Fills the number-concentration bins of `frame`.
    pub fn read_number_concentrations(
        &mut self,
        frame: &mut MeasurementFrame,
    ) -> Result<(), Error<I2C::Error>> {
        let model = self.known_model()?;
        self.require(model != Model::Sen60)?;
        let mut words = [0u16; 5];
        self.delayed_read_cmd(Command::ReadNumberConcentration, &mut words)?;
        Ok(codec::decode_number_concentrations_into(&words, frame)?)
    }

    /// Reads the device status without clearing it.
    pub fn read_device_status(&mut self) -> Result<DeviceStatus, Error<I2C::Error>> {
        let mut words = [0u16; 2];
        self.delayed_read_cmd(Command::ReadDeviceStatus, &mut words)?;
        Ok(DeviceStatus((u32::from(words[0]) << 16) | u32::from(words[1])))
    }

    /// Reads the device status and clears the latched flags.
    pub fn read_and_clear_device_status(&mut self) -> Result<DeviceStatus, Error<I2C::Error>> {
        let mut words = [0u16; 2];
        self.delayed_read_cmd(Command::ReadAndClearDeviceStatus, &mut words)?;
        Ok(DeviceStatus((u32::from(words[0]) << 16) | u32::from(words[1])))
    }

    /// Resets the module; it comes back in idle mode.
    pub fn reset(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_command(Command::DeviceReset)
    }

    /// Starts the fan cleaning. Only accepted while not measuring.
    pub fn start_fan_cleaning(&mut self) -> Result<(), Error<I2C::Error>> {
        self.write_command(Command::StartFanCleaning)
    }

    fn tuning_command(&self, voc: bool) -> Result<Command, Error<I2C::Error>> {
        let model = self.known_model()?;
        if voc {
            self.require(model.supports(Channel::Voc))?;
            Ok(Command::VocAlgorithmTuning)
        } else {
            self.require(model.supports(Channel::Nox))?;
            Ok(Command::NoxAlgorithmTuning)
        }
    }

    /// Raw VOC (`voc = true`) or NOx algorithm tuning words.
    pub fn gas_tuning(&mut self, voc: bool) -> Result<[u16; 6], Error<I2C::Error>> {
        let cmd = self.tuning_command(voc)?;
        let mut words = [0u16; 6];
        self.delayed_read_cmd(cmd, &mut words)?;
        Ok(words)
    }

    /// Read-modify-write of the VOC or NOx tuning: unset fields keep the device value.
    pub fn apply_gas_tuning(
        &mut self,
        voc: bool,
        tuning: &GasTuning,
    ) -> Result<(), Error<I2C::Error>> {
        if tuning.is_empty() {
            return Ok(());
        }
        let cmd = self.tuning_command(voc)?;
        let current = self.gas_tuning(voc)?;
        self.write_command_with_args(cmd, &tuning.merge_into(current))
    }

    /// Current VOC algorithm baseline.
    pub fn voc_baseline(&mut self) -> Result<u16, Error<I2C::Error>> {
        let model = self.known_model()?;
        self.require(model.supports(Channel::Voc))?;
        let mut words = [0u16; 1];
        self.delayed_read_cmd(Command::VocBaseline, &mut words)?;
        Ok(words[0])
    }

    pub fn set_voc_baseline(&mut self, baseline: u16) -> Result<(), Error<I2C::Error>> {
        let model = self.known_model()?;
        self.require(model.supports(Channel::Voc))?;
        self.write_command_with_args(Command::VocBaseline, &[baseline])
    }

    pub fn set_temperature_compensation(
        &mut self,
        compensation: TemperatureCompensation,
    ) -> Result<(), Error<I2C::Error>> {
        let model = self.known_model()?;
        self.require(model.supports(Channel::Temperature))?;
        self.write_command_with_args(Command::TemperatureCompensation, &compensation.to_words())
    }
}
