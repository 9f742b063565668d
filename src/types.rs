/// Physical members of the SEN6x family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Model {
    Sen60,
    Sen63c,
    Sen65,
    Sen66,
    Sen68,
}

/// Opcode family: the SEN60 speaks a command set of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Family {
    Sen60,
    Sen6x,
}

impl Model {
    pub const ALL: [Model; 5] = [
        Model::Sen60,
        Model::Sen63c,
        Model::Sen65,
        Model::Sen66,
        Model::Sen68,
    ];

    /// Channels the hardware is able to measure.
    pub const fn channels(self) -> ChannelSet {
        let base = ChannelSet::PM_MASS.union(ChannelSet::NUMBER_CONCENTRATION);
        let rht = base.with(Channel::Temperature).with(Channel::Humidity);
        match self {
            Model::Sen60 => base,
            Model::Sen63c => rht.with(Channel::Co2),
            Model::Sen65 => rht.with(Channel::Voc).with(Channel::Nox),
            Model::Sen66 => rht.with(Channel::Voc).with(Channel::Nox).with(Channel::Co2),
            Model::Sen68 => rht.with(Channel::Voc).with(Channel::Nox).with(Channel::Hcho),
        }
    }

    pub const fn supports(self, channel: Channel) -> bool {
        self.channels().contains(channel)
    }

    pub(crate) const fn family(self) -> Family {
        match self {
            Model::Sen60 => Family::Sen60,
            _ => Family::Sen6x,
        }
    }

    /// Name reported by the product-name command.
    pub const fn product_name(self) -> &'static str {
        match self {
            Model::Sen60 => "SEN60",
            Model::Sen63c => "SEN63C",
            Model::Sen65 => "SEN65",
            Model::Sen66 => "SEN66",
            Model::Sen68 => "SEN68",
        }
    }

    /// Maps a product name to its model, ignoring case and surrounding blanks.
    pub fn from_product_name(name: &[u8]) -> Option<Model> {
        let name = name.trim_ascii();
        Model::ALL
            .into_iter()
            .find(|model| name.eq_ignore_ascii_case(model.product_name().as_bytes()))
    }

    /// Poll interval used when the configuration leaves it unset.
    pub const fn default_poll_interval(self) -> fugit::MillisDurationU64 {
        match self {
            Model::Sen60 => fugit::MillisDurationU64::secs(10),
            _ => fugit::MillisDurationU64::secs(60),
        }
    }

    /// Longest time the data-ready flag may stay low after a poll starts.
    pub const fn max_data_ready_wait(self) -> fugit::MillisDurationU64 {
        match self {
            Model::Sen60 => fugit::MillisDurationU64::secs(2),
            _ => fugit::MillisDurationU64::secs(5),
        }
    }
}

/// Model requested by the configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModelSelection {
    /// Detect the model from the product name.
    #[default]
    Auto,
    /// Require this model; any other product refuses to start.
    Fixed(Model),
}

/// One published measurement channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Mass Concentration PM1.0 [μg/m³]
    Pm1_0,
    /// Mass Concentration PM2.5 [μg/m³]
    Pm2_5,
    /// Mass Concentration PM4.0 [μg/m³]
    Pm4_0,
    /// Mass Concentration PM10 [μg/m³]
    Pm10_0,
    /// Number Concentration PM0.5 [#/cm³]
    Nc0_5,
    /// Number Concentration PM1.0 [#/cm³]
    Nc1_0,
    /// Number Concentration PM2.5 [#/cm³]
    Nc2_5,
    /// Number Concentration PM4.0 [#/cm³]
    Nc4_0,
    /// Number Concentration PM10 [#/cm³]
    Nc10_0,
    /// Compensated Ambient Temperature [°C]
    Temperature,
    /// Compensated Ambient Humidity [%RH]
    Humidity,
    /// VOC Index
    Voc,
    /// NOx Index
    Nox,
    /// CO2 [ppm]
    Co2,
    /// Formaldehyde [ppb]
    Hcho,
}

impl Channel {
    pub const ALL: [Channel; 15] = [
        Channel::Pm1_0,
        Channel::Pm2_5,
        Channel::Pm4_0,
        Channel::Pm10_0,
        Channel::Nc0_5,
        Channel::Nc1_0,
        Channel::Nc2_5,
        Channel::Nc4_0,
        Channel::Nc10_0,
        Channel::Temperature,
        Channel::Humidity,
        Channel::Voc,
        Channel::Nox,
        Channel::Co2,
        Channel::Hcho,
    ];

    const fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Bitset of channels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelSet(u16);

impl ChannelSet {
    pub const PM_MASS: ChannelSet = ChannelSet::empty()
        .with(Channel::Pm1_0)
        .with(Channel::Pm2_5)
        .with(Channel::Pm4_0)
        .with(Channel::Pm10_0);
    pub const NUMBER_CONCENTRATION: ChannelSet = ChannelSet::empty()
        .with(Channel::Nc0_5)
        .with(Channel::Nc1_0)
        .with(Channel::Nc2_5)
        .with(Channel::Nc4_0)
        .with(Channel::Nc10_0);

    pub const fn empty() -> Self {
        ChannelSet(0)
    }

    pub const fn all() -> Self {
        ChannelSet((1 << Channel::ALL.len()) - 1)
    }

    pub const fn with(self, channel: Channel) -> Self {
        ChannelSet(self.0 | channel.bit())
    }

    pub const fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub const fn union(self, other: ChannelSet) -> Self {
        ChannelSet(self.0 | other.0)
    }

    pub const fn intersection(self, other: ChannelSet) -> Self {
        ChannelSet(self.0 & other.0)
    }

    pub const fn intersects(self, other: ChannelSet) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, channel: Channel) {
        self.0 |= channel.bit();
    }

    pub fn remove(&mut self, channel: Channel) {
        self.0 &= !channel.bit();
    }

    pub fn iter(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<T: IntoIterator<Item = Channel>>(iter: T) -> Self {
        iter.into_iter().fold(ChannelSet::empty(), ChannelSet::with)
    }
}

/// One poll cycle's worth of decoded values. Unavailable channels are `None`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementFrame {
    /// Mass Concentration PM1.0 [μg/m³]
    pub pm1_0: Option<f32>,
    /// Mass Concentration PM2.5 [μg/m³]
    pub pm2_5: Option<f32>,
    /// Mass Concentration PM4.0 [μg/m³]
    pub pm4_0: Option<f32>,
    /// Mass Concentration PM10 [μg/m³]
    pub pm10_0: Option<f32>,
    /// Number Concentrations PM0.5/1.0/2.5/4.0/10 [#/cm³]
    pub number_concentration: [Option<f32>; 5],
    /// Compensated Ambient Temperature [°C]
    pub temperature: Option<f32>,
    /// Compensated Ambient Humidity [%RH]
    pub humidity: Option<f32>,
    /// VOC Index
    pub voc_index: Option<f32>,
    /// NOx Index
    pub nox_index: Option<f32>,
    /// CO2 [ppm]
    pub co2: Option<u16>,
    /// Formaldehyde [ppb]
    pub hcho: Option<f32>,
}

impl MeasurementFrame {
    pub fn get(&self, channel: Channel) -> Option<f32> {
        match channel {
            Channel::Pm1_0 => self.pm1_0,
            Channel::Pm2_5 => self.pm2_5,
            Channel::Pm4_0 => self.pm4_0,
            Channel::Pm10_0 => self.pm10_0,
            Channel::Nc0_5 => self.number_concentration[0],
            Channel::Nc1_0 => self.number_concentration[1],
            Channel::Nc2_5 => self.number_concentration[2],
            Channel::Nc4_0 => self.number_concentration[3],
            Channel::Nc10_0 => self.number_concentration[4],
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Voc => self.voc_index,
            Channel::Nox => self.nox_index,
            Channel::Co2 => self.co2.map(f32::from),
            Channel::Hcho => self.hcho,
        }
    }

    /// Clears every field whose channel is not in `channels`.
    pub fn retain(&mut self, channels: ChannelSet) {
        for channel in Channel::ALL {
            if channels.contains(channel) {
                continue;
            }
            match channel {
                Channel::Pm1_0 => self.pm1_0 = None,
                Channel::Pm2_5 => self.pm2_5 = None,
                Channel::Pm4_0 => self.pm4_0 = None,
                Channel::Pm10_0 => self.pm10_0 = None,
                Channel::Nc0_5 => self.number_concentration[0] = None,
                Channel::Nc1_0 => self.number_concentration[1] = None,
                Channel::Nc2_5 => self.number_concentration[2] = None,
                Channel::Nc4_0 => self.number_concentration[3] = None,
                Channel::Nc10_0 => self.number_concentration[4] = None,
                Channel::Temperature => self.temperature = None,
                Channel::Humidity => self.humidity = None,
                Channel::Voc => self.voc_index = None,
                Channel::Nox => self.nox_index = None,
                Channel::Co2 => self.co2 = None,
                Channel::Hcho => self.hcho = None,
            }
        }
    }

    /// Present values in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, f32)> + '_ {
        Channel::ALL
            .into_iter()
            .filter_map(|channel| self.get(channel).map(|value| (channel, value)))
    }
}

/// VOC/NOx gas index algorithm tuning. Unset fields keep the device value.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GasTuning {
    pub index_offset: Option<i16>,
    pub learning_time_offset_hours: Option<i16>,
    pub learning_time_gain_hours: Option<i16>,
    pub gating_max_duration_minutes: Option<i16>,
    pub std_initial: Option<i16>,
    pub gain_factor: Option<i16>,
}

impl GasTuning {
    pub(crate) fn fields(&self) -> [Option<i16>; 6] {
        [
            self.index_offset,
            self.learning_time_offset_hours,
            self.learning_time_gain_hours,
            self.gating_max_duration_minutes,
            self.std_initial,
            self.gain_factor,
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(Option::is_none)
    }

    /// Overlays the set fields onto the words read back from the device.
    pub(crate) fn merge_into(&self, current: [u16; 6]) -> [u16; 6] {
        let mut merged = current;
        for (word, field) in merged.iter_mut().zip(self.fields()) {
            if let Some(value) = field {
                *word = value as u16;
            }
        }
        merged
    }
}

/// Temperature compensation written to slot 0 of the device.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureCompensation {
    /// Constant offset [°C]
    pub offset: f32,
    /// Offset slope, normalized (0.01 = 1 %)
    pub normalized_offset_slope: f32,
    /// Time constant [s]
    pub time_constant: u16,
}

impl TemperatureCompensation {
    pub(crate) fn to_words(self) -> [u16; 4] {
        [
            to_fixed(self.offset, 200.0) as u16,
            to_fixed(self.normalized_offset_slope, 10000.0) as u16,
            self.time_constant,
            0,
        ]
    }
}

// core has no f32::round; `as` saturates on overflow.
fn to_fixed(value: f32, scale: f32) -> i16 {
    let scaled = value * scale;
    if scaled >= 0.0 {
        (scaled + 0.5) as i16
    } else {
        (scaled - 0.5) as i16
    }
}

/// Device status register.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus(pub u32);

impl DeviceStatus {
    const FAN_SPEED_WARNING: u32 = 1 << 21;
    const CO2_2_ERROR: u32 = 1 << 12;
    const PM_ERROR: u32 = 1 << 11;
    const HCHO_ERROR: u32 = 1 << 10;
    const CO2_ERROR: u32 = 1 << 9;
    const GAS_ERROR: u32 = 1 << 7;
    const RHT_ERROR: u32 = 1 << 6;
    const FAN_ERROR: u32 = 1 << 4;

    pub fn fan_speed_warning(self) -> bool {
        self.0 & Self::FAN_SPEED_WARNING != 0
    }

    pub fn fan_error(self) -> bool {
        self.0 & Self::FAN_ERROR != 0
    }

    pub fn pm_error(self) -> bool {
        self.0 & Self::PM_ERROR != 0
    }

    pub fn hcho_error(self) -> bool {
        self.0 & Self::HCHO_ERROR != 0
    }

    pub fn co2_error(self) -> bool {
        self.0 & (Self::CO2_ERROR | Self::CO2_2_ERROR) != 0
    }

    pub fn gas_error(self) -> bool {
        self.0 & Self::GAS_ERROR != 0
    }

    pub fn rht_error(self) -> bool {
        self.0 & Self::RHT_ERROR != 0
    }

    pub fn has_error(self) -> bool {
        self.fan_error()
            || self.pm_error()
            || self.hcho_error()
            || self.co2_error()
            || self.gas_error()
            || self.rht_error()
    }
}

/// Product name as reported by the device, NUL padding stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductName {
    bytes: [u8; 32],
    len: usize,
}

impl ProductName {
    pub(crate) fn from_words(words: &[u16]) -> Self {
        let mut bytes = [0u8; 32];
        let mut len = 0;
        for byte in words.iter().flat_map(|w| w.to_be_bytes()) {
            if byte == 0 || len == bytes.len() {
                break;
            }
            bytes[len] = byte;
            len += 1;
        }
        ProductName { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }

    pub fn model(&self) -> Option<Model> {
        Model::from_product_name(self.as_bytes())
    }
}
