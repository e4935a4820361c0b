//! Measurement configuration: oversampling, power mode, standby time and IIR filter.
//!
//! A [`Configuration`] is written once, at initialization, into three registers:
//!
//! | register    | bits 7..5    | bits 4..2     | bits 1..0 |
//! |-------------|--------------|---------------|-----------|
//! | `ctrl_hum`  | -            | -             | `osrs_h` (2..0) |
//! | `ctrl_meas` | `osrs_t`     | `osrs_p`      | `mode`    |
//! | `config`    | `t_sb`       | `filter`      | `spi3w_en` |

/// Bit positions inside `ctrl_meas`.
const CTRL_MEAS_OSRS_T_POS: u8 = 5;
const CTRL_MEAS_OSRS_P_POS: u8 = 2;
const CTRL_MEAS_MODE_MASK: u8 = 0b11;

/// Bit positions inside `config`.
const CONFIG_T_SB_POS: u8 = 5;
const CONFIG_FILTER_POS: u8 = 2;

const FIELD_MASK_3BIT: u8 = 0b111;

/// A register field held a value the driver has no meaning for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidRegisterField {
    pub register: u8,
    pub value: u8,
}

/// Oversampling of one measurement channel.
///
/// `Skipped` disables the channel; its ADC register then reads `0x80000` (or `0x8000` for humidity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    Skipped = 0b000,
    X1 = 0b001,
    X2 = 0b010,
    X4 = 0b011,
    X8 = 0b100,
    X16 = 0b101,
}

impl Oversampling {
    pub(crate) fn register_value(&self) -> u8 {
        *self as u8
    }

    /// Number of samples averaged per conversion, 0 when skipped.
    pub fn factor(&self) -> u32 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }

    /// Codes 0b110 and 0b111 also select x16.
    pub(crate) fn from_register_value(value: u8) -> Self {
        match value & FIELD_MASK_3BIT {
            0b000 => Oversampling::Skipped,
            0b001 => Oversampling::X1,
            0b010 => Oversampling::X2,
            0b011 => Oversampling::X4,
            0b100 => Oversampling::X8,
            _ => Oversampling::X16,
        }
    }
}

/// Sensor power mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// No measurements, lowest power. The state after reset.
    Sleep = 0b00,
    /// One measurement, then back to sleep.
    Forced = 0b01,
    /// Continuous measurement with `StandbyTime` between cycles.
    Normal = 0b11,
}

impl PowerMode {
    pub(crate) fn register_value(&self) -> u8 {
        *self as u8
    }

    /// Replace the mode bits of a `ctrl_meas` byte, keeping the oversampling fields.
    pub(crate) fn apply_to_ctrl_meas(&self, ctrl_meas: u8) -> u8 {
        (ctrl_meas & !CTRL_MEAS_MODE_MASK) | self.register_value()
    }

    /// Both 0b01 and 0b10 mean forced mode.
    pub(crate) fn from_register_value(value: u8) -> Self {
        match value & CTRL_MEAS_MODE_MASK {
            0b00 => PowerMode::Sleep,
            0b11 => PowerMode::Normal,
            _ => PowerMode::Forced,
        }
    }
}

/// Inactive time between two measurement cycles in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StandbyTime {
    Ms0_5 = 0b000,
    Ms62_5 = 0b001,
    Ms125 = 0b010,
    Ms250 = 0b011,
    Ms500 = 0b100,
    Ms1000 = 0b101,
    Ms10 = 0b110,
    Ms20 = 0b111,
}

impl StandbyTime {
    pub(crate) fn register_value(&self) -> u8 {
        *self as u8
    }

    pub(crate) fn from_register_value(value: u8) -> Self {
        match value & FIELD_MASK_3BIT {
            0b000 => StandbyTime::Ms0_5,
            0b001 => StandbyTime::Ms62_5,
            0b010 => StandbyTime::Ms125,
            0b011 => StandbyTime::Ms250,
            0b100 => StandbyTime::Ms500,
            0b101 => StandbyTime::Ms1000,
            0b110 => StandbyTime::Ms10,
            _ => StandbyTime::Ms20,
        }
    }

    /// Standby duration in microseconds.
    pub fn as_micros(&self) -> u32 {
        match self {
            StandbyTime::Ms0_5 => 500,
            StandbyTime::Ms62_5 => 62_500,
            StandbyTime::Ms125 => 125_000,
            StandbyTime::Ms250 => 250_000,
            StandbyTime::Ms500 => 500_000,
            StandbyTime::Ms1000 => 1_000_000,
            StandbyTime::Ms10 => 10_000,
            StandbyTime::Ms20 => 20_000,
        }
    }
}

/// IIR filter coefficient applied to temperature and pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterCoefficient {
    Off = 0b000,
    X2 = 0b001,
    X4 = 0b010,
    X8 = 0b011,
    X16 = 0b100,
}

impl FilterCoefficient {
    pub(crate) fn register_value(&self) -> u8 {
        *self as u8
    }

    /// Codes above 0b100 also select a coefficient of 16.
    pub(crate) fn from_register_value(value: u8) -> Self {
        match value & FIELD_MASK_3BIT {
            0b000 => FilterCoefficient::Off,
            0b001 => FilterCoefficient::X2,
            0b010 => FilterCoefficient::X4,
            0b011 => FilterCoefficient::X8,
            _ => FilterCoefficient::X16,
        }
    }
}

/// Everything written to the control and config registers at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    pub(crate) humidity_oversampling: Oversampling,
    pub(crate) pressure_oversampling: Oversampling,
    pub(crate) temperature_oversampling: Oversampling,
    pub(crate) mode: PowerMode,
    pub(crate) standby_time: StandbyTime,
    pub(crate) filter_coefficient: FilterCoefficient,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            humidity_oversampling: Oversampling::X8,
            pressure_oversampling: Oversampling::X8,
            temperature_oversampling: Oversampling::X8,
            mode: PowerMode::Normal,
            standby_time: StandbyTime::Ms500,
            filter_coefficient: FilterCoefficient::Off,
        }
    }
}

impl Configuration {
    pub fn humidity_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.humidity_oversampling = oversampling;

        self
    }

    pub fn pressure_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.pressure_oversampling = oversampling;

        self
    }

    /// Sets temperature oversampling.
    ///
    /// Pressure and humidity compensation both need a compensated temperature, so skipping the
    /// temperature channel leaves them without a valid fine temperature.
    pub fn temperature_oversampling(mut self, oversampling: Oversampling) -> Self {
        self.temperature_oversampling = oversampling;

        self
    }

    pub fn power_mode(mut self, mode: PowerMode) -> Self {
        self.mode = mode;

        self
    }

    pub fn standby_time(mut self, standby_time: StandbyTime) -> Self {
        self.standby_time = standby_time;

        self
    }

    pub fn filter_coefficient(mut self, filter_coefficient: FilterCoefficient) -> Self {
        self.filter_coefficient = filter_coefficient;

        self
    }

    pub fn mode(&self) -> PowerMode {
        self.mode
    }

    /// Worst-case duration of one measurement cycle in microseconds.
    ///
    /// Datasheet appendix B: 1.25 ms, plus 2.3 ms per temperature sample, plus
    /// 2.3 ms per pressure and humidity sample and 0.575 ms for each of those
    /// two channels that is enabled.
    pub fn max_measurement_time_us(&self) -> u32 {
        let channel = |oversampling: Oversampling| match oversampling.factor() {
            0 => 0,
            factor => 2_300 * factor + 575,
        };

        1_250
            + 2_300 * self.temperature_oversampling.factor()
            + channel(self.pressure_oversampling)
            + channel(self.humidity_oversampling)
    }

    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::WeatherMonitoring => Configuration::default()
                .power_mode(PowerMode::Forced)
                .humidity_oversampling(Oversampling::X1)
                .pressure_oversampling(Oversampling::X1)
                .temperature_oversampling(Oversampling::X1)
                .filter_coefficient(FilterCoefficient::Off),
            Preset::HumiditySensing => Configuration::default()
                .power_mode(PowerMode::Forced)
                .humidity_oversampling(Oversampling::X1)
                .pressure_oversampling(Oversampling::Skipped)
                .temperature_oversampling(Oversampling::X1)
                .filter_coefficient(FilterCoefficient::Off),
            Preset::IndoorNavigation => Configuration::default()
                .power_mode(PowerMode::Normal)
                .standby_time(StandbyTime::Ms0_5)
                .humidity_oversampling(Oversampling::X1)
                .pressure_oversampling(Oversampling::X16)
                .temperature_oversampling(Oversampling::X2)
                .filter_coefficient(FilterCoefficient::X16),
            Preset::Gaming => Configuration::default()
                .power_mode(PowerMode::Normal)
                .standby_time(StandbyTime::Ms0_5)
                .humidity_oversampling(Oversampling::Skipped)
                .pressure_oversampling(Oversampling::X4)
                .temperature_oversampling(Oversampling::X1)
                .filter_coefficient(FilterCoefficient::X16),
        }
    }

    /// Encoded `ctrl_hum` register.
    pub fn ctrl_hum(&self) -> u8 {
        self.humidity_oversampling.register_value()
    }

    /// Encoded `ctrl_meas` register.
    pub fn ctrl_meas(&self) -> u8 {
        self.temperature_oversampling.register_value() << CTRL_MEAS_OSRS_T_POS
            | self.pressure_oversampling.register_value() << CTRL_MEAS_OSRS_P_POS
            | self.mode.register_value()
    }

    /// Encoded `config` register. The 3-wire SPI bit is always left clear.
    pub fn config(&self) -> u8 {
        self.standby_time.register_value() << CONFIG_T_SB_POS
            | self.filter_coefficient.register_value() << CONFIG_FILTER_POS
    }

    /// Rebuild a configuration from the three register bytes.
    ///
    /// Fails if the 3-wire SPI bit is set, since this driver never enables it over a two-wire bus.
    pub fn from_registers(
        ctrl_hum: u8,
        ctrl_meas: u8,
        config: u8,
    ) -> Result<Self, InvalidRegisterField> {
        if config & 0b1 != 0 {
            return Err(InvalidRegisterField {
                register: crate::register::CONFIG,
                value: config,
            });
        }

        Ok(Self {
            humidity_oversampling: Oversampling::from_register_value(ctrl_hum),
            pressure_oversampling: Oversampling::from_register_value(
                ctrl_meas >> CTRL_MEAS_OSRS_P_POS,
            ),
            temperature_oversampling: Oversampling::from_register_value(
                ctrl_meas >> CTRL_MEAS_OSRS_T_POS,
            ),
            mode: PowerMode::from_register_value(ctrl_meas),
            standby_time: StandbyTime::from_register_value(config >> CONFIG_T_SB_POS),
            filter_coefficient: FilterCoefficient::from_register_value(
                config >> CONFIG_FILTER_POS,
            ),
        })
    }
}

/// Recommended settings from the datasheet's use-case section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    WeatherMonitoring,
    HumiditySensing,
    IndoorNavigation,
    Gaming,
}

#[cfg(test)]
#[allow(clippy::unusual_byte_groupings)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_register_bytes() {
        let config = Configuration::default();
        assert_eq!(config.ctrl_hum(), 0b100);
        // osrs_t x8, osrs_p x8, normal
        assert_eq!(config.ctrl_meas(), 0b100_100_11);
        // 500 ms standby, filter off
        assert_eq!(config.config(), 0b100_000_00);
    }

    #[test]
    fn every_field_lands_in_its_bits() {
        let config = Configuration::default()
            .humidity_oversampling(Oversampling::X1)
            .temperature_oversampling(Oversampling::X2)
            .pressure_oversampling(Oversampling::X16)
            .power_mode(PowerMode::Forced)
            .standby_time(StandbyTime::Ms20)
            .filter_coefficient(FilterCoefficient::X4);

        assert_eq!(config.ctrl_hum(), 0x01);
        assert_eq!(config.ctrl_meas(), 0b010_101_01);
        assert_eq!(config.config(), 0b111_010_00);
    }

    #[test]
    fn presets_encode() {
        let weather = Configuration::from_preset(Preset::WeatherMonitoring);
        assert_eq!(weather.ctrl_meas(), 0b001_001_01);
        assert_eq!(weather.config(), 0b100_000_00);

        let gaming = Configuration::from_preset(Preset::Gaming);
        assert_eq!(gaming.ctrl_hum(), 0);
        assert_eq!(gaming.ctrl_meas(), 0b001_011_11);
        assert_eq!(gaming.config(), 0b000_100_00);
    }

    #[test]
    fn decode_inverts_encode() {
        let config = Configuration::from_preset(Preset::IndoorNavigation);
        let decoded =
            Configuration::from_registers(config.ctrl_hum(), config.ctrl_meas(), config.config());
        assert_eq!(decoded, Ok(config));
    }

    #[test]
    fn decode_follows_datasheet_aliases() {
        let decoded = Configuration::from_registers(0b111, 0b110_111_10, 0b000_111_00).unwrap();
        assert_eq!(decoded.humidity_oversampling, Oversampling::X16);
        assert_eq!(decoded.temperature_oversampling, Oversampling::X16);
        assert_eq!(decoded.pressure_oversampling, Oversampling::X16);
        assert_eq!(decoded.mode, PowerMode::Forced);
        assert_eq!(decoded.filter_coefficient, FilterCoefficient::X16);
    }

    #[test]
    fn spi3w_bit_is_rejected() {
        assert_eq!(
            Configuration::from_registers(0, 0, 0b1),
            Err(InvalidRegisterField {
                register: 0xF5,
                value: 0b1
            })
        );
    }

    #[test]
    fn standby_durations() {
        assert_eq!(StandbyTime::Ms0_5.as_micros(), 500);
        assert_eq!(StandbyTime::Ms1000.as_micros(), 1_000_000);
        assert_eq!(StandbyTime::Ms10.as_micros(), 10_000);
    }

    #[test]
    fn mode_bits_replace_only_the_mode() {
        assert_eq!(PowerMode::Sleep.apply_to_ctrl_meas(0b100_100_11), 0b100_100_00);
        assert_eq!(PowerMode::Forced.apply_to_ctrl_meas(0b100_100_11), 0b100_100_01);
        assert_eq!(PowerMode::Normal.apply_to_ctrl_meas(0b001_001_10), 0b001_001_11);
    }

    #[test]
    fn measurement_time_follows_oversampling() {
        assert_eq!(Configuration::default().max_measurement_time_us(), 57_600);
        assert_eq!(
            Configuration::from_preset(Preset::WeatherMonitoring).max_measurement_time_us(),
            9_300
        );
        assert_eq!(
            Configuration::from_preset(Preset::HumiditySensing).max_measurement_time_us(),
            6_425
        );
    }
}
