//! Raw ADC samples and compensated readings.

use core::fmt;

/// Fold big-endian register bytes into one word.
fn fold_be(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0_u32, |acc, e| (acc << 8) | *e as u32)
}

/// Raw 20-bit temperature code from `temp_msb..temp_xlsb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawTemperature(pub u32);

impl RawTemperature {
    /// The low nibble of the XLSB byte is not part of the sample.
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(fold_be(&bytes) >> 4)
    }
}

/// Raw 20-bit pressure code from `press_msb..press_xlsb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPressure(pub u32);

impl RawPressure {
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(fold_be(&bytes) >> 4)
    }
}

/// Raw 16-bit humidity code from `hum_msb..hum_lsb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawHumidity(pub u16);

impl RawHumidity {
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }
}

/// All three ADC codes taken from one burst of 0xF7..=0xFE.
///
/// The device shadows its data registers for the duration of a burst, so the
/// three codes belong to the same conversion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawMeasurements {
    pub pressure: RawPressure,
    pub temperature: RawTemperature,
    pub humidity: RawHumidity,
}

impl RawMeasurements {
    pub fn from_bytes(data: &[u8; 8]) -> Self {
        Self {
            pressure: RawPressure::from_bytes([data[0], data[1], data[2]]),
            temperature: RawTemperature::from_bytes([data[3], data[4], data[5]]),
            humidity: RawHumidity::from_bytes([data[6], data[7]]),
        }
    }
}

/// A reading split into an integer and a fractional part for display.
///
/// Both parts are truncated toward zero and carry the sign of the reading, so
/// -12.34 splits into `-12` and `-34`, and -0.05 into `0` and `-5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Split {
    pub integer: i32,
    pub fraction: i32,
    /// How many decimal digits `fraction` stands for.
    pub fraction_digits: u8,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.integer < 0 || self.fraction < 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$}",
            sign,
            self.integer.unsigned_abs(),
            self.fraction.unsigned_abs(),
            width = self.fraction_digits as usize
        )
    }
}

/// Compensated temperature in hundredths of a degree Celsius. 2508 is 25.08 °C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(pub i32);

impl Temperature {
    pub fn centidegrees(&self) -> i32 {
        self.0
    }

    /// Whole degrees and hundredths.
    pub fn split(&self) -> Split {
        let integer = self.0 / 100;
        Split {
            integer,
            fraction: self.0 - integer * 100,
            fraction_digits: 2,
        }
    }
}

/// Compensated pressure in Pascal. 96386 is 963.86 hPa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pressure(pub u32);

impl Pressure {
    pub fn pascals(&self) -> u32 {
        self.0
    }

    /// Whole hectopascals and hundredths.
    pub fn split(&self) -> Split {
        let integer = self.0 / 100;
        Split {
            integer: integer as i32,
            fraction: (self.0 - integer * 100) as i32,
            fraction_digits: 2,
        }
    }
}

/// Compensated relative humidity in %RH as Q22.10. 47445 is 47445/1024 = 46.333 %RH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Humidity(pub u32);

impl Humidity {
    /// Highest value compensation can produce: 100 %RH.
    pub const MAX: Humidity = Humidity(100 << 10);

    pub fn q22_10(&self) -> u32 {
        self.0
    }

    /// Whole percent and thousandths.
    pub fn split(&self) -> Split {
        let integer = self.0 / 1024;
        Split {
            integer: integer as i32,
            fraction: ((self.0 - integer * 1024) * 1000 / 1024) as i32,
            fraction_digits: 3,
        }
    }
}

/// One compensated sample of all three channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurements {
    pub temperature: Temperature,
    pub pressure: Pressure,
    pub humidity: Humidity,
}
