//! Errors that can occur when using the BME280.
//!
//! The driver error is generic over the error type of the underlying
//! [`Transfer`](crate::transport::Transfer), so a bit-banged bus, a
//! hardware peripheral or a test double can all report their own failures.

use core::fmt;

use crate::config::InvalidRegisterField;

/// All the ways a driver operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<BusError> {
    /// The bus transport reported a failure.
    Bus(BusError),

    /// The identification register did not return the BME280 chip id.
    ///
    /// Usually means a BMP280 (0x58) or a different part answers at this address.
    UnsupportedChip(u8),

    /// Pressure or humidity compensation was requested before any temperature
    /// had been compensated on this driver instance.
    NoTemperatureContext,

    /// The device kept copying its calibration NVM after a reset.
    ResetTimeout,

    /// A forced conversion was still running after its worst-case duration.
    MeasurementTimeout,

    /// A control or config register held a bit pattern the driver cannot decode.
    InvalidRegister(InvalidRegisterField),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Bus(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {:?}", e),
            Error::UnsupportedChip(id) => write!(f, "unsupported chip id {:#04x}", id),
            Error::NoTemperatureContext => {
                f.write_str("temperature must be compensated before pressure or humidity")
            }
            Error::ResetTimeout => f.write_str("device did not finish its reset sequence"),
            Error::MeasurementTimeout => f.write_str("forced conversion did not finish"),
            Error::InvalidRegister(field) => write!(f, "invalid register field: {:?}", field),
        }
    }
}

pub type Result<T, BusError> = core::result::Result<T, Error<BusError>>;
