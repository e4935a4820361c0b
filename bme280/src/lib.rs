//! Driver for the Bosch BME280 humidity, pressure and temperature sensor.
//!
//! The driver is layered the way the bus is:
//!
//! - [`transport`]: byte-level start / send / receive / stop primitives behind
//!   the [`BusTransport`] trait, plus a bit-banged implementation on two GPIOs.
//!   Whole transactions go through [`Transfer`], which every `BusTransport`
//!   implements and [`I2cTransport`] provides on a hardware I2C peripheral.
//! - [`register`]: single-register reads and writes and burst reads.
//! - [`calibration`]: the factory coefficients, read once after reset.
//! - [`compensation`]: the datasheet's 32-bit fixed-point formulas.
//!
//! [`Bme280`] ties them together:
//!
//! ```ignore
//! use bme280::{Bme280, Configuration, DeviceAddress, I2cTransport};
//!
//! let bus = I2cTransport::new(i2c);
//! let mut bme = Bme280::new(bus, DeviceAddress::Primary, Configuration::default(), &mut delay)?;
//!
//! let sample = bme.measure()?;
//! info!("{} C  {} hPa  {} %RH",
//!     sample.temperature.split(), sample.pressure.split(), sample.humidity.split());
//! ```
//!
//! Pressure and humidity compensation depend on the temperature of the same
//! sample. [`Bme280::measure`] takes care of that; the single-channel
//! [`Bme280::pressure`] and [`Bme280::humidity`] use the temperature from the
//! last [`Bme280::temperature`] call and fail with
//! [`Error::NoTemperatureContext`] before the first one.
//!
//! In forced mode the sensor converts once per trigger; use
//! [`Bme280::measure_forced`] to start a conversion and wait for it.
//!
//! ## Features
//!
//! - `defmt`: log through `defmt` and derive `defmt::Format` on public types.
//! - `log`: log through the `log` facade.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

mod bme280;
pub mod calibration;
pub mod compensation;
pub mod config;
pub mod error;
pub mod i2c;
pub mod measurement;
pub mod register;
pub mod transport;

#[cfg(test)]
mod testing;

pub use crate::bme280::Bme280;
pub use calibration::CalibrationSet;
pub use compensation::FineTemperature;
pub use config::{Configuration, FilterCoefficient, Oversampling, PowerMode, Preset, StandbyTime};
pub use error::Error;
pub use i2c::I2cTransport;
pub use measurement::{
    Humidity, Measurements, Pressure, RawHumidity, RawMeasurements, RawPressure, RawTemperature,
    Split, Temperature,
};
pub use register::{DeviceAddress, Status};
pub use transport::{BitBangError, BitBangTransport, BusTransport, Transfer};
