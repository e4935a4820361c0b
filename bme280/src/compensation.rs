//! Fixed-point compensation of raw ADC codes.
//!
//! These are the 32-bit integer formulas from the BME280 datasheet. Every
//! intermediate is an `i32`/`u32` and uses wrapping arithmetic, so results
//! match the reference implementation bit for bit and adversarial inputs
//! cannot panic.
//!
//! Pressure and humidity depend on the temperature through the
//! [`FineTemperature`] produced by [`CalibrationSet::compensate_temperature`].
//! It is passed explicitly: compensate the temperature of a sample first, then
//! hand its fine temperature to the other two channels.

use crate::calibration::CalibrationSet;
use crate::measurement::{Humidity, Pressure, RawHumidity, RawPressure, RawTemperature, Temperature};

/// Upper clamp of the humidity accumulator, 100 %RH in Q22.22.
const HUMIDITY_ACCUMULATOR_MAX: i32 = 419_430_400;

/// High-resolution temperature carried from temperature compensation into
/// pressure and humidity compensation (`t_fine` in the datasheet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FineTemperature(pub i32);

impl CalibrationSet {
    /// Compensate a temperature code into hundredths of a degree.
    ///
    /// Also returns the fine temperature that pressure and humidity compensation need.
    pub fn compensate_temperature(&self, raw: RawTemperature) -> (Temperature, FineTemperature) {
        let adc_t = raw.0 as i32;
        let t1 = self.t1 as i32;
        let t2 = self.t2 as i32;
        let t3 = self.t3 as i32;

        let var1 = ((adc_t >> 3) - (t1 << 1)).wrapping_mul(t2) >> 11;
        let delta = (adc_t >> 4) - t1;
        let var2 = ((delta.wrapping_mul(delta) >> 12).wrapping_mul(t3)) >> 14;
        let t_fine = var1.wrapping_add(var2);
        let centidegrees = t_fine.wrapping_mul(5).wrapping_add(128) >> 8;

        (Temperature(centidegrees), FineTemperature(t_fine))
    }

    /// Compensate a pressure code into Pascal.
    ///
    /// Returns 0 Pa when the calibration makes the divisor zero.
    pub fn compensate_pressure(&self, raw: RawPressure, fine: FineTemperature) -> Pressure {
        let adc_p = raw.0 as i32;
        let p1 = self.p1 as i32;
        let p2 = self.p2 as i32;
        let p3 = self.p3 as i32;
        let p4 = self.p4 as i32;
        let p5 = self.p5 as i32;
        let p6 = self.p6 as i32;
        let p7 = self.p7 as i32;
        let p8 = self.p8 as i32;
        let p9 = self.p9 as i32;

        let var1 = (fine.0 >> 1).wrapping_sub(64_000);
        let square = (var1 >> 2).wrapping_mul(var1 >> 2);

        let var2 = (square >> 11).wrapping_mul(p6);
        let var2 = var2.wrapping_add(var1.wrapping_mul(p5) << 1);
        let var2 = (var2 >> 2).wrapping_add(p4 << 16);

        let var1 = ((p3.wrapping_mul(square >> 13) >> 3).wrapping_add(p2.wrapping_mul(var1) >> 1))
            >> 18;
        let var1 = 32_768_i32.wrapping_add(var1).wrapping_mul(p1) >> 15;
        if var1 == 0 {
            return Pressure(0);
        }

        let p = (1_048_576_i32.wrapping_sub(adc_p) as u32)
            .wrapping_sub((var2 >> 12) as u32)
            .wrapping_mul(3125);
        let p = scale_by_divisor(p, var1 as u32);

        let var1 = p9.wrapping_mul(((p >> 3).wrapping_mul(p >> 3) >> 13) as i32) >> 12;
        let var2 = ((p >> 2) as i32).wrapping_mul(p8) >> 13;
        let p = (p as i32).wrapping_add(var1.wrapping_add(var2).wrapping_add(p7) >> 4);

        Pressure(p as u32)
    }

    /// Compensate a humidity code into %RH as Q22.10.
    ///
    /// The accumulator is clamped to 0..=100 %RH before the final shift, so the
    /// result never exceeds [`Humidity::MAX`].
    pub fn compensate_humidity(&self, raw: RawHumidity, fine: FineTemperature) -> Humidity {
        let adc_h = raw.0 as i32;
        let h1 = self.h1 as i32;
        let h2 = self.h2 as i32;
        let h3 = self.h3 as i32;
        let h4 = self.h4 as i32;
        let h5 = self.h5 as i32;
        let h6 = self.h6 as i32;

        let x = fine.0.wrapping_sub(76_800);

        let offset = ((adc_h << 14)
            .wrapping_sub(h4 << 20)
            .wrapping_sub(h5.wrapping_mul(x))
            .wrapping_add(16_384))
            >> 15;
        let sensitivity = (x.wrapping_mul(h6) >> 10)
            .wrapping_mul((x.wrapping_mul(h3) >> 11).wrapping_add(32_768))
            >> 10;
        let sensitivity = (sensitivity
            .wrapping_add(2_097_152)
            .wrapping_mul(h2)
            .wrapping_add(8_192))
            >> 14;

        let x = offset.wrapping_mul(sensitivity);
        let x = x.wrapping_sub(((x >> 15).wrapping_mul(x >> 15) >> 7).wrapping_mul(h1) >> 4);
        let x = x.clamp(0, HUMIDITY_ACCUMULATOR_MAX);

        Humidity((x >> 12) as u32)
    }
}

/// Compute `2 * p / divisor` without losing the top bit of `p`.
///
/// Below 2^31 the doubling happens first to keep the last bit of precision;
/// above it the division happens first so the doubling cannot overflow.
fn scale_by_divisor(p: u32, divisor: u32) -> u32 {
    if p < 0x8000_0000 {
        (p << 1) / divisor
    } else {
        (p / divisor).wrapping_mul(2)
    }
}
