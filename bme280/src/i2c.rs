//! [`Transfer`] on a hardware I2C peripheral.

use embedded_hal::i2c::I2c;

use crate::transport::Transfer;

/// Register transactions on an [`embedded_hal::i2c::I2c`] bus.
///
/// The peripheral generates start, repeated start, ACK/NACK and stop on its
/// own, so each register access maps onto one `write` or `write_read`.
pub struct I2cTransport<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> I2cTransport<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Give back the peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Transfer for I2cTransport<I2C> {
    type Error = I2C::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, bytes)
    }

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(address, bytes, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::{Humidity, Pressure, Temperature};
    use crate::register::{self, DeviceAddress, RegisterBus};
    use crate::testing::{REFERENCE_H1, REFERENCE_H_CALIBRATION, REFERENCE_TP_CALIBRATION};
    use crate::{Bme280, Configuration, Error};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    const ADDR: u8 = 0x76;

    #[test]
    fn register_access_maps_to_write_and_write_read() {
        let expectations = [
            Transaction::write_read(ADDR, vec![register::CHIPID], vec![0x60]),
            Transaction::write(ADDR, vec![register::CTRL_HUM, 0x04]),
            Transaction::write_read(ADDR, vec![register::PRESSDATA], vec![1, 2, 3]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut bus = RegisterBus::new(I2cTransport::new(i2c.clone()), DeviceAddress::Primary);

        assert_eq!(bus.read_register(register::CHIPID), Ok(0x60));
        bus.write_register(register::CTRL_HUM, 0x04).unwrap();
        let mut data = [0u8; 3];
        bus.burst_read(register::PRESSDATA, &mut data).unwrap();
        assert_eq!(data, [1, 2, 3]);

        i2c.done();
    }

    #[test]
    fn peripheral_errors_reach_the_driver() {
        let expectations = [Transaction::write_read(0x77, vec![register::CHIPID], vec![0x00])
            .with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expectations);

        let result = Bme280::new(
            I2cTransport::new(i2c.clone()),
            DeviceAddress::Secondary,
            Configuration::default(),
            &mut NoopDelay::new(),
        );
        assert!(matches!(result, Err(Error::Bus(ErrorKind::Other))));

        i2c.done();
    }

    #[test]
    fn driver_runs_on_a_hardware_bus() {
        let config = Configuration::default();
        let expectations = [
            Transaction::write_read(ADDR, vec![register::CHIPID], vec![0x60]),
            Transaction::write(ADDR, vec![register::SOFTRESET, register::SOFTRESET_VALUE]),
            Transaction::write_read(ADDR, vec![register::STATUS], vec![0x00]),
            Transaction::write_read(ADDR, vec![register::CALIB_TP], REFERENCE_TP_CALIBRATION.to_vec()),
            Transaction::write_read(ADDR, vec![register::CALIB_H1], vec![REFERENCE_H1]),
            Transaction::write_read(ADDR, vec![register::CALIB_H], REFERENCE_H_CALIBRATION.to_vec()),
            Transaction::write_read(ADDR, vec![register::CTRL_MEAS], vec![0x00]),
            Transaction::write(ADDR, vec![register::CTRL_HUM, config.ctrl_hum()]),
            Transaction::write(ADDR, vec![register::CONFIG, config.config()]),
            Transaction::write(ADDR, vec![register::CTRL_MEAS, config.ctrl_meas()]),
            Transaction::write_read(
                ADDR,
                vec![register::PRESSDATA],
                vec![0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x6A, 0x4C],
            ),
        ];
        let mut i2c = I2cMock::new(&expectations);

        let mut bme = Bme280::new(
            I2cTransport::new(i2c.clone()),
            DeviceAddress::Primary,
            config,
            &mut NoopDelay::new(),
        )
        .unwrap();
        let sample = bme.measure().unwrap();

        assert_eq!(sample.temperature, Temperature(2508));
        assert_eq!(sample.pressure, Pressure(100_656));
        assert_eq!(sample.humidity, Humidity(46_152));

        i2c.done();
    }
}
