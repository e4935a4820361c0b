//! Register map and register-level bus transactions.

use crate::transport::Transfer;

pub const BME280_CHIPID: u8 = 0x60;
pub const SOFTRESET_VALUE: u8 = 0xB6;

pub const CALIB_TP: u8 = 0x88;
pub const CALIB_TP_LEN: usize = 24;
pub const CALIB_H1: u8 = 0xA1;
pub const CHIPID: u8 = 0xD0;
pub const SOFTRESET: u8 = 0xE0;
pub const CALIB_H: u8 = 0xE1;
pub const CALIB_H_LEN: usize = 7;
pub const CTRL_HUM: u8 = 0xF2;
pub const STATUS: u8 = 0xF3;
pub const CTRL_MEAS: u8 = 0xF4;
pub const CONFIG: u8 = 0xF5;
/// press_msb, press_lsb, press_xlsb
pub const PRESSDATA: u8 = 0xF7;
/// temp_msb, temp_lsb, temp_xlsb
pub const TEMPDATA: u8 = 0xFA;
/// hum_msb, hum_lsb
pub const HUMIDDATA: u8 = 0xFD;
/// Pressure through humidity, 0xF7..=0xFE.
pub const ALLDATA_LEN: usize = 8;

const STATUS_MEASURING: u8 = 0x08;
const STATUS_IM_UPDATE: u8 = 0x01;

/// Seven-bit bus address, selected by the level of the SDO pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceAddress {
    /// SDO tied to GND.
    #[default]
    Primary = 0x76,
    /// SDO tied to VDDIO.
    Secondary = 0x77,
}

/// Contents of the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(pub u8);

impl Status {
    /// A conversion is running.
    pub fn is_measuring(&self) -> bool {
        self.0 & STATUS_MEASURING != 0
    }

    /// Calibration data is being copied from NVM into the image registers.
    pub fn is_updating(&self) -> bool {
        self.0 & STATUS_IM_UPDATE != 0
    }
}

/// Register reads and writes over a [`Transfer`].
///
/// Each method is one complete bus transaction.
pub struct RegisterBus<T> {
    transport: T,
    address: DeviceAddress,
}

impl<T: Transfer> RegisterBus<T> {
    pub fn new(transport: T, address: DeviceAddress) -> Self {
        Self { transport, address }
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn release(self) -> T {
        self.transport
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Read one register.
    pub fn read_register(&mut self, register: u8) -> Result<u8, T::Error> {
        let mut data = [0u8; 1];
        self.burst_read(register, &mut data)?;

        Ok(data[0])
    }

    /// Write one register.
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), T::Error> {
        self.transport.write(self.address as u8, &[register, value])
    }

    /// Fill `data` from consecutive registers starting at `start`.
    ///
    /// The device auto-increments its register pointer across the read. An
    /// empty buffer touches nothing.
    pub fn burst_read(&mut self, start: u8, data: &mut [u8]) -> Result<(), T::Error> {
        if data.is_empty() {
            return Ok(());
        }
        self.transport.write_read(self.address as u8, &[start], data)
    }
}
