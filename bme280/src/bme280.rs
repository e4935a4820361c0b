use embedded_hal::delay::DelayNs;

use crate::calibration::CalibrationSet;
use crate::compensation::FineTemperature;
use crate::config::{Configuration, PowerMode};
use crate::error::{Error, Result};
use crate::measurement::{
    Humidity, Measurements, Pressure, RawHumidity, RawMeasurements, RawPressure, RawTemperature,
    Split, Temperature,
};
use crate::register::{self, DeviceAddress, RegisterBus, Status, BME280_CHIPID};
use crate::transport::Transfer;

/// Start-up time after a soft reset, before the NVM copy can be polled.
const BME280_RESET_SLEEP_TIME_MS: u32 = 2;
/// Status polls, one millisecond apart, allowed for the NVM copy to finish.
const NVM_COPY_POLLS: u32 = 10;
/// Status polls, one millisecond apart, allowed once a forced conversion should be done.
const MEASUREMENT_POLLS: u32 = 10;

/// BME280 driver.
///
/// Owns the bus transport, the calibration read at initialization and the
/// fine temperature of the most recent temperature compensation.
pub struct Bme280<T> {
    bus: RegisterBus<T>,
    calibration: CalibrationSet,
    fine: Option<FineTemperature>,
}

impl<T: Transfer> Bme280<T> {
    /// Probe, reset, calibrate and configure the sensor.
    pub fn new<D: DelayNs>(
        transport: T,
        address: DeviceAddress,
        configuration: Configuration,
        delay: &mut D,
    ) -> Result<Self, T::Error> {
        let mut bus = RegisterBus::new(transport, address);

        let chipid = bus.read_register(register::CHIPID)?;
        if chipid != BME280_CHIPID {
            error!("BME280 chipid mismatch: {}", chipid);
            return Err(Error::UnsupportedChip(chipid));
        }

        soft_reset(&mut bus, delay)?;
        let calibration = CalibrationSet::load(&mut bus)?;

        let mut bme = Self {
            bus,
            calibration,
            fine: None,
        };
        bme.configure(&configuration)?;
        info!("BME280 ready at address {:#x}", address as u8);

        Ok(bme)
    }

    /// Give back the transport.
    pub fn release(self) -> T {
        self.bus.release()
    }

    pub fn calibration(&self) -> &CalibrationSet {
        &self.calibration
    }

    /// Fine temperature of the last compensated temperature, if any.
    pub fn fine_temperature(&self) -> Option<FineTemperature> {
        self.fine
    }

    pub fn chip_id(&mut self) -> Result<u8, T::Error> {
        Ok(self.bus.read_register(register::CHIPID)?)
    }

    pub fn status(&mut self) -> Result<Status, T::Error> {
        Ok(Status(self.bus.read_register(register::STATUS)?))
    }

    /// Reset the device to its power-on state.
    ///
    /// Control and config registers go back to sleep mode with every channel
    /// skipped; call [`configure`](Self::configure) again afterwards.
    pub fn soft_reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), T::Error> {
        soft_reset(&mut self.bus, delay)
    }

    /// Write oversampling, standby time, filter and power mode.
    ///
    /// `config` writes are only reliable in sleep mode, so a running device is
    /// put to sleep first. `ctrl_hum` only takes effect after a `ctrl_meas`
    /// write, so `ctrl_meas` goes last.
    pub fn configure(&mut self, configuration: &Configuration) -> Result<(), T::Error> {
        debug!("Configuring BME280: {:?}", configuration);
        let ctrl_meas = self.bus.read_register(register::CTRL_MEAS)?;
        if PowerMode::from_register_value(ctrl_meas) != PowerMode::Sleep {
            self.bus.write_register(
                register::CTRL_MEAS,
                PowerMode::Sleep.apply_to_ctrl_meas(ctrl_meas),
            )?;
        }
        self.bus
            .write_register(register::CTRL_HUM, configuration.ctrl_hum())?;
        self.bus
            .write_register(register::CONFIG, configuration.config())?;
        self.bus
            .write_register(register::CTRL_MEAS, configuration.ctrl_meas())?;

        Ok(())
    }

    /// Read back and decode the control and config registers.
    pub fn configuration(&mut self) -> Result<Configuration, T::Error> {
        // ctrl_hum, status, ctrl_meas, config
        let mut data = [0u8; 4];
        self.bus.burst_read(register::CTRL_HUM, &mut data)?;

        Configuration::from_registers(data[0], data[2], data[3]).map_err(Error::InvalidRegister)
    }

    /// Change the power mode, keeping the oversampling settings.
    ///
    /// Setting [`PowerMode::Forced`] starts one measurement cycle.
    pub fn set_mode(&mut self, mode: PowerMode) -> Result<(), T::Error> {
        let ctrl_meas = self.bus.read_register(register::CTRL_MEAS)?;
        self.bus
            .write_register(register::CTRL_MEAS, mode.apply_to_ctrl_meas(ctrl_meas))?;

        Ok(())
    }

    pub fn read_raw_temperature(&mut self) -> Result<RawTemperature, T::Error> {
        let mut data = [0u8; 3];
        self.bus.burst_read(register::TEMPDATA, &mut data)?;
        let raw = RawTemperature::from_bytes(data);
        trace!("Raw temperature {}", raw.0);

        Ok(raw)
    }

    pub fn read_raw_pressure(&mut self) -> Result<RawPressure, T::Error> {
        let mut data = [0u8; 3];
        self.bus.burst_read(register::PRESSDATA, &mut data)?;
        let raw = RawPressure::from_bytes(data);
        trace!("Raw pressure {}", raw.0);

        Ok(raw)
    }

    pub fn read_raw_humidity(&mut self) -> Result<RawHumidity, T::Error> {
        let mut data = [0u8; 2];
        self.bus.burst_read(register::HUMIDDATA, &mut data)?;
        let raw = RawHumidity::from_bytes(data);
        trace!("Raw humidity {}", raw.0);

        Ok(raw)
    }

    /// Read all three ADC codes in one burst.
    pub fn read_raw_all(&mut self) -> Result<RawMeasurements, T::Error> {
        let mut data = [0u8; register::ALLDATA_LEN];
        self.bus.burst_read(register::PRESSDATA, &mut data)?;

        Ok(RawMeasurements::from_bytes(&data))
    }

    /// Read and compensate the temperature, refreshing the fine temperature.
    pub fn temperature(&mut self) -> Result<Temperature, T::Error> {
        let raw = self.read_raw_temperature()?;
        let (temperature, fine) = self.calibration.compensate_temperature(raw);
        self.fine = Some(fine);

        Ok(temperature)
    }

    /// Read and compensate the pressure against the last compensated temperature.
    ///
    /// The pressure register is read in its own transaction and may belong to a
    /// newer conversion than that temperature; use [`measure`](Self::measure)
    /// for a consistent sample.
    pub fn pressure(&mut self) -> Result<Pressure, T::Error> {
        let Some(fine) = self.fine else {
            return Err(Error::NoTemperatureContext);
        };
        let raw = self.read_raw_pressure()?;

        Ok(self.calibration.compensate_pressure(raw, fine))
    }

    /// Read and compensate the humidity against the last compensated temperature.
    pub fn humidity(&mut self) -> Result<Humidity, T::Error> {
        let Some(fine) = self.fine else {
            return Err(Error::NoTemperatureContext);
        };
        let raw = self.read_raw_humidity()?;

        Ok(self.calibration.compensate_humidity(raw, fine))
    }

    /// Burst-read all channels and compensate them as one sample.
    ///
    /// Returns the latest finished conversion. In forced mode nothing new is
    /// converted until the next trigger; see [`measure_forced`](Self::measure_forced).
    pub fn measure(&mut self) -> Result<Measurements, T::Error> {
        let raw = self.read_raw_all()?;
        trace!("Raw measurements {:?}", raw);

        Ok(self.compensate(raw))
    }

    /// Trigger one forced conversion, wait for it and read the result.
    ///
    /// Waits for the worst-case conversion time of the current oversampling
    /// settings, then polls the `measuring` status bit a bounded number of
    /// times. The device drops back to sleep mode afterwards.
    pub fn measure_forced<D: DelayNs>(&mut self, delay: &mut D) -> Result<Measurements, T::Error> {
        let configuration = self.configuration()?;
        self.bus.write_register(
            register::CTRL_MEAS,
            configuration.power_mode(PowerMode::Forced).ctrl_meas(),
        )?;
        delay.delay_us(configuration.max_measurement_time_us());

        for _ in 0..MEASUREMENT_POLLS {
            if !self.status()?.is_measuring() {
                return self.measure();
            }
            delay.delay_ms(1);
        }

        error!("BME280 forced conversion did not finish");
        Err(Error::MeasurementTimeout)
    }

    /// Compensate a raw sample, temperature first.
    pub fn compensate(&mut self, raw: RawMeasurements) -> Measurements {
        let (temperature, fine) = self.calibration.compensate_temperature(raw.temperature);
        self.fine = Some(fine);

        Measurements {
            temperature,
            pressure: self.calibration.compensate_pressure(raw.pressure, fine),
            humidity: self.calibration.compensate_humidity(raw.humidity, fine),
        }
    }

    /// Temperature as degrees and hundredths.
    pub fn get_temperature(&mut self) -> Result<Split, T::Error> {
        Ok(self.temperature()?.split())
    }

    /// Pressure as hectopascals and hundredths.
    pub fn get_pressure(&mut self) -> Result<Split, T::Error> {
        Ok(self.pressure()?.split())
    }

    /// Humidity as percent and thousandths.
    pub fn get_humidity(&mut self) -> Result<Split, T::Error> {
        Ok(self.humidity()?.split())
    }

    #[cfg(test)]
    pub(crate) fn transport_mut(&mut self) -> &mut T {
        self.bus.transport_mut()
    }
}

fn soft_reset<T: Transfer, D: DelayNs>(
    bus: &mut RegisterBus<T>,
    delay: &mut D,
) -> Result<(), T::Error> {
    debug!("Soft resetting BME280");
    bus.write_register(register::SOFTRESET, register::SOFTRESET_VALUE)?;
    delay.delay_ms(BME280_RESET_SLEEP_TIME_MS);

    for _ in 0..NVM_COPY_POLLS {
        if !Status(bus.read_register(register::STATUS)?).is_updating() {
            return Ok(());
        }
        delay.delay_ms(1);
    }

    error!("BME280 NVM copy did not finish after reset");
    Err(Error::ResetTimeout)
}
