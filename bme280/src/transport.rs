//! Byte-level two-wire bus transport.
//!
//! The register layer only ever talks to the bus through [`BusTransport`]: start
//! (or repeated start), send a byte, receive a byte with or without
//! acknowledgment, stop. Every call blocks until the bus has finished the step.
//!
//! [`BitBangTransport`] implements the trait on two open-drain GPIOs. Unlike a
//! bare hardware-flag busy wait it never hangs: clock stretching is polled a
//! bounded number of times and then reported as
//! [`BitBangError::ClockStretchTimeout`].
//!
//! The register layer works in whole transactions through [`Transfer`]. Every
//! [`BusTransport`] gets it for free, and [`I2cTransport`](crate::i2c::I2cTransport)
//! provides it on top of a hardware I2C peripheral.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorKind, InputPin, OutputPin};

/// Blocking byte-level access to a two-wire bus.
///
/// A transaction is everything between [`start`](BusTransport::start) and
/// [`stop`](BusTransport::stop). Calling `start` while a transaction is open
/// issues a repeated start. Implementations are not expected to be shared:
/// two interleaved transactions corrupt each other, so whoever owns the
/// transport must own it for the whole start..stop sequence.
pub trait BusTransport {
    type Error;

    /// Issue a start (or repeated start) condition.
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Transmit one byte, MSB first, and wait for the acknowledge bit.
    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Receive one byte and acknowledge it, asking the device for more.
    fn read_byte_ack(&mut self) -> Result<u8, Self::Error>;

    /// Receive one byte without acknowledging it, ending the read.
    fn read_byte_nack(&mut self) -> Result<u8, Self::Error>;

    /// Issue a stop condition, releasing the bus.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    type Error = T::Error;

    fn start(&mut self) -> Result<(), Self::Error> {
        T::start(self)
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        T::send_byte(self, byte)
    }

    fn read_byte_ack(&mut self) -> Result<u8, Self::Error> {
        T::read_byte_ack(self)
    }

    fn read_byte_nack(&mut self) -> Result<u8, Self::Error> {
        T::read_byte_nack(self)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        T::stop(self)
    }
}

/// Whole write and write-then-read transactions with one device.
///
/// `address` is the seven-bit device address; the R/W bit is added by the
/// implementation.
pub trait Transfer {
    type Error;

    /// Write `bytes` in one transaction.
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Write `bytes`, then fill `buffer` after a repeated start.
    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error>;
}

fn address_byte(address: u8, read: bool) -> u8 {
    address << 1 | read as u8
}

/// Run `f` as one transaction; if it fails, try to release the bus.
fn transaction<T: BusTransport, R>(
    bus: &mut T,
    f: impl FnOnce(&mut T) -> Result<R, T::Error>,
) -> Result<R, T::Error> {
    f(&mut *bus).inspect_err(|_| {
        warn!("bus transaction aborted, releasing the bus");
        if bus.stop().is_err() {
            warn!("stop after an aborted transaction failed, the bus may be stuck");
        }
    })
}

impl<T: BusTransport> Transfer for T {
    type Error = T::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        transaction(self, |bus| {
            bus.start()?;
            bus.send_byte(address_byte(address, false))?;
            for byte in bytes {
                bus.send_byte(*byte)?;
            }
            bus.stop()
        })
    }

    /// Every byte but the last is acknowledged, so the device keeps
    /// auto-incrementing its register pointer until the final NACK.
    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        let Some((last, head)) = buffer.split_last_mut() else {
            return self.write(address, bytes);
        };
        transaction(self, |bus| {
            bus.start()?;
            bus.send_byte(address_byte(address, false))?;
            for byte in bytes {
                bus.send_byte(*byte)?;
            }
            bus.start()?;
            bus.send_byte(address_byte(address, true))?;
            for byte in head.iter_mut() {
                *byte = bus.read_byte_ack()?;
            }
            *last = bus.read_byte_nack()?;
            bus.stop()
        })
    }
}

/// Failures of the bit-banged transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitBangError {
    /// Driving or sampling a GPIO failed.
    Pin(ErrorKind),
    /// The addressed device did not acknowledge a transmitted byte.
    Nack,
    /// SDA was held low by someone else when a start condition was due.
    BusBusy,
    /// SCL stayed low for longer than the configured poll limit.
    ClockStretchTimeout,
}

/// Half of the SCL period, giving a ~100 kHz standard-mode clock.
pub const DEFAULT_HALF_PERIOD_NS: u32 = 5_000;

/// How many half periods a device may stretch the clock before we give up.
pub const DEFAULT_STRETCH_LIMIT: u32 = 1_000;

/// Two-wire master on a pair of open-drain GPIOs.
///
/// Both pins must be open-drain with a pull-up: `set_high` releases the line,
/// `set_low` drives it low, and reading the pin samples the actual bus level.
pub struct BitBangTransport<SDA, SCL, D> {
    sda: SDA,
    scl: SCL,
    delay: D,
    half_period_ns: u32,
    stretch_limit: u32,
}

impl<SDA, SCL, D> BitBangTransport<SDA, SCL, D>
where
    SDA: InputPin + OutputPin,
    SCL: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(sda: SDA, scl: SCL, delay: D) -> Self {
        Self {
            sda,
            scl,
            delay,
            half_period_ns: DEFAULT_HALF_PERIOD_NS,
            stretch_limit: DEFAULT_STRETCH_LIMIT,
        }
    }

    /// Set half of the SCL period in nanoseconds.
    pub fn with_half_period_ns(mut self, half_period_ns: u32) -> Self {
        self.half_period_ns = half_period_ns;

        self
    }

    /// Set how many half periods to wait for a stretched clock. At least one poll is always made.
    pub fn with_stretch_limit(mut self, polls: u32) -> Self {
        self.stretch_limit = polls.max(1);

        self
    }

    /// Give back the pins and the delay.
    pub fn release(self) -> (SDA, SCL, D) {
        (self.sda, self.scl, self.delay)
    }

    fn pause(&mut self) {
        self.delay.delay_ns(self.half_period_ns);
    }

    fn sda_release(&mut self) -> Result<(), BitBangError> {
        self.sda.set_high().map_err(|e| BitBangError::Pin(e.kind()))
    }

    fn sda_low(&mut self) -> Result<(), BitBangError> {
        self.sda.set_low().map_err(|e| BitBangError::Pin(e.kind()))
    }

    fn sda_is_high(&mut self) -> Result<bool, BitBangError> {
        self.sda.is_high().map_err(|e| BitBangError::Pin(e.kind()))
    }

    fn scl_low(&mut self) -> Result<(), BitBangError> {
        self.scl.set_low().map_err(|e| BitBangError::Pin(e.kind()))
    }

    /// Release SCL and wait until the line actually goes high.
    fn scl_release(&mut self) -> Result<(), BitBangError> {
        self.scl.set_high().map_err(|e| BitBangError::Pin(e.kind()))?;
        for _ in 0..self.stretch_limit {
            if self.scl.is_high().map_err(|e| BitBangError::Pin(e.kind()))? {
                return Ok(());
            }
            self.pause();
        }

        Err(BitBangError::ClockStretchTimeout)
    }

    /// Clock one bit out. Leaves SCL low.
    fn write_bit(&mut self, high: bool) -> Result<(), BitBangError> {
        if high {
            self.sda_release()?;
        } else {
            self.sda_low()?;
        }
        self.pause();
        self.scl_release()?;
        self.pause();
        self.scl_low()
    }

    /// Clock one bit in. SDA must already be released. Leaves SCL low.
    fn read_bit(&mut self) -> Result<bool, BitBangError> {
        self.pause();
        self.scl_release()?;
        let bit = self.sda_is_high()?;
        self.pause();
        self.scl_low()?;

        Ok(bit)
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, BitBangError> {
        self.sda_release()?;
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | self.read_bit()? as u8;
        }
        // ACK is SDA low during the ninth clock
        self.write_bit(!ack)?;
        self.sda_release()?;

        Ok(byte)
    }
}

impl<SDA, SCL, D> BusTransport for BitBangTransport<SDA, SCL, D>
where
    SDA: InputPin + OutputPin,
    SCL: InputPin + OutputPin,
    D: DelayNs,
{
    type Error = BitBangError;

    fn start(&mut self) -> Result<(), Self::Error> {
        self.sda_release()?;
        self.scl_release()?;
        self.pause();
        if !self.sda_is_high()? {
            return Err(BitBangError::BusBusy);
        }
        self.sda_low()?;
        self.pause();
        self.scl_low()?;
        self.pause();

        Ok(())
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        for bit in (0..8).rev() {
            self.write_bit(byte & (1 << bit) != 0)?;
        }
        self.sda_release()?;
        let nack = self.read_bit()?;
        if nack {
            return Err(BitBangError::Nack);
        }

        Ok(())
    }

    fn read_byte_ack(&mut self) -> Result<u8, Self::Error> {
        self.read_byte(true)
    }

    fn read_byte_nack(&mut self) -> Result<u8, Self::Error> {
        self.read_byte(false)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.sda_low()?;
        self.pause();
        self.scl_release()?;
        self.pause();
        self.sda_release()?;
        self.pause();

        Ok(())
    }
}
