//! A simulated BME280 sitting on the far side of a [`BusTransport`].
//!
//! `FakeBme280` follows the device's side of the two-wire protocol byte for
//! byte: it checks the address phase, tracks the register pointer, applies
//! writes as register/value pairs, auto-increments on reads and records every
//! bus event so tests can assert on the exact shape of a transaction.
//!
//! Like the real part it ignores `config` writes outside sleep mode, and a
//! forced-mode trigger runs one conversion before dropping back to sleep.

use crate::register;
use crate::transport::BusTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    Start,
    Send(u8),
    ReadAck(u8),
    ReadNack(u8),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBusError {
    /// Nobody answered the address byte.
    Nack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Address,
    Pointer,
    Data,
    Read,
}

/// T1..T3, P1..P9 from the Bosch compensation example, little-endian.
pub const REFERENCE_TP_CALIBRATION: [u8; 24] = [
    0x70, 0x6B, // T1 = 27504
    0x43, 0x67, // T2 = 26435
    0x18, 0xFC, // T3 = -1000
    0x7D, 0x8E, // P1 = 36477
    0x43, 0xD6, // P2 = -10685
    0xD0, 0x0B, // P3 = 3024
    0x27, 0x0B, // P4 = 2855
    0x8C, 0x00, // P5 = 140
    0xF9, 0xFF, // P6 = -7
    0x8C, 0x3C, // P7 = 15500
    0xF8, 0xC6, // P8 = -14600
    0x70, 0x17, // P9 = 6000
];

/// H1 = 75
pub const REFERENCE_H1: u8 = 0x4B;

/// H2 = 370, H3 = 0, H4 = 300, H5 = 50, H6 = 30
pub const REFERENCE_H_CALIBRATION: [u8; 7] = [0x72, 0x01, 0x00, 0x12, 0x2C, 0x03, 0x1E];

pub const REFERENCE_RAW_TEMPERATURE: u32 = 519_888;
pub const REFERENCE_RAW_PRESSURE: u32 = 415_148;
pub const REFERENCE_RAW_HUMIDITY: u16 = 0x6A4C;

pub struct FakeBme280 {
    pub registers: [u8; 256],
    pub events: Vec<BusEvent>,
    pub resets: usize,
    /// Forced conversions triggered so far.
    pub conversions: usize,
    address: u8,
    phase: Phase,
    pointer: u8,
    update_polls_after_reset: usize,
    pending_update_polls: usize,
    measuring_polls: usize,
    pending_measuring_polls: usize,
    next_sample: Option<[u8; register::ALLDATA_LEN]>,
}

impl FakeBme280 {
    pub fn new() -> Self {
        let mut registers = [0u8; 256];
        registers[register::CHIPID as usize] = register::BME280_CHIPID;

        FakeBme280 {
            registers,
            events: Vec::new(),
            resets: 0,
            conversions: 0,
            address: 0x76,
            phase: Phase::Idle,
            pointer: 0,
            update_polls_after_reset: 0,
            pending_update_polls: 0,
            measuring_polls: 0,
            pending_measuring_polls: 0,
            next_sample: None,
        }
    }

    /// A device loaded with the reference calibration and reference ADC codes.
    pub fn reference() -> Self {
        FakeBme280::new()
            .with_calibration(
                &REFERENCE_TP_CALIBRATION,
                REFERENCE_H1,
                &REFERENCE_H_CALIBRATION,
            )
            .with_raw(
                REFERENCE_RAW_PRESSURE,
                REFERENCE_RAW_TEMPERATURE,
                REFERENCE_RAW_HUMIDITY,
            )
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;

        self
    }

    pub fn with_chip_id(mut self, id: u8) -> Self {
        self.registers[register::CHIPID as usize] = id;

        self
    }

    pub fn with_calibration(mut self, tp: &[u8; 24], h1: u8, h: &[u8; 7]) -> Self {
        let base = register::CALIB_TP as usize;
        self.registers[base..base + tp.len()].copy_from_slice(tp);
        self.registers[register::CALIB_H1 as usize] = h1;
        let base = register::CALIB_H as usize;
        self.registers[base..base + h.len()].copy_from_slice(h);

        self
    }

    /// Load the ADC output registers, laid out the way the device stores 20-bit codes.
    pub fn with_raw(mut self, pressure: u32, temperature: u32, humidity: u16) -> Self {
        let base = register::PRESSDATA as usize;
        self.registers[base..base + register::ALLDATA_LEN]
            .copy_from_slice(&sample_bytes(pressure, temperature, humidity));

        self
    }

    /// ADC codes the next forced conversion will produce.
    pub fn queue_sample(&mut self, pressure: u32, temperature: u32, humidity: u16) {
        self.next_sample = Some(sample_bytes(pressure, temperature, humidity));
    }

    /// Keep the `measuring` status bit set for this many status reads after each forced trigger.
    pub fn with_measuring_polls(mut self, polls: usize) -> Self {
        self.measuring_polls = polls;

        self
    }

    /// Keep the `im_update` status bit set for this many status reads after each reset.
    pub fn with_update_polls(mut self, polls: usize) -> Self {
        self.update_polls_after_reset = polls;

        self
    }

    pub fn take_events(&mut self) -> Vec<BusEvent> {
        core::mem::take(&mut self.events)
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers[address as usize]
    }

    fn apply_write(&mut self, address: u8, value: u8) {
        match address {
            register::SOFTRESET if value == register::SOFTRESET_VALUE => {
                self.resets += 1;
                self.registers[register::CTRL_HUM as usize] = 0;
                self.registers[register::CTRL_MEAS as usize] = 0;
                self.registers[register::CONFIG as usize] = 0;
                self.pending_update_polls = self.update_polls_after_reset;
                self.pending_measuring_polls = 0;
            }
            register::CONFIG if self.mode_bits() != 0 => {}
            register::CTRL_MEAS => {
                self.registers[address as usize] = value;
                if matches!(value & 0b11, 0b01 | 0b10) {
                    self.conversions += 1;
                    self.pending_measuring_polls = self.measuring_polls;
                    if self.pending_measuring_polls == 0 {
                        self.finish_conversion();
                    }
                }
            }
            _ => self.registers[address as usize] = value,
        }
    }

    fn mode_bits(&self) -> u8 {
        self.registers[register::CTRL_MEAS as usize] & 0b11
    }

    fn finish_conversion(&mut self) {
        if let Some(sample) = self.next_sample.take() {
            let base = register::PRESSDATA as usize;
            self.registers[base..base + register::ALLDATA_LEN].copy_from_slice(&sample);
        }
        self.registers[register::CTRL_MEAS as usize] &= !0b11;
    }

    fn read(&mut self) -> u8 {
        assert_eq!(self.phase, Phase::Read, "read outside of a read phase");
        let address = self.pointer;
        self.pointer = self.pointer.wrapping_add(1);
        if address != register::STATUS {
            return self.registers[address as usize];
        }

        let mut status = self.registers[address as usize];
        if self.pending_update_polls > 0 {
            self.pending_update_polls -= 1;
            status |= 0x01;
        }
        if self.pending_measuring_polls > 0 {
            self.pending_measuring_polls -= 1;
            status |= 0x08;
            if self.pending_measuring_polls == 0 {
                self.finish_conversion();
            }
        }

        status
    }
}

fn sample_bytes(pressure: u32, temperature: u32, humidity: u16) -> [u8; register::ALLDATA_LEN] {
    let [p0, p1, p2] = encode_20bit(pressure);
    let [t0, t1, t2] = encode_20bit(temperature);
    let [h0, h1] = humidity.to_be_bytes();

    [p0, p1, p2, t0, t1, t2, h0, h1]
}

fn encode_20bit(value: u32) -> [u8; 3] {
    [
        (value >> 12) as u8,
        (value >> 4) as u8,
        ((value & 0x0F) << 4) as u8,
    ]
}

impl BusTransport for FakeBme280 {
    type Error = FakeBusError;

    fn start(&mut self) -> Result<(), Self::Error> {
        self.events.push(BusEvent::Start);
        self.phase = Phase::Address;

        Ok(())
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.events.push(BusEvent::Send(byte));
        match self.phase {
            Phase::Address => {
                if byte >> 1 != self.address {
                    self.phase = Phase::Idle;
                    return Err(FakeBusError::Nack);
                }
                self.phase = if byte & 1 == 1 { Phase::Read } else { Phase::Pointer };
            }
            Phase::Pointer => {
                self.pointer = byte;
                self.phase = Phase::Data;
            }
            Phase::Data => {
                self.apply_write(self.pointer, byte);
                self.phase = Phase::Pointer;
            }
            Phase::Read | Phase::Idle => panic!("unexpected byte {:#04x} in {:?}", byte, self.phase),
        }

        Ok(())
    }

    fn read_byte_ack(&mut self) -> Result<u8, Self::Error> {
        let value = self.read();
        self.events.push(BusEvent::ReadAck(value));

        Ok(value)
    }

    fn read_byte_nack(&mut self) -> Result<u8, Self::Error> {
        let value = self.read();
        self.events.push(BusEvent::ReadNack(value));
        self.phase = Phase::Idle;

        Ok(value)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.events.push(BusEvent::Stop);
        self.phase = Phase::Idle;

        Ok(())
    }
}
