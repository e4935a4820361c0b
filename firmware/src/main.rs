//! BME280 weather logger on I2C3.
//!
//! Samples temperature, pressure and humidity every two seconds and logs them
//! over RTT. The user button pauses and resumes sampling.

#![no_std]
#![no_main]

use core::fmt::Write as _;

use bme280::{Bme280, Configuration, DeviceAddress, I2cTransport, Measurements};
use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Pin, Pull};
use embassy_stm32::i2c::I2c;
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, ThreadModeRawMutex};
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Delay, Duration, Timer};
use heapless::String;
use {defmt_rtt as _, panic_probe as _};

// SDO is tied high on the Adafruit breakout.
const BME280_ADDRESS: DeviceAddress = DeviceAddress::Secondary;
const SAMPLE_INTERVAL: Duration = Duration::from_secs(2);
const BUTTON_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Format)]
pub struct Bme280Message {
    pub sequence: u32,
    pub measurements: Measurements,
}

#[derive(Clone, Copy, PartialEq, Eq, Format)]
pub enum ControlSignal {
    Start,
    Stop,
}

static DATA_CHANNEL: Channel<ThreadModeRawMutex, Bme280Message, 4> = Channel::new();
static CONTROL_SIGNAL: Signal<CriticalSectionRawMutex, ControlSignal> = Signal::new();

#[embassy_executor::task]
async fn logger() {
    loop {
        let message = DATA_CHANNEL.receive().await;
        let sample = message.measurements;

        let mut line: String<64> = String::new();
        match core::write!(
            line,
            "{} C  {} hPa  {} %RH",
            sample.temperature.split(),
            sample.pressure.split(),
            sample.humidity.split()
        ) {
            Ok(()) => info!("#{}: {=str}", message.sequence, line.as_str()),
            Err(_) => warn!("#{}: {}", message.sequence, sample),
        }
    }
}

/// Toggle sampling on every press of the user button.
#[embassy_executor::task]
async fn button(button: Input<'static>) {
    let mut running = true;
    let mut was_pressed = false;
    loop {
        let pressed = button.is_high();
        if pressed && !was_pressed {
            running = !running;
            CONTROL_SIGNAL.signal(if running { ControlSignal::Start } else { ControlSignal::Stop });
        }
        was_pressed = pressed;
        Timer::after(BUTTON_POLL_INTERVAL).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Hello BME280!");
    let p = embassy_stm32::init(Default::default());

    let user_button = Input::new(p.PA0.degrade(), Pull::Down);

    let i2c = I2c::new_blocking(p.I2C3, p.PA8, p.PC9, Hertz(100_000), Default::default());
    let transport = I2cTransport::new(i2c);

    let mut bme = match Bme280::new(transport, BME280_ADDRESS, Configuration::default(), &mut Delay) {
        Ok(bme) => bme,
        Err(e) => {
            error!("BME280 not available: {}", e);
            return;
        }
    };
    debug!("calibration: {}", bme.calibration());

    unwrap!(spawner.spawn(logger()));
    unwrap!(spawner.spawn(button(user_button)));

    let mut sequence: u32 = 0;
    loop {
        if let Some(ControlSignal::Stop) = CONTROL_SIGNAL.try_take() {
            info!("sampling paused");
            while CONTROL_SIGNAL.wait().await != ControlSignal::Start {}
            info!("sampling resumed");
        }

        match bme.measure() {
            Ok(measurements) => {
                DATA_CHANNEL.send(Bme280Message { sequence, measurements }).await;
                sequence = sequence.wrapping_add(1);
            }
            Err(e) => error!("BME280 read failed: {}", e),
        }

        Timer::after(SAMPLE_INTERVAL).await;
    }
}
