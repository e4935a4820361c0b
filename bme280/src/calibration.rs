//! Factory calibration coefficients.

use crate::register::{self, RegisterBus};
use crate::transport::Transfer;

/// The trimming parameters burned into the device's NVM.
///
/// Read once after reset and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationSet {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,

    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,

    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

impl CalibrationSet {
    /// Decode the three calibration regions.
    ///
    /// `tp` is 0x88..=0x9F, `h1` is 0xA1 and `h` is 0xE1..=0xE7. H4 and H5 are
    /// 12-bit values sharing 0xE5: H4 takes its low nibble, H5 its high nibble.
    pub fn from_registers(
        tp: &[u8; register::CALIB_TP_LEN],
        h1: u8,
        h: &[u8; register::CALIB_H_LEN],
    ) -> Self {
        let [t1, t2, t3, p1, p2, p3, p4, p5, p6, p7, p8, p9] = unpack_coefficient_bytes(tp);

        Self {
            t1,
            t2: t2 as i16,
            t3: t3 as i16,
            p1,
            p2: p2 as i16,
            p3: p3 as i16,
            p4: p4 as i16,
            p5: p5 as i16,
            p6: p6 as i16,
            p7: p7 as i16,
            p8: p8 as i16,
            p9: p9 as i16,
            h1,
            h2: i16::from_le_bytes([h[0], h[1]]),
            h3: h[2],
            h4: ((h[3] as i8 as i16) << 4) | (h[4] & 0x0F) as i16,
            h5: ((h[5] as i8 as i16) << 4) | (h[4] >> 4) as i16,
            h6: h[6] as i8,
        }
    }

    /// Read and decode all coefficients from the device.
    pub fn load<T: Transfer>(bus: &mut RegisterBus<T>) -> Result<Self, T::Error> {
        let mut tp = [0u8; register::CALIB_TP_LEN];
        bus.burst_read(register::CALIB_TP, &mut tp)?;
        let h1 = bus.read_register(register::CALIB_H1)?;
        let mut h = [0u8; register::CALIB_H_LEN];
        bus.burst_read(register::CALIB_H, &mut h)?;

        let calibration = Self::from_registers(&tp, h1, &h);
        debug!("Calibration Coefficients: {:?}", calibration);

        Ok(calibration)
    }
}

/// Twelve little-endian words, in register order.
fn unpack_coefficient_bytes(bytes: &[u8; register::CALIB_TP_LEN]) -> [u16; 12] {
    let mut words = [0u16; 12];
    for (word, pair) in words.iter_mut().zip(bytes.chunks_exact(2)) {
        *word = u16::from_le_bytes([pair[0], pair[1]]);
    }

    words
}
