//! Accelerometer range configuration and data reading.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example(mut imu: mpu9250::Mpu9250<impl embedded_hal_async::i2c::I2c, impl embedded_hal_async::delay::DelayNs>) {
//! use mpu9250::accel::AccelRange;
//!
//! imu.begin_accel(AccelRange::G4).await.unwrap();
//!
//! imu.read_accel().await.unwrap();
//! let a = imu.accel();
//! println!("Accel: x={}, y={}, z={}", a.x, a.y, a.z);
//! # }
//! ```

use embedded_hal_async::{delay::DelayNs, i2c::*};
use micromath::vector::Vector3d;

use super::{defs::*, Error, Mpu9250};

impl<I, D, E> Mpu9250<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Configure the accelerometer full-scale range.
  ///
  /// Issues exactly one config-register write and stores the range for
  /// every subsequent decode, then waits out the settling delay.
  pub async fn begin_accel(&mut self, range: AccelRange) -> Result<(), Error<E>> {
    self.write_u8(self.address(), Reg::AccelConfig.into(), range.into()).await?;
    self.accel_range = range.as_g();
    self.settle().await;
    Ok(())
  }

  /// Configure the accelerometer from a raw `ACCEL_CONFIG` selector byte.
  ///
  /// An unrecognized selector is silently ignored: no bus write, prior
  /// range kept. Callers rely on "invalid selector = keep previous
  /// configuration", so this is deliberately not an error.
  pub async fn begin_accel_raw(&mut self, selector: u8) -> Result<(), Error<E>> {
    match AccelRange::try_from(selector) {
      Ok(range) => self.begin_accel(range).await,
      Err(_) => Ok(()),
    }
  }

  /// Burst-read the six accelerometer data registers into the sample
  /// buffer. The buffer is only overwritten on a complete transfer.
  pub async fn read_accel(&mut self) -> Result<(), Error<E>> {
    let mut buf = [0u8; 6];
    self.read_bytes(self.address(), Reg::AccelXoutH.into(), &mut buf).await?;
    self.accel_buf = buf;
    Ok(())
  }

  /// Acceleration on X in g, from the last [`read_accel`](Self::read_accel) sample.
  pub fn accel_x(&self) -> f32 {
    self.accel_axis(0)
  }

  /// Acceleration on Y in g.
  pub fn accel_y(&self) -> f32 {
    self.accel_axis(2)
  }

  /// Acceleration on Z in g.
  pub fn accel_z(&self) -> f32 {
    self.accel_axis(4)
  }

  /// All three axes as a vector, in g.
  pub fn accel(&self) -> Vector3d<f32> {
    Vector3d { x: self.accel_x(), y: self.accel_y(), z: self.accel_z() }
  }

  /// Euclidean norm of the acceleration vector, in g.
  pub fn accel_norm(&self) -> f32 {
    let a = self.accel();
    libm::sqrtf(a.x * a.x + a.y * a.y + a.z * a.z)
  }

  fn accel_axis(&self, hi: usize) -> f32 {
    decode_axis(self.accel_buf[hi], self.accel_buf[hi + 1], self.accel_range)
  }
}

/// Combine a big-endian register pair and scale to physical units.
///
/// The sign is inverted to match the board's axis polarity; the
/// negation happens in f32 so `i16::MIN` maps to `+range` instead of
/// overflowing.
pub(crate) fn decode_axis(hi: u8, lo: u8, range: f32) -> f32 {
  let raw = i16::from_be_bytes([hi, lo]);
  -(raw as f32) * range / 32768.0
}

/// Accelerometer full-scale range.
///
/// Discriminants are the raw `ACCEL_CONFIG` register values
/// (`ACCEL_FS_SEL << 3`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelRange {
  /// ±2g range
  G2 = 0x00,
  /// ±4g range
  G4 = 0x08,
  /// ±8g range
  G8 = 0x10,
  /// ±16g range
  G16 = 0x18,
}

impl AccelRange {
  /// Full-scale magnitude in g, the divisor base of every decode.
  pub fn as_g(self) -> f32 {
    match self {
      AccelRange::G2 => 2.0,
      AccelRange::G4 => 4.0,
      AccelRange::G8 => 8.0,
      AccelRange::G16 => 16.0,
    }
  }
}

impl From<AccelRange> for u8 {
  fn from(value: AccelRange) -> Self {
    value as u8
  }
}

impl TryFrom<u8> for AccelRange {
  type Error = ();

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0x00 => Ok(AccelRange::G2),
      0x08 => Ok(AccelRange::G4),
      0x10 => Ok(AccelRange::G8),
      0x18 => Ok(AccelRange::G16),
      _ => Err(()),
    }
  }
}
