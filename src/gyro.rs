//! Gyroscope range configuration and data reading.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example(mut imu: mpu9250::Mpu9250<impl embedded_hal_async::i2c::I2c, impl embedded_hal_async::delay::DelayNs>) {
//! use mpu9250::gyro::GyroRange;
//!
//! imu.begin_gyro(GyroRange::Dps500).await.unwrap();
//!
//! imu.read_gyro().await.unwrap();
//! let w = imu.gyro();
//! println!("Gyro: x={}, y={}, z={}", w.x, w.y, w.z);
//! # }
//! ```

use embedded_hal_async::{delay::DelayNs, i2c::*};
use micromath::vector::Vector3d;

use super::{accel::decode_axis, defs::*, Error, Mpu9250};

impl<I, D, E> Mpu9250<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Configure the gyroscope full-scale range.
  ///
  /// Issues exactly one config-register write and stores the range for
  /// every subsequent decode, then waits out the settling delay.
  pub async fn begin_gyro(&mut self, range: GyroRange) -> Result<(), Error<E>> {
    self.write_u8(self.address(), Reg::GyroConfig.into(), range.into()).await?;
    self.gyro_range = range.as_dps();
    self.settle().await;
    Ok(())
  }

  /// Configure the gyroscope from a raw `GYRO_CONFIG` selector byte.
  ///
  /// An unrecognized selector is silently ignored: no bus write, prior
  /// range kept (same contract as [`begin_accel_raw`](Self::begin_accel_raw)).
  pub async fn begin_gyro_raw(&mut self, selector: u8) -> Result<(), Error<E>> {
    match GyroRange::try_from(selector) {
      Ok(range) => self.begin_gyro(range).await,
      Err(_) => Ok(()),
    }
  }

  /// Burst-read the six gyroscope data registers into the sample
  /// buffer. The buffer is only overwritten on a complete transfer.
  pub async fn read_gyro(&mut self) -> Result<(), Error<E>> {
    let mut buf = [0u8; 6];
    self.read_bytes(self.address(), Reg::GyroXoutH.into(), &mut buf).await?;
    self.gyro_buf = buf;
    Ok(())
  }

  /// Angular rate on X in °/s, from the last [`read_gyro`](Self::read_gyro) sample.
  pub fn gyro_x(&self) -> f32 {
    self.gyro_axis(0)
  }

  /// Angular rate on Y in °/s.
  pub fn gyro_y(&self) -> f32 {
    self.gyro_axis(2)
  }

  /// Angular rate on Z in °/s.
  pub fn gyro_z(&self) -> f32 {
    self.gyro_axis(4)
  }

  /// All three axes as a vector, in °/s.
  pub fn gyro(&self) -> Vector3d<f32> {
    Vector3d { x: self.gyro_x(), y: self.gyro_y(), z: self.gyro_z() }
  }

  fn gyro_axis(&self, hi: usize) -> f32 {
    decode_axis(self.gyro_buf[hi], self.gyro_buf[hi + 1], self.gyro_range)
  }
}

/// Gyroscope full-scale range.
///
/// Discriminants are the raw `GYRO_CONFIG` register values
/// (`GYRO_FS_SEL << 3`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroRange {
  /// ±250 degrees per second
  Dps250 = 0x00,
  /// ±500 degrees per second
  Dps500 = 0x08,
  /// ±1000 degrees per second
  Dps1000 = 0x10,
  /// ±2000 degrees per second
  Dps2000 = 0x18,
}

impl GyroRange {
  /// Full-scale magnitude in °/s, the divisor base of every decode.
  pub fn as_dps(self) -> f32 {
    match self {
      GyroRange::Dps250 => 250.0,
      GyroRange::Dps500 => 500.0,
      GyroRange::Dps1000 => 1000.0,
      GyroRange::Dps2000 => 2000.0,
    }
  }
}

impl From<GyroRange> for u8 {
  fn from(value: GyroRange) -> Self {
    value as u8
  }
}

impl TryFrom<u8> for GyroRange {
  type Error = ();

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0x00 => Ok(GyroRange::Dps250),
      0x08 => Ok(GyroRange::Dps500),
      0x10 => Ok(GyroRange::Dps1000),
      0x18 => Ok(GyroRange::Dps2000),
      _ => Err(()),
    }
  }
}
