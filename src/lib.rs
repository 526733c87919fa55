#![no_std]
#![doc = include_str!("../README.md")]
//!
//! ## Design Principles
//!
//! - **Type-safe**: Strongly-typed range and mode selectors with raw-byte escape hatches
//! - **Async-first**: Built on `embedded-hal-async` I2C traits
//! - **Faithful**: Decode formulas and init sequencing match the datasheet exactly
//! - **Buffered**: `read_*` transfers a sample block once; `*_x`/`*_y`/`*_z` decode it without bus traffic
//!
//! ## Module Organization
//!
//! - [`accel`]: Accelerometer range configuration and data reading
//! - [`gyro`]: Gyroscope range configuration and data reading
//! - [`mag`]: AK8963 magnetometer initialization, modes and data reading
//!
//! ## Basic Usage
//!
//! ```no_run
//! # async fn example(mut imu: mpu9250::Mpu9250<impl embedded_hal_async::i2c::I2c, impl embedded_hal_async::delay::DelayNs>) {
//! use mpu9250::{accel::AccelRange, gyro::GyroRange, mag::{MagMode, MagResolution}};
//!
//! imu.begin_accel(AccelRange::G16).await.unwrap();
//! imu.begin_gyro(GyroRange::Dps2000).await.unwrap();
//! imu.begin_mag(MagMode::Continuous8Hz, MagResolution::Bit16).await.unwrap();
//!
//! imu.read_accel().await.unwrap();
//! let (x, y, z) = (imu.accel_x(), imu.accel_y(), imu.accel_z());
//! # }
//! ```

use embedded_hal_async::{delay::DelayNs, i2c::*};

pub mod accel;
mod defs;
pub mod gyro;
pub mod mag;
pub(crate) mod rw;

use defs::*;
use mag::{MagAdjustment, MagMode};

/// Expected `WHO_AM_I` (0x75) value of the MPU-9250.
pub const DEVICE_ID: u8 = 0x71;
/// Expected `WIA` (0x00) value of the AK8963 magnetometer.
pub const MAG_DEVICE_ID: u8 = 0x48;

/// Default I2C address (AD0 pin low).
pub const ADDRESS_AD0_LOW: u8 = ADDR_I2C_PRIM;
/// Alternate I2C address (AD0 pin high).
pub const ADDRESS_AD0_HIGH: u8 = ADDR_I2C_ALT;

/// Temperature sensitivity in LSB/°C, per datasheet.
pub const TEMP_SENSITIVITY: f32 = 333.7;
/// Temperature offset at room temperature, per datasheet.
pub const TEMP_ROOM_OFFSET: f32 = 0.0;

/// Driver error type.
///
/// Bus faults (missing acknowledge, truncated transfer) surface as
/// [`Error::I2c`] and are never retried internally.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
  /// I2C communication error
  I2c(E),
  /// Register data failed to decode into its typed representation
  Data,
}

/// MPU-9250 device driver instance.
///
/// Owns the I2C bus and delay provider plus the per-sensor sample
/// buffers and scale state. Each `read_*` call overwrites the matching
/// buffer in place; the axis accessors are pure functions of the last
/// committed sample, so a single instance must not be shared across
/// threads without external serialization.
///
/// Scale state is zero until the matching `begin_*` runs: axis
/// accessors return 0.0 (accel/gyro) or factory-unadjusted garbage
/// (mag) before initialization. Configuring first is the caller's
/// responsibility; the driver raises no error for it.
///
/// # Type Parameters
///
/// - `I`: I2C implementation (must implement `embedded_hal_async::i2c::I2c`)
/// - `D`: Delay provider (must implement `embedded_hal_async::delay::DelayNs`)
pub struct Mpu9250<I, D: DelayNs> {
  i2c: I,
  delay: D,
  address: u8,
  accel_buf: [u8; 6],
  accel_range: f32,
  gyro_buf: [u8; 6],
  gyro_range: f32,
  mag_buf: [u8; 7],
  mag_adjust: MagAdjustment,
  mag_offset: [i16; 3],
  mag_mode: Option<MagMode>,
  temp_buf: [u8; 2],
  temp_offset: f32,
  temp_sensitivity: f32,
}

impl<I, D> Mpu9250<I, D>
where
  I: I2c<SevenBitAddress>,
  D: DelayNs,
{
  /// Create a new driver instance at the default address (AD0 low, 0x68).
  ///
  /// # Arguments
  ///
  /// - `i2c`: I2C bus implementation
  /// - `delay`: Delay provider for the settling waits
  pub fn new(i2c: I, delay: D) -> Self {
    Self::with_address(i2c, delay, ADDR_I2C_PRIM)
  }

  /// Create a new driver instance at an explicit primary address
  /// ([`ADDRESS_AD0_LOW`] or [`ADDRESS_AD0_HIGH`]).
  pub fn with_address(i2c: I, delay: D, address: u8) -> Self {
    Self {
      i2c,
      delay,
      address,
      accel_buf: [0; 6],
      accel_range: 0.0,
      gyro_buf: [0; 6],
      gyro_range: 0.0,
      mag_buf: [0; 7],
      mag_adjust: MagAdjustment::default(),
      mag_offset: [0; 3],
      mag_mode: None,
      temp_buf: [0; 2],
      temp_offset: TEMP_ROOM_OFFSET,
      temp_sensitivity: TEMP_SENSITIVITY,
    }
  }

  /// Release the underlying bus and delay provider.
  pub fn release(self) -> (I, D) {
    (self.i2c, self.delay)
  }

  pub(crate) fn address(&self) -> u8 {
    self.address
  }
}

// Identity and temperature (shared-device concerns)
impl<I, D, E> Mpu9250<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  /// Read the `WHO_AM_I` register of the primary device.
  ///
  /// Returns the raw id byte (should be [`DEVICE_ID`]). The driver does
  /// not validate it; comparing is up to the caller.
  pub async fn who_am_i(&mut self) -> Result<u8, Error<E>> {
    self.read_u8(self.address, Reg::WhoAmI.into()).await
  }

  /// Read the `WIA` register of the AK8963 magnetometer.
  ///
  /// Returns the raw id byte (should be [`MAG_DEVICE_ID`]). Only
  /// reachable after the bypass bridge has been enabled, which
  /// [`begin_mag`](Self::begin_mag) does as its first step.
  pub async fn mag_who_am_i(&mut self) -> Result<u8, Error<E>> {
    self.read_u8(ADDR_I2C_MAG, MagReg::WhoAmI.into()).await
  }

  /// Set the temperature conversion constants.
  ///
  /// `offset` and `sensitivity` default to the datasheet values
  /// ([`TEMP_ROOM_OFFSET`], [`TEMP_SENSITIVITY`]); call this only if a
  /// board-specific calibration says otherwise. No bus traffic.
  pub fn begin_temp(&mut self, offset: f32, sensitivity: f32) {
    self.temp_offset = offset;
    self.temp_sensitivity = sensitivity;
  }

  /// Read the two temperature registers into the sample buffer.
  pub async fn read_temp(&mut self) -> Result<(), Error<E>> {
    let mut buf = [0u8; 2];
    self.read_bytes(self.address, Reg::TempOutH.into(), &mut buf).await?;
    self.temp_buf = buf;
    Ok(())
  }

  /// Temperature in °C from the last [`read_temp`](Self::read_temp) sample.
  ///
  /// `((raw - offset) / sensitivity) + 21.0` with raw as a big-endian
  /// signed 16-bit value, per the register map document.
  pub fn temperature(&self) -> f32 {
    let raw = i16::from_be_bytes(self.temp_buf);
    ((raw as f32 - self.temp_offset) / self.temp_sensitivity) + 21.0
  }
}
