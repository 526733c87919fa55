//! AK8963 magnetometer: initialization sequencing, operating modes and
//! data reading.
//!
//! The magnetometer lives behind the MPU's I2C bridge. Before it can be
//! used, [`begin_mag`](crate::Mpu9250::begin_mag) must walk the device
//! through an ordered mode-transition sequence: enable the bypass
//! bridge, force power-down, enter fuse-ROM mode to read the factory
//! sensitivity adjustment bytes, power down again, then enter the
//! requested operating mode. The hardware signals nothing if a step is
//! skipped; it just returns garbage adjustment values, so the sequence
//! discipline here is load-bearing.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example(mut imu: mpu9250::Mpu9250<impl embedded_hal_async::i2c::I2c, impl embedded_hal_async::delay::DelayNs>) {
//! use mpu9250::mag::{MagMode, MagResolution};
//!
//! imu.begin_mag(MagMode::Continuous8Hz, MagResolution::Bit16).await.unwrap();
//!
//! imu.read_mag().await.unwrap();
//! println!("Heading: {}°", imu.heading());
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
  /// Initialize the magnetometer and enter `mode`.
  ///
  /// Runs the full ordered sequence: bypass-bridge enable on the
  /// primary device, power-down, fuse-ROM read of the factory
  /// adjustment bytes, power-down again, then the requested operating
  /// mode with the output resolution folded into the same control
  /// write. Every mode transition is followed by a settling delay.
  pub async fn begin_mag(&mut self, mode: MagMode, resolution: MagResolution) -> Result<(), Error<E>> {
    // Expose the AK8963 on the shared bus. Required on this part even
    // though the magnetometer has its own address.
    self.write_u8(self.address(), Reg::IntPinCfg.into(), BYPASS_ENABLE).await?;
    self.settle().await;

    self.read_mag_adjustment().await?;
    self.set_mag_mode(MagMode::PowerDown, MagResolution::Bit14).await?;
    self.set_mag_mode(mode, resolution).await?;
    self.settle().await;
    Ok(())
  }

  /// Write `CNTL1` with the given mode and output resolution, then wait
  /// out the settling delay.
  ///
  /// Mode transitions must pass through [`MagMode::PowerDown`]; callers
  /// switching between operating modes after `begin_mag` are expected
  /// to do so themselves.
  pub async fn set_mag_mode(&mut self, mode: MagMode, resolution: MagResolution) -> Result<(), Error<E>> {
    let ctl = MagControl { mode, resolution };
    self.write(ADDR_I2C_MAG, MagReg::Cntl1.into(), ctl).await?;
    self.mag_mode = Some(mode);
    self.settle().await;
    Ok(())
  }

  /// Last commanded operating mode, `None` until the driver has written
  /// `CNTL1` once (the power-up state of the hardware is unknown).
  pub fn mag_mode(&self) -> Option<MagMode> {
    self.mag_mode
  }

  /// Factory sensitivity adjustment read during [`begin_mag`](Self::begin_mag).
  pub fn mag_adjustment(&self) -> MagAdjustment {
    self.mag_adjust
  }

  /// Set per-axis offsets added after the factory adjustment. Takes
  /// effect on the next accessor call; no bus traffic.
  pub fn set_mag_offsets(&mut self, x: i16, y: i16, z: i16) {
    self.mag_offset = [x, y, z];
  }

  /// Burst-read the seven magnetometer data registers (`HXL..ST2`) into
  /// the sample buffer. The trailing `ST2` status byte must be part of
  /// the transfer: reading it re-arms the data-ready latch, and
  /// skipping it stalls every following acquisition cycle.
  ///
  /// The buffer is only overwritten on a complete transfer.
  pub async fn read_mag(&mut self) -> Result<(), Error<E>> {
    let mut buf = [0u8; 7];
    self.read_bytes(ADDR_I2C_MAG, MagReg::Hxl.into(), &mut buf).await?;
    self.mag_buf = buf;
    Ok(())
  }

  /// Magnetic field on X, factory-adjusted plus user offset, from the
  /// last [`read_mag`](Self::read_mag) sample.
  pub fn mag_x(&self) -> f32 {
    self.mag_axis(0)
  }

  /// Magnetic field on Y, factory-adjusted plus user offset.
  pub fn mag_y(&self) -> f32 {
    self.mag_axis(1)
  }

  /// Magnetic field on Z, factory-adjusted plus user offset.
  pub fn mag_z(&self) -> f32 {
    self.mag_axis(2)
  }

  /// All three axes as a vector.
  pub fn mag(&self) -> Vector3d<f32> {
    Vector3d { x: self.mag_x(), y: self.mag_y(), z: self.mag_z() }
  }

  /// Horizontal direction in degrees, `atan2(x, y) * 180 / π`.
  ///
  /// Convention: x=0, y>0 reads 0°; x>0, y=0 reads 90°; x=0, y<0 reads
  /// ±180° per `atan2` at the branch cut.
  pub fn heading(&self) -> f32 {
    libm::atan2f(self.mag_x(), self.mag_y()) * 180.0 / core::f32::consts::PI
  }

  /// Whether the last sample's `ST2` byte flags magnetic sensor
  /// overflow (`HOFL`). Overflowed samples should be discarded.
  pub fn mag_overflow(&self) -> bool {
    self.mag_buf[6] & status2::HOFL != 0
  }

  /// Read the three factory adjustment bytes from the fuse ROM.
  ///
  /// The ROM is only readable from fuse-ROM mode, and fuse-ROM mode is
  /// only reachable from power-down, hence the forced transitions.
  async fn read_mag_adjustment(&mut self) -> Result<(), Error<E>> {
    self.set_mag_mode(MagMode::PowerDown, MagResolution::Bit14).await?;
    self.set_mag_mode(MagMode::FuseRom, MagResolution::Bit14).await?;

    let mut asa = [0u8; 3];
    self.read_bytes(ADDR_I2C_MAG, MagReg::Asax.into(), &mut asa).await?;
    self.mag_adjust = MagAdjustment { x: asa[0], y: asa[1], z: asa[2] };
    Ok(())
  }

  fn mag_axis(&self, axis: usize) -> f32 {
    // Low byte sits at the lower register address; the datasheet
    // assembles pairs as high << 8 | low.
    let lo = axis * 2;
    let raw = i16::from_le_bytes([self.mag_buf[lo], self.mag_buf[lo + 1]]);
    let adjust = match axis {
      0 => self.mag_adjust.x,
      1 => self.mag_adjust.y,
      _ => self.mag_adjust.z,
    };
    adjust_mag_value(raw, adjust) + self.mag_offset[axis] as f32
  }
}

/// Apply the factory sensitivity adjustment, per the datasheet formula
/// `adjusted = raw * (((asa - 128) * 0.5 / 128) + 1)`. An adjustment
/// byte of 128 is the neutral midpoint.
pub(crate) fn adjust_mag_value(raw: i16, adjust: u8) -> f32 {
  raw as f32 * (((adjust as f32 - 128.0) * 0.5 / 128.0) + 1.0)
}

/// AK8963 operating modes (`CNTL1` mode bits).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagMode {
  /// Power-down mode
  PowerDown = 0x0,
  /// Single measurement mode
  Single = 0x1,
  /// Continuous measurement mode 1 (8 Hz)
  Continuous8Hz = 0x2,
  /// External trigger measurement mode
  External = 0x4,
  /// Continuous measurement mode 2 (100 Hz)
  Continuous100Hz = 0x6,
  /// Self-test mode
  SelfTest = 0x8,
  /// Fuse ROM access mode (factory adjustment bytes readable)
  FuseRom = 0xF,
}

impl From<MagMode> for u8 {
  fn from(value: MagMode) -> Self {
    value as u8
  }
}

impl TryFrom<u8> for MagMode {
  type Error = ();

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0x0 => Ok(MagMode::PowerDown),
      0x1 => Ok(MagMode::Single),
      0x2 => Ok(MagMode::Continuous8Hz),
      0x4 => Ok(MagMode::External),
      0x6 => Ok(MagMode::Continuous100Hz),
      0x8 => Ok(MagMode::SelfTest),
      0xF => Ok(MagMode::FuseRom),
      _ => Err(()),
    }
  }
}

/// Output resolution (`CNTL1` BIT field).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagResolution {
  /// 14-bit output
  Bit14 = 0,
  /// 16-bit output
  Bit16 = 1,
}

impl From<MagResolution> for u8 {
  fn from(value: MagResolution) -> Self {
    value as u8
  }
}

impl TryFrom<u8> for MagResolution {
  type Error = ();

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(MagResolution::Bit14),
      1 => Ok(MagResolution::Bit16),
      _ => Err(()),
    }
  }
}

/// `CNTL1` control register: operating mode in the low nibble, output
/// resolution in bit 4.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[packbits::pack(bytes = 1)]
pub struct MagControl {
  /// Operating mode
  #[bits(4)]
  pub mode: MagMode,
  /// Output resolution (14-bit or 16-bit)
  #[bits(1)]
  pub resolution: MagResolution,
}

/// Factory sensitivity adjustment bytes from the fuse ROM, immutable
/// after [`begin_mag`](crate::Mpu9250::begin_mag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MagAdjustment {
  pub x: u8,
  pub y: u8,
  pub z: u8,
}

/// `ST2` status byte bits.
pub(crate) mod status2 {
  /// Magnetic sensor overflow
  pub const HOFL: u8 = 1 << 3;
}
