#![allow(dead_code)]

/// MPU6500-side registers (primary device).
#[repr(u8)]
pub(crate) enum Reg {
  GyroConfig = 0x1B,
  AccelConfig = 0x1C,
  IntPinCfg = 0x37,
  AccelXoutH = 0x3B,
  TempOutH = 0x41,
  GyroXoutH = 0x43,
  WhoAmI = 0x75,
}

impl From<Reg> for u8 {
  #[inline]
  fn from(r: Reg) -> Self {
    r as u8
  }
}

/// AK8963-side registers (magnetometer sub-device at `ADDR_I2C_MAG`).
#[repr(u8)]
pub(crate) enum MagReg {
  WhoAmI = 0x00,
  Hxl = 0x03,
  Cntl1 = 0x0A,
  Asax = 0x10,
}

impl From<MagReg> for u8 {
  #[inline]
  fn from(r: MagReg) -> Self {
    r as u8
  }
}

// Constants used across the crate
pub(crate) const BYPASS_ENABLE: u8 = 0x02; // INT_PIN_CFG value exposing the AK8963
pub(crate) const MODE_SETTLE_MS: u32 = 10; // after every mode-changing write

// I2C addresses
pub(crate) const ADDR_I2C_PRIM: u8 = 0x68; // AD0 low
pub(crate) const ADDR_I2C_ALT: u8 = 0x69; // AD0 high
pub(crate) const ADDR_I2C_MAG: u8 = 0x0C; // fixed by the AK8963
