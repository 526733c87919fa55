use embedded_hal_async::{delay::DelayNs, i2c::*};

use crate::{Error, Mpu9250};

impl<I, D, E> Mpu9250<I, D>
where
  I: I2c<SevenBitAddress, Error = E>,
  D: DelayNs,
{
  pub(crate) async fn read_u8(&mut self, addr: u8, reg: u8) -> Result<u8, Error<E>> {
    let mut b = [0u8; 1];
    self.read_bytes(addr, reg, &mut b).await?;
    Ok(b[0])
  }

  /// Burst read starting at `reg`. Both devices auto-increment the
  /// register address, so one transfer covers a whole sample block.
  pub(crate) async fn read_bytes(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), Error<E>> {
    self.i2c.write_read(addr, &[reg], buf).await.map_err(Error::I2c)
  }

  pub(crate) async fn write<const N: usize, T: TryInto<[u8; N]>>(&mut self, addr: u8, reg: u8, v: T) -> Result<(), Error<E>> {
    let b = v.try_into().map_err(|_| Error::Data)?;
    self.write_bytes(addr, reg, &b).await
  }

  pub(crate) async fn write_u8(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), Error<E>> {
    self.write_bytes(addr, reg, &[value]).await
  }

  pub(crate) async fn write_bytes(&mut self, addr: u8, reg: u8, data: &[u8]) -> Result<(), Error<E>> {
    debug_assert!(data.len() <= 7, "write_bytes buffer too large");
    let mut buf = [0u8; 8];
    let len = 1 + data.len();
    buf[0] = reg;
    buf[1..len].copy_from_slice(data);
    self.i2c.write(addr, &buf[..len]).await.map_err(Error::I2c)
  }

  /// Settling wait after a mode-changing write. The hardware gives no
  /// completion signal, so the delay is the only synchronization.
  pub(crate) async fn settle(&mut self) {
    self.delay.delay_ms(crate::defs::MODE_SETTLE_MS).await;
  }
}
