//! Mock-bus integration tests: register traffic, decode formulas and
//! the magnetometer initialization sequence.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{self, ErrorKind, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

use mpu9250::accel::AccelRange;
use mpu9250::gyro::GyroRange;
use mpu9250::mag::{MagAdjustment, MagMode, MagResolution};
use mpu9250::{Error, Mpu9250};

/// One logged bus or delay event, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Tx {
    Write { addr: u8, bytes: Vec<u8> },
    Read { addr: u8, len: usize },
    Delay { ns: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BusFault(ErrorKind);

impl i2c::Error for BusFault {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Transaction-logging I2C double with canned read data. A canned
/// entry whose length differs from the requested buffer simulates a
/// truncated transfer and fails the whole transaction.
#[derive(Clone, Default)]
struct MockBus {
    log: Rc<RefCell<Vec<Tx>>>,
    reads: Rc<RefCell<VecDeque<Vec<u8>>>>,
    fail_next: Rc<RefCell<bool>>,
}

impl MockBus {
    fn expect_read(&self, bytes: &[u8]) {
        self.reads.borrow_mut().push_back(bytes.to_vec());
    }

    fn fail_next(&self) {
        *self.fail_next.borrow_mut() = true;
    }

    fn log(&self) -> Vec<Tx> {
        self.log.borrow().clone()
    }

    fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|tx| match tx {
                Tx::Write { addr, bytes } => Some((*addr, bytes.clone())),
                _ => None,
            })
            .collect()
    }
}

impl i2c::ErrorType for MockBus {
    type Error = BusFault;
}

impl I2c<SevenBitAddress> for MockBus {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), BusFault> {
        if std::mem::take(&mut *self.fail_next.borrow_mut()) {
            return Err(BusFault(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Address,
            )));
        }
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    self.log.borrow_mut().push(Tx::Write {
                        addr: address,
                        bytes: bytes.to_vec(),
                    });
                }
                Operation::Read(buf) => {
                    let canned = self
                        .reads
                        .borrow_mut()
                        .pop_front()
                        .ok_or(BusFault(ErrorKind::Other))?;
                    if canned.len() != buf.len() {
                        return Err(BusFault(ErrorKind::Other));
                    }
                    buf.copy_from_slice(&canned);
                    self.log.borrow_mut().push(Tx::Read {
                        addr: address,
                        len: buf.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Delay double writing into the same log as the bus, so ordering
/// between transfers and settling waits is observable.
struct MockDelay {
    log: Rc<RefCell<Vec<Tx>>>,
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.log.borrow_mut().push(Tx::Delay { ns });
    }
}

fn setup() -> (Mpu9250<MockBus, MockDelay>, MockBus) {
    let bus = MockBus::default();
    let delay = MockDelay {
        log: bus.log.clone(),
    };
    (Mpu9250::new(bus.clone(), delay), bus)
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

/// Big-endian 6-byte sample block from three raw axis values.
fn be_sample(x: i16, y: i16, z: i16) -> Vec<u8> {
    let mut v = Vec::new();
    for raw in [x, y, z] {
        v.extend_from_slice(&raw.to_be_bytes());
    }
    v
}

/// Little-endian 7-byte magnetometer block (three axes plus ST2).
fn mag_sample(x: i16, y: i16, z: i16, st2: u8) -> Vec<u8> {
    let mut v = Vec::new();
    for raw in [x, y, z] {
        v.extend_from_slice(&raw.to_le_bytes());
    }
    v.push(st2);
    v
}

#[tokio::test]
async fn accel_configure_writes_once_and_scales() {
    let (mut imu, bus) = setup();
    imu.begin_accel(AccelRange::G8).await.unwrap();
    assert_eq!(bus.writes(), vec![(0x68, vec![0x1C, 0x10])]);

    bus.expect_read(&be_sample(16384, 0, i16::MIN));
    imu.read_accel().await.unwrap();
    assert_close(imu.accel_x(), -4.0);
    assert_close(imu.accel_y(), 0.0);
    // i16::MIN decodes to +range, not an overflow
    assert_close(imu.accel_z(), 8.0);
    assert_close(imu.accel_norm(), 80.0_f32.sqrt());
}

#[tokio::test]
async fn gyro_configure_writes_once_and_scales() {
    let (mut imu, bus) = setup();
    imu.begin_gyro(GyroRange::Dps500).await.unwrap();
    assert_eq!(bus.writes(), vec![(0x68, vec![0x1B, 0x08])]);

    bus.expect_read(&be_sample(-8192, 32767, 0));
    imu.read_gyro().await.unwrap();
    assert_close(imu.gyro_x(), 8192.0 * 500.0 / 32768.0);
    assert_close(imu.gyro_y(), -32767.0 * 500.0 / 32768.0);
    assert_close(imu.gyro_z(), 0.0);
}

#[tokio::test]
async fn invalid_raw_selector_is_a_silent_no_op() {
    let (mut imu, bus) = setup();
    imu.begin_accel_raw(0x33).await.unwrap();
    imu.begin_gyro_raw(0x01).await.unwrap();
    assert!(bus.log().is_empty(), "no bus traffic for invalid selectors");

    // A valid raw selector behaves like the typed call.
    imu.begin_accel_raw(0x18).await.unwrap();
    assert_eq!(bus.writes(), vec![(0x68, vec![0x1C, 0x18])]);

    bus.expect_read(&be_sample(2048, 0, 0));
    imu.read_accel().await.unwrap();
    assert_close(imu.accel_x(), -2048.0 * 16.0 / 32768.0);
}

#[tokio::test]
async fn reading_before_begin_yields_zero_scaled_output() {
    let (mut imu, bus) = setup();
    bus.expect_read(&be_sample(12345, -2000, 1));
    imu.read_accel().await.unwrap();
    assert_eq!(imu.accel_x(), 0.0);
    assert_eq!(imu.accel_y(), 0.0);
    assert_eq!(imu.accel_z(), 0.0);
}

#[tokio::test]
async fn mag_init_runs_the_full_ordered_sequence() {
    let (mut imu, bus) = setup();
    bus.expect_read(&[100, 128, 200]);
    imu.begin_mag(MagMode::Continuous8Hz, MagResolution::Bit16)
        .await
        .unwrap();

    // Bridge enable, power-down, fuse ROM, ASA read, power-down,
    // operating mode with the 16-bit flag folded in.
    assert_eq!(
        bus.writes(),
        vec![
            (0x68, vec![0x37, 0x02]),
            (0x0C, vec![0x0A, 0x00]),
            (0x0C, vec![0x0A, 0x0F]),
            (0x0C, vec![0x10]),
            (0x0C, vec![0x0A, 0x00]),
            (0x0C, vec![0x0A, 0x12]),
        ]
    );

    // Every mode-changing write is followed by a settling delay.
    let log = bus.log();
    for (i, tx) in log.iter().enumerate() {
        let mode_write = matches!(
            tx,
            Tx::Write { bytes, .. } if bytes[0] == 0x0A || bytes[0] == 0x37
        );
        if mode_write {
            assert!(
                matches!(log.get(i + 1), Some(Tx::Delay { .. })),
                "no settling delay after mode write at log index {i}"
            );
        }
    }

    assert_eq!(imu.mag_mode(), Some(MagMode::Continuous8Hz));
    assert_eq!(
        imu.mag_adjustment(),
        MagAdjustment { x: 100, y: 128, z: 200 }
    );
}

#[tokio::test]
async fn mag_14bit_resolution_clears_the_output_flag() {
    let (mut imu, bus) = setup();
    bus.expect_read(&[128, 128, 128]);
    imu.begin_mag(MagMode::Continuous100Hz, MagResolution::Bit14)
        .await
        .unwrap();
    let writes = bus.writes();
    assert_eq!(writes.last(), Some(&(0x0C, vec![0x0A, 0x06])));
}

#[tokio::test]
async fn mag_factory_adjustment_factors() {
    let (mut imu, bus) = setup();
    // ASA 0 halves the raw value, 128 is neutral, 255 scales by 1.49609375.
    bus.expect_read(&[0, 128, 255]);
    imu.begin_mag(MagMode::Continuous8Hz, MagResolution::Bit16)
        .await
        .unwrap();

    bus.expect_read(&mag_sample(1000, 1000, 1000, 0));
    imu.read_mag().await.unwrap();
    assert_eq!(imu.mag_x(), 500.0);
    assert_eq!(imu.mag_y(), 1000.0);
    assert_eq!(imu.mag_z(), 1496.09375);
}

#[tokio::test]
async fn mag_user_offsets_are_added_after_adjustment() {
    let (mut imu, bus) = setup();
    bus.expect_read(&[128, 128, 128]);
    imu.begin_mag(MagMode::Continuous8Hz, MagResolution::Bit16)
        .await
        .unwrap();
    imu.set_mag_offsets(10, -20, 30);

    bus.expect_read(&mag_sample(100, 200, -300, 0));
    imu.read_mag().await.unwrap();
    assert_eq!(imu.mag_x(), 110.0);
    assert_eq!(imu.mag_y(), 180.0);
    assert_eq!(imu.mag_z(), -270.0);
}

#[tokio::test]
async fn heading_convention_is_atan2_x_over_y() {
    let (mut imu, bus) = setup();
    bus.expect_read(&[128, 128, 128]);
    imu.begin_mag(MagMode::Continuous8Hz, MagResolution::Bit16)
        .await
        .unwrap();

    // North along +y reads 0°, +x reads 90°, -y reads the +180°
    // branch of atan2, -x reads -90°.
    for (x, y, expected) in [
        (0, 1000, 0.0),
        (1000, 0, 90.0),
        (0, -1000, 180.0),
        (-1000, 0, -90.0),
    ] {
        bus.expect_read(&mag_sample(x, y, 0, 0));
        imu.read_mag().await.unwrap();
        assert_close(imu.heading(), expected);
    }
}

#[tokio::test]
async fn mag_overflow_flag_comes_from_st2() {
    let (mut imu, bus) = setup();
    bus.expect_read(&[128, 128, 128]);
    imu.begin_mag(MagMode::Continuous8Hz, MagResolution::Bit16)
        .await
        .unwrap();

    bus.expect_read(&mag_sample(1, 1, 1, 0x08));
    imu.read_mag().await.unwrap();
    assert!(imu.mag_overflow());

    bus.expect_read(&mag_sample(1, 1, 1, 0x00));
    imu.read_mag().await.unwrap();
    assert!(!imu.mag_overflow());
}

#[tokio::test]
async fn temperature_defaults_decode_raw_zero_to_21c() {
    let (mut imu, bus) = setup();
    bus.expect_read(&[0x00, 0x00]);
    imu.read_temp().await.unwrap();
    assert_eq!(imu.temperature(), 21.0);

    // 3337 LSB at 333.7 LSB/°C is ten degrees above room reference.
    bus.expect_read(&3337i16.to_be_bytes());
    imu.read_temp().await.unwrap();
    assert_close(imu.temperature(), 31.0);
}

#[tokio::test]
async fn temperature_honors_custom_offset_and_sensitivity() {
    let (mut imu, bus) = setup();
    imu.begin_temp(5.0, 100.0);
    bus.expect_read(&105i16.to_be_bytes());
    imu.read_temp().await.unwrap();
    assert_close(imu.temperature(), 22.0);
}

#[tokio::test]
async fn bus_fault_propagates_and_leaves_state_unchanged() {
    let (mut imu, bus) = setup();
    bus.fail_next();
    let err = imu.begin_accel(AccelRange::G2).await.unwrap_err();
    assert!(matches!(err, Error::I2c(_)));

    // The failed configure did not set a range.
    bus.expect_read(&be_sample(16384, 0, 0));
    imu.read_accel().await.unwrap();
    assert_eq!(imu.accel_x(), 0.0);
}

#[tokio::test]
async fn short_read_fails_without_exposing_a_partial_sample() {
    let (mut imu, bus) = setup();
    imu.begin_accel(AccelRange::G2).await.unwrap();

    bus.expect_read(&be_sample(16384, 0, 0));
    imu.read_accel().await.unwrap();
    assert_close(imu.accel_x(), -1.0);

    // Truncated transfer: three bytes where six were requested.
    bus.expect_read(&[0x7F, 0xFF, 0x7F]);
    let err = imu.read_accel().await.unwrap_err();
    assert!(matches!(err, Error::I2c(_)));
    assert_close(imu.accel_x(), -1.0);
}

#[tokio::test]
async fn who_am_i_reads_the_id_registers() {
    let (mut imu, bus) = setup();
    bus.expect_read(&[0x71]);
    assert_eq!(imu.who_am_i().await.unwrap(), mpu9250::DEVICE_ID);

    bus.expect_read(&[0x48]);
    assert_eq!(imu.mag_who_am_i().await.unwrap(), mpu9250::MAG_DEVICE_ID);

    assert_eq!(
        bus.writes(),
        vec![(0x68, vec![0x75]), (0x0C, vec![0x00])]
    );
}

#[tokio::test]
async fn alternate_address_routes_primary_traffic() {
    let bus = MockBus::default();
    let delay = MockDelay {
        log: bus.log.clone(),
    };
    let mut imu = Mpu9250::with_address(bus.clone(), delay, mpu9250::ADDRESS_AD0_HIGH);

    imu.begin_gyro(GyroRange::Dps250).await.unwrap();
    assert_eq!(bus.writes(), vec![(0x69, vec![0x1B, 0x00])]);
}
