use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::config::{GYRO_INIT_ATTEMPTS, GYRO_INIT_BACKOFF_MS, GYRO_SENSITIVITY, MPU6050_ADDRESS};

// MPU-6050 register addresses
const MPU6050_GYRO_XOUT_H_ADDR: u8 = 0x43;
const MPU6050_PWR_MGMT_1_ADDR: u8 = 0x6B;
const MPU6050_WHO_AM_I_ADDR: u8 = 0x75;

// WHO_AM_I reports the 7-bit address with AD0 low
const MPU6050_ID: u8 = 0x68;

/// X, Y, Z high/low pairs.
pub const GYRO_BLOCK_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroError<E> {
    /// I2C communication error
    Bus(E),
    /// Fewer bytes than a full X/Y/Z block came back
    IncompleteTransfer { received: usize },
    /// Device never answered the wake-up sequence
    InitFailed,
}

/// Angular rate in °/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AngularRate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl AngularRate {
    pub fn from_raw(x: i16, y: i16, z: i16) -> Self {
        Self {
            x: f32::from(x) / GYRO_SENSITIVITY,
            y: f32::from(y) / GYRO_SENSITIVITY,
            z: f32::from(z) / GYRO_SENSITIVITY,
        }
    }
}

/// Decode one gyro block: big-endian `i16` per axis in X, Y, Z order.
///
/// A short block is rejected as a whole; axes are never mixed across transactions.
pub fn decode_rates<E>(raw: &[u8]) -> Result<AngularRate, GyroError<E>> {
    if raw.len() < GYRO_BLOCK_LEN {
        return Err(GyroError::IncompleteTransfer {
            received: raw.len(),
        });
    }
    Ok(AngularRate::from_raw(
        i16::from_be_bytes([raw[0], raw[1]]),
        i16::from_be_bytes([raw[2], raw[3]]),
        i16::from_be_bytes([raw[4], raw[5]]),
    ))
}

pub struct Mpu6050<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Mpu6050<I2C> {
    /// Wake the device out of sleep, retrying with exponential backoff.
    pub async fn new<D: DelayNs>(
        i2c: I2C,
        addr: u8,
        delay: &mut D,
    ) -> Result<Self, GyroError<I2C::Error>> {
        let mut mpu = Self { i2c, addr };

        info!("Starting MPU-6050 wake-up sequence...");

        for attempt in 1..=GYRO_INIT_ATTEMPTS {
            match mpu.try_init().await {
                Ok(()) => {
                    info!("MPU-6050 awake on attempt {}", attempt);
                    return Ok(mpu);
                }
                Err(_e) => {
                    warn!("MPU-6050 init attempt {} failed", attempt);

                    if attempt < GYRO_INIT_ATTEMPTS {
                        // 200ms, 400ms, 800ms, 1600ms
                        let delay_ms = GYRO_INIT_BACKOFF_MS << (attempt - 1);
                        delay.delay_ms(delay_ms as u32).await;
                    }
                }
            }
        }

        error!(
            "MPU-6050 initialization failed after {} attempts",
            GYRO_INIT_ATTEMPTS
        );
        Err(GyroError::InitFailed)
    }

    async fn try_init(&mut self) -> Result<(), I2C::Error> {
        // Clearing PWR_MGMT_1 leaves sleep mode on the internal oscillator
        self.write_byte(MPU6050_PWR_MGMT_1_ADDR, 0x00).await?;

        // Clones report other IDs but speak the same register map
        let id = self.read_byte(MPU6050_WHO_AM_I_ADDR).await?;
        if id != MPU6050_ID {
            warn!(
                "Unexpected WHO_AM_I: 0x{:02X}, expected 0x{:02X}",
                id, MPU6050_ID
            );
        }
        Ok(())
    }

    /// One transaction over the gyro block, decoded as a whole.
    pub async fn read_rates(&mut self) -> Result<AngularRate, GyroError<I2C::Error>> {
        let raw = self.read_bytes::<GYRO_BLOCK_LEN>(MPU6050_GYRO_XOUT_H_ADDR).await?;
        decode_rates(&raw)
    }

    async fn write_byte(&mut self, reg: u8, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.addr, &[reg, value]).await
    }

    async fn read_byte(&mut self, reg: u8) -> Result<u8, I2C::Error> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(self.addr, &[reg], &mut buf).await?;
        Ok(buf[0])
    }

    async fn read_bytes<const N: usize>(
        &mut self,
        reg: u8,
    ) -> Result<[u8; N], GyroError<I2C::Error>> {
        let mut buf = [0u8; N];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .await
            .map_err(GyroError::Bus)?;
        Ok(buf)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

// Factory function to create the default gyro (MPU-6050, AD0 low)
pub async fn create_default_gyro<I2C: I2c, D: DelayNs>(
    i2c: I2C,
    delay: &mut D,
) -> Result<Mpu6050<I2C>, GyroError<I2C::Error>> {
    Mpu6050::new(i2c, MPU6050_ADDRESS, delay).await
}
