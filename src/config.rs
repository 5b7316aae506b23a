// Centralize all configuration constants

// Pin assignments live in `board.rs`, where the GPIO types are picked

// I2C bus for the gyro
pub const I2C_FREQUENCY_HZ: u32 = 100_000;

// Ultrasonic timing (µs unless noted)
pub const TRIGGER_SETTLE_US: u32 = 2;
pub const TRIGGER_PULSE_US: u32 = 10;
/// ~4.3 m round trip, well past the sensor's useful range.
pub const ECHO_TIMEOUT_US: u64 = 25_000;
/// Reported for a missing echo, in the sensor's native unit.
pub const RANGE_SENTINEL: u16 = 400;
pub const INTER_SENSOR_DELAY_MS: u64 = 15;
pub const RANGE_CYCLE_DELAY_MS: u64 = 100;

// MPU-6050 gyro
pub const MPU6050_ADDRESS: u8 = 0x68;
pub const GYRO_SAMPLE_PERIOD_MS: u64 = 50;
/// LSB per °/s at the ±250 °/s full-scale setting.
pub const GYRO_SENSITIVITY: f32 = 131.0;
pub const GYRO_INIT_ATTEMPTS: u8 = 5;
pub const GYRO_INIT_BACKOFF_MS: u64 = 200;

// BLE identity
pub const DEVICE_NAME: &str = "ESP32_Capacete";
/// Must match the `#[gatt_service]` literal in `ble.rs`.
pub const SERVICE_UUID: &str = "4fafc201-1fb5-459e-8fcc-c5c9c331914b";

// Channel sizes
pub const NOTIFY_CHANNEL_SIZE: usize = 8;
/// Longest payload: three `-250.00`-style fields plus separators.
pub const PAYLOAD_MAX: usize = 32;
