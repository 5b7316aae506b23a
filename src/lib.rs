#![cfg_attr(not(test), no_std)]

#[macro_use]
pub mod log;

#[cfg(feature = "esp32")]
pub mod ble;
#[cfg(feature = "esp32")]
pub mod board;
pub mod config;
pub mod drivers;
pub mod ipc;
pub mod tasks;
pub mod telemetry;

#[cfg(feature = "esp32")]
pub use board::Board;
pub use drivers::gyro::AngularRate;
pub use drivers::ultrasonic::Echo;
pub use ipc::{ConnectionState, CONNECTION};
pub use telemetry::{ChannelKey, NotificationChannel, SensorId};
