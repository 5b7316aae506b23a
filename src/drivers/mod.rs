pub mod gyro;
pub mod ultrasonic;

pub use gyro::{AngularRate, GyroError, Mpu6050};
pub use ultrasonic::{Echo, EmbassyClock, MicrosClock, Ultrasonic};
