use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, ConfigError, I2c};
use esp_hal::peripherals::{BT, CPU_CTRL, SW_INTERRUPT, TIMG0};
use esp_hal::time::Rate;
use esp_hal::Async;

use crate::config::I2C_FREQUENCY_HZ;
use crate::drivers::ultrasonic::{EmbassyClock, Ultrasonic};
use crate::ipc::QueuedNotifier;
use crate::tasks::{OrientationSampler, RangeSampler};
use crate::telemetry::DebugSink;

pub type RangeSensor = Ultrasonic<Output<'static>, Input<'static>>;
pub type GyroBus = I2c<'static, Async>;

pub type UltrasonicSampler = RangeSampler<
    'static,
    Output<'static>,
    Input<'static>,
    Delay,
    embassy_time::Delay,
    EmbassyClock,
    QueuedNotifier<'static>,
>;

// The range sampler is built on core 0 and moved to the app-core executor
const _: () = {
    const fn assert_send<T: Send>() {}
    assert_send::<UltrasonicSampler>();
};

pub type GyroSampler =
    OrientationSampler<'static, GyroBus, embassy_time::Delay, SerialSink, QueuedNotifier<'static>>;

/// Plotter lines on the UART console, next to the defmt log on RTT.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialSink;

impl DebugSink for SerialSink {
    fn write_line(&mut self, line: &str) {
        esp_println::println!("{}", line);
    }
}

// ── Board struct ──────────────────────────────────────────
pub struct Board {
    /// Front, Left, Right.
    pub range_sensors: [RangeSensor; 3],
    pub i2c0: GyroBus,
    pub timg0: TIMG0<'static>,
    pub sw_interrupt: SW_INTERRUPT<'static>,
    pub cpu_ctrl: CPU_CTRL<'static>,
    pub bt: BT<'static>,
}

impl Board {
    pub fn init() -> Result<Self, ConfigError> {
        let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
        let p = esp_hal::init(config);

        // Trigger idles low; echo is pulled down so a missing sensor reads as "no echo"
        let trig_cfg = OutputConfig::default();
        let echo_cfg = InputConfig::default().with_pull(Pull::Down);

        // trig/echo: Front 26/25, Left 13/12, Right 18/19
        let front = Ultrasonic::new(
            Output::new(p.GPIO26, Level::Low, trig_cfg),
            Input::new(p.GPIO25, echo_cfg),
        );
        let left = Ultrasonic::new(
            Output::new(p.GPIO13, Level::Low, trig_cfg),
            Input::new(p.GPIO12, echo_cfg),
        );
        let right = Ultrasonic::new(
            Output::new(p.GPIO18, Level::Low, trig_cfg),
            Input::new(p.GPIO19, echo_cfg),
        );

        // I²C0 on SDA=21, SCL=22
        let i2c_cfg = I2cConfig::default().with_frequency(Rate::from_hz(I2C_FREQUENCY_HZ));
        let i2c0 = I2c::new(p.I2C0, i2c_cfg)?
            .with_sda(p.GPIO21)
            .with_scl(p.GPIO22)
            .into_async();

        Ok(Self {
            range_sensors: [front, left, right],
            i2c0,
            timg0: p.TIMG0,
            sw_interrupt: p.SW_INTERRUPT,
            cpu_ctrl: p.CPU_CTRL,
            bt: p.BT,
        })
    }
}
