//! Host-side stand-ins for pins, bus, clock and delays.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, Operation};
use helmet_telemetry::drivers::{MicrosClock, Ultrasonic};
use helmet_telemetry::telemetry::DebugSink;

pub type Now = Rc<Cell<u64>>;

/// Advances one microsecond per read.
pub struct StepClock(pub Now);

impl MicrosClock for StepClock {
    fn now_us(&mut self) -> u64 {
        let t = self.0.get();
        self.0.set(t + 1);
        t
    }
}

/// Blocking delay that moves the shared clock instead of sleeping.
pub struct Busy(pub Now);

impl embedded_hal::delay::DelayNs for Busy {
    fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + u64::from(ns / 1000));
    }
}

/// Async pacing delay that records the requested sleeps and yields once.
#[derive(Default)]
pub struct Pace {
    pub sleeps_ms: Vec<u32>,
}

impl embedded_hal_async::delay::DelayNs for Pace {
    async fn delay_ns(&mut self, ns: u32) {
        self.sleeps_ms.push(ns / 1_000_000);
        embassy_futures::yield_now().await;
    }
}

type Pulse = Rc<Cell<Option<(u64, u64)>>>;

pub struct Trig {
    now: Now,
    pulse: Pulse,
    width_us: Option<u64>,
}

impl PinErrorType for Trig {
    type Error = Infallible;
}

impl OutputPin for Trig {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let start = self.now.get() + 100;
        self.pulse.set(self.width_us.map(|w| (start, start + w)));
        Ok(())
    }
}

pub struct EchoLine {
    now: Now,
    pulse: Pulse,
}

impl PinErrorType for EchoLine {
    type Error = Infallible;
}

impl InputPin for EchoLine {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let t = self.now.get();
        Ok(matches!(self.pulse.get(), Some((r, f)) if r <= t && t < f))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        self.is_high().map(|h| !h)
    }
}

/// Sensor whose echo is `width_us` long (100 µs after the trigger), or absent for `None`.
pub fn ranger(now: &Now, width_us: Option<u64>) -> Ultrasonic<Trig, EchoLine> {
    let pulse: Pulse = Rc::new(Cell::new(None));
    Ultrasonic::new(
        Trig {
            now: now.clone(),
            pulse: pulse.clone(),
            width_us,
        },
        EchoLine {
            now: now.clone(),
            pulse,
        },
    )
}

/// MPU-6050 stand-in answering gyro block reads from a script.
pub struct GyroBus {
    pub blocks: VecDeque<Result<[u8; 6], ErrorKind>>,
}

impl GyroBus {
    pub fn new(blocks: impl IntoIterator<Item = Result<[u8; 6], ErrorKind>>) -> Self {
        Self {
            blocks: blocks.into_iter().collect(),
        }
    }
}

impl ErrorType for GyroBus {
    type Error = ErrorKind;
}

impl I2c for GyroBus {
    async fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        let mut reg = 0u8;
        for op in operations {
            match op {
                Operation::Write(bytes) => reg = bytes[0],
                Operation::Read(buf) if reg == 0x43 => {
                    let block = self.blocks.pop_front().unwrap_or(Err(ErrorKind::Other))?;
                    buf.copy_from_slice(&block);
                }
                Operation::Read(buf) => buf.fill(0x68),
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct Lines(pub Vec<String>);

impl DebugSink for Lines {
    fn write_line(&mut self, line: &str) {
        self.0.push(line.to_string());
    }
}
