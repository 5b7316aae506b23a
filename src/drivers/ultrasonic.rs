//! HC-SR04 style ultrasonic ranger on a trigger/echo pin pair.
//!
//! A measurement fires a 10 µs trigger pulse and times how long the echo line stays high. The
//! trigger and the echo timing run inside one critical section so nothing can preempt the core
//! between "trigger high" and "start timing", which would lengthen the measured pulse.

use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::{ECHO_TIMEOUT_US, RANGE_SENTINEL, TRIGGER_PULSE_US, TRIGGER_SETTLE_US};

/// Free-running microsecond counter used to time the echo pulse.
pub trait MicrosClock {
    fn now_us(&mut self) -> u64;
}

/// [`MicrosClock`] on top of the embassy time driver.
///
/// Reading the driver does not need interrupts, so it is usable inside the critical section.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyClock;

impl MicrosClock for EmbassyClock {
    fn now_us(&mut self) -> u64 {
        Instant::now().as_micros()
    }
}

/// Outcome of one trigger/echo exchange.
///
/// A missing echo stays distinguishable here even though it is published as the same
/// sentinel as a far-away target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Echo {
    Received { duration_us: u32 },
    Timeout,
}

impl Echo {
    pub fn from_duration(duration_us: u32) -> Self {
        if duration_us == 0 {
            Echo::Timeout
        } else {
            Echo::Received { duration_us }
        }
    }

    /// Distance in the sensor's native unit, [`RANGE_SENTINEL`] when there was no echo.
    pub fn distance(self) -> u16 {
        match self {
            Echo::Received { duration_us } => distance_from_duration(duration_us),
            Echo::Timeout => RANGE_SENTINEL,
        }
    }

    pub fn is_timeout(self) -> bool {
        matches!(self, Echo::Timeout)
    }
}

/// `floor(duration * 0.034 / 2)`, done in integers (0.034 / 2 == 17 / 1000).
pub fn distance_from_duration(duration_us: u32) -> u16 {
    if duration_us == 0 {
        return RANGE_SENTINEL;
    }
    let distance = u64::from(duration_us) * 17 / 1000;
    distance.min(u64::from(u16::MAX)) as u16
}

pub struct Ultrasonic<TRIG, ECHO> {
    trig: TRIG,
    echo: ECHO,
}

impl<TRIG, ECHO> Ultrasonic<TRIG, ECHO>
where
    TRIG: OutputPin,
    ECHO: InputPin,
{
    pub fn new(trig: TRIG, echo: ECHO) -> Self {
        Self { trig, echo }
    }

    /// Trigger the sensor and time its echo.
    ///
    /// Blocks for at most [`ECHO_TIMEOUT_US`] plus the trigger pulse with interrupts masked.
    /// Pin errors are reported as [`Echo::Timeout`]; a failed read is as useless as no echo.
    pub fn measure<D, C>(&mut self, delay: &mut D, clock: &mut C) -> Echo
    where
        D: DelayNs,
        C: MicrosClock,
    {
        let duration = critical_section::with(|_| {
            self.trigger(delay)?;
            self.pulse_in(clock)
        });

        match duration {
            Some(duration_us) => Echo::from_duration(duration_us),
            None => Echo::Timeout,
        }
    }

    fn trigger<D: DelayNs>(&mut self, delay: &mut D) -> Option<()> {
        self.trig.set_low().ok()?;
        delay.delay_us(TRIGGER_SETTLE_US);
        self.trig.set_high().ok()?;
        delay.delay_us(TRIGGER_PULSE_US);
        self.trig.set_low().ok()
    }

    /// Length of the next high pulse on the echo line, `None` on timeout.
    fn pulse_in<C: MicrosClock>(&mut self, clock: &mut C) -> Option<u32> {
        let deadline = clock.now_us() + ECHO_TIMEOUT_US;

        // A previous pulse may still be in flight
        while self.echo.is_high().ok()? {
            if clock.now_us() >= deadline {
                return None;
            }
        }

        while self.echo.is_low().ok()? {
            if clock.now_us() >= deadline {
                return None;
            }
        }
        let rise = clock.now_us();

        while self.echo.is_high().ok()? {
            if clock.now_us() >= deadline {
                return None;
            }
        }
        let fall = clock.now_us();

        u32::try_from(fall - rise).ok()
    }
}
