//! Range sampler: Front, Left, Right ultrasonic sensors, streamed one reading at a time.

use embedded_hal::delay::DelayNs as BusyDelay;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::config::{INTER_SENSOR_DELAY_MS, RANGE_CYCLE_DELAY_MS};
use crate::drivers::ultrasonic::{Echo, MicrosClock, Ultrasonic};
use crate::ipc::ConnectionState;
use crate::telemetry::{format_distance, NotificationChannel, SensorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangeReading {
    pub sensor: SensorId,
    pub echo: Echo,
    /// Native sensor unit; the sentinel when no echo came back.
    pub distance: u16,
}

pub struct RangeSampler<'a, TRIG, ECHO, B, P, C, N> {
    /// Indexed by [`SensorId::index`].
    sensors: [Ultrasonic<TRIG, ECHO>; 3],
    busy: B,
    pace: P,
    clock: C,
    connection: &'a ConnectionState,
    notifier: &'a N,
    timeout_streak: [u32; 3],
}

impl<'a, TRIG, ECHO, B, P, C, N> RangeSampler<'a, TRIG, ECHO, B, P, C, N>
where
    TRIG: OutputPin,
    ECHO: InputPin,
    B: BusyDelay,
    P: DelayNs,
    C: MicrosClock,
    N: NotificationChannel,
{
    /// `sensors` are Front, Left, Right. `busy` times the trigger pulse, `pace` sleeps between
    /// measurements.
    pub fn new(
        sensors: [Ultrasonic<TRIG, ECHO>; 3],
        busy: B,
        pace: P,
        clock: C,
        connection: &'a ConnectionState,
        notifier: &'a N,
    ) -> Self {
        Self {
            sensors,
            busy,
            pace,
            clock,
            connection,
            notifier,
            timeout_streak: [0; 3],
        }
    }

    /// One trigger/echo exchange; only this sensor's exchange runs with interrupts masked.
    pub fn measure(&mut self, sensor: SensorId) -> RangeReading {
        let idx = sensor.index();
        let echo = self.sensors[idx].measure(&mut self.busy, &mut self.clock);

        let streak = &mut self.timeout_streak[idx];
        match echo {
            Echo::Timeout => {
                *streak += 1;
                if *streak == 1 {
                    warn!("{:?}: no echo, reporting sentinel", sensor);
                }
            }
            Echo::Received { .. } => {
                if *streak > 0 {
                    info!("{:?}: echo back after {} timeouts", sensor, *streak);
                    *streak = 0;
                }
            }
        }

        RangeReading {
            sensor,
            echo,
            distance: echo.distance(),
        }
    }

    /// Measure Front, Left, Right in order, publishing each reading as soon as it exists.
    ///
    /// The link is re-checked before every publish, so a disconnect mid-cycle suppresses only
    /// the readings that follow it.
    pub async fn run_cycle(&mut self) -> [RangeReading; 3] {
        let mut readings = [RangeReading {
            sensor: SensorId::Front,
            echo: Echo::Timeout,
            distance: 0,
        }; 3];

        for (i, sensor) in SensorId::CYCLE.into_iter().enumerate() {
            let reading = self.measure(sensor);
            readings[i] = reading;

            if self.connection.is_connected() {
                let payload = format_distance(reading.distance);
                trace!("{:?} -> {}", sensor, reading.distance);
                self.notifier.publish(sensor.channel(), payload.as_bytes());
            }

            // Let this ping's echoes die out before the next sensor fires
            if i + 1 < SensorId::CYCLE.len() {
                self.pace.delay_ms(INTER_SENSOR_DELAY_MS as u32).await;
            }
        }

        self.pace.delay_ms(RANGE_CYCLE_DELAY_MS as u32).await;
        readings
    }

    pub async fn run(mut self) -> ! {
        info!(
            "Range sampler started - {}ms between sensors, {}ms between cycles",
            INTER_SENSOR_DELAY_MS,
            RANGE_CYCLE_DELAY_MS
        );
        loop {
            self.run_cycle().await;
        }
    }
}
