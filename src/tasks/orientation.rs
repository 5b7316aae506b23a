//! Orientation sampler: gyro angular rates, mirrored to the plot sink and streamed as CSV.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::config::GYRO_SAMPLE_PERIOD_MS;
use crate::drivers::gyro::{AngularRate, GyroError, Mpu6050};
use crate::ipc::ConnectionState;
use crate::telemetry::{format_plot_line, format_rates, ChannelKey, DebugSink, NotificationChannel};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// Sampled, mirrored to the sink and sent to the peer.
    Published(AngularRate),
    /// Sampled and mirrored; no peer connected.
    Sampled(AngularRate),
    /// Transaction failed or came back short; nothing was emitted.
    Skipped,
}

pub struct OrientationSampler<'a, I2C, P, S, N> {
    gyro: Mpu6050<I2C>,
    pace: P,
    sink: S,
    connection: &'a ConnectionState,
    notifier: &'a N,
    error_count: u32,
    consecutive_errors: u32,
}

impl<'a, I2C, P, S, N> OrientationSampler<'a, I2C, P, S, N>
where
    I2C: I2c,
    P: DelayNs,
    S: DebugSink,
    N: NotificationChannel,
{
    pub fn new(
        gyro: Mpu6050<I2C>,
        pace: P,
        sink: S,
        connection: &'a ConnectionState,
        notifier: &'a N,
    ) -> Self {
        Self {
            gyro,
            pace,
            sink,
            connection,
            notifier,
            error_count: 0,
            consecutive_errors: 0,
        }
    }

    pub async fn measure(&mut self) -> Result<AngularRate, GyroError<I2C::Error>> {
        self.gyro.read_rates().await
    }

    /// One gyro transaction, then the fixed pause.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = match self.measure().await {
            Ok(rate) => {
                if self.consecutive_errors > 0 {
                    info!("Gyro recovered after {} consecutive errors", self.consecutive_errors);
                    self.consecutive_errors = 0;
                }

                // The plotter sees every sample regardless of the link
                self.sink.write_line(format_plot_line(&rate).as_str());

                if self.connection.is_connected() {
                    let payload = format_rates(&rate);
                    self.notifier.publish(ChannelKey::Orientation, payload.as_bytes());
                    CycleOutcome::Published(rate)
                } else {
                    CycleOutcome::Sampled(rate)
                }
            }
            Err(e) => {
                self.error_count += 1;
                self.consecutive_errors += 1;

                if self.consecutive_errors % 100 == 1 {
                    match e {
                        GyroError::IncompleteTransfer { received } => warn!(
                            "Gyro read error #{}: short block ({} bytes)",
                            self.error_count, received
                        ),
                        GyroError::Bus(_) | GyroError::InitFailed => {
                            warn!("Gyro read error #{}: bus error", self.error_count)
                        }
                    }
                }
                CycleOutcome::Skipped
            }
        };

        self.pace.delay_ms(GYRO_SAMPLE_PERIOD_MS as u32).await;
        outcome
    }

    pub async fn run(mut self) -> ! {
        info!(
            "Orientation sampler started - sampling at {}ms intervals",
            GYRO_SAMPLE_PERIOD_MS
        );
        loop {
            self.run_cycle().await;
        }
    }
}
