pub mod orientation;
pub mod range;

pub use orientation::{CycleOutcome, OrientationSampler};
pub use range::{RangeReading, RangeSampler};

#[cfg(feature = "esp32")]
pub use target::{orientation_task, range_task};

/// Concrete task entry points; embassy tasks cannot be generic.
#[cfg(feature = "esp32")]
mod target {
    use embassy_executor::task;

    use crate::board::{GyroSampler, UltrasonicSampler};

    #[task]
    pub async fn range_task(sampler: UltrasonicSampler) {
        sampler.run().await
    }

    #[task]
    pub async fn orientation_task(sampler: GyroSampler) {
        sampler.run().await
    }
}
