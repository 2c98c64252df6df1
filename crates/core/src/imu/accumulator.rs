//! Per-axis sample accumulation for self-test and offset calibration
//!
//! The MPU-9250 driver feeds raw accelerometer and gyroscope samples into a
//! [`SampleAccumulator`] while a calibration sub-sequence runs, then reads
//! back a per-axis average.
//!
//! Sums are `i32`. With at most 255 counted samples of at most 65535 in
//! magnitude (the subtract mode can double an `i16` span) the sum stays
//! below 2^24, far inside the accumulator width.

/// How each sample contributes to the running sums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccumulateMode {
    /// Sum the raw samples
    #[default]
    Add,
    /// Sum `sample - baseline`, where the baseline is the average produced
    /// by the most recent [`AccumulateMode::Add`] run
    SubtractBaseline,
}

/// Running per-axis sums over a fixed number of samples
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleAccumulator {
    sums: [i32; 3],
    baseline: [i32; 3],
    mode: AccumulateMode,
    samples_to_read: u8,
    extra_samples: u8,
    counted: u8,
    discarded: u8,
}

impl SampleAccumulator {
    /// Create an idle accumulator with a zero baseline
    pub const fn new() -> Self {
        Self {
            sums: [0; 3],
            baseline: [0; 3],
            mode: AccumulateMode::Add,
            samples_to_read: 0,
            extra_samples: 0,
            counted: 0,
            discarded: 0,
        }
    }

    /// Start a new run, resetting the sums
    ///
    /// The first `extra_samples` pushed are discarded so the sensor can
    /// settle; the following `samples_to_read` are summed.
    pub fn begin(&mut self, samples_to_read: u8, extra_samples: u8, mode: AccumulateMode) {
        self.sums = [0; 3];
        self.mode = mode;
        self.samples_to_read = samples_to_read;
        self.extra_samples = extra_samples;
        self.counted = 0;
        self.discarded = 0;
    }

    /// Feed one sample; returns `true` once the run is complete
    pub fn push(&mut self, sample: [i16; 3]) -> bool {
        if self.discarded < self.extra_samples {
            self.discarded += 1;
            return false;
        }

        if self.counted < self.samples_to_read {
            for (axis, &value) in sample.iter().enumerate() {
                let contribution = match self.mode {
                    AccumulateMode::Add => value as i32,
                    AccumulateMode::SubtractBaseline => value as i32 - self.baseline[axis],
                };
                self.sums[axis] += contribution;
            }
            self.counted += 1;
        }

        self.is_complete()
    }

    /// Whether every requested sample (including discarded ones) has been fed
    pub fn is_complete(&self) -> bool {
        self.discarded >= self.extra_samples && self.counted >= self.samples_to_read
    }

    /// Samples still needed to finish the run, discarded ones included
    pub fn remaining(&self) -> u16 {
        (self.extra_samples - self.discarded) as u16 + (self.samples_to_read - self.counted) as u16
    }

    /// Raw per-axis sums of the current run
    pub fn sums(&self) -> [i32; 3] {
        self.sums
    }

    /// Baseline used by [`AccumulateMode::SubtractBaseline`]
    pub fn baseline(&self) -> [i32; 3] {
        self.baseline
    }

    /// Divide the sums by the number of counted samples
    ///
    /// Division truncates toward zero. An `Add` run also stores its result
    /// as the baseline for a following `SubtractBaseline` run. A run that
    /// counted no samples averages to zero.
    pub fn finalize(&mut self) -> [i32; 3] {
        let average = if self.counted == 0 {
            [0; 3]
        } else {
            let n = self.counted as i32;
            [self.sums[0] / n, self.sums[1] / n, self.sums[2] / n]
        };

        if self.mode == AccumulateMode::Add {
            self.baseline = average;
        }

        average
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_samples_are_discarded() {
        let mut acc = SampleAccumulator::new();
        acc.begin(2, 2, AccumulateMode::Add);
        assert_eq!(acc.remaining(), 4);

        assert!(!acc.push([1000, 1000, 1000]));
        assert!(!acc.push([1000, 1000, 1000]));
        assert_eq!(acc.sums(), [0, 0, 0]);

        assert!(!acc.push([10, 20, 30]));
        assert!(acc.push([10, 20, 30]));
        assert_eq!(acc.remaining(), 0);
        assert_eq!(acc.finalize(), [10, 20, 30]);
    }

    #[test]
    fn test_push_after_complete_is_ignored() {
        let mut acc = SampleAccumulator::new();
        acc.begin(1, 0, AccumulateMode::Add);
        assert!(acc.push([5, 5, 5]));
        assert!(acc.push([100, 100, 100]));
        assert_eq!(acc.finalize(), [5, 5, 5]);
    }

    #[test]
    fn test_subtract_baseline_yields_deviation() {
        let mut acc = SampleAccumulator::new();

        acc.begin(4, 0, AccumulateMode::Add);
        for _ in 0..4 {
            acc.push([100, -200, 16_384]);
        }
        assert_eq!(acc.finalize(), [100, -200, 16_384]);

        acc.begin(4, 0, AccumulateMode::SubtractBaseline);
        for _ in 0..4 {
            acc.push([600, -1200, 20_000]);
        }
        assert_eq!(acc.finalize(), [500, -1000, 3_616]);
        // Subtract runs leave the baseline in place
        assert_eq!(acc.baseline(), [100, -200, 16_384]);
    }

    #[test]
    fn test_begin_resets_sums() {
        let mut acc = SampleAccumulator::new();
        acc.begin(2, 0, AccumulateMode::Add);
        acc.push([7, 7, 7]);
        acc.begin(2, 0, AccumulateMode::Add);
        assert_eq!(acc.sums(), [0, 0, 0]);
        assert!(!acc.is_complete());
    }

    #[test]
    fn test_empty_run_averages_to_zero() {
        let mut acc = SampleAccumulator::new();
        acc.begin(0, 0, AccumulateMode::Add);
        assert!(acc.is_complete());
        assert_eq!(acc.finalize(), [0, 0, 0]);
    }
}
