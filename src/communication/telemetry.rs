//! Telemetry collaborator interface
//!
//! The sensor drivers hand finished measurements to a [`TelemetryService`]
//! and may borrow one of its buffers to receive raw register data directly.
//! Transport off-board is the implementation's concern.
//!
//! # Buffer discipline
//!
//! A buffer obtained from [`TelemetryService::checkout_buffer`] is owned by
//! the driver until handed back with [`TelemetryService::return_buffer`].
//! When no buffer is available the driver reads into its own internal
//! buffer instead; the two are never used for the same transaction.

use heapless::Deque;

/// Sensor that produced a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorId {
    /// MPU-9250 inertial measurement unit
    Imu,
    /// MS5611 barometric altimeter
    Altimeter,
}

/// One IMU measurement in raw sensor counts
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuSample {
    /// Data-ready time of the sample (ms)
    pub time_ms: u32,
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
    /// Magnetometer counts before ASA adjustment
    pub mag: [i16; 3],
    pub temperature: i16,
    /// Magnetometer overflowed; `mag` holds the previous valid reading
    pub mag_overflow: bool,
}

/// One compensated altimeter measurement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AltimeterSample {
    /// Completion time of the pressure/temperature cycle (ms)
    pub time_ms: u32,
    /// Pressure (Pa)
    pub pressure: i32,
    /// Temperature (0.01 °C)
    pub temperature: i32,
    /// Altitude above the reference pressure (m), 0 when disabled
    pub altitude: f32,
}

/// Measurement published to telemetry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Imu(ImuSample),
    Altimeter(AltimeterSample),
}

impl Sample {
    /// Sensor that produced the sample
    pub fn sensor_id(&self) -> SensorId {
        match self {
            Sample::Imu(_) => SensorId::Imu,
            Sample::Altimeter(_) => SensorId::Altimeter,
        }
    }

    /// Timestamp of the sample (ms)
    pub fn time_ms(&self) -> u32 {
        match self {
            Sample::Imu(s) => s.time_ms,
            Sample::Altimeter(s) => s.time_ms,
        }
    }
}

/// Telemetry collaborator
pub trait TelemetryService {
    /// Buffer type loaned to drivers
    type Buffer: AsRef<[u8]> + AsMut<[u8]>;

    /// Borrow a buffer of at least `len` bytes, if one is free
    fn checkout_buffer(&mut self, sensor: SensorId, len: usize) -> Option<Self::Buffer>;

    /// Hand a buffer back; `filled` bytes at its start hold raw sensor data
    fn return_buffer(&mut self, sensor: SensorId, buffer: Self::Buffer, filled: usize);

    /// Queue a finished measurement for transport
    fn publish_sample(&mut self, sample: &Sample);
}

impl<T: TelemetryService + ?Sized> TelemetryService for &mut T {
    type Buffer = T::Buffer;

    fn checkout_buffer(&mut self, sensor: SensorId, len: usize) -> Option<Self::Buffer> {
        (**self).checkout_buffer(sensor, len)
    }

    fn return_buffer(&mut self, sensor: SensorId, buffer: Self::Buffer, filled: usize) {
        (**self).return_buffer(sensor, buffer, filled)
    }

    fn publish_sample(&mut self, sample: &Sample) {
        (**self).publish_sample(sample)
    }
}

// ============================================================================
// Null Implementation
// ============================================================================

/// Telemetry sink that lends no buffers and drops every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetryService for NullTelemetry {
    type Buffer = [u8; 0];

    fn checkout_buffer(&mut self, _sensor: SensorId, _len: usize) -> Option<Self::Buffer> {
        None
    }

    fn return_buffer(&mut self, _sensor: SensorId, _buffer: Self::Buffer, _filled: usize) {}

    fn publish_sample(&mut self, _sample: &Sample) {}
}

// ============================================================================
// Sample Queue
// ============================================================================

/// Fixed-capacity queue of published samples for a transport task to drain
///
/// Lends no buffers. When full, the oldest sample is dropped so the newest
/// data always reaches the ground station.
#[derive(Debug, Default)]
pub struct SampleQueue<const N: usize> {
    samples: Deque<Sample, N>,
    dropped: u32,
}

impl<const N: usize> SampleQueue<N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            samples: Deque::new(),
            dropped: 0,
        }
    }

    /// Take the oldest queued sample
    pub fn pop(&mut self) -> Option<Sample> {
        self.samples.pop_front()
    }

    /// Number of queued samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples discarded because the queue was full
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl<const N: usize> TelemetryService for SampleQueue<N> {
    type Buffer = [u8; 0];

    fn checkout_buffer(&mut self, _sensor: SensorId, _len: usize) -> Option<Self::Buffer> {
        None
    }

    fn return_buffer(&mut self, _sensor: SensorId, _buffer: Self::Buffer, _filled: usize) {}

    fn publish_sample(&mut self, sample: &Sample) {
        if self.samples.is_full() {
            self.samples.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        let _ = self.samples.push_back(*sample);
    }
}

// ============================================================================
// Mock Implementation
// ============================================================================

/// Recording telemetry collaborator for tests
///
/// Lends `Vec<u8>` buffers while its availability count is non-zero and
/// records every returned buffer and published sample.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MockTelemetry {
    available: usize,
    /// Buffers currently on loan
    pub checked_out: usize,
    /// Number of successful checkouts
    pub checkouts: usize,
    /// Returned buffers, truncated to their filled length
    pub returned: std::vec::Vec<(SensorId, std::vec::Vec<u8>)>,
    /// Published samples in order
    pub samples: std::vec::Vec<Sample>,
}

#[cfg(any(test, feature = "mock"))]
impl MockTelemetry {
    /// Collaborator with `available` buffers to lend
    pub fn with_buffers(available: usize) -> Self {
        Self {
            available,
            ..Self::default()
        }
    }

    /// Collaborator that never lends a buffer
    pub fn without_buffers() -> Self {
        Self::default()
    }

    /// Published IMU samples
    pub fn imu_samples(&self) -> std::vec::Vec<ImuSample> {
        self.samples
            .iter()
            .filter_map(|s| match s {
                Sample::Imu(imu) => Some(*imu),
                _ => None,
            })
            .collect()
    }

    /// Published altimeter samples
    pub fn altimeter_samples(&self) -> std::vec::Vec<AltimeterSample> {
        self.samples
            .iter()
            .filter_map(|s| match s {
                Sample::Altimeter(alt) => Some(*alt),
                _ => None,
            })
            .collect()
    }
}

#[cfg(any(test, feature = "mock"))]
impl TelemetryService for MockTelemetry {
    type Buffer = std::vec::Vec<u8>;

    fn checkout_buffer(&mut self, _sensor: SensorId, len: usize) -> Option<Self::Buffer> {
        if self.available == 0 {
            return None;
        }
        self.available -= 1;
        self.checked_out += 1;
        self.checkouts += 1;
        Some(std::vec![0u8; len])
    }

    fn return_buffer(&mut self, sensor: SensorId, mut buffer: Self::Buffer, filled: usize) {
        buffer.truncate(filled);
        self.returned.push((sensor, buffer));
        self.checked_out -= 1;
        self.available += 1;
    }

    fn publish_sample(&mut self, sample: &Sample) {
        self.samples.push(*sample);
    }
}
