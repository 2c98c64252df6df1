//! Board composition
//!
//! A [`Variant`] owns the bus, the clock, the telemetry collaborator and
//! whichever sensor drivers the board carries, plus an optional deployment
//! service. Which parts are present is decided when the variant is built;
//! [`VariantBuilder::build`] rejects combinations that cannot work.
//!
//! ## Usage
//!
//! ```ignore
//! static IMU_READY: DataReadySignal = DataReadySignal::new();
//!
//! let mut board = VariantBuilder::new(bus, EmbassyTime, telemetry)
//!     .with_altimeter(Ms5611Driver::new(Ms5611Config::default())?)
//!     .with_imu(Mpu9250Driver::new(Mpu9250Config::default(), &IMU_READY)?)
//!     .with_deployment(deployment)
//!     .build()?;
//!
//! loop {
//!     board.service();
//! }
//! ```

use core::fmt;

use crate::communication::TelemetryService;
use crate::devices::baro::Ms5611Driver;
use crate::devices::imu::Mpu9250Driver;
use crate::devices::traits::{Altimeter, InertialSensor};
use crate::log_info;
use crate::platform::traits::I2cBus;
use nalgebra::Vector3;
use payload_core::traits::TimeSource;

/// Latest sensor state handed to the deployment service each iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightSample {
    /// Time the snapshot was taken (ms)
    pub time_ms: u32,
    /// Acceleration (g)
    pub accel_g: Vector3<f32>,
    /// Data-ready time of the acceleration sample (ms)
    pub imu_time_ms: u32,
    /// Altitude above the reference pressure (m)
    pub altitude_m: f32,
    /// Compensated pressure (Pa)
    pub pressure_pa: i32,
    /// Time of the altimeter reading (ms)
    pub altimeter_time_ms: u32,
    /// A sensor driver has stopped after an unrecoverable error
    pub sensor_failed: bool,
}

/// Flight-phase decision logic fed from the sensor drivers
pub trait DeploymentService {
    /// Called once per [`Variant::service`] with the latest sensor state
    fn service(&mut self, sample: &FlightSample);
}

impl<D: DeploymentService + ?Sized> DeploymentService for &mut D {
    fn service(&mut self, sample: &FlightSample) {
        (**self).service(sample)
    }
}

/// Placeholder for boards without a deployment service
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDeployment;

impl DeploymentService for NoDeployment {
    fn service(&mut self, _sample: &FlightSample) {}
}

/// Invalid board composition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VariantError {
    /// Deployment decisions need altitude
    DeploymentRequiresAltimeter,
    /// Deployment decisions need acceleration
    DeploymentRequiresImu,
}

impl fmt::Display for VariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantError::DeploymentRequiresAltimeter => {
                write!(f, "deployment service requires an altimeter")
            }
            VariantError::DeploymentRequiresImu => write!(f, "deployment service requires an IMU"),
        }
    }
}

/// Collects the parts of a [`Variant`]
pub struct VariantBuilder<'a, B, T, S: TelemetryService, D = NoDeployment> {
    bus: B,
    time: T,
    telemetry: S,
    altimeter: Option<Ms5611Driver>,
    imu: Option<Mpu9250Driver<'a, S>>,
    deployment: Option<D>,
}

impl<'a, B, T, S> VariantBuilder<'a, B, T, S, NoDeployment>
where
    B: I2cBus,
    T: TimeSource,
    S: TelemetryService,
{
    /// Start a board with no sensors
    pub fn new(bus: B, time: T, telemetry: S) -> Self {
        Self {
            bus,
            time,
            telemetry,
            altimeter: None,
            imu: None,
            deployment: None,
        }
    }
}

impl<'a, B, T, S, D> VariantBuilder<'a, B, T, S, D>
where
    B: I2cBus,
    T: TimeSource,
    S: TelemetryService,
    D: DeploymentService,
{
    /// Add the barometric altimeter
    pub fn with_altimeter(mut self, altimeter: Ms5611Driver) -> Self {
        self.altimeter = Some(altimeter);
        self
    }

    /// Add the inertial measurement unit
    pub fn with_imu(mut self, imu: Mpu9250Driver<'a, S>) -> Self {
        self.imu = Some(imu);
        self
    }

    /// Add a deployment service; requires both sensors at [`Self::build`]
    pub fn with_deployment<D2: DeploymentService>(
        self,
        deployment: D2,
    ) -> VariantBuilder<'a, B, T, S, D2> {
        VariantBuilder {
            bus: self.bus,
            time: self.time,
            telemetry: self.telemetry,
            altimeter: self.altimeter,
            imu: self.imu,
            deployment: Some(deployment),
        }
    }

    /// Check the composition and assemble the board
    pub fn build(self) -> Result<Variant<'a, B, T, S, D>, VariantError> {
        if self.deployment.is_some() {
            if self.altimeter.is_none() {
                return Err(VariantError::DeploymentRequiresAltimeter);
            }
            if self.imu.is_none() {
                return Err(VariantError::DeploymentRequiresImu);
            }
        }

        log_info!(
            "Variant: altimeter {}, imu {}, deployment {}",
            self.altimeter.is_some(),
            self.imu.is_some(),
            self.deployment.is_some()
        );

        Ok(Variant {
            bus: self.bus,
            time: self.time,
            telemetry: self.telemetry,
            altimeter: self.altimeter,
            imu: self.imu,
            deployment: self.deployment,
        })
    }
}

/// Assembled payload board
pub struct Variant<'a, B, T, S: TelemetryService, D = NoDeployment> {
    bus: B,
    time: T,
    telemetry: S,
    altimeter: Option<Ms5611Driver>,
    imu: Option<Mpu9250Driver<'a, S>>,
    deployment: Option<D>,
}

impl<'a, B, T, S, D> Variant<'a, B, T, S, D>
where
    B: I2cBus,
    T: TimeSource,
    S: TelemetryService,
    D: DeploymentService,
{
    /// One main-loop iteration: altimeter, IMU, then deployment
    pub fn service(&mut self) {
        if let Some(altimeter) = self.altimeter.as_mut() {
            altimeter.service(&mut self.bus, &self.time, &mut self.telemetry);
        }
        if let Some(imu) = self.imu.as_mut() {
            imu.service(&mut self.bus, &self.time, &mut self.telemetry);
        }
        if let (Some(deployment), Some(altimeter), Some(imu)) = (
            self.deployment.as_mut(),
            self.altimeter.as_ref(),
            self.imu.as_ref(),
        ) {
            let sample = FlightSample {
                time_ms: self.time.now_ms(),
                accel_g: imu.accel_g(),
                imu_time_ms: imu.last_sample_time(),
                altitude_m: altimeter.altitude(),
                pressure_pa: altimeter.pressure(),
                altimeter_time_ms: altimeter.last_reading_time(),
                sensor_failed: imu.is_failed() || altimeter.is_failed(),
            };
            deployment.service(&sample);
        }
    }

    /// Start the IMU sample read from the data-ready interrupt window
    ///
    /// Returns `false` when there is no IMU or the read could not start.
    pub fn start_imu_async_read(&mut self) -> bool {
        match self.imu.as_mut() {
            Some(imu) => imu.start_async_read(&mut self.bus),
            None => false,
        }
    }

    /// Restart any driver that has failed
    pub fn reinit_failed(&mut self) {
        if let Some(altimeter) = self.altimeter.as_mut().filter(|a| a.is_failed()) {
            altimeter.reinit();
        }
        if let Some(imu) = self.imu.as_mut().filter(|i| i.is_failed()) {
            imu.reinit(&mut self.telemetry);
        }
    }

    pub fn altimeter(&self) -> Option<&Ms5611Driver> {
        self.altimeter.as_ref()
    }

    pub fn imu(&self) -> Option<&Mpu9250Driver<'a, S>> {
        self.imu.as_ref()
    }

    pub fn deployment(&self) -> Option<&D> {
        self.deployment.as_ref()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn telemetry(&self) -> &S {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut S {
        &mut self.telemetry
    }

    pub fn time(&self) -> &T {
        &self.time
    }
}
