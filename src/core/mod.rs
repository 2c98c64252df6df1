//! Core payload functionality
//!
//! - `logging`: the `log_*!` macros used throughout the crate
//! - `variant`: board composition and the main-loop service order

pub mod logging;
pub mod variant;

pub use variant::{DeploymentService, FlightSample, NoDeployment, Variant, VariantBuilder, VariantError};
