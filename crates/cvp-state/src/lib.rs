//! CVP Desired State
//!
//! Types for the YAML document that declares what CloudVision should look
//! like: containers, devices, configlets, image bundles and tasks, plus the
//! option enums that steer how the reconciler applies them.

pub mod error;
pub mod options;
pub mod container;
pub mod device;
pub mod image_bundle;
pub mod document;

pub use error::*;
pub use options::*;
pub use container::*;
pub use device::*;
pub use image_bundle::*;
pub use document::*;
