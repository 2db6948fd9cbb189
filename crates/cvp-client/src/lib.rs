//! CloudVision Portal REST API Client
//!
//! A Rust client library for the Arista CloudVision Portal (CVP) REST API.
//! Provides typed models and one method per logical CVP operation for
//! devices, containers, configlets, image bundles and tasks.
//!
//! # Example
//!
//! ```no_run
//! use cvp_client::{CvpClient, CvpClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CvpClient::new(
//!     "https://cvp.example.com".to_string(),
//!     "service-account-token".to_string(),
//! )?;
//!
//! // Page through configlets four windows at a time
//! let configlets = cvp_client::fetch_all_concurrently(
//!     |start, end| client.get_configlets_page(start, end),
//!     4,
//! ).await?;
//!
//! // Attach a configlet to a device
//! let device = client.get_inventory().await?.remove(0);
//! let tasks = client.apply_configlets_to_device(&device, &configlets[..1]).await?;
//! println!("created tasks {:?}", tasks.task_ids);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Provisioning**: containers, configlet attachment, device moves and resets
//! - **Configlets**: create, update, delete, lookup by name or attachment
//! - **Images**: image bundles and image upload
//! - **Tasks**: lookup, execution and cancellation
//! - **Pagination**: concurrent fan-out over `startIndex`/`endIndex` endpoints

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod cvp_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::CvpClient;
pub use common::HttpClient;
pub use common::pagination::fetch_all_concurrently;
pub use cvp_trait::CvpClientTrait;
pub use error::CvpError;
pub use models::*;
#[cfg(feature = "test-util")]
pub use mock::MockCvpClient;
