//! ADS129x analog front-end driver
//!
//! This library drives the TI ADS1294/6/8(R) and ADS1299 biopotential AFEs over SPI,
//! including the power/reset sequencing, channel plan driven register configuration
//! and continuous-read frame decoding.
//!
//! All hardware access goes through the [`BusLink`] capability, so the same code runs
//! against Linux spidev/GPIO (via [`HalLink`]) or against the [`SimulatedChip`].

pub mod configure;
pub mod device;
pub mod error;
pub mod identity;
pub mod link;
pub mod plan;
pub mod power;
pub mod registers;
pub mod sim;
pub mod stream;

// Re-export main types for convenience
pub use configure::{register_writes, AcquisitionSettings, RegisterWrite};
pub use device::Ads129x;
pub use error::{Error, PlanError};
pub use identity::DeviceIdentity;
pub use link::{BusLink, HalLink, HalPins, Line, LinkError};
pub use plan::{ChannelPlan, ChannelRole};
pub use power::{PowerSequencer, PowerState};
pub use sim::SimulatedChip;
pub use stream::{AcquisitionFrame, StatusWord};
