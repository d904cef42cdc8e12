// src/common/mod.rs

// --- Declare all public modules within common ---
pub mod accumulator;
pub mod checksum;
pub mod error;
pub mod frame;
pub mod hal_traits;
pub mod io_helpers;
pub mod reading;
pub mod timing;

#[cfg(feature = "impl-native")]
pub mod adapter;

#[cfg(test)]
pub(crate) mod mock;

// --- Re-export key types/traits/functions for easier access ---

pub use accumulator::ByteAccumulator;
pub use checksum::{additive_checksum, inverted_sum, verify_additive, verify_inverted_sum};
pub use error::{ErrorKind, SensorError};
pub use frame::{FrameFormat, SerialSettings, ValidatedFrame};
pub use hal_traits::{SensorSerial, SensorTimer};
pub use reading::{Channel, Reading, ReadingSink, Readings, Subscriptions};

// Native HAL integration (embedded-hal 1.0 + embedded-hal-nb)
#[cfg(feature = "impl-native")]
pub use adapter::NativeAdapter;
