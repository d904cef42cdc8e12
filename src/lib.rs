// src/lib.rs
#![cfg_attr(not(test), no_std)] // Specify no_std at the crate root

//! Drivers for UART air-quality sensors: the five-in-one VOC/HCHO/eCO2/T/RH
//! module, the PM2005 particle sensor and the JX-CO2-102 CO2 sensor.
//!
//! Each driver turns the sensor's raw byte stream into typed [`Reading`]s.
//! Call [`SensorDriver::service`] from the main loop; it never waits for
//! input.

pub mod common;
pub mod sensor;

// Re-export key types for convenience
pub use common::{
    Channel, ErrorKind, Reading, ReadingSink, SensorError, SensorSerial, SensorTimer, SerialSettings,
    Subscriptions,
};
pub use sensor::{SensorConfig, SensorDriver, SensorKind, SequencerTimings};

#[cfg(feature = "impl-native")]
pub use common::NativeAdapter;
