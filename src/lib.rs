#![cfg_attr(not(test), no_std)]

#[cfg(feature = "tls")]
extern crate alloc;

pub mod calibration;
pub mod config;
pub mod constants;
pub mod duty_cycle;
pub mod indicator;
pub mod network;
pub mod power;
pub mod reading;
pub mod retry;
pub mod sensors;
pub mod telemetry;

#[cfg(feature = "esp32")]
pub mod board;
#[cfg(feature = "esp32")]
pub mod transport;
#[cfg(feature = "esp32")]
pub mod wifi;

#[cfg(test)]
mod testing;
