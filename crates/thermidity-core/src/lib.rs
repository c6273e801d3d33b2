//! Hardware-independent core library for the thermidity sensor node
//!
//! This crate contains all platform-agnostic logic for a battery-powered
//! thermometer/hygrometer with a bistable (e-ink) display: oversampled
//! acquisition, exponential averaging, sensor calibration, the change-gated
//! refresh policy and the power-aware scheduler that ties them together.
//!
//! It is `#![no_std]` without `alloc` so it compiles on small embedded
//! targets and on desktop hosts (for the simulator and tests).

#![no_std]

pub mod app_state;
pub mod averaging;
pub mod calibration;
pub mod config;
pub mod display_manager;
pub mod format;
pub mod math;
pub mod metrics;
pub mod panel;
pub mod power;
pub mod refresh_policy;
pub mod sensors;
pub mod tick;
