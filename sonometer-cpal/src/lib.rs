//! # sonometer-cpal
//!
//! Cross-platform input backend for the sonometer, built on cpal.
//!
//! Provides:
//! - `CpalDriver`: host API / device enumeration and callback-driven input
//!   streams delivering fixed-size chunks
//! - the `sonometer` binary: a headless instrument driven from stdin
//!
//! ## Usage
//! ```ignore
//! use sonometer_core::{Sonometer, SonometerConfig, SvgSurface};
//! use sonometer_cpal::CpalDriver;
//!
//! let mut meter = Sonometer::new(CpalDriver::new(), SonometerConfig::default(), Box::new(SvgSurface::default()))?;
//! meter.start();
//! ```

pub mod cpal_driver;

pub use cpal_driver::CpalDriver;
