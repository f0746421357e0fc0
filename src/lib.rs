// src/lib.rs

//! Geofencing Library
//!
//! Place search with isochrone regions, region monitoring and visit records
//! driven by entry, dwell and exit events.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
