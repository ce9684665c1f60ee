//! Pure decision logic: turns kiosk settings into concrete package lists.
//!
//! # Modules
//!
//! - `resolver` — package name resolution

pub mod resolver;
