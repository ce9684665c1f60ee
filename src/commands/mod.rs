//! Typed argument structs for every external program kioskify runs.
//!
//! Each struct implements `HostCommand` and is executed through
//! `command::run_command_safe`.

pub mod packages;
pub mod system;
pub mod systemd;
