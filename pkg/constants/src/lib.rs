//! Centralized constants for the countdown engine.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod api;
pub mod countdown;
