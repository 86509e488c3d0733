//! # tagwatch
//!
//! Process-level pieces of the tagwatch FindMy tracker detector: logging
//! setup, the terminal display that consumes snapshots, and the optional
//! read-only status API.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod api;
pub mod display;
pub mod logging;
pub mod state;
