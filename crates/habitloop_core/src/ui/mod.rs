//! Screen-facing contracts of the habit list.
//!
//! The coordinator decides *that* something is shown; implementations of
//! `Screen` decide how.

pub mod message;
pub mod screen;
