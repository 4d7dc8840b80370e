// skylark_core/src/filters/mod.rs

//! The digital filter bank: one independent single-pole low-pass filter per
//! physical sensor channel.

mod bank;
mod iir;

pub use bank::{FilterBank, TriadFilter};
pub use iir::LowPassFilter;
