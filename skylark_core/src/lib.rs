// skylark_core/src/lib.rs

// This file defines the public modules of the navigation library.
pub mod airdata;
pub mod config;
pub mod error;
pub mod estimation;
pub mod filters;
pub mod gate;
pub mod geodesy;
pub mod messages;
pub mod output;
pub mod pipeline;
pub mod prelude;
