// skylark_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::NavFilter;
pub use crate::pipeline::NavPipeline;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::config::{FrameRate, NavConfig, SensorConfig};
pub use crate::error::NavError;
pub use crate::messages::{GnssData, ImuData, InceptorData, NavData, PresData, SensorData};
pub use crate::pipeline::HomePosition;

// --- Concrete Implementations (Export common ones for convenience) ---
pub use crate::estimation::ekf15::{Ekf15State, EkfTuning};
pub use crate::filters::{FilterBank, LowPassFilter, TriadFilter};
