//! Detection pipeline: raw records, the backend boundary, the simulator and
//! the normalizer that turns them into canonical annotations.

mod backend;
mod normalizer;
mod raw;
mod simulator;

pub use backend::{DetectionBackend, TextResponseBackend, detect_or_empty};
pub use normalizer::DetectionNormalizer;
pub use raw::{RawDetection, parse_payload};
pub use simulator::Simulator;
