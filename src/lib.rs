//! Song catalogue search by title and artist, and vocal range detection
//! from sung pitch.

pub mod config;
pub mod music;
pub mod paths;
pub mod range;
pub mod search;
pub mod storage;
