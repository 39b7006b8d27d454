//! Chronological team Glicko-2 ladder over a feed of recorded matches.

pub mod config;
pub mod driver;
pub mod evaluation;
pub mod feed;
pub mod player;
pub mod standings;
pub mod store;

pub use driver::{Ladder, Prediction};
