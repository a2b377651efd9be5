//! Playback endpoint: buffer pool and adaptive flow control.

mod flow;
mod pool;

pub use flow::{PlayState, Player};
