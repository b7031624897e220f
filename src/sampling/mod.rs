//! Bit sampling from the locked screen region.
//!
//! The [`BitSampler`] turns frames into symbols on a fixed time grid and
//! the [`BitBuffer`] accumulates the resulting bits until the protocol
//! layer finds a complete frame in them.

mod buffer;
mod sampler;

pub use buffer::BitBuffer;
pub use sampler::{BitSampler, SamplingConfig, SamplingMode};
