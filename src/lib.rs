pub mod analysis;
pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod mesh;
pub mod pipeline;

pub use error::{FiberMeshError, Result};
