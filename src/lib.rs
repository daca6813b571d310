//! Cascaded voxel signed distance fields and ray marching queries against
//! them.

#[macro_use]
mod macros;

pub mod config;
pub mod consts;
pub mod global_sdf;
pub mod io;
pub mod layout;
pub mod sampler;
pub mod texture;
pub mod trace;

#[cfg(test)]
mod test_util;

pub use config::{CascadeConfig, GlobalSdfConfig, TraceConfig};
pub use global_sdf::GlobalSdf;
pub use layout::{Cascade, CascadeLayout, CascadeLayoutUniform};
pub use sampler::{DistanceGradient, sample_distance, sample_gradient};
pub use texture::CascadeTexture;
pub use trace::{SdfHit, SdfTrace, line_hit_box, trace_ray};
