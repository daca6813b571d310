//! Constants shared by the sampling and tracing code.

/// The maximum number of nested cascades in a [`CascadeLayout`](crate::CascadeLayout).
pub const MAX_CASCADE_COUNT: usize = 4;

/// Distance returned when no cascade holds a valid sample for a position. Any
/// real distance in the field is smaller than this.
pub const WORLD_SIZE: f32 = 60000.0;

/// Number of voxels along each axis of a rasterization chunk. The flood
/// texture is trustworthy at the granularity of one chunk.
pub const RASTERIZE_CHUNK_SIZE: u32 = 32;

/// Number of voxels of margin rasterized around each chunk.
pub const RASTERIZE_CHUNK_MARGIN: u32 = 4;

/// Upper bound on the number of steps taken in a single cascade when tracing
/// a ray.
pub const MAX_STEPS_PER_CASCADE: u32 = 250;

/// Upper bound on the total number of steps taken when tracing a ray.
pub const MAX_TOTAL_STEPS: u32 = MAX_STEPS_PER_CASCADE * MAX_CASCADE_COUNT as u32;

/// Normalized distance values at or above this are treated as unset when
/// sampling distances.
pub const DISTANCE_VALIDITY_THRESHOLD: f32 = 1.0;

/// Normalized distance values at or above this are treated as unset when
/// computing gradients. Stricter than [`DISTANCE_VALIDITY_THRESHOLD`] so that
/// the finite differences stay clear of the unset region.
pub const GRADIENT_VALIDITY_THRESHOLD: f32 = 0.9;

/// Gradient returned when no cascade qualifies for gradient computation.
pub const FILLER_GRADIENT: [f32; 3] = [0.0, 1e-5, 0.0];
