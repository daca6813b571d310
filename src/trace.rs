//! Ray marching through the cascades of a signed distance field.

use crate::{
    consts::MAX_STEPS_PER_CASCADE, layout::CascadeLayout, sampler::central_difference,
    texture::CascadeTexture,
};
use nalgebra::{Point3, UnitVector3};

/// A ray to trace through the field.
///
/// The direction is a unit vector. The caller is responsible for supplying
/// a positive `step_scale` and `min_distance <= max_distance`; other values
/// give unspecified (but bounded) results.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SdfTrace {
    pub origin: Point3<f32>,
    pub direction: UnitVector3<f32>,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Factor applied to every distance-based step. Values below one trade
    /// speed for robustness against overstepping thin features.
    pub step_scale: f32,
    pub needs_hit_normal: bool,
}

/// The outcome of tracing a ray through the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SdfHit {
    /// Distance along the ray to the surface, or a negative value if nothing
    /// was hit.
    pub hit_time: f32,
    /// Index of the cascade in which the surface was found.
    pub hit_cascade: usize,
    /// Total number of steps taken across all traversed cascades.
    pub step_count: u32,
    /// Surface normal at the hit, if requested and computable.
    pub hit_normal: Option<UnitVector3<f32>>,
}

impl SdfTrace {
    /// Creates a new trace with unit step scale.
    pub fn new(
        origin: Point3<f32>,
        direction: UnitVector3<f32>,
        min_distance: f32,
        max_distance: f32,
        needs_hit_normal: bool,
    ) -> Self {
        Self {
            origin,
            direction,
            min_distance,
            max_distance,
            step_scale: 1.0,
            needs_hit_normal,
        }
    }

    pub fn with_step_scale(mut self, step_scale: f32) -> Self {
        self.step_scale = step_scale;
        self
    }

    /// The point at the given distance along the ray.
    pub fn point_at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction.scale(distance)
    }
}

impl SdfHit {
    fn miss() -> Self {
        Self {
            hit_time: -1.0,
            hit_cascade: 0,
            step_count: 0,
            hit_normal: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.hit_time >= 0.0
    }

    /// The world-space hit position along the given trace, or [`None`] if
    /// nothing was hit.
    pub fn hit_position(&self, trace: &SdfTrace) -> Option<Point3<f32>> {
        self.is_hit().then(|| trace.point_at(self.hit_time))
    }
}

/// Finds the first surface along the given ray.
///
/// The cascades are traversed from finest to coarsest as consecutive,
/// non-overlapping bands along the ray: each cascade only traces the part of
/// the ray beyond where the previously traced cascade was exited. Within a
/// cascade, the flood texture is used to skip empty space a whole
/// rasterization chunk at a time, and the precise texture takes over close to
/// geometry. At most [`MAX_STEPS_PER_CASCADE`] steps are taken per cascade.
///
/// `textures` and `flood_textures` hold the precise and flood texture for each
/// cascade in `layout`. Cascades lacking either texture are not traced.
pub fn trace_ray(
    layout: &CascadeLayout,
    textures: &[CascadeTexture],
    flood_textures: &[CascadeTexture],
    trace: &SdfTrace,
) -> SdfHit {
    let mut hit = SdfHit::miss();

    let chunk_size_distance = layout.chunk_size_distance();
    let chunk_margin_distance = layout.chunk_margin_distance();
    let texel_offset = layout.texel_offset();

    let trace_max_distance = f32::min(trace.max_distance, layout.max_trace_distance());
    let trace_end = trace.point_at(trace_max_distance);

    let mut next_intersection_start = trace.min_distance;

    for (cascade_idx, ((cascade, texture), flood_texture)) in layout
        .active_cascades()
        .iter()
        .zip(textures)
        .zip(flood_textures)
        .enumerate()
    {
        let voxel_extent = 0.5 * cascade.voxel_size;
        let cascade_min_step = cascade.voxel_size;
        let cascade_max_distance = cascade.max_distance();

        let [t_enter, t_exit] = line_hit_box(
            &trace.origin,
            &trace_end,
            &cascade.lower_corner(),
            &cascade.upper_corner(),
        )
        .map(|t| t * trace_max_distance);

        let t_enter = f32::max(t_enter, next_intersection_start);
        if t_enter >= t_exit {
            continue;
        }
        next_intersection_start = t_exit;

        let mut step_time = t_enter;
        let mut step = 0;

        while step < MAX_STEPS_PER_CASCADE && step_time < t_exit {
            let normalized_coords = cascade.normalized_coords(&trace.point_at(step_time));

            let mut step_distance = flood_texture.sample(&normalized_coords);
            if step_distance < chunk_size_distance {
                // The flood values are unreliable close to geometry
                let precise_distance = texture.sample(&normalized_coords);
                if precise_distance < 2.0 * chunk_margin_distance {
                    step_distance = precise_distance;
                }
            } else {
                // No geometry within the chunk, so skip across it
                step_distance = chunk_size_distance;
            }
            step_distance *= cascade_max_distance;

            let min_surface_thickness =
                voxel_extent * saturate(step_time / (2.0 * voxel_extent));

            if step_distance < min_surface_thickness {
                hit.hit_time = f32::max(step_time + step_distance - min_surface_thickness, 0.0);
                hit.hit_cascade = cascade_idx;
                if trace.needs_hit_normal {
                    hit.hit_normal = UnitVector3::try_new(
                        central_difference(texture, &normalized_coords, texel_offset),
                        f32::EPSILON,
                    );
                }
                break;
            }

            step_time += f32::max(step_distance * trace.step_scale, cascade_min_step);
            step += 1;
        }

        hit.step_count += step;

        if hit.is_hit() {
            break;
        }
    }

    hit
}

/// Intersects the line segment from `line_start` to `line_end` with the
/// axis-aligned box spanned by `box_min` and `box_max`.
///
/// # Returns
/// The entry and exit points as fractions of the segment length, clamped to
/// `[0, 1]`. The segment misses the box if the entry is not smaller than the
/// exit.
pub fn line_hit_box(
    line_start: &Point3<f32>,
    line_end: &Point3<f32>,
    box_min: &Point3<f32>,
    box_max: &Point3<f32>,
) -> [f32; 2] {
    let mut enter = f32::NEG_INFINITY;
    let mut exit = f32::INFINITY;

    for dim in 0..3 {
        let inverse_direction = (line_end[dim] - line_start[dim]).recip();
        let to_min = (box_min[dim] - line_start[dim]) * inverse_direction;
        let to_max = (box_max[dim] - line_start[dim]) * inverse_direction;

        // `f32::min`/`max` discard NaN from `0 * inf` when the segment lies in a
        // box face plane
        enter = enter.max(to_min.min(to_max));
        exit = exit.min(to_min.max(to_max));
    }

    [saturate(enter), saturate(exit)]
}

fn saturate(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}
