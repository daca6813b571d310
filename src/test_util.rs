//! Helpers for building synthetic fields in tests.

use crate::{
    layout::{Cascade, CascadeLayout},
    texture::CascadeTexture,
};
use nalgebra::{Point3, UnitVector3};

pub fn single_cascade_layout(
    half_extent: f32,
    voxel_size: f32,
    resolution: usize,
) -> CascadeLayout {
    CascadeLayout::from_cascades(
        &[Cascade::new(Point3::origin(), half_extent, voxel_size)],
        resolution as f32,
    )
    .unwrap()
}

/// Rasterizes the given world-space signed distance function into a texture
/// covering the given cascade.
pub fn texture_from_world_fn(
    cascade: &Cascade,
    resolution: usize,
    distance: impl Fn(&Point3<f32>) -> f32,
) -> CascadeTexture {
    let max_distance = cascade.max_distance();
    CascadeTexture::from_fn(resolution, |coords| {
        let position = cascade.center + coords.coords.add_scalar(-0.5) * max_distance;
        distance(&position) / max_distance
    })
}

pub fn sphere_distance(center: Point3<f32>, radius: f32) -> impl Fn(&Point3<f32>) -> f32 {
    move |position| nalgebra::distance(&center, position) - radius
}

/// Signed distance to the plane through `point` with the given normal,
/// negative behind the plane.
pub fn plane_distance(
    point: Point3<f32>,
    normal: UnitVector3<f32>,
) -> impl Fn(&Point3<f32>) -> f32 {
    move |position| normal.dot(&(position - point))
}
