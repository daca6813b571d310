//! Layout of the nested cascades making up a cascaded signed distance field.

use crate::consts::{MAX_CASCADE_COUNT, RASTERIZE_CHUNK_MARGIN, RASTERIZE_CHUNK_SIZE};
use anyhow::{Result, bail};
use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A cubic volume of the field, centered on `center` and extending
/// `half_extent` along each axis in both directions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    pub center: Point3<f32>,
    pub half_extent: f32,
    pub voxel_size: f32,
}

/// The nested cascades of a signed distance field, ordered from the finest
/// (smallest) to the coarsest (largest), together with the number of voxels
/// along each axis of every cascade texture.
///
/// Only the leading cascades with a positive half extent are active. The
/// first cascade with a non-positive half extent terminates the sequence, and
/// every cascade after it is ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeLayout {
    cascades: [Cascade; MAX_CASCADE_COUNT],
    resolution: f32,
    active_count: usize,
}

/// Packed representation of a [`CascadeLayout`] suitable for uploading as a
/// uniform buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Zeroable, Pod)]
pub struct CascadeLayoutUniform {
    /// Center in `xyz` and half extent in `w` for each cascade.
    pub cascade_pos_distance: [[f32; 4]; MAX_CASCADE_COUNT],
    pub cascade_voxel_size: [f32; MAX_CASCADE_COUNT],
    pub padding: [f32; 2],
    pub cascade_count: u32,
    pub resolution: f32,
}

impl Cascade {
    /// Creates a new cascade with the given center, half extent and voxel
    /// size.
    pub fn new(center: Point3<f32>, half_extent: f32, voxel_size: f32) -> Self {
        Self {
            center,
            half_extent,
            voxel_size,
        }
    }

    /// Creates a placeholder for an unused cascade slot.
    pub fn absent() -> Self {
        Self::new(Point3::origin(), 0.0, 0.0)
    }

    /// Whether this cascade covers any volume.
    pub fn is_active(&self) -> bool {
        self.half_extent > 0.0
    }

    /// The side length of the cascade volume. A normalized texture value of
    /// one corresponds to this world-space distance.
    pub fn max_distance(&self) -> f32 {
        2.0 * self.half_extent
    }

    pub fn lower_corner(&self) -> Point3<f32> {
        self.center - Vector3::repeat(self.half_extent)
    }

    pub fn upper_corner(&self) -> Point3<f32> {
        self.center + Vector3::repeat(self.half_extent)
    }

    /// Computes the normalized texture coordinates of the given world-space
    /// position in this cascade. Positions inside the cascade map to the unit
    /// cube.
    pub fn normalized_coords(&self, position: &Point3<f32>) -> Point3<f32> {
        let offset = (position - self.center) / self.max_distance();
        Point3::from(offset.add_scalar(0.5))
    }

    /// Whether the given cascade lies fully inside this one.
    pub fn encloses(&self, other: &Self) -> bool {
        let (lower, upper) = (self.lower_corner(), self.upper_corner());
        let (other_lower, other_upper) = (other.lower_corner(), other.upper_corner());
        (0..3).all(|dim| other_lower[dim] >= lower[dim] && other_upper[dim] <= upper[dim])
    }
}

/// Whether all components of the given normalized texture coordinates lie in
/// the closed unit interval. NaN components count as outside.
pub fn is_within_unit_cube(normalized_coords: &Point3<f32>) -> bool {
    normalized_coords
        .iter()
        .all(|coord| (0.0..=1.0).contains(coord))
}

impl CascadeLayout {
    /// Creates a new layout from the given cascade slots and texture
    /// resolution. Slots following the first inactive one are cleared.
    pub fn new(cascades: [Cascade; MAX_CASCADE_COUNT], resolution: f32) -> Self {
        let active_count = cascades
            .iter()
            .take_while(|cascade| cascade.is_active())
            .count();

        let mut cascades = cascades;
        for cascade in &mut cascades[active_count..] {
            *cascade = Cascade::absent();
        }

        Self {
            cascades,
            resolution,
            active_count,
        }
    }

    /// Creates a layout with no active cascades. Every query against it
    /// yields the corresponding sentinel result.
    pub fn empty(resolution: f32) -> Self {
        Self::new([Cascade::absent(); MAX_CASCADE_COUNT], resolution)
    }

    /// Creates a layout from the given active cascades, ordered from finest to
    /// coarsest.
    ///
    /// # Errors
    /// Returns an error if there are more than [`MAX_CASCADE_COUNT`]
    /// cascades, if the resolution is smaller than one, if any cascade has a
    /// non-positive half extent or voxel size, or if any cascade is not fully
    /// enclosed by the next one.
    pub fn from_cascades(cascades: &[Cascade], resolution: f32) -> Result<Self> {
        if cascades.len() > MAX_CASCADE_COUNT {
            bail!(
                "Got {} cascades, but at most {} are supported",
                cascades.len(),
                MAX_CASCADE_COUNT
            );
        }
        if resolution.is_nan() || resolution < 1.0 {
            bail!("Invalid cascade texture resolution {}", resolution);
        }

        for (idx, cascade) in cascades.iter().enumerate() {
            if !cascade.is_active() {
                bail!(
                    "Cascade {} has non-positive half extent {}",
                    idx,
                    cascade.half_extent
                );
            }
            if cascade.voxel_size.is_nan() || cascade.voxel_size <= 0.0 {
                bail!(
                    "Cascade {} has non-positive voxel size {}",
                    idx,
                    cascade.voxel_size
                );
            }
        }

        for (idx, pair) in cascades.windows(2).enumerate() {
            if !pair[1].encloses(&pair[0]) {
                bail!("Cascade {} does not enclose cascade {}", idx + 1, idx);
            }
        }

        let mut slots = [Cascade::absent(); MAX_CASCADE_COUNT];
        slots[..cascades.len()].copy_from_slice(cascades);

        Ok(Self::new(slots, resolution))
    }

    /// Reconstructs a layout from its uniform representation. At most
    /// `cascade_count` cascades are considered active.
    pub fn from_uniform(uniform: &CascadeLayoutUniform) -> Self {
        let cascades = std::array::from_fn(|idx| {
            let [x, y, z, half_extent] = uniform.cascade_pos_distance[idx];
            Cascade::new(
                Point3::new(x, y, z),
                half_extent,
                uniform.cascade_voxel_size[idx],
            )
        });
        let mut layout = Self::new(cascades, uniform.resolution);

        let count = usize::min(layout.active_count, uniform.cascade_count as usize);
        for cascade in &mut layout.cascades[count..] {
            *cascade = Cascade::absent();
        }
        layout.active_count = count;

        layout
    }

    /// Packs the layout into its uniform representation.
    pub fn to_uniform(&self) -> CascadeLayoutUniform {
        let mut uniform = CascadeLayoutUniform::zeroed();
        for (idx, cascade) in self.active_cascades().iter().enumerate() {
            uniform.cascade_pos_distance[idx] = [
                cascade.center.x,
                cascade.center.y,
                cascade.center.z,
                cascade.half_extent,
            ];
            uniform.cascade_voxel_size[idx] = cascade.voxel_size;
        }
        uniform.cascade_count = self.active_count as u32;
        uniform.resolution = self.resolution;
        uniform
    }

    /// The number of voxels along each axis of the cascade textures.
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    pub fn has_active_cascades(&self) -> bool {
        self.active_count > 0
    }

    /// The active cascades, ordered from finest to coarsest.
    pub fn active_cascades(&self) -> &[Cascade] {
        &self.cascades[..self.active_count]
    }

    pub fn cascade(&self, idx: usize) -> Option<&Cascade> {
        self.active_cascades().get(idx)
    }

    /// The coarsest active cascade, if any.
    pub fn outermost_cascade(&self) -> Option<&Cascade> {
        self.active_cascades().last()
    }

    /// The longest distance a ray can be traced through the field, which is
    /// the side length of the outermost cascade.
    pub fn max_trace_distance(&self) -> f32 {
        self.outermost_cascade().map_or(0.0, Cascade::max_distance)
    }

    /// The side length of a rasterization chunk in normalized texture units.
    pub fn chunk_size_distance(&self) -> f32 {
        RASTERIZE_CHUNK_SIZE as f32 / self.resolution
    }

    /// The chunk margin width in normalized texture units.
    pub fn chunk_margin_distance(&self) -> f32 {
        RASTERIZE_CHUNK_MARGIN as f32 / self.resolution
    }

    /// The width of one texel in normalized texture units.
    pub fn texel_offset(&self) -> f32 {
        self.resolution.recip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::point;

    fn nested_cascades() -> [Cascade; 3] {
        [
            Cascade::new(point![0.0, 0.0, 0.0], 5.0, 0.05),
            Cascade::new(point![1.0, 0.0, 0.0], 10.0, 0.1),
            Cascade::new(point![0.0, 2.0, 0.0], 40.0, 0.4),
        ]
    }

    #[test]
    fn should_count_only_leading_active_cascades() {
        let cascades = [
            Cascade::new(point![0.0, 0.0, 0.0], 5.0, 0.05),
            Cascade::absent(),
            Cascade::new(point![0.0, 0.0, 0.0], 20.0, 0.2),
            Cascade::new(point![0.0, 0.0, 0.0], 40.0, 0.4),
        ];
        let layout = CascadeLayout::new(cascades, 64.0);
        assert_eq!(layout.active_count(), 1);
        assert_eq!(layout.active_cascades(), &cascades[..1]);
        assert!(layout.cascade(2).is_none());
    }

    #[test]
    fn should_have_no_active_cascades_when_first_is_absent() {
        let layout = CascadeLayout::empty(64.0);
        assert!(!layout.has_active_cascades());
        assert!(layout.outermost_cascade().is_none());
        assert_abs_diff_eq!(layout.max_trace_distance(), 0.0);
    }

    #[test]
    fn should_build_layout_from_nested_cascades() {
        let cascades = nested_cascades();
        let layout = CascadeLayout::from_cascades(&cascades, 128.0).unwrap();
        assert_eq!(layout.active_count(), 3);
        assert_eq!(layout.outermost_cascade(), Some(&cascades[2]));
        assert_abs_diff_eq!(layout.max_trace_distance(), 80.0);
    }

    #[test]
    fn should_reject_too_many_cascades() {
        let cascade = Cascade::new(point![0.0, 0.0, 0.0], 5.0, 0.05);
        assert!(CascadeLayout::from_cascades(&[cascade; 5], 128.0).is_err());
    }

    #[test]
    fn should_reject_cascades_that_are_not_nested() {
        let cascades = [
            Cascade::new(point![0.0, 0.0, 0.0], 5.0, 0.05),
            Cascade::new(point![8.0, 0.0, 0.0], 10.0, 0.1),
        ];
        assert!(CascadeLayout::from_cascades(&cascades, 128.0).is_err());
    }

    #[test]
    fn should_reject_invalid_resolution_and_voxel_size() {
        let cascade = Cascade::new(point![0.0, 0.0, 0.0], 5.0, 0.05);
        assert!(CascadeLayout::from_cascades(&[cascade], 0.0).is_err());
        assert!(CascadeLayout::from_cascades(&[cascade], f32::NAN).is_err());

        let cascade = Cascade::new(point![0.0, 0.0, 0.0], 5.0, 0.0);
        assert!(CascadeLayout::from_cascades(&[cascade], 128.0).is_err());
    }

    #[test]
    fn should_map_cascade_center_and_corners_to_unit_cube() {
        let cascade = Cascade::new(point![1.0, 2.0, 3.0], 4.0, 0.1);
        assert_abs_diff_eq!(
            cascade.normalized_coords(&cascade.center),
            point![0.5, 0.5, 0.5]
        );
        assert_abs_diff_eq!(
            cascade.normalized_coords(&cascade.lower_corner()),
            point![0.0, 0.0, 0.0]
        );
        assert_abs_diff_eq!(
            cascade.normalized_coords(&cascade.upper_corner()),
            point![1.0, 1.0, 1.0]
        );
        assert!(!is_within_unit_cube(
            &cascade.normalized_coords(&point![5.5, 2.0, 3.0])
        ));
    }

    #[test]
    fn should_treat_nan_coordinates_as_outside_unit_cube() {
        assert!(!is_within_unit_cube(&point![0.5, f32::NAN, 0.5]));
        assert!(is_within_unit_cube(&point![0.0, 1.0, 0.5]));
    }

    #[test]
    fn should_compute_chunk_distances_from_resolution() {
        let layout = CascadeLayout::from_cascades(&nested_cascades(), 256.0).unwrap();
        assert_abs_diff_eq!(layout.chunk_size_distance(), 0.125);
        assert_abs_diff_eq!(layout.chunk_margin_distance(), 4.0 / 256.0);
        assert_abs_diff_eq!(layout.texel_offset(), 1.0 / 256.0);
    }

    #[test]
    fn should_round_trip_layout_through_uniform() {
        let layout = CascadeLayout::from_cascades(&nested_cascades(), 128.0).unwrap();
        let uniform = layout.to_uniform();
        assert_eq!(uniform.cascade_count, 3);
        assert_eq!(bytemuck::bytes_of(&uniform).len(), 96);
        assert_eq!(CascadeLayout::from_uniform(&uniform), layout);
    }

    #[test]
    fn should_limit_active_cascades_to_uniform_cascade_count() {
        let layout = CascadeLayout::from_cascades(&nested_cascades(), 128.0).unwrap();
        let mut uniform = layout.to_uniform();
        uniform.cascade_count = 2;
        let truncated = CascadeLayout::from_uniform(&uniform);
        assert_eq!(truncated.active_count(), 2);
        assert_eq!(truncated.active_cascades(), &layout.active_cascades()[..2]);
    }
}
