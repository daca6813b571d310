//! Point queries against the cascades of a signed distance field.

use crate::{
    consts::{
        DISTANCE_VALIDITY_THRESHOLD, FILLER_GRADIENT, GRADIENT_VALIDITY_THRESHOLD, WORLD_SIZE,
    },
    layout::{CascadeLayout, is_within_unit_cube},
    texture::CascadeTexture,
};
use nalgebra::{Point3, UnitVector3, Vector3};

/// Approximate gradient of the signed distance field at a point, together
/// with the distance at that point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceGradient {
    /// Unnormalized gradient, in world-space distance per texel step.
    pub gradient: Vector3<f32>,
    /// World-space distance, or [`WORLD_SIZE`] if no cascade qualified.
    pub distance: f32,
}

impl DistanceGradient {
    fn filler() -> Self {
        Self {
            gradient: Vector3::from(FILLER_GRADIENT),
            distance: WORLD_SIZE,
        }
    }

    /// Whether the gradient was computed from field data rather than being
    /// the filler value.
    pub fn is_valid(&self) -> bool {
        self.distance < WORLD_SIZE
    }

    /// The surface normal given by the normalized gradient, or [`None`] if
    /// the gradient is the filler value or too small to normalize.
    pub fn normal(&self) -> Option<UnitVector3<f32>> {
        if self.is_valid() {
            UnitVector3::try_new(self.gradient, f32::EPSILON)
        } else {
            None
        }
    }
}

/// Returns the world-space distance from the given position to the nearest
/// surface, read from the finest cascade that contains the position and has
/// a set value there.
///
/// `textures` holds the precise texture for each cascade in `layout`. A
/// cascade without a corresponding texture is skipped.
///
/// Returns [`WORLD_SIZE`] if the layout has no active cascades or no cascade
/// holds a valid sample for the position.
pub fn sample_distance(
    layout: &CascadeLayout,
    textures: &[CascadeTexture],
    position: &Point3<f32>,
) -> f32 {
    for (cascade, texture) in layout.active_cascades().iter().zip(textures) {
        let normalized_coords = cascade.normalized_coords(position);
        if !is_within_unit_cube(&normalized_coords) {
            continue;
        }
        let normalized_distance = texture.sample(&normalized_coords);
        if normalized_distance < DISTANCE_VALIDITY_THRESHOLD {
            return normalized_distance * cascade.max_distance();
        }
    }
    WORLD_SIZE
}

/// Estimates the gradient of the field at the given position by central
/// differences one texel apart along each axis, in the finest cascade that
/// contains the position and whose value there is below
/// [`GRADIENT_VALIDITY_THRESHOLD`].
///
/// If no cascade qualifies, the returned gradient is the small non-zero
/// [`FILLER_GRADIENT`] and the distance is [`WORLD_SIZE`]. Callers should
/// check [`DistanceGradient::is_valid`] before trusting the direction.
pub fn sample_gradient(
    layout: &CascadeLayout,
    textures: &[CascadeTexture],
    position: &Point3<f32>,
) -> DistanceGradient {
    let texel_offset = layout.texel_offset();

    for (cascade, texture) in layout.active_cascades().iter().zip(textures) {
        let normalized_coords = cascade.normalized_coords(position);
        if !is_within_unit_cube(&normalized_coords) {
            continue;
        }
        let normalized_distance = texture.sample(&normalized_coords);
        if normalized_distance < GRADIENT_VALIDITY_THRESHOLD {
            let max_distance = cascade.max_distance();
            return DistanceGradient {
                gradient: central_difference(texture, &normalized_coords, texel_offset)
                    * max_distance,
                distance: normalized_distance * max_distance,
            };
        }
    }
    DistanceGradient::filler()
}

/// Differences of the texture samples one texel offset ahead and behind the
/// given coordinates along each axis.
pub(crate) fn central_difference(
    texture: &CascadeTexture,
    normalized_coords: &Point3<f32>,
    texel_offset: f32,
) -> Vector3<f32> {
    Vector3::from_fn(|dim, _| {
        let mut ahead = *normalized_coords;
        let mut behind = *normalized_coords;
        ahead[dim] += texel_offset;
        behind[dim] -= texel_offset;
        texture.sample(&ahead) - texture.sample(&behind)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::Cascade,
        test_util::{single_cascade_layout, sphere_distance, texture_from_world_fn},
    };
    use approx::assert_abs_diff_eq;
    use nalgebra::{point, vector};

    fn two_cascade_layout() -> CascadeLayout {
        CascadeLayout::from_cascades(
            &[
                Cascade::new(point![0.0, 0.0, 0.0], 5.0, 0.1),
                Cascade::new(point![0.0, 0.0, 0.0], 10.0, 0.2),
            ],
            32.0,
        )
        .unwrap()
    }

    #[test]
    fn should_return_world_size_without_active_cascades() {
        let layout = CascadeLayout::empty(32.0);
        let textures = [CascadeTexture::uniform(4, 0.0)];
        let position = point![0.0, 0.0, 0.0];

        assert_eq!(sample_distance(&layout, &textures, &position), WORLD_SIZE);

        let gradient = sample_gradient(&layout, &textures, &position);
        assert!(!gradient.is_valid());
        assert_eq!(gradient.distance, WORLD_SIZE);
        assert_eq!(gradient.gradient, Vector3::from(FILLER_GRADIENT));
        assert!(gradient.normal().is_none());
    }

    #[test]
    fn should_return_world_size_outside_all_cascades() {
        let layout = two_cascade_layout();
        let textures = [
            CascadeTexture::uniform(4, 0.1),
            CascadeTexture::uniform(4, 0.1),
        ];
        for position in [
            point![10.5, 0.0, 0.0],
            point![0.0, -12.0, 0.0],
            point![30.0, 30.0, 30.0],
        ] {
            assert_eq!(sample_distance(&layout, &textures, &position), WORLD_SIZE);
            assert!(!sample_gradient(&layout, &textures, &position).is_valid());
        }
    }

    #[test]
    fn should_return_world_size_where_every_cascade_is_unset() {
        let layout = two_cascade_layout();
        let textures = [
            CascadeTexture::uniform(4, 1.0),
            CascadeTexture::uniform(4, 1.5),
        ];
        assert_eq!(
            sample_distance(&layout, &textures, &point![1.0, 2.0, 3.0]),
            WORLD_SIZE
        );
    }

    #[test]
    fn should_prefer_finer_cascade_where_both_are_valid() {
        let layout = two_cascade_layout();
        let textures = [
            CascadeTexture::uniform(4, 0.1),
            CascadeTexture::uniform(4, 0.3),
        ];

        let inside_both = point![1.0, -2.0, 0.5];
        assert_abs_diff_eq!(
            sample_distance(&layout, &textures, &inside_both),
            1.0,
            epsilon = 1e-5
        );
        assert_abs_diff_eq!(
            sample_gradient(&layout, &textures, &inside_both).distance,
            1.0,
            epsilon = 1e-5
        );

        let inside_coarse_only = point![7.0, 0.0, 0.0];
        assert_abs_diff_eq!(
            sample_distance(&layout, &textures, &inside_coarse_only),
            6.0,
            epsilon = 1e-5
        );
        assert_abs_diff_eq!(
            sample_gradient(&layout, &textures, &inside_coarse_only).distance,
            6.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn should_fall_back_to_coarser_cascade_where_finer_is_unset() {
        let layout = two_cascade_layout();
        let textures = [
            CascadeTexture::uniform(4, 1.0),
            CascadeTexture::uniform(4, 0.3),
        ];
        assert_abs_diff_eq!(
            sample_distance(&layout, &textures, &point![0.0, 0.0, 0.0]),
            6.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn should_use_stricter_threshold_for_gradient_than_for_distance() {
        let layout = two_cascade_layout();
        let textures = [
            CascadeTexture::uniform(4, 0.95),
            CascadeTexture::uniform(4, 0.2),
        ];
        let position = point![0.0, 0.0, 0.0];

        assert_abs_diff_eq!(
            sample_distance(&layout, &textures, &position),
            9.5,
            epsilon = 1e-4
        );

        let gradient = sample_gradient(&layout, &textures, &position);
        assert!(gradient.is_valid());
        assert_abs_diff_eq!(gradient.distance, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn should_skip_cascades_without_texture() {
        let layout = two_cascade_layout();
        let textures = [CascadeTexture::uniform(4, 1.0)];
        assert_eq!(
            sample_distance(&layout, &textures, &point![0.0, 0.0, 0.0]),
            WORLD_SIZE
        );
    }

    #[test]
    fn should_approximate_sphere_distance_and_normal() {
        let layout = single_cascade_layout(10.0, 0.3125, 64);
        let cascade = layout.active_cascades()[0];
        let textures = [texture_from_world_fn(
            &cascade,
            64,
            sphere_distance(Point3::origin(), 5.0),
        )];

        let position = point![7.0, 0.0, 0.0];
        assert_abs_diff_eq!(
            sample_distance(&layout, &textures, &position),
            2.0,
            epsilon = 0.05
        );

        let gradient = sample_gradient(&layout, &textures, &position);
        assert!(gradient.is_valid());
        assert_abs_diff_eq!(gradient.distance, 2.0, epsilon = 0.05);
        assert_abs_diff_eq!(
            gradient.normal().unwrap().into_inner(),
            vector![1.0, 0.0, 0.0],
            epsilon = 1e-2
        );

        let inside = point![0.0, -3.0, 0.0];
        assert_abs_diff_eq!(
            sample_distance(&layout, &textures, &inside),
            -2.0,
            epsilon = 0.05
        );
        assert_abs_diff_eq!(
            sample_gradient(&layout, &textures, &inside)
                .normal()
                .unwrap()
                .into_inner(),
            vector![0.0, -1.0, 0.0],
            epsilon = 1e-2
        );
    }
}
