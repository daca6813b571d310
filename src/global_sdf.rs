//! Owned cascaded signed distance field ready for queries.

use crate::{
    layout::CascadeLayout,
    sampler::{self, DistanceGradient},
    texture::CascadeTexture,
    trace::{self, SdfHit, SdfTrace},
};
use anyhow::{Result, bail};
use nalgebra::Point3;
use rayon::prelude::*;

/// A cascade layout together with the precise and flood textures for each of
/// its active cascades.
///
/// The field is immutable once created, so any number of queries may run
/// concurrently against it.
#[derive(Clone, Debug)]
pub struct GlobalSdf {
    layout: CascadeLayout,
    textures: Vec<CascadeTexture>,
    flood_textures: Vec<CascadeTexture>,
}

impl GlobalSdf {
    /// Creates a new field from the given layout and textures.
    ///
    /// # Errors
    /// Returns an error if either texture set does not contain exactly one
    /// texture per active cascade, or if a precise texture does not have the
    /// layout's resolution.
    pub fn new(
        layout: CascadeLayout,
        textures: Vec<CascadeTexture>,
        flood_textures: Vec<CascadeTexture>,
    ) -> Result<Self> {
        let cascade_count = layout.active_count();

        if textures.len() != cascade_count {
            bail!(
                "Got {} precise textures for {} active cascades",
                textures.len(),
                cascade_count
            );
        }
        if flood_textures.len() != cascade_count {
            bail!(
                "Got {} flood textures for {} active cascades",
                flood_textures.len(),
                cascade_count
            );
        }

        for (idx, texture) in textures.iter().enumerate() {
            if texture.resolution() as f32 != layout.resolution() {
                bail!(
                    "Precise texture for cascade {} has resolution {}, but the layout specifies {}",
                    idx,
                    texture.resolution(),
                    layout.resolution()
                );
            }
        }

        log::debug!(
            "Created cascaded SDF with {} cascades at resolution {}",
            cascade_count,
            layout.resolution()
        );

        Ok(Self {
            layout,
            textures,
            flood_textures,
        })
    }

    pub fn layout(&self) -> &CascadeLayout {
        &self.layout
    }

    pub fn textures(&self) -> &[CascadeTexture] {
        &self.textures
    }

    pub fn flood_textures(&self) -> &[CascadeTexture] {
        &self.flood_textures
    }

    /// See [`sampler::sample_distance`].
    pub fn sample_distance(&self, position: &Point3<f32>) -> f32 {
        sampler::sample_distance(&self.layout, &self.textures, position)
    }

    /// See [`sampler::sample_gradient`].
    pub fn sample_gradient(&self, position: &Point3<f32>) -> DistanceGradient {
        sampler::sample_gradient(&self.layout, &self.textures, position)
    }

    /// See [`trace::trace_ray`].
    pub fn trace_ray(&self, trace: &SdfTrace) -> SdfHit {
        trace::trace_ray(&self.layout, &self.textures, &self.flood_textures, trace)
    }

    /// Traces all the given rays in parallel, returning the hits in the same
    /// order as the rays.
    pub fn trace_rays(&self, traces: &[SdfTrace]) -> Vec<SdfHit> {
        log_elapsed!(log::Level::Trace, "Traced {} rays", traces.len(); {
            traces
                .par_iter()
                .map(|trace| self.trace_ray(trace))
                .collect()
        })
    }
}
