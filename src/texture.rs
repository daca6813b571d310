//! Dense cubic grids of normalized signed distances for a single cascade.

use anyhow::{Result, anyhow, bail};
use nalgebra::Point3;

/// A cubic 3D texture holding one normalized signed distance per texel.
///
/// Texels are stored with the x-index varying fastest, followed by the y- and
/// z-index. Texel `(i, j, k)` is centered at the normalized coordinates
/// `((i + 0.5) / res, (j + 0.5) / res, (k + 0.5) / res)`.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeTexture {
    resolution: usize,
    values: Vec<f32>,
}

impl CascadeTexture {
    /// Creates a texture with the given number of texels along each axis from
    /// the given texel values.
    ///
    /// # Errors
    /// Returns an error if the resolution is zero or the number of values does
    /// not equal the cube of the resolution.
    pub fn new(resolution: usize, values: Vec<f32>) -> Result<Self> {
        let texel_count = texel_count(resolution)?;
        if values.len() != texel_count {
            bail!(
                "Got {} texel values for cascade texture with resolution {} (expected {})",
                values.len(),
                resolution,
                texel_count
            );
        }
        Ok(Self { resolution, values })
    }

    /// Creates a texture where every texel has the given value.
    ///
    /// # Panics
    /// If the resolution is zero or its cube overflows `usize`.
    pub fn uniform(resolution: usize, value: f32) -> Self {
        let texel_count = texel_count(resolution).unwrap_or_else(|err| panic!("{err}"));
        Self {
            resolution,
            values: vec![value; texel_count],
        }
    }

    /// Creates a texture by evaluating the given closure at the normalized
    /// coordinates of each texel center.
    ///
    /// # Panics
    /// If the resolution is zero or its cube overflows `usize`.
    pub fn from_fn(resolution: usize, mut value_at: impl FnMut(Point3<f32>) -> f32) -> Self {
        let texel_count = texel_count(resolution).unwrap_or_else(|err| panic!("{err}"));

        let texel_extent = (resolution as f32).recip();
        let center_coord = |idx: usize| (idx as f32 + 0.5) * texel_extent;

        let mut values = Vec::with_capacity(texel_count);
        for k in 0..resolution {
            for j in 0..resolution {
                for i in 0..resolution {
                    values.push(value_at(Point3::new(
                        center_coord(i),
                        center_coord(j),
                        center_coord(k),
                    )));
                }
            }
        }

        Self { resolution, values }
    }

    /// Creates a texture from raw little-endian `f32` texel data.
    ///
    /// # Errors
    /// Returns an error if the resolution is zero or the byte count does not
    /// match the resolution.
    pub fn from_le_bytes(resolution: usize, bytes: &[u8]) -> Result<Self> {
        let expected_len = texel_count(resolution)?
            .checked_mul(size_of::<f32>())
            .ok_or_else(|| anyhow!("Cascade texture resolution {} is too large", resolution))?;
        if bytes.len() != expected_len {
            bail!(
                "Got {} bytes of texel data for cascade texture with resolution {} (expected {})",
                bytes.len(),
                resolution,
                expected_len
            );
        }

        let values = bytes
            .chunks_exact(size_of::<f32>())
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Self { resolution, values })
    }

    /// Encodes the texel values as raw little-endian `f32` data.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.values
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }

    /// The number of texels along each axis.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the value of the texel at the given indices, or [`None`] if
    /// any index is out of bounds.
    pub fn texel(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        if i < self.resolution && j < self.resolution && k < self.resolution {
            Some(self.values[self.linear_idx(i, j, k)])
        } else {
            None
        }
    }

    /// Samples the texture at the given normalized coordinates using
    /// trilinear interpolation between texel centers. Coordinates outside the
    /// unit cube are clamped to the edge texels.
    pub fn sample(&self, normalized_coords: &Point3<f32>) -> f32 {
        let resolution = self.resolution as f32;
        let max_idx = (self.resolution - 1) as f32;

        let mut lower = [0; 3];
        let mut upper = [0; 3];
        let mut weights = [0.0; 3];

        for dim in 0..3 {
            let coord = normalized_coords[dim] * resolution - 0.5;
            let floored = coord.floor();
            weights[dim] = coord - floored;
            lower[dim] = floored.clamp(0.0, max_idx) as usize;
            upper[dim] = (floored + 1.0).clamp(0.0, max_idx) as usize;
        }

        let value = |i: usize, j: usize, k: usize| self.values[self.linear_idx(i, j, k)];
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let [wx, wy, wz] = weights;

        let v00 = lerp(
            value(lower[0], lower[1], lower[2]),
            value(upper[0], lower[1], lower[2]),
            wx,
        );
        let v10 = lerp(
            value(lower[0], upper[1], lower[2]),
            value(upper[0], upper[1], lower[2]),
            wx,
        );
        let v01 = lerp(
            value(lower[0], lower[1], upper[2]),
            value(upper[0], lower[1], upper[2]),
            wx,
        );
        let v11 = lerp(
            value(lower[0], upper[1], upper[2]),
            value(upper[0], upper[1], upper[2]),
            wx,
        );

        lerp(lerp(v00, v10, wy), lerp(v01, v11, wy), wz)
    }

    fn linear_idx(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.resolution + j) * self.resolution + i
    }
}

fn texel_count(resolution: usize) -> Result<usize> {
    if resolution == 0 {
        bail!("Cascade texture resolution must be positive");
    }
    resolution
        .checked_pow(3)
        .ok_or_else(|| anyhow!("Cascade texture resolution {} is too large", resolution))
}
