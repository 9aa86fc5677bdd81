use glam::{Quat, Vec3};
use rayon::prelude::*;

use crate::error::{RenderError, Result};
use crate::geometry::Ray;

/// Projection model used to generate rays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Shared origin, per-pixel direction. Vertical field of view in degrees.
    Perspective { fov_y_degrees: f32 },
    /// Shared direction, per-pixel origin. Half-height of the view volume.
    Orthographic { size: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective { fov_y_degrees: 60.0 }
    }
}

/// Ray casting camera. Local forward is +Z, right is +X, up is +Y.
///
/// Owns the CPU ray buffer; its length always equals `width * height`.
pub struct Camera {
    pub position: Vec3,
    pub orientation: Quat,
    pub projection: Projection,
    /// RGBA written where no triangle is hit.
    pub background_color: [f32; 4],

    width: u32,
    height: u32,
    /// Set by `set_display_size`; the camera resolution stands in until then.
    display_size: Option<(u32, u32)>,
    rays: Vec<Ray>,
}

const DEFAULT_WIDTH: u32 = 256;
const DEFAULT_HEIGHT: u32 = 256;

impl Default for Camera {
    fn default() -> Self {
        Self::with_valid_resolution(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        validate_dimensions(width, height)?;
        Ok(Self::with_valid_resolution(width, height))
    }

    fn with_valid_resolution(width: u32, height: u32) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            projection: Projection::default(),
            background_color: [49.0 / 255.0, 77.0 / 255.0, 121.0 / 255.0, 0.0],
            width,
            height,
            display_size: None,
            rays: vec![Ray::default(); width as usize * height as usize],
        }
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) -> Result<()> {
        validate_dimensions(width, height)?;
        self.width = width;
        self.height = height;
        self.rays.resize(width as usize * height as usize, Ray::default());
        Ok(())
    }

    /// Resolution of the display the image is shown on. Only the
    /// perspective aspect ratio reads it.
    pub fn set_display_size(&mut self, width: u32, height: u32) -> Result<()> {
        validate_dimensions(width, height)?;
        self.display_size = Some((width, height));
        Ok(())
    }

    /// Follows the camera resolution again after `set_display_size`.
    pub fn clear_display_size(&mut self) {
        self.display_size = None;
    }

    /// Display size used for the perspective aspect ratio.
    pub fn display_size(&self) -> (u32, u32) {
        self.display_size.unwrap_or((self.width, self.height))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.rays.len()
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    /// Fills the ray buffer, pixel (x, y) at `y * width + x`.
    pub fn compute_rays(&mut self) {
        let width = self.width as usize;
        let inv_w = 1.0 / self.width as f32;
        let inv_h = 1.0 / self.height as f32;
        let position = self.position;
        let orientation = self.orientation;

        match self.projection {
            Projection::Perspective { fov_y_degrees } => {
                let offset_scale = (fov_y_degrees.to_radians() * 0.5).tan();
                // A low-resolution image stretched over the display keeps
                // the display's proportions.
                let (display_width, display_height) = self.display_size();
                let aspect = display_width as f32 / display_height as f32;

                self.rays
                    .par_chunks_mut(width)
                    .enumerate()
                    .for_each(|(y, row)| {
                        let ndc_y = pixel_to_ndc(y, inv_h);
                        for (x, ray) in row.iter_mut().enumerate() {
                            let ndc_x = pixel_to_ndc(x, inv_w);
                            let local =
                                Vec3::new(ndc_x * offset_scale * aspect, ndc_y * offset_scale, 1.0);
                            *ray = Ray::new(position, orientation * local.normalize());
                        }
                    });
            }
            Projection::Orthographic { size } => {
                let aspect = self.width as f32 * inv_h;
                let direction = orientation * Vec3::Z;

                self.rays
                    .par_chunks_mut(width)
                    .enumerate()
                    .for_each(|(y, row)| {
                        let ndc_y = pixel_to_ndc(y, inv_h);
                        for (x, ray) in row.iter_mut().enumerate() {
                            let ndc_x = pixel_to_ndc(x, inv_w);
                            let local = Vec3::new(ndc_x * aspect * size, ndc_y * size, 0.0);
                            *ray = Ray::new(position + orientation * local, direction);
                        }
                    });
            }
        }
    }
}

// Pixel center in [0, 1], then remapped to [-1, 1].
fn pixel_to_ndc(i: usize, inv_extent: f32) -> f32 {
    (i as f32 + 0.5) * inv_extent * 2.0 - 1.0
}

fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    Ok(())
}
