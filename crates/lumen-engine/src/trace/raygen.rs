//! Primary ray generation on the CPU.
//!
//! Buffers are row-major with the top image row first, matching the compute
//! shader's `global_invocation_id` and the storage texture's origin.
//! Each direction occupies `3 + padding` floats; padding floats are zero.

use glam::{Mat3, Vec3};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RayGenError {
    #[error("image size must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("vertical field of view must be within (0, 180) degrees, got {0}")]
    FieldOfView(f32),

    #[error("direction buffer holds {actual} floats, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("camera basis is degenerate (eye equals center, or up is parallel to the view direction)")]
    DegenerateCamera,
}

/// Floats per direction entry.
#[inline]
pub const fn direction_stride(padding: usize) -> usize {
    3 + padding
}

/// Origins and world-space directions of every primary ray.
#[derive(Debug, Clone, PartialEq)]
pub struct RayOrigins {
    /// Four floats per pixel: eye xyz, w = 1.
    pub positions: Vec<f32>,
    /// `3 + padding` floats per pixel.
    pub directions: Vec<f32>,
}

/// Unit directions through every pixel center of a camera at the origin
/// looking down −Z with +Y up.
pub fn perspective_directions(
    fov_y_degrees: f32,
    width: u32,
    height: u32,
    padding: usize,
) -> Result<Vec<f32>, RayGenError> {
    if width == 0 || height == 0 {
        return Err(RayGenError::EmptyImage { width, height });
    }
    if !(fov_y_degrees > 0.0 && fov_y_degrees < 180.0) {
        return Err(RayGenError::FieldOfView(fov_y_degrees));
    }

    let stride = direction_stride(padding);
    let aspect = width as f32 / height as f32;
    let half_h = (fov_y_degrees.to_radians() * 0.5).tan();
    let half_w = half_h * aspect;

    let mut out = vec![0.0f32; width as usize * height as usize * stride];

    for y in 0..height {
        let v = (1.0 - 2.0 * (y as f32 + 0.5) / height as f32) * half_h;
        for x in 0..width {
            let u = (2.0 * (x as f32 + 0.5) / width as f32 - 1.0) * half_w;
            let dir = Vec3::new(u, v, -1.0).normalize();

            let base = (y as usize * width as usize + x as usize) * stride;
            out[base..base + 3].copy_from_slice(&dir.to_array());
        }
    }

    Ok(out)
}

/// Rotates camera-space `directions` into the frame of a camera at `eye`
/// looking at `center`, and places every ray origin at `eye`.
pub fn look_at(
    directions: &[f32],
    padding: usize,
    width: u32,
    height: u32,
    eye: Vec3,
    center: Vec3,
    up: Vec3,
) -> Result<RayOrigins, RayGenError> {
    let stride = direction_stride(padding);
    let pixels = width as usize * height as usize;
    let expected = pixels * stride;
    if directions.len() != expected {
        return Err(RayGenError::BufferSize {
            expected,
            actual: directions.len(),
        });
    }

    let rotation = camera_basis(eye, center, up)?;

    let mut rotated = directions.to_vec();
    for entry in rotated.chunks_exact_mut(stride) {
        let d = rotation * Vec3::new(entry[0], entry[1], entry[2]);
        entry[..3].copy_from_slice(&d.to_array());
    }

    let origin = [eye.x, eye.y, eye.z, 1.0];
    let positions = origin.repeat(pixels);

    Ok(RayOrigins {
        positions,
        directions: rotated,
    })
}

/// Columns are the camera's right, up and backward axes in world space.
fn camera_basis(eye: Vec3, center: Vec3, up: Vec3) -> Result<Mat3, RayGenError> {
    let forward = (center - eye).try_normalize().ok_or(RayGenError::DegenerateCamera)?;
    let right = forward.cross(up).try_normalize().ok_or(RayGenError::DegenerateCamera)?;
    let true_up = right.cross(forward);
    Ok(Mat3::from_cols(right, true_up, -forward))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn dir_at(buf: &[f32], padding: usize, width: u32, x: u32, y: u32) -> Vec3 {
        let stride = direction_stride(padding);
        let i = (y as usize * width as usize + x as usize) * stride;
        Vec3::new(buf[i], buf[i + 1], buf[i + 2])
    }

    #[test]
    fn single_pixel_looks_straight_ahead() {
        let buf = perspective_directions(30.0, 1, 1, 1).unwrap();
        assert_eq!(buf.len(), 4);
        assert!((Vec3::new(buf[0], buf[1], buf[2]) - Vec3::NEG_Z).length() < EPS);
        assert_eq!(buf[3], 0.0);
    }

    #[test]
    fn buffer_has_stride_and_zero_padding() {
        let (w, h) = (8, 6);
        let buf = perspective_directions(30.0, w, h, 1).unwrap();
        assert_eq!(buf.len(), (w * h * 4) as usize);
        assert!(buf.chunks_exact(4).all(|c| c[3] == 0.0));

        let wide = perspective_directions(30.0, w, h, 3).unwrap();
        assert_eq!(wide.len(), (w * h * 6) as usize);
    }

    #[test]
    fn every_direction_is_unit_length_and_forward() {
        let buf = perspective_directions(30.0, 64, 48, 1).unwrap();
        for c in buf.chunks_exact(4) {
            let d = Vec3::new(c[0], c[1], c[2]);
            assert!((d.length() - 1.0).abs() < EPS);
            assert!(d.z < 0.0);
        }
    }

    #[test]
    fn top_row_points_up_and_left_column_points_left() {
        let (w, h) = (640, 480);
        let buf = perspective_directions(30.0, w, h, 1).unwrap();
        let top_left = dir_at(&buf, 1, w, 0, 0);
        let bottom_right = dir_at(&buf, 1, w, w - 1, h - 1);
        assert!(top_left.y > 0.0 && top_left.x < 0.0);
        assert!(bottom_right.y < 0.0 && bottom_right.x > 0.0);
        assert!((top_left + bottom_right).truncate().length() < EPS);
    }

    #[test]
    fn vertical_extent_matches_field_of_view() {
        let (w, h) = (4, 1000);
        let buf = perspective_directions(30.0, w, h, 0).unwrap();
        let top = dir_at(&buf, 0, w, 0, 0);
        let angle = (top.y / -top.z).atan().to_degrees();
        // Pixel centers sit half a pixel inside the frustum edge.
        assert!((angle - 15.0).abs() < 0.05, "angle = {angle}");
    }

    #[test]
    fn rejects_empty_image_and_bad_fov() {
        assert_eq!(
            perspective_directions(30.0, 0, 480, 1),
            Err(RayGenError::EmptyImage { width: 0, height: 480 })
        );
        assert_eq!(perspective_directions(0.0, 2, 2, 1), Err(RayGenError::FieldOfView(0.0)));
        assert_eq!(perspective_directions(180.0, 2, 2, 1), Err(RayGenError::FieldOfView(180.0)));
        assert!(matches!(
            perspective_directions(f32::NAN, 2, 2, 1),
            Err(RayGenError::FieldOfView(_))
        ));
    }

    #[test]
    fn default_camera_is_identity() {
        let (w, h) = (16, 12);
        let dirs = perspective_directions(30.0, w, h, 1).unwrap();
        let rays = look_at(&dirs, 1, w, h, Vec3::ZERO, Vec3::NEG_Z, Vec3::Y).unwrap();

        for (a, b) in rays.directions.iter().zip(&dirs) {
            assert!((a - b).abs() < EPS);
        }
        assert_eq!(rays.positions.len(), (w * h * 4) as usize);
        assert!(rays.positions.chunks_exact(4).all(|p| p == [0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn look_at_rotates_and_positions_at_eye() {
        let dirs = perspective_directions(30.0, 1, 1, 1).unwrap();
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let rays = look_at(&dirs, 1, 1, 1, eye, eye + Vec3::X, Vec3::Y).unwrap();

        let d = Vec3::new(rays.directions[0], rays.directions[1], rays.directions[2]);
        assert!((d - Vec3::X).length() < EPS);
        assert_eq!(rays.directions[3], 0.0);
        assert_eq!(rays.positions, vec![1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn look_at_rejects_degenerate_input() {
        let dirs = perspective_directions(30.0, 2, 2, 1).unwrap();
        assert_eq!(
            look_at(&dirs, 1, 2, 2, Vec3::ZERO, Vec3::ZERO, Vec3::Y),
            Err(RayGenError::DegenerateCamera)
        );
        assert_eq!(
            look_at(&dirs, 1, 2, 2, Vec3::ZERO, Vec3::Y, Vec3::Y),
            Err(RayGenError::DegenerateCamera)
        );
        assert_eq!(
            look_at(&dirs[..8], 1, 2, 2, Vec3::ZERO, Vec3::NEG_Z, Vec3::Y),
            Err(RayGenError::BufferSize { expected: 16, actual: 8 })
        );
    }
}
