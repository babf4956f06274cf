//! Scene data uploaded verbatim to the sphere and light storage buffers.
//!
//! Layouts mirror the WGSL structs in `raytrace.comp.wgsl` (std430 rules):
//! `Material` 64 bytes, `Sphere` 96 bytes, `PointLight` 32 bytes.

use bytemuck::{Pod, Zeroable};

/// Value written into padding slots so they are recognizable in GPU captures.
pub const PADDING: f32 = -321.123;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub emissive_color: [f32; 4],
    pub diffuse_color: [f32; 4],
    pub specular_color: [f32; 4],
    pub shininess: f32,
    /// 1.0 is opaque; the remainder is transmitted (refracted).
    pub alpha: f32,
    /// Share of the surface's opaque part that is mirrored.
    pub reflectivity: f32,
    pub padding: f32,
}

impl Material {
    const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
    const GREY: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

    /// Matte surface: no highlight, no reflection.
    pub const fn diffuse(r: f32, g: f32, b: f32) -> Self {
        Self {
            emissive_color: Self::BLACK,
            diffuse_color: [r, g, b, 1.0],
            specular_color: Self::BLACK,
            shininess: 0.0,
            alpha: 1.0,
            reflectivity: 0.0,
            padding: PADDING,
        }
    }

    /// Phong surface with a grey highlight of exponent 20.
    pub const fn glossy(r: f32, g: f32, b: f32, alpha: f32, reflectivity: f32) -> Self {
        Self {
            emissive_color: Self::BLACK,
            diffuse_color: [r, g, b, 1.0],
            specular_color: Self::GREY,
            shininess: 20.0,
            alpha,
            reflectivity,
            padding: PADDING,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha < 1.0
    }

    pub fn is_reflective(&self) -> bool {
        self.reflectivity > 0.0
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Sphere {
    /// xyz center, w = 1.
    pub center: [f32; 4],
    pub radius: f32,
    pub padding: [f32; 3],
    pub material: Material,
}

impl Sphere {
    pub const fn new(center: [f32; 3], radius: f32, material: Material) -> Self {
        Self {
            center: [center[0], center[1], center[2], 1.0],
            radius,
            padding: [PADDING; 3],
            material,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    /// xyz position, w = 1.
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl PointLight {
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position: [position[0], position[1], position[2], 1.0],
            color: [color[0], color[1], color[2], 1.0],
        }
    }
}

const _: () = assert!(std::mem::size_of::<Material>() == 64);
const _: () = assert!(std::mem::size_of::<Sphere>() == 96);
const _: () = assert!(std::mem::size_of::<PointLight>() == 32);

/// Spheres and point lights, in upload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub lights: Vec<PointLight>,
}

impl Scene {
    pub const DEMO_SPHERES: usize = 6;
    pub const DEMO_LIGHTS: usize = 1;

    /// Ground plus five spheres (one glass, one mirror, three colored) lit by
    /// a single white light above the camera.
    pub fn demo() -> Self {
        let spheres = vec![
            // Ground: a huge sphere whose top sits at y = -1.
            Sphere::new([0.0, -10001.0, -20.0], 10000.0, Material::diffuse(0.4, 0.4, 0.4)),
            // Transparent
            Sphere::new([0.0, 0.0, -10.0], 1.0, Material::glossy(0.8, 0.8, 0.8, 0.2, 1.0)),
            // Reflective
            Sphere::new([1.0, -0.75, -7.0], 0.25, Material::glossy(0.8, 0.8, 0.8, 1.0, 0.8)),
            // Blue
            Sphere::new([2.0, 1.0, -16.0], 2.0, Material::glossy(0.0, 0.0, 0.8, 1.0, 0.2)),
            // Green
            Sphere::new([-2.0, 0.25, -6.0], 1.25, Material::glossy(0.0, 0.8, 0.0, 1.0, 0.2)),
            // Red
            Sphere::new([3.0, 0.0, -8.0], 1.0, Material::glossy(0.8, 0.0, 0.0, 1.0, 0.2)),
        ];

        let lights = vec![PointLight::new([0.0, 5.0, -5.0], [1.0, 1.0, 1.0])];

        Self { spheres, lights }
    }

    pub fn sphere_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.spheres)
    }

    pub fn light_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.lights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn material_matches_wgsl_offsets() {
        assert_eq!(offset_of!(Material, diffuse_color), 16);
        assert_eq!(offset_of!(Material, specular_color), 32);
        assert_eq!(offset_of!(Material, shininess), 48);
        assert_eq!(offset_of!(Material, reflectivity), 56);
    }

    #[test]
    fn sphere_material_starts_on_16_byte_boundary() {
        assert_eq!(offset_of!(Sphere, radius), 16);
        assert_eq!(offset_of!(Sphere, material), 32);
    }

    #[test]
    fn demo_scene_has_six_spheres_and_one_light() {
        let scene = Scene::demo();
        assert_eq!(scene.spheres.len(), Scene::DEMO_SPHERES);
        assert_eq!(scene.lights.len(), Scene::DEMO_LIGHTS);
        assert_eq!(scene.sphere_bytes().len(), 6 * 96);
        assert_eq!(scene.light_bytes().len(), 32);
    }

    #[test]
    fn ground_top_is_just_below_the_camera() {
        let ground = Scene::demo().spheres[0];
        assert_eq!(ground.center[1] + ground.radius, -1.0);
        assert!(!ground.material.is_reflective());
        assert!(!ground.material.is_transparent());
    }

    #[test]
    fn only_the_glass_sphere_is_transparent() {
        let scene = Scene::demo();
        let transparent: Vec<usize> = scene
            .spheres
            .iter()
            .enumerate()
            .filter(|(_, s)| s.material.is_transparent())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(transparent, vec![1]);
        assert_eq!(scene.spheres[1].material.alpha, 0.2);
    }

    #[test]
    fn padding_slots_carry_sentinel() {
        let s = Scene::demo().spheres[2];
        assert_eq!(s.padding, [PADDING; 3]);
        assert_eq!(s.material.padding, PADDING);
        assert_eq!(s.center[3], 1.0);
    }

    #[test]
    fn light_bytes_are_the_light_not_the_spheres() {
        let scene = Scene::demo();
        let floats: &[f32] = bytemuck::cast_slice(scene.light_bytes());
        assert_eq!(floats, &[0.0, 5.0, -5.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    }
}
