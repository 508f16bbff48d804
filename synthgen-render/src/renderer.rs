//! Rendering engine
//!
//! [`SoftwareRenderer`] is a z-buffered triangle rasterizer with flat Lambert
//! shading from point lights. Shading runs on the rayon pool; rasterization
//! is sequential.

use image::RgbImage;
use rayon::prelude::*;
use std::f32::consts::PI;
use synthgen_core::{Color, Error, Point3f, Result, Scene, Vector3f};
use synthgen_io::ShadingConfig;
use tracing::trace;

/// Renderer settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Fraction of the surface color visible without direct light
    pub ambient: f32,
    pub background: Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        ShadingConfig::default().into()
    }
}

impl From<ShadingConfig> for RenderConfig {
    fn from(shading: ShadingConfig) -> Self {
        Self {
            ambient: shading.ambient,
            background: shading.background,
        }
    }
}

/// Turns the current state of a scene into an image
pub trait Renderer {
    fn render(&mut self, scene: &Scene) -> Result<RgbImage>;
}

/// A triangle ready for rasterization
struct ScreenTriangle {
    /// Pixel x, pixel y and NDC depth of each corner
    corners: [Point3f; 3],
    color: Color,
}

/// CPU rasterizer
#[derive(Debug, Clone, Default)]
pub struct SoftwareRenderer {
    pub config: RenderConfig,
}

impl SoftwareRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Project every renderable triangle and shade it
    fn prepare(&self, scene: &Scene) -> Result<Vec<ScreenTriangle>> {
        let camera = &scene.camera;
        let view_projection = camera.view_projection();
        let (width, height) = (camera.resolution.width as f32, camera.resolution.height as f32);

        let mut world_triangles = Vec::new();
        for (index, object) in scene.objects.iter().enumerate() {
            if !object.renderable {
                continue;
            }
            let mesh = scene.world_mesh(index)?;
            world_triangles.extend(mesh.triangles().map(|t| (t, object.color)));
        }

        let triangles = world_triangles
            .par_iter()
            .filter_map(|(world, color)| {
                let mut corners = [Point3f::origin(); 3];
                for (corner, vertex) in corners.iter_mut().zip(world.iter()) {
                    let clip = view_projection * vertex.to_homogeneous();
                    // Triangles crossing the near plane are dropped rather than clipped
                    if clip.w < camera.near {
                        return None;
                    }
                    let ndc = clip.xyz() / clip.w;
                    *corner = Point3f::new(
                        (ndc.x + 1.0) * 0.5 * width,
                        (1.0 - (ndc.y + 1.0) * 0.5) * height,
                        ndc.z,
                    );
                }
                Some(ScreenTriangle {
                    corners,
                    color: self.shade(scene, world, *color),
                })
            })
            .collect();
        Ok(triangles)
    }

    /// Flat Lambert shading at the triangle centroid, lit from both sides
    fn shade(&self, scene: &Scene, world: &[Point3f; 3], base: Color) -> Color {
        let [a, b, c] = world;
        let centroid = Point3f::from((a.coords + b.coords + c.coords) / 3.0);
        let mut normal = (b - a).cross(&(c - a));
        if normal.norm() <= f32::EPSILON {
            return base.scale(self.config.ambient);
        }
        normal.normalize_mut();
        if normal.dot(&(scene.camera.pose.position - centroid)) < 0.0 {
            normal = -normal;
        }

        let mut color = base.scale(self.config.ambient);
        for light in &scene.lights {
            let to_light: Vector3f = light.position - centroid;
            let distance_squared = to_light.norm_squared().max(1e-6);
            let cosine = normal.dot(&to_light.normalize()).max(0.0);
            let irradiance = light.intensity * cosine / (4.0 * PI * distance_squared);
            color = color + base.modulate(light.color).scale(irradiance);
        }
        color
    }
}

impl Renderer for SoftwareRenderer {
    fn render(&mut self, scene: &Scene) -> Result<RgbImage> {
        let resolution = scene.camera.resolution;
        let (width, height) = (resolution.width as usize, resolution.height as usize);
        if width == 0 || height == 0 {
            return Err(Error::Render(format!(
                "cannot render a {}x{} image",
                resolution.width, resolution.height
            )));
        }

        let triangles = self.prepare(scene)?;
        let mut depth = vec![f32::INFINITY; width * height];
        let mut pixels = vec![self.config.background; width * height];

        for triangle in &triangles {
            rasterize(triangle, width, height, &mut depth, &mut pixels);
        }
        trace!(triangles = triangles.len(), width, height, "Rasterized frame");

        let bytes: Vec<u8> = pixels.par_iter().flat_map_iter(|c| c.to_rgb8()).collect();
        RgbImage::from_raw(resolution.width, resolution.height, bytes)
            .ok_or_else(|| Error::Render("pixel buffer does not match the resolution".to_string()))
    }
}

fn edge(a: &Point3f, b: &Point3f, x: f32, y: f32) -> f32 {
    (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x)
}

/// Fill the pixels whose centers the triangle covers, nearest surface wins
fn rasterize(
    triangle: &ScreenTriangle,
    width: usize,
    height: usize,
    depth: &mut [f32],
    pixels: &mut [Color],
) {
    let [a, b, c] = &triangle.corners;
    let area = edge(a, b, c.x, c.y);
    if area.abs() <= f32::EPSILON {
        return;
    }

    let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as usize;
    let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as usize;
    let max_x = (a.x.max(b.x).max(c.x).ceil().max(0.0) as usize).min(width);
    let max_y = (a.y.max(b.y).max(c.y).ceil().max(0.0) as usize).min(height);

    for y in min_y..max_y {
        for x in min_x..max_x {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b, c, px, py) / area;
            let w1 = edge(c, a, px, py) / area;
            let w2 = edge(a, b, px, py) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let z = w0 * a.z + w1 * b.z + w2 * c.z;
            let index = y * width + x;
            if z < depth[index] {
                depth[index] = z;
                pixels[index] = triangle.color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synthgen_core::{Light, SceneObject, TriangleMesh};

    fn lit_cube_scene() -> Scene {
        let mut scene = Scene::default();
        scene.camera.resolution = synthgen_core::Resolution::new(64, 48);
        let mut cube = SceneObject::new("cube", TriangleMesh::cube(2.0));
        cube.color = Color::new(1.0, 0.0, 0.0);
        scene.add_object(cube);
        scene.add_light(Light::new("key", Point3f::new(0.0, 0.0, 4.0), 1000.0));
        scene
    }

    #[test]
    fn test_render_dimensions_and_background() {
        let mut renderer = SoftwareRenderer::default();
        let image = renderer.render(&lit_cube_scene()).unwrap();
        assert_eq!(image.dimensions(), (64, 48));
        let corner = image.get_pixel(0, 0);
        assert_eq!(corner.0, renderer.config.background.to_rgb8());
    }

    #[test]
    fn test_lit_face_is_red() {
        let mut renderer = SoftwareRenderer::default();
        let image = renderer.render(&lit_cube_scene()).unwrap();
        let center = image.get_pixel(32, 24).0;
        assert!(center[0] > 200, "center pixel {:?}", center);
        assert_eq!(center[1], 0);
        assert_eq!(center[2], 0);
    }

    #[test]
    fn test_hidden_objects_are_not_drawn() {
        let mut scene = lit_cube_scene();
        scene.objects[0].renderable = false;
        let mut renderer = SoftwareRenderer::default();
        let image = renderer.render(&scene).unwrap();
        let background = renderer.config.background.to_rgb8();
        assert!(image.pixels().all(|p| p.0 == background));
    }

    #[test]
    fn test_nearer_surface_wins() {
        let mut scene = lit_cube_scene();
        let mut front = SceneObject::new("front", TriangleMesh::quad(0.5, 0.5));
        front.color = Color::new(0.0, 0.0, 1.0);
        front.pose.position = Point3f::new(0.0, 0.0, 2.0);
        scene.add_object(front);
        let mut renderer = SoftwareRenderer::default();
        let center = renderer.render(&scene).unwrap().get_pixel(32, 24).0;
        assert_eq!(center[0], 0);
        assert!(center[2] > 0);
    }

    #[test]
    fn test_object_behind_camera_is_skipped() {
        let mut scene = lit_cube_scene();
        scene.objects[0].pose.position = Point3f::new(0.0, 0.0, 20.0);
        let mut renderer = SoftwareRenderer::default();
        let image = renderer.render(&scene).unwrap();
        let background = renderer.config.background.to_rgb8();
        assert!(image.pixels().all(|p| p.0 == background));
    }
}
