use glam::{Mat4, Vec2};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Orthographic camera over a y-down world: +y points toward the bottom of
/// the screen, matching the physics convention that negative vertical
/// velocity moves upward.
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            viewport: (viewport_width, viewport_height),
        }
    }

    /// Camera whose view covers exactly `(0, 0)..(width, height)` in world units.
    pub fn fit_world(width: u32, height: u32) -> Self {
        let mut camera = Self::new(width, height);
        camera.position = Vec2::new(width as f32 * 0.5, height as f32 * 0.5);
        camera
    }

    pub fn view_proj(&self) -> Mat4 {
        let half_w = (self.viewport.0 as f32) / (2.0 * self.zoom);
        let half_h = (self.viewport.1 as f32) / (2.0 * self.zoom);

        // bottom/top swapped relative to a y-up camera
        Mat4::orthographic_rh(
            self.position.x - half_w,
            self.position.x + half_w,
            self.position.y + half_h,
            self.position.y - half_h,
            -1.0,
            1.0,
        )
    }

    pub fn build_uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_proj().to_cols_array_2d(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn fit_world_maps_world_corners_to_clip_corners() {
        let camera = Camera2D::fit_world(800, 600);
        let m = camera.view_proj();

        let top_left = m.project_point3(Vec3::new(0.0, 0.0, 0.0));
        assert!((top_left.x + 1.0).abs() < 1e-5);
        assert!((top_left.y - 1.0).abs() < 1e-5);

        let bottom_right = m.project_point3(Vec3::new(800.0, 600.0, 0.0));
        assert!((bottom_right.x - 1.0).abs() < 1e-5);
        assert!((bottom_right.y + 1.0).abs() < 1e-5);
    }
}
