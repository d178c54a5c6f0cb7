pub use glam::Vec3;

/// Axis-aligned horizontal extent of a room (x/z plane).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl HorizontalBounds {
    /// Bounds of a box centered on `center` with full extents `size`, shrunk by the
    /// given wall margins so a body standing inside never clips a wall.
    pub fn from_center_size(center: Vec3, size: Vec3, margin_x: f32, margin_z: f32) -> Self {
        let half_x = size.x / 2.0;
        let half_z = size.z / 2.0;
        Self {
            min_x: center.x - half_x + margin_x,
            max_x: center.x + half_x - margin_x,
            min_z: center.z - half_z + margin_z,
            max_z: center.z + half_z - margin_z,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.z >= self.min_z
            && point.z <= self.max_z
    }

    pub fn clamp(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(self.min_x, self.max_x),
            point.y,
            point.z.clamp(self.min_z, self.max_z),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_apply_wall_margins() {
        let bounds = HorizontalBounds::from_center_size(
            Vec3::new(0.0, 0.0, -15.0),
            Vec3::new(9.2, 8.0, 13.2),
            0.7,
            0.9,
        );
        assert!((bounds.min_x - (-3.9)).abs() < 1e-5);
        assert!((bounds.max_x - 3.9).abs() < 1e-5);
        assert!((bounds.min_z - (-20.7)).abs() < 1e-5);
        assert!((bounds.max_z - (-9.3)).abs() < 1e-5);
    }

    #[test]
    fn clamp_keeps_height_and_pulls_point_inside() {
        let bounds = HorizontalBounds {
            min_x: -1.0,
            max_x: 1.0,
            min_z: -2.0,
            max_z: 2.0,
        };
        let clamped = bounds.clamp(Vec3::new(5.0, 1.7, -9.0));
        assert_eq!(clamped, Vec3::new(1.0, 1.7, -2.0));
        assert!(bounds.contains(clamped));
        assert!(!bounds.contains(Vec3::new(1.5, 0.0, 0.0)));
    }
}
