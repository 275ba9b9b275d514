//! レイと基本図形の交差判定
//!
//! レイ・球、レイ・三角形（Möller-Trumbore）の交差判定を提供します。

use glam::{Mat4, Vec3};

/// ピッキング用のレイ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// 始点（ワールド座標）
    pub origin: Vec3,
    /// 方向（正規化済み）
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// レイ上の距離 t の点
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// 行列でレイを変換する
    ///
    /// 方向は正規化し直すので、変換後の距離は変換前と一致しません。
    pub fn transformed(&self, matrix: &Mat4) -> Ray {
        let origin = matrix.transform_point3(self.origin);
        let direction = matrix.transform_vector3(self.direction);
        Ray::new(origin, direction)
    }
}

/// 境界球
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// 点群を包む境界球（AABBの中心と最大距離）
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::new(Vec3::ZERO, 0.0);
        }

        let (min, max) = points.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), p| (min.min(*p), max.max(*p)),
        );
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);

        Self::new(center, radius)
    }

    /// レイとの交差距離（始点が内部なら 0）
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;

        // 始点が球の内部
        if c <= 0.0 {
            return Some(0.0);
        }
        // 球から遠ざかる方向
        if b > 0.0 {
            return None;
        }

        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        Some(-b - discriminant.sqrt())
    }
}

/// 三角形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// 法線（右手系）
    pub fn normal(&self) -> Vec3 {
        (self.v1 - self.v0).cross(self.v2 - self.v0).normalize_or_zero()
    }

    /// Möller-Trumbore 法で交差距離を求める（両面判定）
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        const EPSILON: f32 = 1e-7;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);
        // レイが三角形と平行
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if t >= 0.0 {
            Some(t)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_direction_is_normalized() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0));
        assert_relative_eq!(ray.direction.length(), 1.0, epsilon = 1e-6);
        assert_eq!(ray.point_at(2.0), Vec3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn test_sphere_hit_and_miss() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 2.0);

        let hit = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert_relative_eq!(sphere.intersect_ray(&hit).unwrap(), 8.0, epsilon = 1e-5);

        let miss = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z);
        assert!(sphere.intersect_ray(&miss).is_none());

        let behind = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(sphere.intersect_ray(&behind).is_none());

        let inside = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::X);
        assert_eq!(sphere.intersect_ray(&inside), Some(0.0));
    }

    #[test]
    fn test_bounding_sphere_from_points() {
        let points = [Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 0.0)];
        let sphere = BoundingSphere::from_points(&points);
        assert_eq!(sphere.center, Vec3::new(1.0, 1.0, 0.0));
        for p in points {
            assert!(p.distance(sphere.center) <= sphere.radius + 1e-6);
        }
    }

    #[test]
    fn test_triangle_hit_both_faces() {
        let tri = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );

        let front = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert_relative_eq!(tri.intersect_ray(&front).unwrap(), 5.0, epsilon = 1e-5);

        let back = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert_relative_eq!(tri.intersect_ray(&back).unwrap(), 5.0, epsilon = 1e-5);

        let outside = Ray::new(Vec3::new(2.0, 2.0, 5.0), Vec3::NEG_Z);
        assert!(tri.intersect_ray(&outside).is_none());

        let parallel = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::X);
        assert!(tri.intersect_ray(&parallel).is_none());
    }

    #[test]
    fn test_ray_transform() {
        let translate = Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::X).transformed(&translate);
        assert_eq!(ray.origin, Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(ray.direction, Vec3::X);
    }
}
