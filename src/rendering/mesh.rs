//! メッシュモジュール
//!
//! 三角形メッシュのジオメトリを保持します。ジオメトリは `Rc` で共有され、
//! テンプレートを複製しても頂点データはコピーされません。

use glam::Vec3;

use crate::physics::{BoundingSphere, Ray, Triangle};

/// 三角形メッシュ
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
    bounds: BoundingSphere,
}

impl Mesh {
    /// 頂点とインデックスからメッシュを作成
    ///
    /// 範囲外のインデックスを持つ三角形は取り除かれます。
    pub fn new(positions: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Self {
        let count = positions.len() as u32;
        let indices: Vec<[u32; 3]> = indices
            .into_iter()
            .filter(|tri| tri.iter().all(|i| *i < count))
            .collect();
        let bounds = BoundingSphere::from_points(&positions);

        Self {
            positions,
            indices,
            bounds,
        }
    }

    /// UV球メッシュを作成
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut positions = Vec::new();
        for y in 0..=height_segments {
            let v = y as f32 / height_segments as f32;
            let theta = v * std::f32::consts::PI;
            for x in 0..=width_segments {
                let u = x as f32 / width_segments as f32;
                let phi = u * std::f32::consts::TAU;
                positions.push(Vec3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                ));
            }
        }

        let stride = width_segments + 1;
        let mut indices = Vec::new();
        for y in 0..height_segments {
            for x in 0..width_segments {
                let a = y * stride + x + 1;
                let b = y * stride + x;
                let c = (y + 1) * stride + x;
                let d = (y + 1) * stride + x + 1;
                if y != 0 {
                    indices.push([a, b, d]);
                }
                if y != height_segments - 1 {
                    indices.push([b, c, d]);
                }
            }
        }

        Self::new(positions, indices)
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn bounds(&self) -> BoundingSphere {
        self.bounds
    }

    /// 三角形を列挙
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices.iter().map(move |[a, b, c]| {
            Triangle::new(
                self.positions[*a as usize],
                self.positions[*b as usize],
                self.positions[*c as usize],
            )
        })
    }

    /// ローカル座標のレイとの最も近い交差距離
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        if self.indices.is_empty() {
            return None;
        }
        // 境界球で早期リジェクト
        self.bounds.intersect_ray(ray)?;

        self.triangles()
            .filter_map(|tri| tri.intersect_ray(ray))
            .min_by(|a, b| a.total_cmp(b))
    }
}
