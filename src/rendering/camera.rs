//! カメラモジュール
//!
//! 透視投影カメラを管理します。
//! ワールド座標から正規化デバイス座標（NDC）への変換と、
//! ポインタ位置からのレイ生成を提供します。

use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;
use crate::physics::Ray;

/// 透視投影カメラ
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    /// 垂直視野角（ラジアン）
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl PerspectiveCamera {
    /// 新しいカメラを作成（原点から -Z を向く）
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y: fov_degrees.to_radians(),
            aspect: sanitize_aspect(aspect),
            near,
            far,
        }
    }

    /// 設定からカメラを作成
    ///
    /// `(0, height, distance)` に置き、同じ高さの原点上の点を注視します。
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(config.fov_degrees, aspect, config.near, config.far);
        camera.set_position(Vec3::new(0.0, config.height, config.distance));
        camera.look_at(Vec3::new(0.0, config.height, 0.0));
        camera
    }

    /// カメラの位置を設定
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// 注視点を設定
    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// アスペクト比を設定（画面サイズ変更時）
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = sanitize_aspect(aspect);
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// ワールド座標をNDCに変換
    pub fn world_to_ndc(&self, point: Vec3) -> Vec3 {
        self.view_projection().project_point3(point)
    }

    /// NDCのポインタ位置を通るレイを生成
    ///
    /// 始点はカメラ位置です。方向はビュー空間で近平面上の点へ向かうベクトルを求め、
    /// ワールド空間へ回転させます。
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let view_direction = self.projection_matrix().inverse().project_point3(ndc.extend(-1.0));
        let direction = self.view_matrix().inverse().transform_vector3(view_direction);
        Ray::new(self.position, direction)
    }
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}
