//! 物理モジュール
//!
//! 一定重力下の放物運動と、ピッキング用のレイ交差判定を提供します。
//! 物体同士の衝突応答は扱いません。

use glam::Vec3;

pub mod ray;

pub use ray::{BoundingSphere, Ray, Triangle};

/// 重力加速度（ワールド単位/秒²、Y軸方向）
pub const GRAVITY: f32 = -9.81;

/// 運動状態
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl Kinematics {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self { position, velocity }
    }

    /// 1ステップ積分する（半陰的オイラー法）
    ///
    /// 速度を先に更新し、更新後の速度で位置を進めます。Z成分は変化しません。
    pub fn integrate(&mut self, delta_time: f32) {
        self.velocity.y += GRAVITY * delta_time;

        self.position.x += self.velocity.x * delta_time;
        self.position.y += self.velocity.y * delta_time;
    }
}
