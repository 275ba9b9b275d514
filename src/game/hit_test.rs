//! 当たり判定モジュール
//!
//! ポインタが押されている間、毎フレームカメラからポインタ方向へレイを飛ばし、
//! 当たった落下オブジェクトをすべて切ります。

use glam::{Mat4, Vec2};

use super::entities::ObjectRef;
use crate::input::PointerEvent;
use crate::rendering::PerspectiveCamera;

/// ポインタの状態と切った数を保持する当たり判定
#[derive(Debug, Default, Clone)]
pub struct HitTester {
    active: bool,
    /// 正規化済みのポインタ位置（-1〜1、上が正）
    pointer: Vec2,
    kills: u32,
}

impl HitTester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_down(&mut self) {
        self.active = true;
    }

    pub fn pointer_up(&mut self) {
        self.active = false;
    }

    pub fn pointer_move(&mut self, ndc: Vec2) {
        self.pointer = ndc;
    }

    /// 入力イベントを反映
    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down => self.pointer_down(),
            PointerEvent::Up => self.pointer_up(),
            PointerEvent::Move(ndc) => self.pointer_move(ndc),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// これまでに切った数
    pub fn kills(&self) -> u32 {
        self.kills
    }

    /// レイを飛ばして当たったオブジェクトを切る
    ///
    /// 丸ごとのモデルとその子ノードを判定します。新たに切った数を返します。
    pub fn run(&mut self, camera: &PerspectiveCamera, objects: &[ObjectRef]) -> usize {
        if !self.active {
            return 0;
        }

        let ray = camera.ray_from_ndc(self.pointer);
        let mut killed = 0;
        for object in objects {
            let hit = object
                .borrow()
                .whole()
                .borrow()
                .intersect_ray(&ray, Mat4::IDENTITY)
                .is_some();
            if hit && object.borrow_mut().kill() {
                killed += 1;
            }
        }

        if killed > 0 {
            self.kills += killed as u32;
            log::debug!("🎯 {} 個切断 (合計 {})", killed, self.kills);
        }
        killed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssetConfig, CameraConfig, SpawnConfig};
    use crate::game::entities::{FallingObject, ObjectState};
    use crate::game::testing::{test_world, TestWorld};
    use crate::physics::Kinematics;
    use glam::Vec3;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::from_config(&CameraConfig::default(), 1.0)
    }

    fn object_at(t: &TestWorld, x: f32, y: f32) -> ObjectRef {
        FallingObject::spawn_with_launch(
            &t.world,
            &SpawnConfig::default(),
            &AssetConfig::default(),
            Kinematics::new(Vec3::new(x, y, 0.0), Vec3::ZERO),
            Box::new(|_| {}),
        )
        .unwrap()
    }

    /// ワールド座標の点を指すポインタ位置
    fn pointer_at(camera: &PerspectiveCamera, x: f32, y: f32) -> Vec2 {
        let ndc = camera.world_to_ndc(Vec3::new(x, y, 0.0));
        Vec2::new(ndc.x, ndc.y)
    }

    #[test]
    fn test_inactive_pointer_never_kills() {
        let t = test_world(5);
        let camera = camera();
        let objects = vec![object_at(&t, 0.0, 25.0)];

        let mut tester = HitTester::new();
        tester.pointer_move(pointer_at(&camera, 0.0, 25.0));
        assert_eq!(tester.run(&camera, &objects), 0);
        assert!(objects[0].borrow().is_alive());

        tester.pointer_down();
        tester.pointer_up();
        assert_eq!(tester.run(&camera, &objects), 0);
        assert_eq!(tester.kills(), 0);
    }

    #[test]
    fn test_active_pointer_kills_hit_object() {
        let t = test_world(5);
        let camera = camera();
        let objects = vec![object_at(&t, 5.0, 20.0), object_at(&t, -10.0, 30.0)];

        let mut tester = HitTester::new();
        tester.handle(PointerEvent::Down);
        tester.handle(PointerEvent::Move(pointer_at(&camera, 5.0, 20.0)));

        assert_eq!(tester.run(&camera, &objects), 1);
        assert_eq!(objects[0].borrow().state(), ObjectState::Killed);
        assert!(objects[1].borrow().is_alive());

        // 切った後も同じ位置にいるが数え直さない
        assert_eq!(tester.run(&camera, &objects), 0);
        assert_eq!(tester.kills(), 1);
    }

    #[test]
    fn test_multiple_kills_in_one_pass() {
        let t = test_world(5);
        let camera = camera();
        // カメラから見て一直線に並べる
        let objects = vec![object_at(&t, 0.0, 25.0), object_at(&t, 0.0, 25.0)];

        let mut tester = HitTester::new();
        tester.pointer_down();
        tester.pointer_move(Vec2::ZERO);

        assert_eq!(tester.run(&camera, &objects), 2);
        assert_eq!(tester.kills(), 2);
    }

    #[test]
    fn test_miss() {
        let t = test_world(5);
        let camera = camera();
        let objects = vec![object_at(&t, 10.0, 25.0)];

        let mut tester = HitTester::new();
        tester.pointer_down();
        tester.pointer_move(pointer_at(&camera, -10.0, 25.0));
        assert_eq!(tester.run(&camera, &objects), 0);
        assert!(objects[0].borrow().is_alive());
    }
}
