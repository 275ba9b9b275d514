//! ゲームモジュール
//!
//! 落下オブジェクト、スポナー、当たり判定をまとめてゲームとして動かします。
//! 共有状態（シーン、フレームループ、アセット、タイマー、乱数）は `World` にまとめ、
//! 各要素はそのクローンを保持します。

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;

pub mod entities;
pub mod hit_test;
pub mod resources;
pub mod spawner;

pub use entities::{FallingObject, ObjectRef, ObjectState};
pub use hit_test::HitTester;
pub use resources::FruitVisuals;
pub use spawner::{LiveObjects, SpawnContext, Spawner};

use crate::assets::AssetRegistry;
use crate::config::GameConfig;
use crate::frame::{FramePhase, RenderLoop, SubscriptionId};
use crate::input::PointerEvent;
use crate::rendering::{PerspectiveCamera, Scene};
use crate::utils::{Clock, TimerScheduler};

/// ゲーム全体で共有する状態
#[derive(Clone)]
pub struct World {
    pub scene: Rc<RefCell<Scene>>,
    pub render_loop: Rc<RenderLoop>,
    pub assets: Rc<RefCell<AssetRegistry>>,
    pub timers: Rc<dyn TimerScheduler>,
    pub rng: Rc<RefCell<SmallRng>>,
}

impl World {
    pub fn new(
        clock: Box<dyn Clock>,
        timers: Rc<dyn TimerScheduler>,
        rng: SmallRng,
        assets: Rc<RefCell<AssetRegistry>>,
    ) -> Self {
        let scene = Rc::new(RefCell::new(Scene::new()));
        let render_loop = Rc::new(RenderLoop::new(clock, Rc::clone(&scene)));
        Self {
            scene,
            render_loop,
            assets,
            timers,
            rng: Rc::new(RefCell::new(rng)),
        }
    }
}

/// ゲームインスタンス
///
/// アセットの読み込みが終わったら `begin` で開始します。
pub struct Game {
    world: World,
    camera: Rc<RefCell<PerspectiveCamera>>,
    spawner: Spawner,
    hit_tester: Rc<RefCell<HitTester>>,
    hit_subscription: Option<SubscriptionId>,
}

impl Game {
    pub fn new(world: World, config: &GameConfig, aspect: f32) -> Self {
        let camera = PerspectiveCamera::from_config(&config.camera, aspect);
        let context = SpawnContext::new(world.clone(), config.spawn.clone(), config.assets.clone());

        Self {
            camera: Rc::new(RefCell::new(camera)),
            spawner: Spawner::new(context),
            hit_tester: Rc::new(RefCell::new(HitTester::new())),
            hit_subscription: None,
            world,
        }
    }

    /// カメラを設定し、当たり判定とスポナーを開始する（開始済みなら何もしない）
    pub fn begin(&mut self) {
        if self.hit_subscription.is_some() {
            return;
        }

        self.world.render_loop.set_camera(Rc::clone(&self.camera));

        // オブジェクトの更新が済んだ後に判定する
        let hit_tester = Rc::clone(&self.hit_tester);
        let camera = Rc::clone(&self.camera);
        let live = Rc::downgrade(&self.spawner.live());
        let id = self.world.render_loop.subscribe_in(FramePhase::Late, move |_| {
            if let Some(live) = live.upgrade() {
                let objects = live.borrow().clone();
                hit_tester.borrow_mut().run(&camera.borrow(), &objects);
            }
            Ok(())
        });
        self.hit_subscription = Some(id);

        self.spawner.start();
        log::info!("🎮 ゲーム開始");
    }

    /// スポナーと当たり判定を止め、残っているオブジェクトを破棄する
    pub fn stop(&mut self) {
        self.spawner.stop();
        if let Some(id) = self.hit_subscription.take() {
            self.world.render_loop.unsubscribe(id);
        }

        let objects = self.spawner.live().borrow().clone();
        for object in objects {
            object.borrow_mut().cleanup();
        }
        log::info!("🏁 ゲーム停止 (スコア: {})", self.score());
    }

    pub fn is_started(&self) -> bool {
        self.hit_subscription.is_some()
    }

    /// 入力イベントを当たり判定へ渡す
    pub fn handle_pointer(&self, event: PointerEvent) {
        self.hit_tester.borrow_mut().handle(event);
    }

    /// 画面サイズ変更時にアスペクト比を更新
    pub fn set_aspect(&self, aspect: f32) {
        self.camera.borrow_mut().set_aspect(aspect);
    }

    /// 切った数
    pub fn score(&self) -> u32 {
        self.hit_tester.borrow().kills()
    }

    pub fn live_count(&self) -> usize {
        self.spawner.live_count()
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawner.spawned_total()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn camera(&self) -> Rc<RefCell<PerspectiveCamera>> {
        Rc::clone(&self.camera)
    }

    pub fn live(&self) -> LiveObjects {
        self.spawner.live()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::test_world;
    use super::*;

    #[test]
    fn test_game_spawns_and_scores() {
        let t = test_world(9);
        let mut game = Game::new(t.world.clone(), &GameConfig::default(), 1.0);
        game.begin();
        game.begin();
        assert!(game.is_started());
        assert!(t.world.render_loop.camera().is_some());

        t.world.render_loop.tick();
        t.timers.advance(3500);
        assert_eq!(game.live_count(), 1);

        // 出現直後のオブジェクトを狙う
        let target = game.live().borrow()[0].borrow().position();
        let ndc = game.camera().borrow().world_to_ndc(target);
        game.handle_pointer(PointerEvent::Move(glam::Vec2::new(ndc.x, ndc.y)));
        game.handle_pointer(PointerEvent::Down);

        t.world.render_loop.tick();
        assert_eq!(game.score(), 1);
        assert_eq!(game.live().borrow()[0].borrow().state(), ObjectState::Killed);

        // 離した後はもう切らない
        game.handle_pointer(PointerEvent::Up);
        t.timers.advance(500);
        t.world.render_loop.tick();
        assert_eq!(game.score(), 1);
    }

    #[test]
    fn test_stop_clears_everything() {
        let t = test_world(9);
        let mut game = Game::new(t.world.clone(), &GameConfig::default(), 1.0);
        game.begin();
        t.timers.advance(4000);
        assert_eq!(game.live_count(), 3);

        game.stop();
        assert_eq!(game.live_count(), 0);
        assert!(t.world.scene.borrow().is_empty());
        assert_eq!(t.world.render_loop.subscriber_count(), 0);

        t.timers.advance(10_000);
        assert_eq!(game.spawned_total(), 3);
    }

    #[test]
    fn test_objects_fall_out_of_play() {
        let t = test_world(11);
        let mut game = Game::new(t.world.clone(), &GameConfig::default(), 1.0);
        game.begin();
        t.world.render_loop.tick();
        t.timers.advance(3500);
        assert_eq!(game.live_count(), 1);

        // 最大速度 40 でも約 8.6 秒で画面外に落ちる
        for _ in 0..700 {
            t.clock.advance(16.0);
            t.world.render_loop.tick();
        }
        assert_eq!(game.live_count(), 0);
        assert!(t.world.scene.borrow().is_empty());
    }
}
