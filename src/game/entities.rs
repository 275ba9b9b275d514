//! ゲームエンティティモジュール
//!
//! 打ち上げられて重力で落ちてくる果物（落下オブジェクト）を実装します。
//!
//! 状態は `Alive → Killed → Destroyed` の順にしか進みません。
//! 生きている間は丸ごとのモデルが、切られた後は上下の半分がシーンに置かれます。

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec3;
use rand::Rng;

use super::resources::FruitVisuals;
use super::World;
use crate::config::{AssetConfig, SpawnConfig};
use crate::error::Result;
use crate::frame::SubscriptionId;
use crate::physics::Kinematics;
use crate::rendering::NodeRef;
use crate::utils::random_range;

/// これより下に落ちたら破棄する高さ
pub const DESTROY_BELOW_Y: f32 = -20.0;

/// 半分に割れた後の揺らぎ回転の最大値（ラジアン）
const JITTER_ROTATION: f32 = 0.001;

/// 共有される落下オブジェクト
pub type ObjectRef = Rc<RefCell<FallingObject>>;

/// 破棄されたときに呼ばれるコールバック（破棄されたオブジェクトへの弱参照を受け取る）
///
/// オブジェクトは可変借用中なので、コールバックの中で借用してはいけません。
pub type DestroyedCallback = Box<dyn FnOnce(&Weak<RefCell<FallingObject>>)>;

/// 落下オブジェクトの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// 飛んでいる
    Alive,
    /// 切られた
    Killed,
    /// 破棄済み
    Destroyed,
}

/// ランダムな打ち上げ位置と速度を決める
///
/// 横方向の速度は出現位置と反対側（中央寄り）に向かい、揺らぎが加わります。
pub fn random_launch<R: Rng + ?Sized>(rng: &mut R, config: &SpawnConfig) -> Kinematics {
    let half_spread = config.spread / 2.0;
    let x = random_range(rng, -half_spread, half_spread);

    let direction = if x > 0.0 { -1.0 } else { 1.0 };
    let vx = direction * random_range(rng, 0.0, config.x_speed)
        + random_range(rng, -config.x_jitter, config.x_jitter);
    let vy = random_range(rng, config.min_velocity, config.max_velocity);

    Kinematics::new(Vec3::new(x, 0.0, 0.0), Vec3::new(vx, vy, 0.0))
}

/// 落下オブジェクト
pub struct FallingObject {
    world: World,
    self_ref: Weak<RefCell<FallingObject>>,
    kinematics: Kinematics,
    state: ObjectState,
    /// 割れた半分同士の横方向の累積ずれ
    x_drift: f32,
    drift_factor: f32,
    visuals: FruitVisuals,
    subscription: Option<SubscriptionId>,
    on_destroyed: Option<DestroyedCallback>,
}

impl FallingObject {
    /// ランダムな位置と速度でオブジェクトを作成し、シーンとフレームループに登録する
    pub fn spawn(
        world: &World,
        spawn: &SpawnConfig,
        assets: &AssetConfig,
        on_destroyed: DestroyedCallback,
    ) -> Result<ObjectRef> {
        let visuals = FruitVisuals::instantiate(&world.assets.borrow(), assets, spawn.collider_radius)?;
        let launch = random_launch(&mut *world.rng.borrow_mut(), spawn);
        Ok(Self::register(world, spawn, visuals, launch, on_destroyed))
    }

    /// 指定した位置と速度でオブジェクトを作成する
    pub fn spawn_with_launch(
        world: &World,
        spawn: &SpawnConfig,
        assets: &AssetConfig,
        launch: Kinematics,
        on_destroyed: DestroyedCallback,
    ) -> Result<ObjectRef> {
        let visuals = FruitVisuals::instantiate(&world.assets.borrow(), assets, spawn.collider_radius)?;
        Ok(Self::register(world, spawn, visuals, launch, on_destroyed))
    }

    fn register(
        world: &World,
        spawn: &SpawnConfig,
        visuals: FruitVisuals,
        launch: Kinematics,
        on_destroyed: DestroyedCallback,
    ) -> ObjectRef {
        let object = Rc::new_cyclic(|self_ref| {
            RefCell::new(FallingObject {
                world: world.clone(),
                self_ref: self_ref.clone(),
                kinematics: launch,
                state: ObjectState::Alive,
                x_drift: 0.0,
                drift_factor: spawn.drift_factor,
                visuals,
                subscription: None,
                on_destroyed: Some(on_destroyed),
            })
        });

        {
            let object = object.borrow();
            object.apply_position();
            let mut scene = world.scene.borrow_mut();
            scene.add(&object.visuals.whole);
            if let Some(collider) = &object.visuals.collider {
                scene.add(collider);
            }
        }

        let weak = Rc::downgrade(&object);
        let id = world.render_loop.subscribe(move |delta_time| {
            if let Some(object) = weak.upgrade() {
                object.borrow_mut().update(delta_time)?;
            }
            Ok(())
        });
        object.borrow_mut().subscription = Some(id);

        log::debug!("🍊 出現: x={:.2}, vy={:.2}", launch.position.x, launch.velocity.y);
        object
    }

    pub fn state(&self) -> ObjectState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == ObjectState::Alive
    }

    pub fn position(&self) -> Vec3 {
        self.kinematics.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.kinematics.velocity
    }

    pub fn x_drift(&self) -> f32 {
        self.x_drift
    }

    /// 当たり判定に使う丸ごとのモデル
    pub fn whole(&self) -> &NodeRef {
        &self.visuals.whole
    }

    pub fn top(&self) -> &NodeRef {
        &self.visuals.top
    }

    pub fn bottom(&self) -> &NodeRef {
        &self.visuals.bottom
    }

    pub fn collider(&self) -> Option<&NodeRef> {
        self.visuals.collider.as_ref()
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    /// 切る（丸ごとのモデルを上下の半分に差し替える）
    ///
    /// 状態が変わった場合のみ `true` を返します。
    pub fn kill(&mut self) -> bool {
        if self.state != ObjectState::Alive {
            return false;
        }
        self.state = ObjectState::Killed;

        let mut scene = self.world.scene.borrow_mut();
        scene.remove(&self.visuals.whole);
        scene.add(&self.visuals.top);
        scene.add(&self.visuals.bottom);

        log::debug!("🔪 切断: ({:.2}, {:.2})", self.kinematics.position.x, self.kinematics.position.y);
        true
    }

    /// 破棄する（シーンとフレームループから外し、破棄コールバックを一度だけ呼ぶ）
    pub fn cleanup(&mut self) {
        if self.state == ObjectState::Destroyed {
            return;
        }
        self.state = ObjectState::Destroyed;

        {
            let mut scene = self.world.scene.borrow_mut();
            for node in self.visuals.all() {
                scene.remove(node);
            }
        }
        if let Some(id) = self.subscription.take() {
            self.world.render_loop.unsubscribe(id);
        }

        log::debug!("🗑️ 破棄: y={:.2}", self.kinematics.position.y);

        if let Some(on_destroyed) = self.on_destroyed.take() {
            on_destroyed(&self.self_ref);
        }
    }

    /// 1フレーム分の更新
    pub fn update(&mut self, delta_time: f32) -> Result<()> {
        if self.state == ObjectState::Destroyed {
            return Ok(());
        }

        self.kinematics.integrate(delta_time);
        self.apply_position();

        let tumble = (self.kinematics.velocity.y * delta_time).abs();
        for node in self.visuals.models() {
            let mut node = node.borrow_mut();
            node.rotate_x(tumble);
            node.rotate_z(tumble);
        }

        if self.state == ObjectState::Killed {
            self.x_drift += self.drift_factor * self.kinematics.velocity.x * delta_time;

            let mut rng = self.world.rng.borrow_mut();
            let mut jitter = || random_range(&mut *rng, 0.0, JITTER_ROTATION);

            let mut top = self.visuals.top.borrow_mut();
            top.position.x -= self.x_drift;
            top.rotate_x(jitter());
            top.rotate_y(jitter());
            top.rotate_z(jitter());

            let mut bottom = self.visuals.bottom.borrow_mut();
            bottom.position.x += self.x_drift;
            bottom.rotate_x(-tumble - jitter());
            bottom.rotate_y(-tumble - jitter());
            bottom.rotate_z(-tumble - jitter());
        }

        if self.kinematics.position.y < DESTROY_BELOW_Y {
            self.cleanup();
        }

        Ok(())
    }

    /// 現在位置をすべての表示ノードに反映
    fn apply_position(&self) {
        let position = self.kinematics.position;
        for node in self.visuals.all() {
            let mut node = node.borrow_mut();
            node.position.x = position.x;
            node.position.y = position.y;
        }
    }
}
