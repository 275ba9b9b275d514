//! フレームループモジュール
//!
//! 毎フレームの更新コールバック（購読者）を登録順に実行し、
//! カメラが設定されていればシーンを描画します。
//!
//! 購読者はフレーム中に追加・解除できます。フレーム開始時点の購読者だけが実行され、
//! 同じフレーム内で先に解除された購読者はスキップされます。

mod driver;

pub use driver::FrameDriver;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::error::Result;
use crate::rendering::{PerspectiveCamera, Scene, SceneRenderer};
use crate::utils::{Clock, FrameClock};

new_key_type! {
    /// 購読の識別子（世代付きなので、解除済みIDが再利用されることはない）
    pub struct SubscriptionId;
}

/// 毎フレームのコールバック（引数は前フレームからの経過秒数）
pub type FrameCallback = Box<dyn FnMut(f32) -> Result<()>>;

/// 実行フェーズ
///
/// 同じフレーム内では `Update` の購読者がすべて実行された後に `Late` が実行されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// 通常の更新
    Update,
    /// 更新後の処理（当たり判定など）
    Late,
}

impl FramePhase {
    const ORDER: [FramePhase; 2] = [FramePhase::Update, FramePhase::Late];
}

struct Subscriber {
    phase: FramePhase,
    callback: Rc<RefCell<FrameCallback>>,
}

/// フレームループ
///
/// すべてのメソッドは `&self` で呼べるので、`Rc<RenderLoop>` を共有して
/// コールバックの中から購読・解除できます。
pub struct RenderLoop {
    clock: RefCell<FrameClock>,
    subscribers: RefCell<SlotMap<SubscriptionId, Subscriber>>,
    /// 登録順
    order: RefCell<Vec<SubscriptionId>>,
    scene: Rc<RefCell<Scene>>,
    camera: RefCell<Option<Rc<RefCell<PerspectiveCamera>>>>,
    renderer: RefCell<Option<Box<dyn SceneRenderer>>>,
    frames_rendered: Cell<u64>,
}

impl RenderLoop {
    pub fn new(clock: Box<dyn Clock>, scene: Rc<RefCell<Scene>>) -> Self {
        Self {
            clock: RefCell::new(FrameClock::new(clock)),
            subscribers: RefCell::new(SlotMap::with_key()),
            order: RefCell::new(Vec::new()),
            scene,
            camera: RefCell::new(None),
            renderer: RefCell::new(None),
            frames_rendered: Cell::new(0),
        }
    }

    pub fn scene(&self) -> Rc<RefCell<Scene>> {
        Rc::clone(&self.scene)
    }

    /// `Update` フェーズに購読者を追加
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: FnMut(f32) -> Result<()> + 'static,
    {
        self.subscribe_in(FramePhase::Update, callback)
    }

    /// 指定したフェーズに購読者を追加
    pub fn subscribe_in<F>(&self, phase: FramePhase, callback: F) -> SubscriptionId
    where
        F: FnMut(f32) -> Result<()> + 'static,
    {
        let callback: FrameCallback = Box::new(callback);
        let id = self.subscribers.borrow_mut().insert(Subscriber {
            phase,
            callback: Rc::new(RefCell::new(callback)),
        });
        self.order.borrow_mut().push(id);
        id
    }

    /// 購読を解除（解除済みなら何もしない）
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.subscribers.borrow_mut().remove(id).is_none() {
            return false;
        }
        self.order.borrow_mut().retain(|other| *other != id);
        true
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow().contains_key(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// 描画に使うカメラを設定
    pub fn set_camera(&self, camera: Rc<RefCell<PerspectiveCamera>>) {
        *self.camera.borrow_mut() = Some(camera);
    }

    pub fn camera(&self) -> Option<Rc<RefCell<PerspectiveCamera>>> {
        self.camera.borrow().clone()
    }

    pub fn set_renderer(&self, renderer: Box<dyn SceneRenderer>) {
        *self.renderer.borrow_mut() = Some(renderer);
    }

    /// 描画したフレーム数
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.get()
    }

    /// 最初のフレームからの経過時間（秒）
    pub fn elapsed(&self) -> f32 {
        self.clock.borrow().elapsed()
    }

    /// 1フレーム進める
    pub fn tick(&self) {
        let delta_time = self.clock.borrow_mut().tick();

        // フレーム開始時点の購読者（借用はここで解放する）
        let snapshot: Vec<(SubscriptionId, FramePhase, Rc<RefCell<FrameCallback>>)> = {
            let subscribers = self.subscribers.borrow();
            self.order
                .borrow()
                .iter()
                .filter_map(|id| {
                    subscribers
                        .get(*id)
                        .map(|s| (*id, s.phase, Rc::clone(&s.callback)))
                })
                .collect()
        };

        for phase in FramePhase::ORDER {
            for (id, _, callback) in snapshot.iter().filter(|(_, p, _)| *p == phase) {
                if !self.is_subscribed(*id) {
                    continue;
                }
                let mut callback = match callback.try_borrow_mut() {
                    Ok(callback) => callback,
                    Err(_) => {
                        log::warn!("購読者 {:?} は実行中のためスキップします", id);
                        continue;
                    }
                };
                if let Err(e) = (*callback)(delta_time) {
                    log::error!("フレーム更新中にエラーが発生: {}", e);
                }
            }
        }

        self.render();
    }

    /// カメラとレンダラーが設定されていればシーンを描画
    pub fn render(&self) {
        let camera = match self.camera() {
            Some(camera) => camera,
            None => return,
        };
        let mut renderer = self.renderer.borrow_mut();
        let renderer = match renderer.as_mut() {
            Some(renderer) => renderer,
            None => return,
        };

        let scene = self.scene.borrow();
        let camera = camera.borrow();
        match renderer.render(&scene, &camera) {
            Ok(()) => self.frames_rendered.set(self.frames_rendered.get() + 1),
            Err(e) => log::error!("描画中にエラーが発生: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::error::Error;
    use crate::utils::ManualClock;
    use approx::assert_relative_eq;

    /// 描画回数とシーンのノード数を記録するレンダラー
    struct RecordingRenderer {
        frames: Rc<RefCell<Vec<usize>>>,
    }

    impl SceneRenderer for RecordingRenderer {
        fn render(&mut self, scene: &Scene, _camera: &PerspectiveCamera) -> Result<()> {
            self.frames.borrow_mut().push(scene.len());
            Ok(())
        }
    }

    fn setup() -> (Rc<RenderLoop>, ManualClock) {
        let clock = ManualClock::new();
        let render_loop = Rc::new(RenderLoop::new(
            Box::new(clock.clone()),
            Rc::new(RefCell::new(Scene::new())),
        ));
        (render_loop, clock)
    }

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> impl FnMut(f32) -> Result<()> {
        let log = Rc::clone(log);
        move |_| {
            log.borrow_mut().push(label);
            Ok(())
        }
    }

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let (render_loop, _) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        render_loop.subscribe_in(FramePhase::Late, recorder(&log, "late"));
        render_loop.subscribe(recorder(&log, "a"));
        render_loop.subscribe(recorder(&log, "b"));

        render_loop.tick();
        assert_eq!(*log.borrow(), vec!["a", "b", "late"]);
    }

    #[test]
    fn test_delta_time_from_clock() {
        let (render_loop, clock) = setup();
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let d = Rc::clone(&deltas);
        render_loop.subscribe(move |dt| {
            d.borrow_mut().push(dt);
            Ok(())
        });

        render_loop.tick();
        clock.advance(100.0);
        render_loop.tick();
        clock.advance(-50.0);
        render_loop.tick();

        let deltas = deltas.borrow();
        assert_eq!(deltas[0], 0.0);
        assert_relative_eq!(deltas[1], 0.1);
        assert_eq!(deltas[2], 0.0);
    }

    #[test]
    fn test_unsubscribe_self_during_tick() {
        let (render_loop, _) = setup();
        let count = Rc::new(Cell::new(0));

        let id_slot: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let (rl, slot, c) = (Rc::downgrade(&render_loop), Rc::clone(&id_slot), Rc::clone(&count));
        let id = render_loop.subscribe(move |_| {
            c.set(c.get() + 1);
            if let (Some(rl), Some(id)) = (rl.upgrade(), slot.get()) {
                rl.unsubscribe(id);
            }
            Ok(())
        });
        id_slot.set(Some(id));

        render_loop.tick();
        render_loop.tick();
        assert_eq!(count.get(), 1);
        assert!(!render_loop.is_subscribed(id));
        assert!(!render_loop.unsubscribe(id));
    }

    #[test]
    fn test_unsubscribed_earlier_in_tick_is_skipped() {
        let (render_loop, _) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        let victim: Rc<Cell<Option<SubscriptionId>>> = Rc::new(Cell::new(None));
        let (rl, v) = (Rc::downgrade(&render_loop), Rc::clone(&victim));
        render_loop.subscribe(move |_| {
            if let (Some(rl), Some(id)) = (rl.upgrade(), v.get()) {
                rl.unsubscribe(id);
            }
            Ok(())
        });
        victim.set(Some(render_loop.subscribe(recorder(&log, "victim"))));

        render_loop.tick();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_added_during_tick_runs_next_tick() {
        let (render_loop, _) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (rl, l) = (Rc::downgrade(&render_loop), Rc::clone(&log));
        let added = Rc::new(Cell::new(false));
        let a = Rc::clone(&added);
        render_loop.subscribe(move |_| {
            if !a.get() {
                a.set(true);
                if let Some(rl) = rl.upgrade() {
                    rl.subscribe(recorder(&l, "new"));
                }
            }
            Ok(())
        });

        render_loop.tick();
        assert!(log.borrow().is_empty());
        render_loop.tick();
        assert_eq!(*log.borrow(), vec!["new"]);
    }

    #[test]
    fn test_error_does_not_stop_loop() {
        let (render_loop, _) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));

        render_loop.subscribe(|_| Err(Error::Js("boom".to_string())));
        render_loop.subscribe(recorder(&log, "after"));

        render_loop.tick();
        render_loop.tick();
        assert_eq!(*log.borrow(), vec!["after", "after"]);
    }

    #[test]
    fn test_render_requires_camera() {
        let (render_loop, _) = setup();
        let frames = Rc::new(RefCell::new(Vec::new()));
        render_loop.set_renderer(Box::new(RecordingRenderer {
            frames: Rc::clone(&frames),
        }));

        render_loop.tick();
        assert!(frames.borrow().is_empty());
        assert_eq!(render_loop.frames_rendered(), 0);

        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        render_loop.set_camera(Rc::new(RefCell::new(camera)));
        render_loop.tick();
        render_loop.tick();
        assert_eq!(*frames.borrow(), vec![0, 0]);
        assert_eq!(render_loop.frames_rendered(), 2);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let (render_loop, _) = setup();
        let first = render_loop.subscribe(|_| Ok(()));
        render_loop.unsubscribe(first);
        let second = render_loop.subscribe(|_| Ok(()));

        assert_ne!(first, second);
        assert!(!render_loop.is_subscribed(first));
        assert_eq!(render_loop.subscriber_count(), 1);
    }
}
