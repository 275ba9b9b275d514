//! 出現管理モジュール
//!
//! 一定間隔でバッチを出現させ、バッチ内では少しずつ時間をずらして作成します。
//! 生存中のオブジェクトは `LiveObjects` に保持され、破棄時に取り除かれます。

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::entities::{FallingObject, ObjectRef};
use super::World;
use crate::config::{AssetConfig, SpawnConfig};
use crate::error::Result;
use crate::utils::TimerId;

/// 生存中のオブジェクト（出現順）
pub type LiveObjects = Rc<RefCell<Vec<ObjectRef>>>;

/// 出現処理に必要な共有状態（クローンは同じ状態を共有する）
#[derive(Clone)]
pub struct SpawnContext {
    world: World,
    spawn: SpawnConfig,
    assets: AssetConfig,
    live: LiveObjects,
    spawned_total: Rc<Cell<u64>>,
    /// 停止のたびに進む世代（古い世代で予約された出現は行わない）
    generation: Rc<Cell<u64>>,
}

impl SpawnContext {
    pub fn new(world: World, spawn: SpawnConfig, assets: AssetConfig) -> Self {
        Self {
            world,
            spawn,
            assets,
            live: Rc::new(RefCell::new(Vec::new())),
            spawned_total: Rc::new(Cell::new(0)),
            generation: Rc::new(Cell::new(0)),
        }
    }

    pub fn live(&self) -> LiveObjects {
        Rc::clone(&self.live)
    }

    /// オブジェクトを1つ作成して生存リストに追加
    pub fn spawn_one(&self) -> Result<ObjectRef> {
        let live = Rc::downgrade(&self.live);
        let object = FallingObject::spawn(
            &self.world,
            &self.spawn,
            &self.assets,
            Box::new(move |gone| {
                if let Some(live) = live.upgrade() {
                    live.borrow_mut()
                        .retain(|object| !std::ptr::eq(Rc::as_ptr(object), gone.as_ptr()));
                }
            }),
        )?;

        self.live.borrow_mut().push(Rc::clone(&object));
        self.spawned_total.set(self.spawned_total.get() + 1);
        Ok(object)
    }

    /// `count` 個を `stagger_ms` ずつずらして出現させる
    ///
    /// 最初の1つは即座に、k 番目は呼び出しから `k * stagger_ms` 後に作成されます。
    /// 作成の失敗はログに残すだけで、残りの出現は続けます。
    /// 予約中に `cancel_pending` が呼ばれた出現は行いません。
    pub fn spawn_batch(&self, count: u32, stagger_ms: u32) {
        let generation = self.generation.get();
        for k in 0..count {
            if k == 0 {
                self.spawn_logged();
                continue;
            }

            let context = self.clone();
            self.world.timers.set_timeout(
                k.saturating_mul(stagger_ms),
                Box::new(move || {
                    if context.generation.get() == generation {
                        context.spawn_logged();
                    }
                }),
            );
        }
    }

    /// 予約済みの出現をすべて取りやめる
    pub fn cancel_pending(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    fn spawn_logged(&self) {
        if let Err(e) = self.spawn_one() {
            log::error!("オブジェクトの出現に失敗: {}", e);
        }
    }
}

/// 一定間隔でバッチを出現させるスポナー
pub struct Spawner {
    context: SpawnContext,
    interval: Option<TimerId>,
}

impl Spawner {
    pub fn new(context: SpawnContext) -> Self {
        Self {
            context,
            interval: None,
        }
    }

    /// 繰り返しタイマーを開始（開始済みなら何もしない）
    pub fn start(&mut self) {
        if self.interval.is_some() {
            return;
        }
        let context = self.context.clone();
        let batch_size = self.context.spawn.batch_size;
        let stagger_ms = self.context.spawn.stagger_ms;
        let id = self.context.world.timers.set_interval(
            self.context.spawn.batch_interval_ms,
            Box::new(move || context.spawn_batch(batch_size, stagger_ms)),
        );
        self.interval = Some(id);

        log::info!(
            "🌱 スポナー開始: {} 個ずつ / {} ms 間隔",
            batch_size,
            self.context.spawn.batch_interval_ms
        );
    }

    /// タイマーを解除し、予約済みの出現も取りやめる
    pub fn stop(&mut self) {
        self.context.cancel_pending();
        if let Some(id) = self.interval.take() {
            self.context.world.timers.clear(id);
            log::info!("🛑 スポナー停止");
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn context(&self) -> &SpawnContext {
        &self.context
    }

    pub fn live(&self) -> LiveObjects {
        self.context.live()
    }

    pub fn live_count(&self) -> usize {
        self.context.live.borrow().len()
    }

    /// これまでに出現したオブジェクトの総数
    pub fn spawned_total(&self) -> u64 {
        self.context.spawned_total.get()
    }
}

impl Drop for Spawner {
    fn drop(&mut self) {
        self.stop();
    }
}
