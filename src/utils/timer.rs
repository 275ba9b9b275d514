//! タイマーモジュール
//!
//! フレームとは独立したタイマー（`setTimeout` / `setInterval`）を抽象化します。
//! ブラウザ実装と、仮想時間で動くテスト用実装があります。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::error::{Error, Result};

/// タイマーの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u32);

/// タイマーのスケジューラ
pub trait TimerScheduler {
    /// `delay_ms` ミリ秒後に一度だけ実行
    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId;

    /// `period_ms` ミリ秒ごとに繰り返し実行
    fn set_interval(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> TimerId;

    /// タイマーを解除（実行済み・解除済みなら何もしない）
    fn clear(&self, id: TimerId);
}

/// ID生成器
#[derive(Debug, Default)]
struct TimerIds {
    next: Cell<u32>,
}

impl TimerIds {
    fn next_id(&self) -> TimerId {
        let id = self.next.get() + 1;
        self.next.set(id);
        TimerId(id)
    }
}

/// ブラウザのタイマーに渡す遅延（`i32` に収まらない値は最大値に丸める）
fn browser_delay(ms: u32) -> i32 {
    i32::try_from(ms).unwrap_or(i32::MAX)
}

enum BrowserTimer {
    /// ワンショット（クロージャは実行後に自分で解放される）
    Timeout(i32),
    /// 繰り返し（クロージャを保持しておく必要がある）
    Interval(i32, Closure<dyn FnMut()>),
}

/// `window.setTimeout` / `window.setInterval` を使うスケジューラ
pub struct BrowserTimers {
    window: web_sys::Window,
    ids: TimerIds,
    timers: Rc<RefCell<HashMap<TimerId, BrowserTimer>>>,
}

impl BrowserTimers {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| Error::Js("window is not available".to_string()))?;
        Ok(Self {
            window,
            ids: TimerIds::default(),
            timers: Rc::new(RefCell::new(HashMap::new())),
        })
    }
}

impl TimerScheduler for BrowserTimers {
    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId {
        let id = self.ids.next_id();
        let timers = Rc::clone(&self.timers);
        let closure = Closure::once_into_js(move || {
            timers.borrow_mut().remove(&id);
            callback();
        });

        match self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.unchecked_ref(),
            browser_delay(delay_ms),
        ) {
            Ok(handle) => {
                self.timers.borrow_mut().insert(id, BrowserTimer::Timeout(handle));
            }
            Err(e) => log::error!("setTimeout に失敗しました: {:?}", e),
        }
        id
    }

    fn set_interval(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> TimerId {
        let id = self.ids.next_id();
        let closure = Closure::wrap(callback);

        match self.window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            browser_delay(period_ms),
        ) {
            Ok(handle) => {
                self.timers.borrow_mut().insert(id, BrowserTimer::Interval(handle, closure));
            }
            Err(e) => log::error!("setInterval に失敗しました: {:?}", e),
        }
        id
    }

    fn clear(&self, id: TimerId) {
        let removed = self.timers.borrow_mut().remove(&id);
        match removed {
            Some(BrowserTimer::Timeout(handle)) => self.window.clear_timeout_with_handle(handle),
            Some(BrowserTimer::Interval(handle, _closure)) => self.window.clear_interval_with_handle(handle),
            None => {}
        }
    }
}

impl Drop for BrowserTimers {
    fn drop(&mut self) {
        let ids: Vec<TimerId> = self.timers.borrow().keys().copied().collect();
        for id in ids {
            self.clear(id);
        }
    }
}

enum Task {
    Once(Box<dyn FnOnce()>),
    Repeat(u32, Box<dyn FnMut()>),
}

struct ScheduledTask {
    id: TimerId,
    due_ms: u64,
    task: Task,
}

/// 仮想時間で動くスケジューラ（テスト用）
///
/// `advance` で時間を進めると、期限の来たタイマーが期限順に実行されます。
/// 同じ期限のタイマーは登録順です。
#[derive(Default)]
pub struct ManualTimers {
    ids: TimerIds,
    now_ms: Cell<u64>,
    tasks: RefCell<Vec<ScheduledTask>>,
    /// 実行中のタイマーと、実行中に解除されたかどうか
    running: Cell<Option<TimerId>>,
    running_cleared: Cell<bool>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 現在の仮想時刻（ミリ秒）
    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    /// 保留中のタイマー数
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// 仮想時間を進めて、期限の来たタイマーを実行する
    pub fn advance(&self, ms: u64) {
        let target = self.now_ms.get() + ms;

        while let Some(mut scheduled) = self.pop_due(target) {
            self.now_ms.set(scheduled.due_ms);
            self.running.set(Some(scheduled.id));
            self.running_cleared.set(false);

            match scheduled.task {
                Task::Once(callback) => callback(),
                Task::Repeat(period, mut callback) => {
                    callback();
                    if !self.running_cleared.get() {
                        scheduled.due_ms += u64::from(period.max(1));
                        scheduled.task = Task::Repeat(period, callback);
                        self.tasks.borrow_mut().push(scheduled);
                    }
                }
            }

            self.running.set(None);
        }

        self.now_ms.set(target);
    }

    fn pop_due(&self, target: u64) -> Option<ScheduledTask> {
        let mut tasks = self.tasks.borrow_mut();
        let index = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= target)
            .min_by_key(|(_, t)| (t.due_ms, t.id))
            .map(|(i, _)| i)?;
        Some(tasks.remove(index))
    }

    fn schedule(&self, due_ms: u64, task: Task) -> TimerId {
        let id = self.ids.next_id();
        self.tasks.borrow_mut().push(ScheduledTask { id, due_ms, task });
        id
    }
}

impl TimerScheduler for ManualTimers {
    fn set_timeout(&self, delay_ms: u32, callback: Box<dyn FnOnce()>) -> TimerId {
        self.schedule(self.now_ms.get() + u64::from(delay_ms), Task::Once(callback))
    }

    fn set_interval(&self, period_ms: u32, callback: Box<dyn FnMut()>) -> TimerId {
        let period = period_ms.max(1);
        self.schedule(self.now_ms.get() + u64::from(period), Task::Repeat(period, callback))
    }

    fn clear(&self, id: TimerId) {
        if self.running.get() == Some(id) {
            self.running_cleared.set(true);
        }
        self.tasks.borrow_mut().retain(|t| t.id != id);
    }
}
