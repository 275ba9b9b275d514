//! `requestAnimationFrame` でフレームループを駆動するランナー

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::RenderLoop;
use crate::error::{Error, Result};

type FrameClosure = Closure<dyn FnMut(f64)>;

/// ブラウザの描画タイミングごとに `RenderLoop::tick` を呼ぶ
///
/// `stop` するかドロップするまで動き続けます。
pub struct FrameDriver {
    window: web_sys::Window,
    running: Rc<Cell<bool>>,
    /// 予約中のフレームのハンドル
    handle: Rc<Cell<Option<i32>>>,
    closure: Rc<RefCell<Option<FrameClosure>>>,
}

impl FrameDriver {
    /// ループを開始
    pub fn start(render_loop: Rc<RenderLoop>) -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| Error::Js("window is not available".to_string()))?;
        let running = Rc::new(Cell::new(true));
        let handle = Rc::new(Cell::new(None));
        let closure: Rc<RefCell<Option<FrameClosure>>> = Rc::new(RefCell::new(None));

        // クロージャ自身は弱参照で持つ（循環参照を作らない）
        let self_ref = Rc::downgrade(&closure);
        let frame_window = window.clone();
        let frame_running = Rc::clone(&running);
        let frame_handle = Rc::clone(&handle);

        *closure.borrow_mut() = Some(Closure::wrap(Box::new(move |_timestamp: f64| {
            frame_handle.set(None);
            if !frame_running.get() {
                return;
            }

            render_loop.tick();

            // tick 中に停止された場合は次のフレームを予約しない
            if !frame_running.get() {
                return;
            }
            if let Some(slot) = self_ref.upgrade() {
                if let Some(next) = slot.borrow().as_ref() {
                    match request_frame(&frame_window, next) {
                        Ok(id) => frame_handle.set(Some(id)),
                        Err(e) => log::error!("次のフレームを予約できません: {}", e),
                    }
                }
            }
        }) as Box<dyn FnMut(f64)>));

        if let Some(first) = closure.borrow().as_ref() {
            handle.set(Some(request_frame(&window, first)?));
        }

        log::info!("▶️ フレームループ開始");

        Ok(Self {
            window,
            running,
            handle,
            closure,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// ループを停止（予約中のフレームも取り消す）
    pub fn stop(&mut self) {
        if !self.running.replace(false) {
            return;
        }
        if let Some(id) = self.handle.take() {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                log::warn!("フレームの取り消しに失敗: {:?}", e);
            }
        }
        log::info!("⏹️ フレームループ停止");
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        self.stop();
        self.closure.borrow_mut().take();
    }
}

fn request_frame(window: &web_sys::Window, closure: &FrameClosure) -> Result<i32> {
    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(Error::js)
}
