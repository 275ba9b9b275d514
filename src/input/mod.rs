//! 入力処理モジュール
//!
//! マウスとタッチのイベントをポインタイベントに変換します。
//! リスナーは `window` に登録し、`InputBindings` のドロップ時に解除します。

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, MouseEvent, TouchEvent, Window};

use crate::error::{Error, Result};

/// ポインタイベント
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// マウスボタンが押された / タッチ開始
    Down,
    /// マウスボタンが離された / タッチ終了
    Up,
    /// 正規化済みの位置へ移動
    Move(Vec2),
}

/// スクリーン座標を -1〜1 に正規化する（Y軸は上が正）
///
/// 幅や高さが 0 以下の場合は中央を返します。
pub fn normalize_pointer(x: f64, y: f64, width: f64, height: f64) -> Vec2 {
    if width <= 0.0 || height <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(
        (x / width * 2.0 - 1.0) as f32,
        (-(y / height) * 2.0 + 1.0) as f32,
    )
}

type Listener = Closure<dyn FnMut(Event)>;

/// `window` に登録したイベントリスナー
pub struct InputBindings {
    window: Window,
    listeners: Vec<(&'static str, Listener)>,
}

impl InputBindings {
    /// マウス・タッチ・リサイズのリスナーを登録する
    ///
    /// `on_pointer` には正規化済みのポインタイベントが、
    /// `on_resize` にはウィンドウの新しい幅と高さが渡されます。
    pub fn attach<P, R>(window: &Window, on_pointer: P, on_resize: R) -> Result<Self>
    where
        P: FnMut(PointerEvent) + 'static,
        R: FnMut(f64, f64) + 'static,
    {
        let on_pointer = Rc::new(RefCell::new(on_pointer));
        let on_resize = Rc::new(RefCell::new(on_resize));
        let mut bindings = Self {
            window: window.clone(),
            listeners: Vec::new(),
        };

        let emit = {
            let on_pointer = Rc::clone(&on_pointer);
            move |event: PointerEvent| (*on_pointer.borrow_mut())(event)
        };

        {
            let emit = emit.clone();
            bindings.listen("mousedown", move |_| emit(PointerEvent::Down))?;
        }
        {
            let emit = emit.clone();
            bindings.listen("mouseup", move |_| emit(PointerEvent::Up))?;
        }
        {
            let emit = emit.clone();
            let window = window.clone();
            bindings.listen("mousemove", move |event| {
                if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
                    let (width, height) = window_size(&window);
                    emit(PointerEvent::Move(normalize_pointer(
                        mouse.client_x() as f64,
                        mouse.client_y() as f64,
                        width,
                        height,
                    )));
                }
            })?;
        }
        {
            let emit = emit.clone();
            let window = window.clone();
            bindings.listen("touchstart", move |event| {
                if let Some(position) = touch_position(&window, &event) {
                    emit(PointerEvent::Move(position));
                }
                emit(PointerEvent::Down);
            })?;
        }
        {
            let emit = emit.clone();
            bindings.listen("touchend", move |_| emit(PointerEvent::Up))?;
        }
        {
            let emit = emit.clone();
            let window = window.clone();
            bindings.listen("touchmove", move |event| {
                if let Some(position) = touch_position(&window, &event) {
                    emit(PointerEvent::Move(position));
                }
            })?;
        }
        {
            let window = window.clone();
            bindings.listen("resize", move |_| {
                let (width, height) = window_size(&window);
                (*on_resize.borrow_mut())(width, height);
            })?;
        }

        log::debug!("🖱️ 入力リスナーを {} 件登録", bindings.listeners.len());
        Ok(bindings)
    }

    fn listen<F>(&mut self, event_type: &'static str, handler: F) -> Result<()>
    where
        F: FnMut(Event) + 'static,
    {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        self.window
            .add_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())
            .map_err(Error::js)?;
        self.listeners.push((event_type, closure));
        Ok(())
    }
}

impl Drop for InputBindings {
    fn drop(&mut self) {
        for (event_type, closure) in self.listeners.drain(..) {
            if let Err(e) = self
                .window
                .remove_event_listener_with_callback(event_type, closure.as_ref().unchecked_ref())
            {
                log::warn!("リスナー '{}' の解除に失敗: {:?}", event_type, e);
            }
        }
    }
}

/// ウィンドウの内側のサイズ
pub fn window_size(window: &Window) -> (f64, f64) {
    let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    (width, height)
}

fn touch_position(window: &Window, event: &Event) -> Option<Vec2> {
    let touch = event.dyn_ref::<TouchEvent>()?.touches().get(0)?;
    let (width, height) = window_size(window);
    Some(normalize_pointer(
        touch.client_x() as f64,
        touch.client_y() as f64,
        width,
        height,
    ))
}
