//! アセット管理モジュール
//!
//! 論理名でモデルテンプレートを保持するレジストリと、
//! OBJファイルをHTTPで取得してレジストリへ登録するローダーを提供します。

pub mod obj;

pub use obj::parse_obj;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::join_all;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use crate::config::AssetEntry;
use crate::error::{Error, Result};
use crate::rendering::Node;

/// 論理名 → モデルテンプレート
#[derive(Debug, Default)]
pub struct AssetRegistry {
    models: HashMap<String, Node>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// テンプレートを登録（同名があれば警告して上書き）
    pub fn insert(&mut self, name: &str, node: Node) {
        if self.models.insert(name.to_string(), node).is_some() {
            log::warn!("⚠️ モデル '{}' を上書きしました", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.models.get(name)
    }

    /// テンプレートを取得（未登録なら `ModelNotLoaded`）
    pub fn require(&self, name: &str) -> Result<&Node> {
        self.get(name).ok_or_else(|| Error::ModelNotLoaded {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Default)]
struct LoaderState {
    /// 未完了のアセット数
    pending: usize,
    loaded: bool,
    callbacks: Vec<Box<dyn FnOnce()>>,
    /// 読み込みに失敗したアセット名
    failed: Vec<String>,
}

/// アセットローダー
///
/// 登録したすべてのアセットが（成功・失敗にかかわらず）完了した時点で
/// `on_loaded` のコールバックを実行します。クローンは同じ状態を共有します。
#[derive(Clone)]
pub struct AssetLoader {
    registry: Rc<RefCell<AssetRegistry>>,
    state: Rc<RefCell<LoaderState>>,
}

impl AssetLoader {
    pub fn new(registry: Rc<RefCell<AssetRegistry>>) -> Self {
        Self {
            registry,
            state: Rc::new(RefCell::new(LoaderState::default())),
        }
    }

    pub fn registry(&self) -> Rc<RefCell<AssetRegistry>> {
        Rc::clone(&self.registry)
    }

    /// 読み込み完了時のコールバックを登録（完了済みなら即座に実行）
    pub fn on_loaded<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        let loaded = self.state.borrow().loaded;
        if loaded {
            callback();
        } else {
            self.state.borrow_mut().callbacks.push(Box::new(callback));
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().pending > 0
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    /// 読み込みに失敗したアセット名
    pub fn failed(&self) -> Vec<String> {
        self.state.borrow().failed.clone()
    }

    /// すべてのエントリをブラウザの `fetch` で読み込む
    pub fn load_all(&self, entries: &[AssetEntry]) {
        self.begin(entries.len());
        if entries.is_empty() {
            self.complete();
            return;
        }

        log::info!("📦 アセット読み込み開始: {} 件", entries.len());

        let loader = self.clone();
        let entries = entries.to_vec();
        wasm_bindgen_futures::spawn_local(async move {
            let results = join_all(entries.into_iter().map(fetch_obj)).await;
            for result in results {
                loader.finish_item(result);
            }
        });
    }

    fn begin(&self, count: usize) {
        let mut state = self.state.borrow_mut();
        state.pending += count;
        if count > 0 {
            state.loaded = false;
        }
    }

    /// 1件の読み込み結果を反映する
    fn finish_item(&self, result: Result<(String, Node)>) {
        match result {
            Ok((name, node)) => {
                log::info!("✅ モデル '{}' を読み込みました", name);
                self.registry.borrow_mut().insert(&name, node);
            }
            Err(err) => {
                log::error!("❌ {}", err);
                if let Error::AssetLoad { name, .. } = &err {
                    self.state.borrow_mut().failed.push(name.clone());
                }
            }
        }

        let done = {
            let mut state = self.state.borrow_mut();
            state.pending = state.pending.saturating_sub(1);
            state.pending == 0
        };
        if done {
            self.complete();
        }
    }

    fn complete(&self) {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            state.loaded = true;
            std::mem::take(&mut state.callbacks)
        };

        log::info!("📦 アセット読み込み完了 (失敗: {})", self.state.borrow().failed.len());
        // コールバック内から on_loaded を呼べるよう、借用を解放してから実行
        for callback in callbacks {
            callback();
        }
    }
}

/// OBJファイルを取得して解析する
async fn fetch_obj(entry: AssetEntry) -> Result<(String, Node)> {
    let load_error = |reason: String| Error::AssetLoad {
        name: entry.name.clone(),
        url: entry.url.clone(),
        reason,
    };

    let window = web_sys::window().ok_or_else(|| load_error("window is not available".to_string()))?;

    let response: Response = JsFuture::from(window.fetch_with_str(&entry.url))
        .await
        .map_err(|e| load_error(format!("{:?}", e)))?
        .dyn_into()
        .map_err(|_| load_error("fetch did not return a Response".to_string()))?;

    if !response.ok() {
        return Err(load_error(format!("HTTP {}", response.status())));
    }

    let text_promise = response.text().map_err(|e| load_error(format!("{:?}", e)))?;
    let text = JsFuture::from(text_promise)
        .await
        .map_err(|e| load_error(format!("{:?}", e)))?
        .as_string()
        .ok_or_else(|| load_error("response body is not text".to_string()))?;

    let node = parse_obj(&entry.name, &text).map_err(|e| load_error(e.to_string()))?;
    Ok((entry.name.clone(), node))
}
