//! fruit_slice
//!
//! 打ち上げられたオレンジをマウスやタッチで切るブラウザ向けの物理トイです。
//! WebAssembly にコンパイルし、JavaScript から `FruitGame` を作成して使います。

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

pub mod assets;
pub mod config;
pub mod error;
pub mod frame;
pub mod game;
pub mod input;
pub mod physics;
pub mod rendering;
pub mod utils;

pub use config::GameConfig;
pub use error::{Error, Result};

use assets::{AssetLoader, AssetRegistry};
use config::AssetEntry;
use frame::FrameDriver;
use game::{Game, World};
use input::InputBindings;
use rendering::CanvasRenderer;
use utils::{BrowserTimers, PerformanceClock, TimerScheduler};

// 初期化用のエントリーポイント
#[wasm_bindgen(start)]
pub fn start() {
    utils::init_logging(utils::default_level());
    log::info!("WebAssembly module initialized!");
}

/// JavaScript から使うゲームのハンドル
#[wasm_bindgen]
pub struct FruitGame {
    game: Rc<RefCell<Game>>,
    loader: AssetLoader,
    driver: Option<FrameDriver>,
    input: Option<InputBindings>,
    session_id: String,
}

#[wasm_bindgen]
impl FruitGame {
    /// ゲームを作成してアセットの読み込みとフレームループを開始する
    ///
    /// # 引数
    ///
    /// * `canvas_id` - 描画先キャンバスのID
    /// * `config_json` - 設定を上書きするJSON（省略可）
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, config_json: Option<String>) -> std::result::Result<FruitGame, JsValue> {
        let config = match config_json {
            Some(json) => GameConfig::from_json(&json)?,
            None => GameConfig::default(),
        };
        let session_id = Uuid::new_v4().to_string();

        let window = web_sys::window().ok_or_else(|| Error::Js("window is not available".to_string()))?;
        let (width, height) = input::window_size(&window);

        let mut renderer = CanvasRenderer::new(canvas_id)?;
        if width > 0.0 && height > 0.0 {
            renderer.set_size(width, height);
        }

        let timers: Rc<dyn TimerScheduler> = Rc::new(BrowserTimers::new()?);
        let registry = Rc::new(RefCell::new(AssetRegistry::new()));
        let world = World::new(
            Box::new(PerformanceClock::new()),
            timers,
            SmallRng::from_entropy(),
            Rc::clone(&registry),
        );
        world.render_loop.set_renderer(Box::new(renderer));

        let game = Rc::new(RefCell::new(Game::new(world.clone(), &config, aspect_ratio(width, height))));

        // 読み込みが終わったら開始する
        let loader = AssetLoader::new(registry);
        {
            let game = Rc::downgrade(&game);
            loader.on_loaded(move || {
                if let Some(game) = game.upgrade() {
                    game.borrow_mut().begin();
                }
            });
        }
        let entries: Vec<AssetEntry> = config.assets.entries().into_iter().cloned().collect();
        loader.load_all(&entries);

        let input = {
            let pointer_game = Rc::downgrade(&game);
            let resize_game = Rc::downgrade(&game);
            InputBindings::attach(
                &window,
                move |event| {
                    if let Some(game) = pointer_game.upgrade() {
                        game.borrow().handle_pointer(event);
                    }
                },
                move |width, height| {
                    if let Some(game) = resize_game.upgrade() {
                        game.borrow().set_aspect(aspect_ratio(width, height));
                    }
                },
            )?
        };

        let driver = FrameDriver::start(Rc::clone(&world.render_loop))?;

        log::info!("🍊 fruit_slice 起動 (session {})", session_id);

        Ok(FruitGame {
            game,
            loader,
            driver: Some(driver),
            input: Some(input),
            session_id,
        })
    }

    /// 切った数
    pub fn score(&self) -> u32 {
        self.game.borrow().score()
    }

    /// 画面上に残っているオブジェクト数
    pub fn live_objects(&self) -> u32 {
        self.game.borrow().live_count() as u32
    }

    /// これまでに出現したオブジェクト数
    pub fn spawned_total(&self) -> u32 {
        self.game.borrow().spawned_total() as u32
    }

    /// アセットの読み込みが完了したか
    pub fn is_loaded(&self) -> bool {
        self.loader.is_loaded()
    }

    #[wasm_bindgen(getter)]
    pub fn session_id(&self) -> String {
        self.session_id.clone()
    }

    /// フレームループ・入力・スポナーを止めて、オブジェクトを破棄する
    pub fn dispose(&mut self) {
        self.driver.take();
        self.input.take();
        self.game.borrow_mut().stop();
        log::info!("👋 fruit_slice 終了 (session {})", self.session_id);
    }
}

fn aspect_ratio(width: f64, height: f64) -> f32 {
    if width > 0.0 && height > 0.0 {
        (width / height) as f32
    } else {
        1.0
    }
}
