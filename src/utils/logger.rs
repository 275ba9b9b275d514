//! ロギングユーティリティモジュール
//!
//! WebAssemblyからブラウザのコンソールへのログ出力を初期化します。

use std::sync::Once;

static INIT: Once = Once::new();

/// ロギングとパニックフックを初期化（複数回呼んでも一度だけ有効）
pub fn init_logging(level: log::Level) {
    INIT.call_once(|| {
        // エラーをコンソールにパニックフックとして表示
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::new(level));
        log::info!("ロガーが初期化されました (最小レベル: {:?})", level);
    });
}

/// ビルド設定に応じたデフォルトのログレベル
pub fn default_level() -> log::Level {
    if cfg!(feature = "debug") {
        log::Level::Debug
    } else {
        log::Level::Info
    }
}
