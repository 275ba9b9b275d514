//! エラー型モジュール
//!
//! クレート全体で使用するエラー型を定義します。
//! wasm境界では `JsValue` に変換して JavaScript 側へ返します。

use thiserror::Error;
use wasm_bindgen::JsValue;

/// ゲーム全体のエラー
#[derive(Debug, Error)]
pub enum Error {
    /// 必要なモデルテンプレートがまだ読み込まれていない
    #[error("model '{name}' has not been loaded")]
    ModelNotLoaded { name: String },

    /// アセットの読み込みに失敗した
    #[error("failed to load asset '{name}' from {url}: {reason}")]
    AssetLoad {
        name: String,
        url: String,
        reason: String,
    },

    /// OBJファイルの解析エラー
    #[error("OBJ parse error at line {line}: {reason}")]
    ObjParse { line: usize, reason: String },

    /// 設定JSONの解析エラー
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// ブラウザAPIの呼び出しエラー
    #[error("browser error: {0}")]
    Js(String),
}

impl Error {
    /// `JsValue` のエラーから変換
    pub fn js(value: JsValue) -> Self {
        Error::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

impl From<Error> for JsValue {
    fn from(err: Error) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
