//! ゲーム設定モジュール
//!
//! 出現パラメータ、カメラ、アセットのパスなどの設定を保持します。
//! JavaScript 側から JSON で部分的に上書きできます。

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// ゲーム全体の設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// 出現設定
    pub spawn: SpawnConfig,
    /// カメラ設定
    pub camera: CameraConfig,
    /// モデルアセット設定
    pub assets: AssetConfig,
}

impl GameConfig {
    /// JSON文字列から設定を読み込む（省略されたフィールドはデフォルト値）
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// 落下オブジェクトの出現設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// 初期X座標の散らばり幅（ワールド単位）
    pub spread: f32,
    /// 打ち上げ速度の最小値
    pub min_velocity: f32,
    /// 打ち上げ速度の最大値
    pub max_velocity: f32,
    /// 1バッチあたりの出現数
    pub batch_size: u32,
    /// バッチ内の出現間隔（ミリ秒）
    pub stagger_ms: u32,
    /// バッチの間隔（ミリ秒）
    pub batch_interval_ms: u32,
    /// 横方向の打ち上げ速度の最大値（中央へ向かう向き）
    pub x_speed: f32,
    /// 横方向速度に加える揺らぎの幅
    pub x_jitter: f32,
    /// 分割後の半分同士が離れる速さ
    pub drift_factor: f32,
    /// 不可視の球コライダーの半径（None なら作らない）
    pub collider_radius: Option<f32>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spread: 50.0,
            min_velocity: 20.0,
            max_velocity: 40.0,
            batch_size: 3,
            stagger_ms: 250,
            batch_interval_ms: 3500,
            x_speed: 2.0,
            x_jitter: 0.5,
            drift_factor: 5.0,
            collider_radius: None,
        }
    }
}

/// カメラ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// 垂直視野角（度）
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// カメラの高さ（注視点も同じ高さ）
    pub height: f32,
    /// カメラのZ位置
    pub distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.1,
            far: 50.0,
            height: 25.0,
            distance: 30.0,
        }
    }
}

/// モデルアセット設定
///
/// 論理名とURLの対応です。3つすべてが読み込まれるまで出現は成功しません。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub whole: AssetEntry,
    pub top: AssetEntry,
    pub bottom: AssetEntry,
}

impl AssetConfig {
    /// すべてのエントリを列挙
    pub fn entries(&self) -> [&AssetEntry; 3] {
        [&self.whole, &self.top, &self.bottom]
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            whole: AssetEntry::new("orange", "/assets/models/orange/orange_whole.obj"),
            top: AssetEntry::new("orangeTop", "/assets/models/orange/orange_top.obj"),
            bottom: AssetEntry::new("orangeBottom", "/assets/models/orange/orange_bottom.obj"),
        }
    }
}

/// 1つのアセットの名前とURL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub name: String,
    pub url: String,
}

impl AssetEntry {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.spawn.spread, 50.0);
        assert_eq!(config.spawn.batch_size, 3);
        assert_eq!(config.spawn.batch_interval_ms, 3500);
        assert_eq!(config.camera.fov_degrees, 45.0);
        assert_eq!(config.assets.top.name, "orangeTop");
        assert!(config.spawn.collider_radius.is_none());
    }

    #[test]
    fn test_partial_json_override() {
        let json = r#"{ "spawn": { "batch_size": 5, "collider_radius": 2.0 }, "camera": { "height": 10.0 } }"#;
        let config = GameConfig::from_json(json).unwrap();
        assert_eq!(config.spawn.batch_size, 5);
        assert_eq!(config.spawn.collider_radius, Some(2.0));
        // 省略されたフィールドはデフォルト値のまま
        assert_eq!(config.spawn.min_velocity, 20.0);
        assert_eq!(config.camera.height, 10.0);
        assert_eq!(config.camera.distance, 30.0);
        assert_eq!(config.assets, AssetConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        assert!(GameConfig::from_json("not json").is_err());
    }
}
