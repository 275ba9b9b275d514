//! 時間ユーティリティモジュール
//!
//! フレーム間の経過時間を計算するための時計を提供します。
//! ブラウザでは `performance.now()` を、テストでは手動で進める時計を使います。

use std::cell::Cell;
use std::rc::Rc;

/// ミリ秒単位の現在時刻を返す時刻ソース
pub trait Clock {
    /// 現在時刻（ミリ秒）
    fn now_ms(&self) -> f64;
}

/// ブラウザの高精度タイマーを使う時計
///
/// `Performance` が使えない環境では `Date.now()` にフォールバックします。
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|window| window.performance()),
        }
    }
}

impl Default for PerformanceClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        match &self.performance {
            Some(performance) => performance.now(),
            None => js_sys::Date::now(),
        }
    }
}

/// 手動で進める時計（テスト用）
///
/// クローンは同じ時刻を共有します。
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 時刻を進める
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    /// 時刻を設定
    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// フレーム時間管理用の構造体
pub struct FrameClock {
    source: Box<dyn Clock>,
    /// 最後の更新タイムスタンプ（未計測なら None）
    last_update: Option<f64>,
    /// 最初のフレームからの経過時間（秒）
    elapsed: f32,
    /// 直前のデルタタイム（秒）
    delta: f32,
    /// 累積フレーム数
    frame_count: u64,
}

impl FrameClock {
    pub fn new(source: Box<dyn Clock>) -> Self {
        Self {
            source,
            last_update: None,
            elapsed: 0.0,
            delta: 0.0,
            frame_count: 0,
        }
    }

    /// 時間を更新してデルタタイム（秒）を返す
    ///
    /// 最初の呼び出しは 0 を返します。時計が巻き戻った場合や
    /// 非数の場合も 0 に丸めます。
    pub fn tick(&mut self) -> f32 {
        let now = self.source.now_ms();

        let raw_delta = match self.last_update {
            Some(previous) => ((now - previous) / 1000.0) as f32,
            None => 0.0,
        };
        self.delta = if raw_delta.is_finite() && raw_delta > 0.0 {
            raw_delta
        } else {
            0.0
        };

        self.elapsed += self.delta;
        self.last_update = Some(now);
        self.frame_count += 1;

        self.delta
    }

    /// 直前のフレームからの経過時間（秒）
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// 計測開始からの経過時間（秒）
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// フレーム数を取得
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// 現在のフレームレート（FPS）
    pub fn fps(&self) -> f32 {
        if self.delta == 0.0 {
            0.0
        } else {
            1.0 / self.delta
        }
    }
}
