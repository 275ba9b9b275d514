//! ユーティリティモジュール
//!
//! 時計、タイマー、ロギングなどゲーム全体で使用される補助機能です。

pub mod logger;
pub mod time;
pub mod timer;

pub use logger::*;
pub use time::*;
pub use timer::*;

/// 一様乱数 `[min, min + |max - min|)` を返す
///
/// `min > max` の場合も幅の絶対値を使います。
pub fn random_range<R: rand::Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    min + rng.gen::<f32>() * (max - min).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_range_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = random_range(&mut rng, 20.0, 40.0);
            assert!((20.0..40.0).contains(&v));
        }
    }

    #[test]
    fn test_random_range_swapped_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = random_range(&mut rng, 40.0, 20.0);
            assert!((40.0..60.0).contains(&v));
        }
    }

    #[test]
    fn test_random_range_empty_width() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(random_range(&mut rng, 5.0, 5.0), 5.0);
    }
}
