//! 强度窗口与由其导出的掩膜.

use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 强度窗口 `(lo, hi)`. 体素值 `v` 在窗口内当且仅当 `lo < v < hi` (两侧严格).
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f32; 2]", into = "[f32; 2]")]
pub struct Limits {
    lo: f32,
    hi: f32,
}

impl TryFrom<[f32; 2]> for Limits {
    type Error = String;

    fn try_from([lo, hi]: [f32; 2]) -> std::result::Result<Self, Self::Error> {
        Self::new(lo, hi).ok_or_else(|| format!("malformed limits pair ({lo}, {hi})"))
    }
}

impl From<Limits> for [f32; 2] {
    #[inline]
    fn from(l: Limits) -> Self {
        [l.lo, l.hi]
    }
}

impl Limits {
    /// 构建窗口.
    ///
    /// 若 `lo` 或 `hi` 为 NaN, 或 `lo >= hi`, 则返回 `None`.
    pub fn new(lo: f32, hi: f32) -> Option<Limits> {
        (lo < hi).then_some(Self { lo, hi })
    }

    /// 与 [`Limits::new`] 相同, 但对不合法的区间返回 [`Error::InvalidArgument`].
    pub fn try_new(lo: f32, hi: f32) -> Result<Limits> {
        Self::new(lo, hi).ok_or_else(|| Error::invalid(format!("malformed limits pair ({lo}, {hi})")))
    }

    /// 由窗位 `level` 和窗宽 `width` 构建窗口, 即 `(level - width / 2, level + width / 2)`.
    ///
    /// `width` 必须为正且两者有限, 否则返回 `None`.
    pub fn from_window(level: f32, width: f32) -> Option<Limits> {
        if level.is_finite() && width.is_finite() && width > 0.0 {
            Self::new(level - width / 2.0, level + width / 2.0)
        } else {
            None
        }
    }

    /// 以 `center` 为中心, 宽为 1 的窗口.
    #[inline]
    pub(crate) fn around(center: f32) -> Limits {
        Self {
            lo: center - 0.5,
            hi: center + 0.5,
        }
    }

    /// 窗下限 (不含).
    #[inline]
    pub fn lo(&self) -> f32 {
        self.lo
    }

    /// 窗上限 (不含).
    #[inline]
    pub fn hi(&self) -> f32 {
        self.hi
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.hi - self.lo
    }

    /// `v` 是否严格位于窗口内.
    #[inline]
    pub fn contains(&self, v: f32) -> bool {
        self.lo < v && v < self.hi
    }

    /// 求 `v` 在当前窗口下对应的灰度图像素整数值 (0 <= value <= 255).
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        if !v.is_finite() {
            return None;
        }
        if v <= self.lo {
            Some(u8::MIN)
        } else if v >= self.hi {
            Some(u8::MAX)
        } else {
            // 255, not 256.
            Some(((v - self.lo) / self.width() * 255.0) as u8)
        }
    }

    /// 逐体素求窗口掩膜.
    pub fn mask(&self, volume: ArrayView3<f32>) -> Array3<bool> {
        volume.map(|v| self.contains(*v))
    }
}

/// 窗口掩膜的求值结果.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowMask {
    /// 至少一个体素在窗口内.
    Restricted(Array3<bool>),

    /// 没有任何体素在窗口内. 此时应改为对同形状的全零体数据进行全域分割.
    Degenerate,
}

impl WindowMask {
    /// 对 `volume` 应用 `limits`.
    pub fn eval(volume: ArrayView3<f32>, limits: &Limits) -> Self {
        let mask = limits.mask(volume);
        if mask.iter().any(|m| *m) {
            Self::Restricted(mask)
        } else {
            Self::Degenerate
        }
    }

    /// 是否为退化窗口.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Degenerate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn is_valid_init(lo: f32, hi: f32) -> bool {
        Limits::new(lo, hi).is_some()
    }

    #[test]
    fn test_limits_invalid_input() {
        assert!(!is_valid_init(1.0, 1.0));
        assert!(!is_valid_init(2.0, 1.0));
        assert!(!is_valid_init(f32::NAN, 1.0));
        assert!(!is_valid_init(0.0, f32::NAN));
        assert!(Limits::from_window(0.0, 0.0).is_none());
        assert!(Limits::from_window(f32::INFINITY, 1.0).is_none());
    }

    #[test]
    fn test_limits_try_new() {
        assert!(Limits::try_new(0.0, 1.0).is_ok());
        for (lo, hi) in [(1.0, 0.0), (1.0, 1.0), (f32::NAN, 1.0)] {
            let err = Limits::try_new(lo, hi).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_limits_strict() {
        let l = Limits::new(0.0, 10.0).unwrap();
        assert!(!l.contains(0.0));
        assert!(!l.contains(10.0));
        assert!(l.contains(0.001));
        assert!(l.contains(5.0));

        let w = Limits::from_window(60.0, 200.0).unwrap();
        assert_eq!((w.lo(), w.hi()), (-40.0, 160.0));
    }

    #[test]
    fn test_limits_eval() {
        // [60, 100]
        let l = Limits::from_window(80.0, 40.0).unwrap();
        assert_eq!(l.eval(f32::NAN), None);
        assert_eq!(l.eval(f32::MIN), Some(0));
        assert_eq!(l.eval(f32::MAX), Some(255));
        assert_eq!(l.eval(60.0), Some(0));
        assert_eq!(l.eval(80.0), Some((255.0 * 0.5) as u8));
        assert_eq!(l.eval(99.999), Some(254));
        assert_eq!(l.eval(100.0), Some(255));
    }

    #[test]
    fn test_window_mask() {
        let mut v = Array3::<f32>::zeros((3, 3, 3));
        v[(1, 1, 1)] = 5.0;
        let l = Limits::new(0.0, 10.0).unwrap();
        match WindowMask::eval(v.view(), &l) {
            WindowMask::Restricted(m) => {
                assert_eq!(m.iter().filter(|b| **b).count(), 1);
                assert!(m[(1, 1, 1)]);
            }
            WindowMask::Degenerate => panic!("window should select one voxel"),
        }

        let l = Limits::new(5.0, 10.0).unwrap();
        assert!(WindowMask::eval(v.view(), &l).is_degenerate());
    }

    #[test]
    fn test_limits_serde() {
        let l: Limits = serde_json::from_str("[-1.5, 2.0]").unwrap();
        assert_eq!((l.lo(), l.hi()), (-1.5, 2.0));
        assert!(serde_json::from_str::<Limits>("[3.0, 2.0]").is_err());
        assert_eq!(serde_json::to_string(&l).unwrap(), "[-1.5,2.0]");
    }
}
