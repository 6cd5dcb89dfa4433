//! 分割结果评价指标: Dice 损失 / Dice 分数 / 3D Hausdorff 距离.

use ndarray::{Array, ArrayBase, Data, Dimension, Ix3, Zip};
use num::Zero;
use ordered_float::OrderedFloat;

use crate::consts::DICE_SMOOTH;
use crate::error::{Error, Result};
use crate::Idx3d;

/// 检查两个数组形状一致.
fn check_shape<S1, S2, D1, D2>(a: &ArrayBase<S1, D1>, b: &ArrayBase<S2, D2>) -> Result<()>
where
    S1: Data,
    S2: Data,
    D1: Dimension,
    D2: Dimension,
{
    if a.shape() == b.shape() {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "shape mismatch: {:?} vs {:?}",
            a.shape(),
            b.shape()
        )))
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Dice 损失 `1 - (2Σpt + s) / (Σp + Σt + s)`, 其中 `p = sigmoid(logits)`.
///
/// 平滑常数 `s` 避免了分母为 0. 除损失值外还提供对 logits 的解析梯度,
/// 可直接接入基于梯度的优化流程.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DiceLoss {
    smooth: f64,
}

impl Default for DiceLoss {
    #[inline]
    fn default() -> Self {
        Self::new(DICE_SMOOTH)
    }
}

impl DiceLoss {
    /// 指定平滑常数.
    #[inline]
    pub fn new(smooth: f64) -> Self {
        Self { smooth }
    }

    /// 平滑常数.
    #[inline]
    pub fn smooth(&self) -> f64 {
        self.smooth
    }

    /// 计算 `(Σpt, Σp + Σt)` 与概率 `p`.
    fn sums<S1, S2, D, A, B>(
        &self,
        logits: &ArrayBase<S1, D>,
        target: &ArrayBase<S2, D>,
    ) -> Result<(f64, f64, Array<f64, D>)>
    where
        S1: Data<Elem = A>,
        S2: Data<Elem = B>,
        D: Dimension,
        A: Copy + Into<f64>,
        B: Copy + Into<f64>,
    {
        check_shape(logits, target)?;
        let prob = logits.mapv(|x| sigmoid(x.into()));
        let mut inter = 0.0;
        let mut total = 0.0;
        Zip::from(&prob).and(target).for_each(|&p, &t| {
            let t: f64 = t.into();
            inter += p * t;
            total += p + t;
        });
        Ok((inter, total, prob))
    }

    /// 损失值.
    pub fn forward<S1, S2, D, A, B>(
        &self,
        logits: &ArrayBase<S1, D>,
        target: &ArrayBase<S2, D>,
    ) -> Result<f64>
    where
        S1: Data<Elem = A>,
        S2: Data<Elem = B>,
        D: Dimension,
        A: Copy + Into<f64>,
        B: Copy + Into<f64>,
    {
        let (inter, total, _) = self.sums(logits, target)?;
        Ok(1.0 - (2.0 * inter + self.smooth) / (total + self.smooth))
    }

    /// 损失值及其对 `logits` 的梯度.
    pub fn forward_backward<S1, S2, D, A, B>(
        &self,
        logits: &ArrayBase<S1, D>,
        target: &ArrayBase<S2, D>,
    ) -> Result<(f64, Array<f64, D>)>
    where
        S1: Data<Elem = A>,
        S2: Data<Elem = B>,
        D: Dimension,
        A: Copy + Into<f64>,
        B: Copy + Into<f64>,
    {
        let (inter, total, mut grad) = self.sums(logits, target)?;
        let num = 2.0 * inter + self.smooth;
        let den = total + self.smooth;

        // d(dice)/dp = (2t * den - num) / den², dp/dx = p(1 - p).
        Zip::from(&mut grad).and(target).for_each(|g, &t| {
            let p = *g;
            let t: f64 = t.into();
            let d_dice = (2.0 * t * den - num) / (den * den);
            *g = -d_dice * p * (1.0 - p);
        });
        Ok((1.0 - num / den, grad))
    }

    /// 损失对 `logits` 的梯度.
    #[inline]
    pub fn backward<S1, S2, D, A, B>(
        &self,
        logits: &ArrayBase<S1, D>,
        target: &ArrayBase<S2, D>,
    ) -> Result<Array<f64, D>>
    where
        S1: Data<Elem = A>,
        S2: Data<Elem = B>,
        D: Dimension,
        A: Copy + Into<f64>,
        B: Copy + Into<f64>,
    {
        self.forward_backward(logits, target).map(|(_, g)| g)
    }
}

/// Dice 分数 `(2Σab + s) / (Σa + Σb + s)`. 输入直接参与计算, 不做 sigmoid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DiceScore {
    smooth: f64,
}

impl Default for DiceScore {
    #[inline]
    fn default() -> Self {
        Self::new(DICE_SMOOTH)
    }
}

impl DiceScore {
    /// 指定平滑常数.
    #[inline]
    pub fn new(smooth: f64) -> Self {
        Self { smooth }
    }

    /// 计算分数. 两者形状不一致时返回 [`Error::InvalidArgument`].
    pub fn eval<S1, S2, D, A, B>(
        &self,
        input: &ArrayBase<S1, D>,
        target: &ArrayBase<S2, D>,
    ) -> Result<f64>
    where
        S1: Data<Elem = A>,
        S2: Data<Elem = B>,
        D: Dimension,
        A: Copy + Into<f64>,
        B: Copy + Into<f64>,
    {
        check_shape(input, target)?;
        let mut inter = 0.0;
        let mut total = 0.0;
        Zip::from(input).and(target).for_each(|&a, &b| {
            let (a, b): (f64, f64) = (a.into(), b.into());
            inter += a * b;
            total += a + b;
        });
        Ok((2.0 * inter + self.smooth) / (total + self.smooth))
    }
}

/// 所有非零体素的坐标.
fn nonzero<S, A>(mask: &ArrayBase<S, Ix3>) -> Vec<Idx3d>
where
    S: Data<Elem = A>,
    A: Zero + PartialEq,
{
    let zero = A::zero();
    mask.indexed_iter()
        .filter_map(|(pos, v)| (*v != zero).then_some(pos))
        .collect()
}

/// `p` 到点集 `to` 的最近欧氏距离.
fn min_dist(p: &Idx3d, to: &[Idx3d]) -> f64 {
    let d = |a: usize, b: usize| a.abs_diff(b) as f64;
    to.iter()
        .map(|q| {
            let (dx, dy, dz) = (d(p.0, q.0), d(p.1, q.1), d(p.2, q.2));
            dx * dx + dy * dy + dz * dz
        })
        .fold(f64::INFINITY, f64::min)
        .sqrt()
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

        /// 有向 Hausdorff 距离 `max_{p in from} min_{q in to} |p - q|`.
        fn directed(from: &[Idx3d], to: &[Idx3d]) -> f64 {
            from.par_iter()
                .map(|p| OrderedFloat(min_dist(p, to)))
                .max()
                .map_or(0.0, |d| d.0)
        }
    } else {
        /// 有向 Hausdorff 距离 `max_{p in from} min_{q in to} |p - q|`.
        fn directed(from: &[Idx3d], to: &[Idx3d]) -> f64 {
            from.iter()
                .map(|p| OrderedFloat(min_dist(p, to)))
                .max()
                .map_or(0.0, |d| d.0)
        }
    }
}

/// 两个 3D 掩膜非零体素集合之间的对称 Hausdorff 距离 (以体素为单位).
///
/// 形状不一致或任一掩膜没有非零体素时返回 [`Error::InvalidArgument`].
pub fn hausdorff_3d<S1, S2, A, B>(input: &ArrayBase<S1, Ix3>, target: &ArrayBase<S2, Ix3>) -> Result<f64>
where
    S1: Data<Elem = A>,
    S2: Data<Elem = B>,
    A: Zero + PartialEq,
    B: Zero + PartialEq,
{
    check_shape(input, target)?;
    let a = nonzero(input);
    let b = nonzero(target);
    if a.is_empty() || b.is_empty() {
        return Err(Error::invalid("Hausdorff distance of an empty mask"));
    }
    Ok(directed(&a, &b).max(directed(&b, &a)))
}
