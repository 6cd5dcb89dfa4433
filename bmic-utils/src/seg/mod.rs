//! 3D 超像素分割.
//!
//! 对单通道 3D 体数据运行 SLIC-zero 聚类, 得到约 `n_seg` 个大小相近、
//! 各自连通的超像素. 标签从 1 开始; 给定强度窗口时, 窗口外的体素标签为 0.
//!
//! 流程: 强度窗口掩膜 → 按掩膜内极值归一化到 `[0, 1]` → (可选) 高斯平滑
//! → 播种 → 局部 k-means 迭代 → 连通性约束.

use ndarray::{Array3, ArrayView3, ArrayViewD, Ix3};
use serde::{Deserialize, Serialize};

use crate::consts::slic::*;
use crate::data::{Limits, WindowMask};
use crate::error::{Error, Result};

mod cluster;
mod connectivity;
mod gaussian;
mod grid;
mod seeds;

use cluster::Slic;

/// 聚类中心: 空间位置 `(x, y, z)` 与强度.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Centroid {
    pos: [f64; 3],
    color: f64,
}

impl Centroid {
    #[inline]
    fn at(pos: [f64; 3]) -> Self {
        Self { pos, color: 0.0 }
    }

    /// 取中心所在 (四舍五入后) 体素的强度作为初始颜色.
    fn sample(&mut self, image: &Array3<f64>) {
        let (nx, ny, nz) = image.dim();
        let idx = |v: f64, n: usize| (v.round().max(0.0) as usize).min(n - 1);
        self.color = image[(idx(self.pos[0], nx), idx(self.pos[1], ny), idx(self.pos[2], nz))];
    }
}

/// 超像素分割参数.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicParams {
    /// 期望的超像素个数 (近似值).
    pub n_seg: usize,

    /// 聚类前高斯平滑的带宽. 0 表示不平滑.
    pub sigma: f64,

    /// 紧致度. 越大则超像素越规整, 越小则越贴合强度边界.
    pub compactness: f64,

    /// 强度窗口. 仅窗口内 (严格) 的体素参与分割.
    pub limits: Option<Limits>,
}

impl Default for SlicParams {
    fn default() -> Self {
        Self {
            n_seg: DEFAULT_N_SEG,
            sigma: DEFAULT_SIGMA,
            compactness: DEFAULT_COMPACTNESS,
            limits: None,
        }
    }
}

impl SlicParams {
    /// 设置超像素个数.
    #[inline]
    pub fn with_n_seg(mut self, n_seg: usize) -> Self {
        self.n_seg = n_seg;
        self
    }

    /// 设置平滑带宽.
    #[inline]
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// 设置紧致度.
    #[inline]
    pub fn with_compactness(mut self, compactness: f64) -> Self {
        self.compactness = compactness;
        self
    }

    /// 设置强度窗口.
    #[inline]
    pub fn with_limits(mut self, limits: Option<Limits>) -> Self {
        self.limits = limits;
        self
    }

    /// 设置强度窗口 `(lo, hi)`. 区间不合法时返回 [`Error::InvalidArgument`],
    /// 而不是像 `with_limits(Limits::new(lo, hi))` 那样退化为不加窗口.
    pub fn with_window(self, lo: f32, hi: f32) -> Result<Self> {
        Limits::try_new(lo, hi).map(|l| self.with_limits(Some(l)))
    }

    /// 检查参数.
    pub fn validate(&self) -> Result<()> {
        if self.n_seg == 0 {
            return Err(Error::invalid("n_seg must be at least 1"));
        }
        if !(self.compactness > 0.0 && self.compactness.is_finite()) {
            return Err(Error::invalid(format!(
                "compactness must be positive, got {}",
                self.compactness
            )));
        }
        if !(self.sigma >= 0.0 && self.sigma.is_finite()) {
            return Err(Error::invalid(format!(
                "sigma must be non-negative, got {}",
                self.sigma
            )));
        }
        Ok(())
    }
}

/// 对 3D 体数据做超像素分割, 返回与 `volume` 同形状的标签数组.
///
/// # 强度窗口
///
/// 给定 `params.limits` 时, 只有满足 `lo < v < hi` 的体素参与分割, 其余标签为 0.
/// 若没有任何体素落在窗口内, 则放弃窗口限制, 改为对同形状的全零体数据做全域分割
/// (结果与 `segment_3d(zeros, limits = None)` 相同), 不会报错.
///
/// # 错误
///
/// 参数不合法、`volume` 为空或 (掩膜内) 含有 NaN/inf 时返回 [`Error::InvalidArgument`].
///
/// # 返回值
///
/// 标签从 1 开始连续编号, 每个标签是单个 6-连通分量. 对相同输入结果一致.
pub fn segment_3d(volume: ArrayView3<f32>, params: &SlicParams) -> Result<Array3<u32>> {
    params.validate()?;
    if volume.is_empty() {
        return Err(Error::invalid("cannot segment an empty volume"));
    }

    let (mut image, mask) = match params.limits.map(|l| WindowMask::eval(volume, &l)) {
        None => (volume.mapv(f64::from), None),
        Some(WindowMask::Restricted(m)) => (volume.mapv(f64::from), Some(m)),
        Some(WindowMask::Degenerate) => {
            log::warn!(
                "no voxel strictly inside {:?}, segmenting a blank volume instead",
                params.limits
            );
            (Array3::zeros(volume.raw_dim()), None)
        }
    };
    // 全真掩膜与不加掩膜等价.
    let mask = mask.filter(|m| !m.iter().all(|b| *b));
    let masked_len = mask
        .as_ref()
        .map_or(image.len(), |m| m.iter().filter(|b| **b).count());

    normalize(&mut image, mask.as_ref())?;
    gaussian::smooth(&mut image, params.sigma);

    let shape = [image.dim().0, image.dim().1, image.dim().2];
    let (mut centroids, steps) = match mask.as_ref() {
        None => grid::grid_centroids(shape, params.n_seg),
        Some(m) => seeds::mask_centroids(m, params.n_seg),
    };
    let step = steps.into_iter().fold(1.0, f64::max);

    image.mapv_inplace(|v| v / params.compactness);
    centroids.iter_mut().for_each(|c| c.sample(&image));
    let k = centroids.len();
    log::debug!("slic: {k} seeds, step {step}, {masked_len} voxels to label");

    let clusters = Slic::new(&image, mask.as_ref(), centroids, step).run();

    let segment_size = masked_len as f64 / k as f64;
    let min_size = (MIN_SIZE_FACTOR * segment_size) as usize;
    let max_size = (MAX_SIZE_FACTOR * segment_size) as usize;
    Ok(connectivity::enforce_connectivity(
        &clusters, min_size, max_size,
    ))
}

/// 与 [`segment_3d`] 相同, 但接受任意维度的数组. 非 3D 输入返回 [`Error::InvalidArgument`].
pub fn segment_dyn(volume: ArrayViewD<f32>, params: &SlicParams) -> Result<Array3<u32>> {
    let ndim = volume.ndim();
    let volume = volume
        .into_dimensionality::<Ix3>()
        .map_err(|_| Error::invalid(format!("expected a 3D volume, got {ndim} dimensions")))?;
    segment_3d(volume, params)
}

/// 按掩膜内 (无掩膜时全体) 体素的最小/最大值把强度线性映射到 `[0, 1]`.
/// 最小值等于最大值时不做任何处理.
fn normalize(image: &mut Array3<f64>, mask: Option<&Array3<bool>>) -> Result<()> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (pos, v) in image.indexed_iter() {
        if mask.map_or(true, |m| m[pos]) {
            if !v.is_finite() {
                return Err(Error::invalid("volume contains NaN or infinite values"));
            }
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
    }
    if hi > lo {
        let range = hi - lo;
        image.mapv_inplace(|v| (v - lo) / range);
    }
    Ok(())
}
