//! 可视化辅助: 挑选最有代表性的正交切片并保存为灰度图.

use std::cmp::Reverse;
use std::path::{Path, PathBuf};

use ndarray::{ArrayView2, ArrayView3, Axis};

use crate::data::Limits;
use crate::error::{Error, Result};
use crate::Idx3d;

/// 每个分组 (下标) 上另一坐标的 `(min, max)`.
type Spans = Vec<Option<(usize, usize)>>;

#[inline]
fn widen(span: &mut Option<(usize, usize)>, v: usize) {
    *span = Some(match *span {
        Some((lo, hi)) => (lo.min(v), hi.max(v)),
        None => (v, v),
    });
}

/// 跨度 (`max - min`) 最大的分组下标. 跨度相同时取最小下标.
fn widest(spans: &Spans) -> Option<usize> {
    spans
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.map(|(lo, hi)| (i, hi - lo)))
        .max_by_key(|(i, span)| (*span, Reverse(*i)))
        .map(|(i, _)| i)
}

/// 求最适合展示的三个正交切片下标 `(x, y, z)`.
///
/// 仅考虑非零体素:
///
/// 1. `x`: 使该 x 切片上非零体素在 y 方向跨度最大的 x;
/// 2. `y`: 使该 y 切片上非零体素在 z 方向跨度最大的 y;
/// 3. `z`: 使该 z 切片上非零体素在 x 方向跨度最大的 z.
///
/// 跨度相同时取最小下标. 不存在非零体素时返回 `None`.
pub fn best_view_indices(volume: ArrayView3<f32>) -> Option<Idx3d> {
    let (nx, ny, nz) = volume.dim();
    let mut y_of_x: Spans = vec![None; nx];
    let mut z_of_y: Spans = vec![None; ny];
    let mut x_of_z: Spans = vec![None; nz];

    for ((x, y, z), _) in volume.indexed_iter().filter(|(_, v)| **v != 0.0) {
        widen(&mut y_of_x[x], y);
        widen(&mut z_of_y[y], z);
        widen(&mut x_of_z[z], x);
    }
    Some((widest(&y_of_x)?, widest(&z_of_y)?, widest(&x_of_z)?))
}

/// 按 `window` 把二维切片映射为 8-bit 灰度图并保存. 切片第一维为图像的行.
fn save_slice(slice: ArrayView2<f32>, window: &Limits, path: &Path) -> Result<()> {
    let (height, width) = slice.dim();
    let mut buf = image::GrayImage::new(width as u32, height as u32);
    for ((h, w), &v) in slice.indexed_iter() {
        let gray = window.eval(v).unwrap_or(0);
        buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
    }
    buf.save(path)?;
    Ok(())
}

/// 体数据的有限值范围. 全部相等或没有有限值时把窗口放宽到 1.
fn full_range(volume: ArrayView3<f32>) -> Limits {
    let (lo, hi) = volume
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    Limits::new(lo, hi).unwrap_or_else(|| Limits::around(if lo.is_finite() { lo } else { 0.0 }))
}

/// 在 [`best_view_indices`] 给出的位置 (没有非零体素时取中心) 保存三张正交切片,
/// 依次为 `x_{i}.png`, `y_{j}.png`, `z_{k}.png`. 灰度按 `limits`
/// (缺省时为体数据的取值范围) 线性映射.
///
/// 返回写入的三个路径. `volume` 为空时返回 [`Error::InvalidArgument`].
pub fn save_views<P: AsRef<Path>>(
    volume: ArrayView3<f32>,
    dir: P,
    limits: Option<Limits>,
) -> Result<[PathBuf; 3]> {
    if volume.is_empty() {
        return Err(Error::invalid(format!(
            "cannot take views of an empty volume {:?}",
            volume.dim()
        )));
    }
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let (nx, ny, nz) = volume.dim();
    let (x, y, z) = best_view_indices(volume).unwrap_or((nx / 2, ny / 2, nz / 2));
    let window = limits.unwrap_or_else(|| full_range(volume));

    let paths = [
        dir.join(format!("x_{x}.png")),
        dir.join(format!("y_{y}.png")),
        dir.join(format!("z_{z}.png")),
    ];
    for (axis, (index, path)) in [x, y, z].into_iter().zip(&paths).enumerate() {
        save_slice(volume.index_axis(Axis(axis), index), &window, path)?;
    }
    log::debug!("saved views at ({x}, {y}, {z}) to `{}`", dir.display());
    Ok(paths)
}
