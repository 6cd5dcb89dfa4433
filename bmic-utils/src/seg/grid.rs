//! 规则网格播种.

use itertools::iproduct;

use super::Centroid;

/// 单个坐标轴上的采样方式: `start, start + step, ...`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct AxisStride {
    pub start: usize,
    pub step: usize,
}

/// `x.5` 时取偶数的四舍五入.
fn round_half_even(v: f64) -> f64 {
    let r = v.round();
    if (v - v.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - v.signum()
    } else {
        r
    }
}

/// 在形状为 `shape` 的网格上大致均匀地选取 `n_points` 个点, 返回每个轴上的采样方式.
///
/// 所有轴的步长初始都取 `(体素数 / n_points)^(1/3)`; 若某些轴比该步长还短,
/// 则从最短的轴开始, 令其步长等于自身长度, 并将剩余点数重新均摊到其余轴上.
pub(crate) fn regular_grid(shape: [usize; 3], n_points: usize) -> [AxisStride; 3] {
    let whole = AxisStride { start: 0, step: 1 };
    let n = n_points.max(1) as f64;
    let space: f64 = shape.iter().map(|d| *d as f64).product();
    if space <= n {
        return [whole; 3];
    }

    let mut order = [0, 1, 2];
    order.sort_by_key(|&i| shape[i]);
    let sorted = order.map(|i| shape[i] as f64);

    let mut steps = [(space / n).powf(1.0 / 3.0); 3];
    if sorted.iter().zip(&steps).any(|(d, s)| d < s) {
        for dim in 0..3 {
            steps[dim] = sorted[dim];
            let rest = 3 - dim - 1;
            if rest > 0 {
                let remaining: f64 = sorted[dim + 1..].iter().product();
                let s = (remaining / n).powf(1.0 / rest as f64);
                steps[dim + 1..].iter_mut().for_each(|v| *v = s);
            }
            if sorted.iter().zip(&steps).all(|(d, s)| d >= s) {
                break;
            }
        }
    }

    let mut out = [whole; 3];
    for (k, &axis) in order.iter().enumerate() {
        out[axis] = AxisStride {
            start: (steps[k] / 2.0).floor() as usize,
            step: round_half_even(steps[k]).max(1.0) as usize,
        };
    }
    out
}

/// 规则网格上的初始聚类中心 (颜色待定), 以及各轴步长.
pub(crate) fn grid_centroids(shape: [usize; 3], n_points: usize) -> (Vec<Centroid>, [f64; 3]) {
    let grid = regular_grid(shape, n_points);
    let axis = |a: usize| (grid[a].start..shape[a]).step_by(grid[a].step);
    let centroids = iproduct!(axis(0), axis(1), axis(2))
        .map(|(x, y, z)| Centroid::at([x as f64, y as f64, z as f64]))
        .collect();
    (centroids, grid.map(|g| g.step as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(0.5), 0.0);
        assert_eq!(round_half_even(1.5), 2.0);
        assert_eq!(round_half_even(2.5), 2.0);
        assert_eq!(round_half_even(2.4), 2.0);
        assert_eq!(round_half_even(2.6), 3.0);
    }

    #[test]
    fn test_regular_grid_cube() {
        // 1000 / 8 = 125, 步长 5.
        let g = regular_grid([10, 10, 10], 8);
        assert!(g.iter().all(|s| *s == AxisStride { start: 2, step: 5 }));
        let (c, steps) = grid_centroids([10, 10, 10], 8);
        assert_eq!(c.len(), 8);
        assert_eq!(steps, [5.0; 3]);
        assert_eq!(c[0].pos, [2.0, 2.0, 2.0]);
        assert_eq!(c[7].pos, [7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_regular_grid_too_many_points() {
        let g = regular_grid([2, 2, 2], 500);
        assert!(g.iter().all(|s| *s == AxisStride { start: 0, step: 1 }));
        assert_eq!(grid_centroids([2, 2, 2], 500).0.len(), 8);
    }

    #[test]
    fn test_regular_grid_flat_axis() {
        // z 轴只有 1 层, 点数全部摊到 x/y 上.
        let g = regular_grid([20, 20, 1], 4);
        assert_eq!(g[2], AxisStride { start: 0, step: 1 });
        assert_eq!(g[0], AxisStride { start: 5, step: 10 });
        assert_eq!(g[1], AxisStride { start: 5, step: 10 });
        assert_eq!(grid_centroids([20, 20, 1], 4).0.len(), 4);
    }
}
