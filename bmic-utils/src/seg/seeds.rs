//! 掩膜内的 k-means++ 播种.

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::Centroid;
use crate::consts::slic::{DENSE_FACTOR, KMEANS_ITER, MASK_SEED};

type Point = [f64; 3];

#[inline]
fn dist2(a: &Point, b: &Point) -> f64 {
    a.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum()
}

/// 与 `p` 最近的中心下标. 距离相同时取下标最小者.
fn nearest(p: &Point, centers: &[Point]) -> usize {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centers.iter().enumerate() {
        let d = dist2(p, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best.0
}

/// k-means++ 初始化.
fn init_plus_plus(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    debug_assert!(k >= 1 && k <= points.len());
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..points.len())]);

    let mut d2: Vec<f64> = points.iter().map(|p| dist2(p, &centers[0])).collect();
    while centers.len() < k {
        let total: f64 = d2.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            d2.iter()
                .position(|d| {
                    target -= d;
                    target < 0.0
                })
                .unwrap_or(points.len() - 1)
        } else {
            // 所有点都与已有中心重合.
            rng.random_range(0..points.len())
        };
        let c = points[next];
        d2.iter_mut()
            .zip(points)
            .for_each(|(d, p)| *d = d.min(dist2(p, &c)));
        centers.push(c);
    }
    centers
}

/// Lloyd 迭代. 空簇保持原中心不动.
fn lloyd(points: &[Point], centers: &mut [Point], iterations: usize) {
    let k = centers.len();
    for _ in 0..iterations {
        let mut sums = vec![[0.0; 3]; k];
        let mut counts = vec![0usize; k];
        for p in points {
            let i = nearest(p, centers);
            counts[i] += 1;
            sums[i].iter_mut().zip(p).for_each(|(s, v)| *s += v);
        }
        let mut moved = false;
        for ((c, s), n) in centers.iter_mut().zip(&sums).zip(&counts) {
            if *n == 0 {
                continue;
            }
            let mean = s.map(|v| v / *n as f64);
            moved |= mean != *c;
            *c = mean;
        }
        if !moved {
            break;
        }
    }
}

/// 在掩膜内挑选至多 `n_points` 个初始聚类中心, 并估计各轴步长.
///
/// 坐标以固定种子打乱, 超过 `DENSE_FACTOR^3 * n_points` 个时只取前面一部分参与 k-means.
/// 步长为每个中心到其最近的其他中心的各轴距离的平均值; 只有一个中心时为 1.
///
/// 掩膜不能为空.
pub(crate) fn mask_centroids(mask: &Array3<bool>, n_points: usize) -> (Vec<Centroid>, [f64; 3]) {
    let mut coords: Vec<Point> = mask
        .indexed_iter()
        .filter_map(|((x, y, z), m)| m.then_some([x as f64, y as f64, z as f64]))
        .collect();
    debug_assert!(!coords.is_empty());

    let mut rng = StdRng::seed_from_u64(MASK_SEED);
    coords.shuffle(&mut rng);
    let n_dense = DENSE_FACTOR.pow(3).saturating_mul(n_points);
    coords.truncate(n_dense);

    let k = n_points.clamp(1, coords.len());
    let mut centers = init_plus_plus(&coords, k, &mut rng);
    lloyd(&coords, &mut centers, KMEANS_ITER);

    let steps = if k == 1 {
        [1.0; 3]
    } else {
        let mut acc = [0.0; 3];
        for (i, c) in centers.iter().enumerate() {
            let closest = centers
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .min_by(|(_, a), (_, b)| dist2(c, a).total_cmp(&dist2(c, b)))
                .map(|(_, p)| p)
                .unwrap_or(c);
            acc.iter_mut()
                .zip(c.iter().zip(closest))
                .for_each(|(s, (a, b))| *s += (a - b).abs());
        }
        acc.map(|s| s / k as f64)
    };

    (centers.into_iter().map(Centroid::at).collect(), steps)
}
