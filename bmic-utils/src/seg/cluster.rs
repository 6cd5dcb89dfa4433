//! SLIC-zero 局部迭代聚类.

use ndarray::{Array3, Zip};

use super::Centroid;
use crate::consts::slic::MAX_NUM_ITER;

/// 尚未分配到任何聚类的体素.
pub(crate) const UNASSIGNED: usize = usize::MAX;

/// 单个中心在某一轴上的搜索范围 `[c - 2 * step, c + 2 * step]`, 截断到 `[0, len)`.
#[inline]
fn window(c: f64, step: f64, len: usize) -> std::ops::Range<usize> {
    let lo = (c - 2.0 * step).max(0.0) as usize;
    let hi = ((c + 2.0 * step + 1.0) as usize).min(len);
    lo..hi.max(lo)
}

/// 局部 k-means 聚类的工作区.
///
/// 距离为 `空间距离² / step² + 颜色距离² / max_color[k]`, 其中 `max_color`
/// 为每个聚类迄今观察到的最大颜色距离 (SLIC-zero), 初值为 1, 只增不减.
pub(crate) struct Slic<'a> {
    image: &'a Array3<f64>,
    mask: Option<&'a Array3<bool>>,
    centroids: Vec<Centroid>,
    step: f64,
    max_color: Vec<f64>,
}

impl<'a> Slic<'a> {
    /// 初始化. `centroids` 的颜色需已按 `image` 采样.
    pub fn new(
        image: &'a Array3<f64>,
        mask: Option<&'a Array3<bool>>,
        centroids: Vec<Centroid>,
        step: f64,
    ) -> Self {
        let max_color = vec![1.0; centroids.len()];
        Self {
            image,
            mask,
            centroids,
            step,
            max_color,
        }
    }

    #[inline]
    fn in_mask(&self, pos: (usize, usize, usize)) -> bool {
        self.mask.map_or(true, |m| m[pos])
    }

    #[inline]
    fn distance(&self, k: usize, (x, y, z): (usize, usize, usize)) -> f64 {
        let c = &self.centroids[k];
        let spatial = (c.pos[0] - x as f64).powi(2)
            + (c.pos[1] - y as f64).powi(2)
            + (c.pos[2] - z as f64).powi(2);
        let color = (self.image[(x, y, z)] - c.color).powi(2);
        spatial / (self.step * self.step) + color / self.max_color[k]
    }

    /// 将每个中心搜索窗口内的体素分配给距离最近的中心.
    fn assign(&self, nearest: &mut Array3<usize>, distance: &mut Array3<f64>) {
        let (nx, ny, nz) = self.image.dim();
        distance.fill(f64::MAX);
        for (k, c) in self.centroids.iter().enumerate() {
            for x in window(c.pos[0], self.step, nx) {
                for y in window(c.pos[1], self.step, ny) {
                    for z in window(c.pos[2], self.step, nz) {
                        let pos = (x, y, z);
                        if !self.in_mask(pos) {
                            continue;
                        }
                        let d = self.distance(k, pos);
                        if distance[pos] > d {
                            distance[pos] = d;
                            nearest[pos] = k;
                        }
                    }
                }
            }
        }
    }

    /// 中心移动到所属体素的均值处. 空聚类保持不动.
    fn update_centroids(&mut self, nearest: &Array3<usize>) {
        let k = self.centroids.len();
        let mut sums = vec![[0.0f64; 4]; k];
        let mut counts = vec![0usize; k];
        for ((x, y, z), &n) in nearest.indexed_iter() {
            if n == UNASSIGNED {
                continue;
            }
            counts[n] += 1;
            let s = &mut sums[n];
            s[0] += x as f64;
            s[1] += y as f64;
            s[2] += z as f64;
            s[3] += self.image[(x, y, z)];
        }
        for ((c, s), &n) in self.centroids.iter_mut().zip(&sums).zip(&counts) {
            if n > 0 {
                let n = n as f64;
                c.pos = [s[0] / n, s[1] / n, s[2] / n];
                c.color = s[3] / n;
            }
        }
    }

    /// 更新每个聚类的最大颜色距离.
    fn update_max_color(&mut self, nearest: &Array3<usize>) {
        Zip::from(nearest).and(self.image).for_each(|&n, &v| {
            if n != UNASSIGNED {
                let d = (v - self.centroids[n].color).powi(2);
                if self.max_color[n] < d {
                    self.max_color[n] = d;
                }
            }
        });
    }

    /// 迭代直到分配不再变化或达到 `MAX_NUM_ITER` 次, 返回每个体素所属的中心下标.
    ///
    /// 掩膜外的体素为 [`UNASSIGNED`]. 掩膜内若有体素不在任何中心的搜索窗口内,
    /// 最后会被分配给全局距离最近的中心.
    pub fn run(mut self) -> Array3<usize> {
        let dim = self.image.raw_dim();
        let mut nearest = Array3::from_elem(dim.clone(), UNASSIGNED);
        let mut distance = Array3::from_elem(dim, f64::MAX);

        for iter in 0..MAX_NUM_ITER {
            let previous = nearest.clone();
            self.assign(&mut nearest, &mut distance);
            if nearest == previous {
                log::debug!("slic converged after {iter} iterations");
                break;
            }
            self.update_centroids(&nearest);
            self.update_max_color(&nearest);
        }

        self.assign_orphans(&mut nearest);
        nearest
    }

    fn assign_orphans(&self, nearest: &mut Array3<usize>) {
        let orphans: Vec<_> = nearest
            .indexed_iter()
            .filter(|(pos, n)| **n == UNASSIGNED && self.in_mask(*pos))
            .map(|(pos, _)| pos)
            .collect();
        if !orphans.is_empty() {
            log::debug!("{} voxels outside every search window", orphans.len());
        }
        for pos in orphans {
            let best = (0..self.centroids.len())
                .map(|k| (k, self.distance(k, pos)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(k, _)| k);
            if let Some(k) = best {
                nearest[pos] = k;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window() {
        assert_eq!(window(0.0, 2.0, 10), 0..5);
        assert_eq!(window(5.0, 2.0, 10), 1..10);
        assert_eq!(window(9.0, 1.0, 10), 7..10);
    }

    #[test]
    fn test_two_intensity_halves() {
        // 左半为 0, 右半为 100 (颜色尺度远大于空间尺度).
        let image = Array3::from_shape_fn((8, 4, 4), |(x, _, _)| if x < 4 { 0.0 } else { 100.0 });
        let mut centroids = vec![Centroid::at([3.0, 1.5, 1.5]), Centroid::at([4.0, 1.5, 1.5])];
        for c in centroids.iter_mut() {
            c.sample(&image);
        }
        let nearest = Slic::new(&image, None, centroids, 4.0).run();
        for ((x, _, _), &n) in nearest.indexed_iter() {
            assert_eq!(n, usize::from(x >= 4));
        }
    }

    #[test]
    fn test_mask_excluded() {
        let image = Array3::<f64>::zeros((3, 3, 3));
        let mask = Array3::from_shape_fn((3, 3, 3), |(x, _, _)| x == 1);
        let centroids = vec![Centroid::at([1.0, 1.0, 1.0])];
        let nearest = Slic::new(&image, Some(&mask), centroids, 1.0).run();
        for (pos, &n) in nearest.indexed_iter() {
            assert_eq!(n == UNASSIGNED, !mask[pos]);
        }
    }
}
