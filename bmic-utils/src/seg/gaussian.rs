//! 可分离高斯平滑.

use ndarray::{Array3, Axis};

use crate::consts::slic::GAUSSIAN_TRUNCATE;

/// 半样本对称反射 (`d c b a | a b c d | d c b a`) 下, 越界下标 `i` 对应的实际下标.
#[inline]
fn reflect(i: isize, n: isize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * n;
    let m = i.rem_euclid(period);
    (if m >= n { period - 1 - m } else { m }) as usize
}

/// 归一化的一维高斯核, 半径为 `round(GAUSSIAN_TRUNCATE * sigma)`.
fn kernel(sigma: f64) -> Vec<f64> {
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as isize;
    let mut k: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
        .collect();
    let sum: f64 = k.iter().sum();
    k.iter_mut().for_each(|w| *w /= sum);
    k
}

/// 沿三个轴依次做带宽为 `sigma` 的高斯平滑. `sigma <= 0` 时什么都不做.
pub(crate) fn smooth(volume: &mut Array3<f64>, sigma: f64) {
    if sigma <= 0.0 {
        return;
    }
    let k = kernel(sigma);
    let radius = (k.len() / 2) as isize;
    let mut buf = Vec::new();

    for axis in 0..3 {
        for mut lane in volume.lanes_mut(Axis(axis)) {
            buf.clear();
            buf.extend(lane.iter().copied());
            let n = buf.len() as isize;
            for (i, out) in lane.iter_mut().enumerate() {
                *out = k
                    .iter()
                    .enumerate()
                    .map(|(j, w)| w * buf[reflect(i as isize + j as isize - radius, n)])
                    .sum();
            }
        }
    }
}
