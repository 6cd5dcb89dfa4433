//! 体素索引到物理坐标的 4x4 仿射矩阵.

use nifti::NiftiHeader;
use serde::{Deserialize, Serialize};

/// sform/qform code `NIFTI_XFORM_ALIGNED_ANAT`.
const XFORM_ALIGNED_ANAT: i16 = 2;

/// 4x4 仿射矩阵, 行优先存储. 最后一行恒为 `[0, 0, 0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Affine([[f64; 4]; 4]);

impl Default for Affine {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

impl From<[[f64; 4]; 4]> for Affine {
    #[inline]
    fn from(m: [[f64; 4]; 4]) -> Self {
        Self(m)
    }
}

impl Affine {
    /// 单位矩阵.
    pub const fn identity() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 对角缩放矩阵, 平移为 0.
    pub const fn from_zooms([x, y, z]: [f64; 3]) -> Self {
        Self([
            [x, 0.0, 0.0, 0.0],
            [0.0, y, 0.0, 0.0],
            [0.0, 0.0, z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 获取行优先的矩阵内容.
    #[inline]
    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.0
    }

    /// 是否为单位矩阵.
    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// 体素索引 `(i, j, k)` 对应的物理坐标.
    pub fn apply(&self, [i, j, k]: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        std::array::from_fn(|r| m[r][0] * i + m[r][1] * j + m[r][2] * k + m[r][3])
    }

    /// 线性部分各列的模长, 即三个方向上的体素尺寸.
    pub fn zooms(&self) -> [f64; 3] {
        let m = &self.0;
        std::array::from_fn(|c| (0..3).map(|r| m[r][c] * m[r][c]).sum::<f64>().sqrt())
    }

    /// 按 sform > qform > 基础仿射的优先级从 header 中取出仿射矩阵.
    pub fn from_header(h: &NiftiHeader) -> Self {
        if h.sform_code > 0 {
            Self::from_sform(h)
        } else if h.qform_code > 0 {
            Self::from_qform(h)
        } else {
            Self::base(h)
        }
    }

    fn from_sform(h: &NiftiHeader) -> Self {
        let row = |r: &[f32; 4]| r.map(f64::from);
        Self([
            row(&h.srow_x),
            row(&h.srow_y),
            row(&h.srow_z),
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    fn from_qform(h: &NiftiHeader) -> Self {
        let (b, c, d) = (
            h.quatern_b as f64,
            h.quatern_c as f64,
            h.quatern_d as f64,
        );
        // 数值误差可能让 1 - |bcd|^2 略小于 0.
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
        let r = [
            [
                a * a + b * b - c * c - d * d,
                2.0 * (b * c - a * d),
                2.0 * (b * d + a * c),
            ],
            [
                2.0 * (b * c + a * d),
                a * a + c * c - b * b - d * d,
                2.0 * (c * d - a * b),
            ],
            [
                2.0 * (b * d - a * c),
                2.0 * (c * d + a * b),
                a * a + d * d - c * c - b * b,
            ],
        ];
        let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let mut zooms = pix_zooms(h);
        zooms[2] *= qfac;
        let offset = [
            h.quatern_x as f64,
            h.quatern_y as f64,
            h.quatern_z as f64,
        ];

        let mut m = Self::identity().0;
        for (i, row) in r.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                m[i][j] = v * zooms[j];
            }
            m[i][3] = offset[i];
        }
        Self(m)
    }

    /// 没有 sform/qform 时的基础仿射: x 轴翻转, 原点位于体数据中心.
    fn base(h: &NiftiHeader) -> Self {
        let [_, nx, ny, nz, ..] = h.dim;
        let mut zooms = pix_zooms(h);
        zooms[0] = -zooms[0];
        let mut m = Self::from_zooms(zooms).0;
        for (i, n) in [nx, ny, nz].into_iter().enumerate() {
            let origin = (n.max(1) as f64 - 1.0) / 2.0;
            m[i][3] = -origin * zooms[i];
        }
        Self(m)
    }

    /// 将仿射矩阵写入 header (sform, aligned), 并同步 `pixdim`.
    pub fn write_header(&self, h: &mut NiftiHeader) {
        let row = |r: &[f64; 4]| r.map(|v| v as f32);
        h.srow_x = row(&self.0[0]);
        h.srow_y = row(&self.0[1]);
        h.srow_z = row(&self.0[2]);
        h.sform_code = XFORM_ALIGNED_ANAT;
        h.qform_code = 0;
        h.pixdim[0] = 1.0;
        for (p, z) in h.pixdim[1..4].iter_mut().zip(self.zooms()) {
            *p = z as f32;
        }
    }
}

/// header 中的体素尺寸; 非正值按 1 处理.
fn pix_zooms(h: &NiftiHeader) -> [f64; 3] {
    let [_, x, y, z, ..] = h.pixdim;
    [x, y, z].map(|v| if v > 0.0 { v as f64 } else { 1.0 })
}
