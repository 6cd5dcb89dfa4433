//! 通用常量.

/// 分割标签.
pub mod label {
    /// 掩膜之外 (未分割) 的体素标签.
    pub const UNLABELED: u32 = 0;

    /// 超像素标签的起始值.
    pub const START_LABEL: u32 = 1;

    /// 体素是否未被分割?
    #[inline]
    pub const fn is_unlabeled(l: u32) -> bool {
        l == UNLABELED
    }
}

/// 文件后缀.
pub mod suffix {
    /// 写入 nifti 文件时使用的压缩容器后缀.
    pub const NII_GZ: &str = ".nii.gz";

    /// 未压缩 nifti 文件后缀.
    pub const NII: &str = ".nii";

    /// 点云文件后缀.
    pub const PLY: &str = ".ply";
}

/// SLIC 超像素分割参数.
pub mod slic {
    /// 默认超像素个数.
    pub const DEFAULT_N_SEG: usize = 500;

    /// 默认高斯平滑带宽 (不平滑).
    pub const DEFAULT_SIGMA: f64 = 0.0;

    /// 默认紧致度.
    pub const DEFAULT_COMPACTNESS: f64 = 0.01;

    /// 聚类最大迭代次数.
    pub const MAX_NUM_ITER: usize = 10;

    /// 连通性约束中, 最小区域占平均超像素大小的比例.
    pub const MIN_SIZE_FACTOR: f64 = 0.5;

    /// 连通性约束中, 最大区域占平均超像素大小的比例.
    pub const MAX_SIZE_FACTOR: f64 = 3.0;

    /// 掩膜模式下 k-means 播种使用的随机数种子.
    pub const MASK_SEED: u64 = 123;

    /// 掩膜模式下, 每个聚类中心最多参与 k-means 的坐标数为 `DENSE_FACTOR^3`.
    pub const DENSE_FACTOR: usize = 10;

    /// 掩膜模式下 k-means 的迭代次数.
    pub const KMEANS_ITER: usize = 10;

    /// 高斯核截断半径 (以 sigma 为单位).
    pub const GAUSSIAN_TRUNCATE: f64 = 4.0;
}

/// Dice 指标默认平滑常数.
pub const DICE_SMOOTH: f64 = 1.0;

/// JSON 写入默认缩进.
pub const JSON_INDENT: usize = 2;
