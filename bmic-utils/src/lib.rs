#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 生物医学影像辅助库. 提供 nifti 体数据读写、3D 超像素分割、点云导出、
//! 分割评价指标以及结构化数据 (JSON / YAML / blob) 的读写.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 体数据统一按 nifti 文件中的存储顺序 `(x, y, z)` 索引, 读入时不做任何轴置换.
//! 2. 所有可失败的操作都返回 [`Result`], 不会在输入不合法时 panic.
//! 3. 所有写操作都会自动创建父目录并静默覆盖已有文件, 不保证原子性.
//!
//! # 开发计划
//!
//! ### nifti 体数据读写 ✅
//!
//! 读入时应用 `scl_slope`/`scl_inter` 缩放并求仿射矩阵 (sform 优先, 其次 qform);
//! 写出时统一保存为 `int16`.
//!
//! 实现位于 `bmic-utils/src/data`.
//!
//! ### 3D SLIC-zero 超像素 ✅
//!
//! 1. 强度窗口掩膜, 窗口为空时退化为全域分割. ✅
//! 2. 掩膜内 k-means++ 播种. ✅
//! 3. 自适应颜色尺度的局部聚类. ✅
//! 4. 6-连通约束与小分量合并. ✅
//!
//! 实现位于 `bmic-utils/src/seg`.
//!
//! ### 点云导出 ✅
//!
//! 非零体素导出为二进制 PLY. 实现位于 `bmic-utils/src/points.rs`.
//!
//! ### 评价指标 ✅
//!
//! Dice loss (含解析梯度)、Dice score、3D Hausdorff 距离.
//!
//! 实现位于 `bmic-utils/src/metrics.rs`.
//!
//! ### 结构化数据读写 ✅
//!
//! 1. JSON / YAML, 支持点号路径访问. ✅
//! 2. YAML 安全模式拒绝显式 tag. ✅
//! 3. `FromArgs` 逐字段参数绑定. ✅
//! 4. 纯数据 blob (bincode). ✅
//!
//! 实现位于 `bmic-utils/src/io`.
//!
//! ### 最佳视图切片 ✅
//!
//! 实现位于 `bmic-utils/src/vis.rs`.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

mod error;
mod path;

pub use error::{Error, ErrorKind, Result};

/// nifti 体数据与强度窗口.
pub mod data;

pub use data::{load_nii, load_nii_data, save_nii, Affine, Limits, NiiVolume, ToI16Lossy};

pub mod consts;
pub mod io;
pub mod metrics;
pub mod points;
pub mod seg;
pub mod vis;

pub use points::export_points;
pub use seg::{segment_3d, SlicParams};

pub mod prelude;
