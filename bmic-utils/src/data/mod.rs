use std::ops::Index;
use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayBase, ArrayView3, Axis, Data, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::suffix::{NII, NII_GZ};
use crate::error::{Error, Result};
use crate::path::{ensure_parent, with_suffix};
use crate::Idx3d;

mod affine;
pub mod window;

pub use affine::Affine;
pub use window::{Limits, WindowMask};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 读取时的路径规范化: 既不是 `.nii` 也不是 `.nii.gz` 时追加 `.nii.gz`.
#[inline]
fn nii_path(path: &Path) -> PathBuf {
    with_suffix(path, &[NII, NII_GZ], NII_GZ)
}

/// 可以按 "先截断, 再回绕" 规则收窄为 `i16` 的体素类型.
///
/// 浮点数先向零截断 (超出 `i64` 时饱和, NaN 为 0), 整数则按补码回绕.
/// 超出 `i16` 范围的值不会报错, 调用者需要自行裁剪.
pub trait ToI16Lossy: Copy {
    /// 收窄为 `i16`.
    fn to_i16_lossy(self) -> i16;
}

macro_rules! impl_to_i16_float {
    ($($t: ty),+) => {
        $(
            impl ToI16Lossy for $t {
                #[inline]
                fn to_i16_lossy(self) -> i16 {
                    self as i64 as i16
                }
            }
        )+
    };
}

macro_rules! impl_to_i16_int {
    ($($t: ty),+) => {
        $(
            impl ToI16Lossy for $t {
                #[inline]
                fn to_i16_lossy(self) -> i16 {
                    self as i16
                }
            }
        )+
    };
}

impl_to_i16_float!(f32, f64);
impl_to_i16_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl ToI16Lossy for bool {
    #[inline]
    fn to_i16_lossy(self) -> i16 {
        self as i16
    }
}

/// nii 格式 3D 体数据, 包括 header, 体素值和仿射矩阵. 体素值以 `f32` 保存,
/// 按文件中的 `(x, y, z)` 顺序索引.
#[derive(Debug, Clone)]
pub struct NiiVolume {
    header: BoxedHeader,
    data: Array3<f32>,
    affine: Affine,
}

impl Index<Idx3d> for NiiVolume {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl NiiVolume {
    /// 打开 nii 文件格式的 3D 体数据. `path` 缺少 `.nii`/`.nii.gz`
    /// 后缀时自动追加 `.nii.gz`.
    ///
    /// # 错误
    ///
    /// 1. 文件不存在时返回 [`Error::FileNotFound`];
    /// 2. 文件无法解析时返回 [`Error::Decode`];
    /// 3. 数据 (去掉末尾长度为 1 的维度后) 不是三维时返回 [`Error::NotVolumetric`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = nii_path(path.as_ref());
        if !path.is_file() {
            return Err(Error::FileNotFound(path));
        }
        let decode = |source| Error::Decode {
            path: path.clone(),
            source,
        };

        let obj = ReaderOptions::new().read_file(&path).map_err(decode)?;
        let header = Box::new(obj.header().clone());
        let affine = Affine::from_header(&header);

        // 缩放 (scl_slope, scl_inter) 由 nifti 负责.
        let mut data = obj.into_volume().into_ndarray::<f32>().map_err(decode)?;
        while data.ndim() > 3 && data.shape().last() == Some(&1) {
            let last = data.ndim() - 1;
            data = data.index_axis_move(Axis(last), 0);
        }
        let shape = data.shape().to_vec();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| Error::NotVolumetric {
                path: path.clone(),
                shape,
            })?;

        // nifti 数据按 Fortran 序排列; 转为标准布局便于后续按行遍历.
        let data = data.as_standard_layout().into_owned();
        log::debug!("loaded `{}` with shape {:?}", path.display(), data.dim());

        Ok(Self {
            header,
            data,
            affine,
        })
    }

    /// 由裸数据和仿射矩阵直接创建体数据. header 按仿射矩阵填写.
    ///
    /// nifti-1 header 的各维长度不能超过 `u16::MAX`, 否则返回 [`Error::InvalidArgument`].
    pub fn from_array(data: Array3<f32>, affine: Affine) -> Result<Self> {
        let mut header = Box::<NiftiHeader>::default();
        affine.write_header(&mut header);
        let (x, y, z) = data.dim();
        let len = |n: usize| {
            u16::try_from(n).map_err(|_| Error::invalid(format!("axis length {n} exceeds {}", u16::MAX)))
        };
        header.dim = [3, len(x)?, len(y)?, len(z)?, 1, 1, 1, 1];
        Ok(Self {
            header,
            data,
            affine,
        })
    }

    /// 获取 header 部分.
    #[inline]
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// 获取数据形状 `(x, y, z)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获取数据体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获取单个体素在 `(x, y, z)` 三个方向的分辨率, 以毫米为单位.
    #[inline]
    pub fn pix_dim(&self) -> [f64; 3] {
        self.affine.zooms()
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    pub fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 获取仿射矩阵.
    #[inline]
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 消费自我, 获得体数据和仿射矩阵.
    #[inline]
    pub fn into_parts(self) -> (Array3<f32>, Affine) {
        (self.data, self.affine)
    }

    /// 以 `int16` 格式保存到 `path`, 使用自身的仿射矩阵. 返回实际写入的路径.
    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        save_nii(path, &self.data, Some(&self.affine))
    }
}

/// 读取 nii 文件, 返回 `(x, y, z)` 体数据及其仿射矩阵. 参见 [`NiiVolume::open`].
pub fn load_nii<P: AsRef<Path>>(path: P) -> Result<(Array3<f32>, Affine)> {
    NiiVolume::open(path).map(NiiVolume::into_parts)
}

/// 读取 nii 文件, 仅返回体数据.
pub fn load_nii_data<P: AsRef<Path>>(path: P) -> Result<Array3<f32>> {
    load_nii(path).map(|(data, _)| data)
}

/// 将 3D 体数据以 `int16` 格式写入 nii 文件.
///
/// 1. 体素值按 [`ToI16Lossy`] 收窄, 超出范围的值不会报错;
/// 2. `affine` 为 `None` 时使用单位矩阵;
/// 3. `path` 缺少 `.nii`/`.nii.gz` 后缀时追加 `.nii.gz`, 父目录不存在时自动创建,
///   已有文件直接覆盖.
///
/// 返回实际写入的路径.
pub fn save_nii<P, S, A>(path: P, voxels: &ArrayBase<S, Ix3>, affine: Option<&Affine>) -> Result<PathBuf>
where
    P: AsRef<Path>,
    S: Data<Elem = A>,
    A: ToI16Lossy,
{
    let path = nii_path(path.as_ref());
    ensure_parent(&path)?;

    let mut header = NiftiHeader::default();
    affine.copied().unwrap_or_default().write_header(&mut header);

    let narrowed = voxels.mapv(ToI16Lossy::to_i16_lossy);
    WriterOptions::new(&path)
        .reference_header(&header)
        .write_nifti(&narrowed)
        .map_err(|source| Error::Encode {
            path: path.clone(),
            source,
        })?;
    log::debug!("saved {:?} voxels to `{}`", narrowed.dim(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_to_i16_lossy() {
        assert_eq!(1.9f32.to_i16_lossy(), 1);
        assert_eq!((-1.9f64).to_i16_lossy(), -1);
        assert_eq!(f32::NAN.to_i16_lossy(), 0);
        assert_eq!(32768i32.to_i16_lossy(), i16::MIN);
        assert_eq!(40000.0f64.to_i16_lossy(), 40000i64 as i16);
        assert_eq!(7u32.to_i16_lossy(), 7);
        assert_eq!(true.to_i16_lossy(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let err = NiiVolume::open("definitely/not/here").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        match err {
            Error::FileNotFound(p) => assert_eq!(p, PathBuf::from("definitely/not/here.nii.gz")),
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn test_from_array_header() {
        let v = NiiVolume::from_array(Array3::zeros((2, 3, 4)), Affine::from_zooms([1.0, 2.0, 3.0]))
            .unwrap();
        assert_eq!(v.shape(), (2, 3, 4));
        assert_eq!(v.size(), 24);
        assert_eq!(v.header().dim[1..4], [2, 3, 4]);
        assert_eq!(v.voxel(), 6.0);
    }

    #[test]
    fn test_from_array_axis_too_long() {
        let long = Array3::<f32>::zeros((u16::MAX as usize + 1, 1, 1));
        let err = NiiVolume::from_array(long, Affine::identity()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let edge = Array3::<f32>::zeros((u16::MAX as usize, 1, 1));
        let v = NiiVolume::from_array(edge, Affine::identity()).unwrap();
        assert_eq!(v.header().dim[1], u16::MAX);
    }
}
