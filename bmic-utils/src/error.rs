//! 运行时错误.

use std::io;
use std::path::PathBuf;

use nifti::NiftiError;
use thiserror::Error;

/// 本 crate 所有可失败操作的错误.
#[derive(Debug, Error)]
pub enum Error {
    /// 输入路径不存在.
    #[error("file `{0}` does not exist")]
    FileNotFound(PathBuf),

    /// nifti 容器无法解析.
    #[error("cannot decode nifti file `{path}`: {source}")]
    Decode {
        /// 出错的文件.
        path: PathBuf,
        /// 底层 nifti 错误.
        #[source]
        source: NiftiError,
    },

    /// nifti 文件能解析, 但数据不是 3D 体数据.
    #[error("`{path}` is not a 3D volume (shape {shape:?})")]
    NotVolumetric {
        /// 出错的文件.
        path: PathBuf,
        /// 实际数据形状.
        shape: Vec<usize>,
    },

    /// nifti 文件写入失败.
    #[error("cannot write nifti file `{path}`: {source}")]
    Encode {
        /// 目标文件.
        path: PathBuf,
        /// 底层 nifti 错误.
        #[source]
        source: NiftiError,
    },

    /// 其他底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// 参数不合法 (数组维度、形状不一致, 非法 limits 等).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON 编解码错误.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML 编解码错误.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// 安全模式下读取到了带 tag 的 YAML 节点.
    #[error("YAML tag `{0}` is not allowed in safe mode")]
    UnsafeYaml(String),

    /// 二进制 blob 编解码错误.
    #[error(transparent)]
    Blob(#[from] bincode::Error),

    /// 图像编码错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// 错误的粗粒度分类.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// 路径不存在.
    FileNotFound,

    /// 输入内容无法解析.
    Decode,

    /// 输出无法写入.
    Io,

    /// 调用参数不合法.
    InvalidArgument,
}

impl Error {
    /// 获取错误分类.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::Decode { .. }
            | Self::NotVolumetric { .. }
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::UnsafeYaml(_)
            | Self::Blob(_) => ErrorKind::Decode,
            Self::Encode { .. } | Self::Io(_) | Self::Image(_) => ErrorKind::Io,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// 便捷构造 [`Error::InvalidArgument`].
    #[inline]
    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// 本 crate 运行时结果.
pub type Result<T> = std::result::Result<T, Error>;
