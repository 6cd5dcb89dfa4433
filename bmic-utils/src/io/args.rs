use serde::de::DeserializeOwned;

use super::EasyDict;
use crate::error::Result;
use crate::seg::SlicParams;

/// 从配置字典逐字段构建参数.
///
/// 约定: 未知键被忽略; 缺失的键取类型默认值; 键存在但类型不符时返回
/// [`Error::InvalidArgument`](crate::Error::InvalidArgument).
pub trait FromArgs: Default {
    /// 从 `args` 中提取字段.
    fn from_args(args: &EasyDict) -> Result<Self>;
}

/// 便捷入口, 等价于 `T::from_args(args)`.
#[inline]
pub fn auto_args<T: FromArgs>(args: &EasyDict) -> Result<T> {
    T::from_args(args)
}

/// 若 `args` 中存在 `key`, 则覆盖 `slot`.
pub fn override_field<T: DeserializeOwned>(args: &EasyDict, key: &str, slot: &mut T) -> Result<()> {
    if let Some(v) = args.get_as(key)? {
        *slot = v;
    }
    Ok(())
}

impl FromArgs for SlicParams {
    fn from_args(args: &EasyDict) -> Result<Self> {
        let mut p = Self::default();
        override_field(args, "n_seg", &mut p.n_seg)?;
        override_field(args, "sigma", &mut p.sigma)?;
        override_field(args, "compactness", &mut p.compactness)?;
        override_field(args, "limits", &mut p.limits)?;
        Ok(p)
    }
}
