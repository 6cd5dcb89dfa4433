use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Array3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::data::Affine;
use crate::error::{Error, Result};
use crate::path::ensure_parent;

/// 可持久化的任意值.
///
/// 仅包含纯数据, 读取时不会执行任何代码.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Blob {
    /// 空值.
    None,
    /// 布尔值.
    Bool(bool),
    /// 整数.
    Int(i64),
    /// 浮点数.
    Float(f64),
    /// 字符串.
    Str(String),
    /// 原始字节.
    Bytes(Vec<u8>),
    /// 列表.
    List(Vec<Blob>),
    /// 有序映射.
    Map(BTreeMap<String, Blob>),
    /// 强度体数据.
    Volume(Array3<f32>),
    /// 分割标签.
    Labels(Array3<u32>),
    /// 仿射矩阵.
    Affine(Affine),
}

/// 以 bincode 编码写入 `value`, 自动创建父目录, 覆盖已有文件.
pub fn blob_write<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut w = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut w, value)?;
    w.flush()?;
    Ok(())
}

/// 读取由 [`blob_write`] 写出的文件.
pub fn blob_read<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_owned()));
    }
    let r = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(r)?)
}
