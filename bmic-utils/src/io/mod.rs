//! 结构化数据的读写: JSON / YAML 配置, 参数绑定与二进制 blob.

mod args;
mod blob;
mod easy;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::consts::JSON_INDENT;
use crate::error::{Error, Result};
use crate::path::ensure_parent;

pub use args::{auto_args, override_field, FromArgs};
pub use blob::{blob_read, blob_write, Blob};
pub use easy::EasyDict;

/// 读入的文档. 由读取函数的 `easy_dict` 参数决定具体形态.
#[derive(Clone, Debug, PartialEq)]
pub enum Document {
    /// 原样的 JSON 值.
    Raw(Value),

    /// 点号路径访问视图. 要求顶层为映射.
    Easy(EasyDict),
}

impl Document {
    fn build(value: Value, easy_dict: bool) -> Result<Self> {
        if easy_dict {
            Ok(Self::Easy(EasyDict::try_from(value)?))
        } else {
            Ok(Self::Raw(value))
        }
    }

    /// 获取底层 JSON 值.
    pub fn into_value(self) -> Value {
        match self {
            Self::Raw(v) => v,
            Self::Easy(d) => d.into_value(),
        }
    }

    /// 转换为 [`EasyDict`]. 顶层不是映射时出错.
    pub fn into_easy(self) -> Result<EasyDict> {
        match self {
            Self::Raw(v) => EasyDict::try_from(v),
            Self::Easy(d) => Ok(d),
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_owned()));
    }
    Ok(BufReader::new(File::open(path)?))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    ensure_parent(path)?;
    Ok(BufWriter::new(File::create(path)?))
}

/// 读取 JSON 文件.
pub fn json_read<P: AsRef<Path>>(path: P, easy_dict: bool) -> Result<Document> {
    let value: Value = serde_json::from_reader(open(path.as_ref())?)?;
    Document::build(value, easy_dict)
}

/// 读取 JSON 文件并反序列化为 `T`.
pub fn json_read_as<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    Ok(serde_json::from_reader(open(path.as_ref())?)?)
}

/// 以 2 空格缩进写入 JSON 文件, 自动创建父目录, 覆盖已有文件.
#[inline]
pub fn json_write<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    json_write_with_indent(value, path, JSON_INDENT)
}

/// 以 `indent` 个空格缩进写入 JSON 文件.
pub fn json_write_with_indent<T, P>(value: &T, path: P, indent: usize) -> Result<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut w = create(path.as_ref())?;
    let mut ser = serde_json::Serializer::with_formatter(&mut w, formatter);
    value.serialize(&mut ser)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

/// 找到第一个显式 tag.
fn find_tag(value: &serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value as Y;
    match value {
        Y::Tagged(t) => Some(t.tag.to_string()),
        Y::Sequence(seq) => seq.iter().find_map(find_tag),
        Y::Mapping(map) => map
            .iter()
            .find_map(|(k, v)| find_tag(k).or_else(|| find_tag(v))),
        _ => None,
    }
}

/// 解析 YAML 文件并展开合并键 (`<<: *anchor`).
fn yaml_value(path: &Path) -> Result<serde_yaml::Value> {
    let mut yaml: serde_yaml::Value = serde_yaml::from_reader(open(path)?)?;
    yaml.apply_merge()?;
    Ok(yaml)
}

/// 读取 YAML 文件. 合并键 (`<<: *anchor`) 会被展开.
///
/// 安全模式 (`unsafe_load == false`) 下, 任何显式 tag (如 `!!python/object`) 都会导致
/// [`Error::UnsafeYaml`]. 非安全模式下保留带 tag 的值, 转换后表示为单键映射 `{"!tag": value}`.
pub fn yaml_read<P: AsRef<Path>>(path: P, unsafe_load: bool, easy_dict: bool) -> Result<Document> {
    let yaml = yaml_value(path.as_ref())?;
    if !unsafe_load {
        if let Some(tag) = find_tag(&yaml) {
            return Err(Error::UnsafeYaml(tag));
        }
    }
    let value = serde_json::to_value(yaml)?;
    Document::build(value, easy_dict)
}

/// 读取 YAML 文件并反序列化为 `T`.
pub fn yaml_read_as<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    Ok(serde_yaml::from_value(yaml_value(path.as_ref())?)?)
}

/// 写入 YAML 文件, 自动创建父目录, 覆盖已有文件.
pub fn yaml_write<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let mut w = create(path.as_ref())?;
    serde_yaml::to_writer(&mut w, value)?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Run {
        name: String,
        epochs: u32,
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/run.json");
        let run = Run {
            name: "liver".into(),
            epochs: 3,
        };
        json_write(&run, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"name\": \"liver\""));
        assert_eq!(json_read_as::<Run, _>(&path).unwrap(), run);

        let doc = json_read(&path, true).unwrap();
        match doc {
            Document::Easy(d) => assert_eq!(d.get("epochs"), Some(&json!(3))),
            Document::Raw(_) => panic!("expected an easy dict"),
        }
    }

    #[test]
    fn test_json_indent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        json_write_with_indent(&json!({"k": [1]}), &path, 4).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \"k\""));
    }

    #[test]
    fn test_read_missing() {
        let err = json_read("/definitely/not/here.json", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        let err = yaml_read("/definitely/not/here.yaml", false, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_yaml_safe_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.yaml");
        std::fs::write(&path, "a: 1\nb: !custom {x: 2}\n").unwrap();

        let err = yaml_read(&path, false, false).unwrap_err();
        assert!(matches!(err, Error::UnsafeYaml(_)));

        let v = yaml_read(&path, true, false).unwrap().into_value();
        assert_eq!(v, json!({"a": 1, "b": {"!custom": {"x": 2}}}));
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cfg.yaml");
        yaml_write(&json!({"model": {"depth": 4}, "lr": 0.5}), &path).unwrap();
        let d = yaml_read(&path, false, true).unwrap().into_easy().unwrap();
        assert_eq!(d.get_as::<u32>("model.depth").unwrap(), Some(4));
        assert_eq!(d.get_as::<f64>("lr").unwrap(), Some(0.5));
    }

    #[test]
    fn test_easy_requires_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.yaml");
        std::fs::write(&path, "- 1\n- 2\n").unwrap();
        assert!(yaml_read(&path, false, false).is_ok());
        let err = yaml_read(&path, false, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_yaml_merge_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merge.yaml");
        std::fs::write(
            &path,
            "base: &b {n_seg: 7, sigma: 0.5}\nrun:\n  <<: *b\n  sigma: 1\n",
        )
        .unwrap();

        let d = yaml_read(&path, false, true).unwrap().into_easy().unwrap();
        assert_eq!(d.get_as::<usize>("run.n_seg").unwrap(), Some(7));
        // 显式键优先于合并进来的键.
        assert_eq!(d.get_as::<f64>("run.sigma").unwrap(), Some(1.0));
        assert!(!d.contains("run.<<"));

        #[derive(Debug, Deserialize)]
        struct Merged {
            run: Run2,
        }
        #[derive(Debug, Deserialize)]
        struct Run2 {
            n_seg: usize,
            sigma: f64,
        }
        let m: Merged = yaml_read_as(&path).unwrap();
        assert_eq!((m.run.n_seg, m.run.sigma), (7, 1.0));
    }
}
