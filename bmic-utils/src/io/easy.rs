use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// 支持点号路径访问的映射视图, 例如 `dict.get("model.depth")`.
///
/// 路径中的每一段按对象键查找; 当前节点为数组时, 该段按数组下标解析.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EasyDict {
    inner: Map<String, Value>,
}

impl fmt::Display for EasyDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.inner.clone()))
    }
}

impl TryFrom<Value> for EasyDict {
    type Error = Error;

    /// 只有 JSON 对象可以转换 (`null` 视为空对象).
    fn try_from(v: Value) -> Result<Self> {
        match v {
            Value::Object(inner) => Ok(Self { inner }),
            Value::Null => Ok(Self::default()),
            other => Err(Error::invalid(format!(
                "expected a mapping at the top level, got `{other}`"
            ))),
        }
    }
}

impl From<Map<String, Value>> for EasyDict {
    #[inline]
    fn from(inner: Map<String, Value>) -> Self {
        Self { inner }
    }
}

impl EasyDict {
    /// 空字典.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 从任意可序列化为对象的值构建.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        Self::try_from(serde_json::to_value(value)?)
    }

    /// 按点号路径查找.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = self.inner.get(segments.next()?)?;
        segments.try_fold(first, |node, seg| match node {
            Value::Object(m) => m.get(seg),
            Value::Array(a) => a.get(seg.parse::<usize>().ok()?),
            _ => None,
        })
    }

    /// 按点号路径查找并反序列化为 `T`.
    ///
    /// 路径不存在时返回 `Ok(None)`; 存在但类型不符时返回 [`Error::InvalidArgument`].
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        self.get(path)
            .map(|v| {
                T::deserialize(v)
                    .map_err(|e| Error::invalid(format!("field `{path}`: {e}")))
            })
            .transpose()
    }

    /// 路径是否存在.
    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// 按点号路径写入, 自动创建中间对象. 中间节点不是对象时会被覆盖.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };
        let mut node = &mut self.inner;
        for seg in segments {
            let entry = node
                .entry(seg.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            node = match entry {
                Value::Object(m) => m,
                _ => unreachable!(),
            };
        }
        node.insert(last.to_owned(), value);
    }

    /// 顶层键.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// 顶层键个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// 消费自我, 获得底层 JSON 值.
    #[inline]
    pub fn into_value(self) -> Value {
        Value::Object(self.inner)
    }

    /// 整体反序列化为 `T`.
    pub fn deserialize_into<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.into_value())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> EasyDict {
        EasyDict::try_from(json!({
            "model": {"depth": 4, "name": "unet"},
            "layers": [{"width": 16}, {"width": 32}],
            "lr": 0.1
        }))
        .unwrap()
    }

    #[test]
    fn test_dotted_get() {
        let d = sample();
        assert_eq!(d.get("model.depth"), Some(&json!(4)));
        assert_eq!(d.get("layers.1.width"), Some(&json!(32)));
        assert_eq!(d.get("layers.x"), None);
        assert_eq!(d.get("model.depth.more"), None);
        assert_eq!(d.get("missing"), None);
        assert!(d.contains("lr"));
    }

    #[test]
    fn test_get_as() {
        let d = sample();
        assert_eq!(d.get_as::<u32>("model.depth").unwrap(), Some(4));
        assert_eq!(d.get_as::<String>("model.name").unwrap().as_deref(), Some("unet"));
        assert_eq!(d.get_as::<u32>("nothing").unwrap(), None);
        assert!(d.get_as::<u32>("model.name").is_err());
    }

    #[test]
    fn test_set_creates_objects() {
        let mut d = EasyDict::new();
        d.set("a.b.c", json!(1));
        d.set("lr", json!(0.5));
        assert_eq!(d.get("a.b.c"), Some(&json!(1)));
        d.set("lr.inner", json!(true));
        assert_eq!(d.get("lr.inner"), Some(&json!(true)));
        assert_eq!(d.keys().collect::<Vec<_>>().len(), 2);
    }

    #[test]
    fn test_top_level_must_be_object() {
        assert!(EasyDict::try_from(json!([1, 2])).is_err());
        assert!(EasyDict::try_from(Value::Null).unwrap().is_empty());
    }
}
