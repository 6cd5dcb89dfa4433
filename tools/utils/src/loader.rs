//! 对 `bmic_utils::io` 的更一层封装. 提供更直接的配置文件加载器.

use std::env;
use std::path::{Path, PathBuf};

use bmic_utils::io::{json_read, yaml_read, EasyDict};
use bmic_utils::Result;

/// 配置文件路径环境变量.
pub const CONFIG_ENV: &str = "BMIC_CONFIG";

/// 获取默认配置文件路径.
///
/// 1. 若环境变量 `$BMIC_CONFIG` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/bmic/<name>`;
/// 3. 无法确定主目录时返回 `None`.
pub fn config_path_from_env_or_home(name: &str) -> Option<PathBuf> {
    match env::var(CONFIG_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dirs::home_dir().map(|h| h.join("bmic").join(name)),
    }
}

/// 按后缀读取配置文件: `.json` 按 JSON 解析, 其余按 YAML (安全模式) 解析.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EasyDict> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let doc = if is_json {
        json_read(path, true)?
    } else {
        yaml_read(path, false, true)?
    };
    doc.into_easy()
}
