//! 路径规范化与输出目录准备.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 若 `path` 不以 `accepted` 中任一后缀结尾, 则在其后追加 `append`.
///
/// 后缀比较按原始字节进行, 区分大小写.
pub(crate) fn with_suffix(path: &Path, accepted: &[&str], append: &str) -> PathBuf {
    let s = path.as_os_str().to_string_lossy();
    if accepted.iter().any(|suf| s.ends_with(suf)) {
        path.to_owned()
    } else {
        let mut os = path.as_os_str().to_owned();
        os.push(append);
        PathBuf::from(os)
    }
}

/// 创建 `path` 的所有父目录 (已存在则什么都不做).
pub(crate) fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
