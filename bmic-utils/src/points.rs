//! 体素数组到点云 (PLY) 的导出.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use ndarray::{ArrayBase, Data, Ix3};
use num::Zero;

use crate::consts::suffix::PLY;
use crate::error::{Error, Result};
use crate::path::{ensure_parent, with_suffix};

/// 三维点.
pub type Point3 = [f64; 3];

/// 收集所有值大于 0 的体素, 按行优先序转换为点.
///
/// 数组按 `(x, y, z)` 索引, 点的坐标按 `(y, x, z)` 排列.
pub fn nonzero_points<S, A>(volume: &ArrayBase<S, Ix3>) -> Vec<Point3>
where
    S: Data<Elem = A>,
    A: PartialOrd + Zero,
{
    let zero = A::zero();
    volume
        .indexed_iter()
        .filter(|(_, v)| **v > zero)
        .map(|((x, y, z), _)| [y as f64, x as f64, z as f64])
        .collect()
}

/// 将 `volume` 中所有值大于 0 的体素以 PLY (binary little endian, double) 格式写入 `path`.
///
/// `path` 缺少 `.ply` 后缀时自动追加, 父目录不存在时自动创建. 返回实际写入的路径.
pub fn export_points<P, S, A>(path: P, volume: &ArrayBase<S, Ix3>) -> Result<PathBuf>
where
    P: AsRef<Path>,
    S: Data<Elem = A>,
    A: PartialOrd + Zero,
{
    let path = with_suffix(path.as_ref(), &[PLY], PLY);
    let points = nonzero_points(volume);
    write_ply(&path, &points)?;
    log::debug!("wrote {} points to `{}`", points.len(), path.display());
    Ok(path)
}

/// 写入 PLY 点云文件.
pub fn write_ply(path: &Path, points: &[Point3]) -> Result<()> {
    ensure_parent(path)?;
    let mut w = BufWriter::new(File::create(path)?);
    write!(
        w,
        "ply\nformat binary_little_endian 1.0\nelement vertex {}\n\
         property double x\nproperty double y\nproperty double z\nend_header\n",
        points.len()
    )?;
    for p in points {
        for c in p {
            w.write_all(&c.to_le_bytes())?;
        }
    }
    w.flush()?;
    Ok(())
}

/// 读取由 [`write_ply`] 写出的点云文件 (binary little endian, 仅含 double x/y/z 三个属性).
pub fn read_ply_points<P: AsRef<Path>>(path: P) -> Result<Vec<Point3>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_owned()));
    }
    let mut r = BufReader::new(File::open(path)?);

    let mut vertices = None;
    let mut line = String::new();
    loop {
        line.clear();
        if r.read_line(&mut line)? == 0 {
            return Err(Error::invalid("PLY header is not terminated"));
        }
        let t = line.trim_end();
        if t == "end_header" {
            break;
        }
        if let Some(n) = t.strip_prefix("element vertex ") {
            vertices = n.trim().parse::<usize>().ok();
        } else if t.starts_with("format ") && t != "format binary_little_endian 1.0" {
            return Err(Error::invalid(format!("unsupported PLY format `{t}`")));
        }
    }
    let n = vertices.ok_or_else(|| Error::invalid("PLY header has no vertex element"))?;

    let mut buf = [0u8; 8];
    let mut points = Vec::with_capacity(n);
    for _ in 0..n {
        let mut p = [0.0; 3];
        for c in p.iter_mut() {
            r.read_exact(&mut buf)?;
            *c = f64::from_le_bytes(buf);
        }
        points.push(p);
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_nonzero_points_axis_order() {
        let mut v = Array3::<i32>::zeros((3, 4, 5));
        v[(1, 2, 3)] = 7;
        v[(2, 0, 0)] = -1;
        assert_eq!(nonzero_points(&v), vec![[2.0, 1.0, 3.0]]);
    }

    #[test]
    fn test_export_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut v = Array3::<f32>::zeros((2, 2, 2));
        v[(0, 1, 0)] = 0.5;
        v[(1, 1, 1)] = 3.0;
        let path = export_points(dir.path().join("nested/cloud"), &v).unwrap();
        assert_eq!(path, dir.path().join("nested/cloud.ply"));
        let points = read_ply_points(&path).unwrap();
        assert_eq!(points, vec![[1.0, 0.0, 0.0], [1.0, 1.0, 1.0]]);
    }

    #[test]
    fn test_export_empty_volume() {
        let dir = tempfile::tempdir().unwrap();
        let v = Array3::<f32>::zeros((3, 3, 3));
        let path = export_points(dir.path().join("empty.ply"), &v).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("element vertex 0\n"));
        assert!(text.ends_with("end_header\n"));
        assert!(read_ply_points(&path).unwrap().is_empty());
    }
}
