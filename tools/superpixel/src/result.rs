//! 运行结果.

use std::io::{self, Write};
use std::path::PathBuf;

use bmic_utils::consts::label::is_unlabeled;
use bmic_utils::io::json_write;
use ndarray::Array3;
use serde::Serialize;

/// 单次流水线运行的结果.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    stem: String,
    shape: [usize; 3],
    n_labels: u32,
    labelled: usize,
    seg_path: PathBuf,
    ply_path: Option<PathBuf>,
    view_paths: Vec<PathBuf>,
    load_ms: u128,
    segment_ms: u128,
}

impl RunResult {
    pub fn new(
        stem: String,
        labels: &Array3<u32>,
        seg_path: PathBuf,
        ply_path: Option<PathBuf>,
        view_paths: Vec<PathBuf>,
        load_ms: u128,
        segment_ms: u128,
    ) -> Self {
        let (x, y, z) = labels.dim();
        Self {
            stem,
            shape: [x, y, z],
            n_labels: labels.iter().max().copied().unwrap_or(0),
            labelled: labels.iter().filter(|l| !is_unlabeled(**l)).count(),
            seg_path,
            ply_path,
            view_paths,
            load_ms,
            segment_ms,
        }
    }

    /// 最大标签值, 即超像素个数.
    #[inline]
    pub fn n_labels(&self) -> u32 {
        self.n_labels
    }

    /// 将结果写进 `w` 中.
    fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        writeln!(w, "Case `{}`:", self.stem)?;
        writeln!(w, "{S4}Shape: {:?}", self.shape)?;
        writeln!(w, "{S4}Superpixels: {}", self.n_labels())?;
        writeln!(w, "{S4}Labelled voxels: {}", self.labelled)?;
        writeln!(w, "{S4}Load time: {} ms", self.load_ms)?;
        writeln!(w, "{S4}Segmentation time: {} ms", self.segment_ms)?;
        writeln!(w, "{S4}Labels: {}", self.seg_path.display())?;
        match &self.ply_path {
            Some(p) => writeln!(w, "{S4}Points: {}", p.display())?,
            None => writeln!(w, "{S4}Points: /")?,
        }
        write!(w, "{S4}Views: ")?;
        if self.view_paths.is_empty() {
            write!(w, "/")?;
        } else {
            for p in self.view_paths.iter() {
                write!(w, "{} ", p.display())?;
            }
        }
        Ok(())
    }

    /// 打印结果, 并把结果以 JSON 格式保存在分割结果旁.
    pub fn analyze(&self) -> anyhow::Result<()> {
        utils::sep();
        let mut buf = Vec::with_capacity(512);
        self.describe_into(&mut buf)?;
        println!("{}", String::from_utf8_lossy(&buf));
        utils::sep();

        let report = self.seg_path.with_file_name(format!("{}_report.json", self.stem));
        json_write(self, &report)?;
        log::info!("wrote report to `{}`", report.display());
        Ok(())
    }
}
