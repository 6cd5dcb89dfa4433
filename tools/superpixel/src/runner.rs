//! 程序运行函数.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{ensure, Context};
use bmic_utils::consts::suffix::{NII, NII_GZ};
use bmic_utils::io::{override_field, EasyDict, FromArgs};
use bmic_utils::{export_points, load_nii, save_nii, segment_3d, vis, SlicParams};
use utils::loader;

use crate::result::RunResult;

/// 流水线配置.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// 输入 nifti 文件.
    pub input: PathBuf,
    /// 输出目录.
    pub output: PathBuf,
    /// 是否导出分割结果的点云.
    pub points: bool,
    /// 是否保存三张正交视图.
    pub views: bool,
    /// 分割参数.
    pub slic: SlicParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::from("."),
            points: true,
            views: false,
            slic: SlicParams::default(),
        }
    }
}

impl FromArgs for PipelineConfig {
    fn from_args(args: &EasyDict) -> bmic_utils::Result<Self> {
        let mut c = Self {
            slic: SlicParams::from_args(args)?,
            ..Self::default()
        };
        override_field(args, "input", &mut c.input)?;
        override_field(args, "output", &mut c.output)?;
        override_field(args, "points", &mut c.points)?;
        override_field(args, "views", &mut c.views)?;
        Ok(c)
    }
}

/// 去掉 nifti 后缀后的文件名.
fn stem_of(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    [NII_GZ, NII]
        .iter()
        .find_map(|suf| name.strip_suffix(suf))
        .map_or_else(|| name.clone(), str::to_owned)
}

/// 读取配置文件并运行.
pub fn run_with_config(path: &Path) -> anyhow::Result<RunResult> {
    let args = loader::load_config(path)
        .with_context(|| format!("cannot load config `{}`", path.display()))?;
    let config = PipelineConfig::from_args(&args)
        .with_context(|| format!("malformed config `{}`", path.display()))?;
    run(&config)
}

/// 实际运行: 读取 → 分割 → 保存 → (点云) → (视图).
pub fn run(config: &PipelineConfig) -> anyhow::Result<RunResult> {
    ensure!(
        !config.input.as_os_str().is_empty(),
        "config key `input` is required"
    );
    let stem = stem_of(&config.input);
    let out = config.output.as_path();

    let t = Instant::now();
    let (volume, affine) = load_nii(&config.input)
        .with_context(|| format!("cannot load `{}`", config.input.display()))?;
    log::info!("loaded `{}` with shape {:?}", config.input.display(), volume.dim());
    let load_ms = t.elapsed().as_millis();

    let t = Instant::now();
    let labels = segment_3d(volume.view(), &config.slic).context("segmentation failed")?;
    let segment_ms = t.elapsed().as_millis();
    log::info!("segmented into {} superpixels", labels.iter().max().copied().unwrap_or(0));

    let seg_path = save_nii(out.join(format!("{stem}_seg")), &labels, Some(&affine))?;
    log::info!("saved labels to `{}`", seg_path.display());

    let ply_path = if config.points {
        Some(export_points(out.join(format!("{stem}_seg")), &labels)?)
    } else {
        None
    };

    let view_paths = if config.views {
        vis::save_views(volume.view(), out.join("views").join(&stem), config.slic.limits)?.to_vec()
    } else {
        Vec::new()
    };

    Ok(RunResult::new(
        stem, &labels, seg_path, ply_path, view_paths, load_ms, segment_ms,
    ))
}
