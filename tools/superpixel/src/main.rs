//! 3D 超像素分割流水线.
//!
//! 用法: `superpixel [config.{yaml,yml,json}]`. 未给出配置文件时依次尝试
//! `$BMIC_CONFIG` 与 `$HOME/bmic/superpixel.yaml`.

use std::path::PathBuf;

use anyhow::Context;
use utils::loader;

mod result;
mod runner;

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let config = match std::env::args_os().nth(1) {
        Some(p) => PathBuf::from(p),
        None => loader::config_path_from_env_or_home("superpixel.yaml")
            .context("cannot determine the config path")?,
    };
    log::info!("using config `{}`", config.display());

    let result = runner::run_with_config(&config)?;
    result.analyze()
}
