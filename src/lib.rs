// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod logger;
pub mod models;
pub mod resolver;
pub mod symbols;
pub mod tagger;
pub mod ui;
pub mod utils;
mod workflows;

pub use crate::{
    downloader::Downloader,
    error::{AppError, AppResult},
    resolver::{ManifestResolver, TrackResolver},
    tagger::{TagEmbedder, TaggingWarning, compress_cover},
    utils::{determine_extension, sanitize},
};

use crate::{cli::Cli, config::AppConfig, downloader::DownloadManager};
use log::debug;
use std::sync::Arc;

/// 命令行运行所需的全部状态
#[derive(Clone)]
pub struct DownloadJobContext {
    pub manager: DownloadManager,
    pub downloader: Downloader,
    pub resolver: Arc<ManifestResolver>,
    pub args: Arc<Cli>,
}

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args);

    let config = AppConfig::from_cli(&args)?;
    let resolver = Arc::new(ManifestResolver::load(&args.manifest)?);
    let context = DownloadJobContext {
        manager: DownloadManager::new(),
        downloader: Downloader::new(config)?,
        resolver,
        args: Arc::clone(&args),
    };

    if args.progress {
        workflows::run_progress(&context).await
    } else if args.all {
        let ids = context.resolver.ids().to_vec();
        workflows::run_downloads(&context, &ids).await
    } else {
        workflows::run_downloads(&context, &args.ids).await
    }
}
