// src/error.rs

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("获取歌曲信息失败: {0}")]
    Resolution(String),
    #[error("超过最大并发下载数（{max}），请稍后再试")]
    TooManyActiveDownloads { max: usize },
    #[error("单次最多下载{max}个文件 (本次请求 {requested} 个)")]
    BatchTooLarge { requested: usize, max: usize },
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("网络中间件错误: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("任务超时 (超过 {}秒)", .0.as_secs_f32())]
    Timeout(Duration),
    #[error("下载内容为空")]
    EmptyBody,
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("临时文件持久化失败: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL 解析错误: {0}")]
    Url(#[from] url::ParseError),
    #[error("音乐标签读写错误: {0}")]
    Tag(#[from] lofty::error::LoftyError),
    #[error("封面图片处理错误: {0}")]
    Image(#[from] image::ImageError),
    #[error("配置错误: {0}")]
    Config(String),
    #[error("用户中断")]
    UserInterrupt,
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// 并发上限或批量上限被突破，请求在执行任何工作之前就被拒绝。
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            AppError::TooManyActiveDownloads { .. } | AppError::BatchTooLarge { .. }
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
