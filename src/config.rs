// src/config.rs

pub mod file;

use self::file::load_or_create_external_config;
use crate::{
    cli::Cli,
    constants,
    error::{AppError, AppResult},
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub connect_timeout_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub cover_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

/// `~/.ncm-dl/config.json` 的内容，所有字段均可省略。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<usize>,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        let network_config = NetworkConfig {
            connect_timeout_secs: Some(constants::CONNECT_TIMEOUT.as_secs()),
            timeout_secs: Some(constants::REQUEST_TIMEOUT.as_secs()),
            cover_timeout_secs: Some(constants::COVER_TIMEOUT.as_secs()),
            max_retries: Some(0),
        };

        Self {
            download_dir: None,
            max_concurrent: Some(constants::DEFAULT_MAX_CONCURRENT),
            network: network_config,
        }
    }
}

/// 下载流水线的运行期配置。每个下载器实例只读取一次。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub download_dir: PathBuf,
    pub max_concurrent: usize,
    pub max_batch_size: usize,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub cover_timeout: Duration,
    pub cover_max_bytes: usize,
    pub task_timeout: Duration,
    /// 传输层重试次数。默认为 0：流水线本身不做任何自动重试。
    pub max_retries: u32,
}

impl AppConfig {
    /// 供库调用方使用：除目录与并发数外全部采用固定默认值。
    pub fn new(download_dir: impl Into<PathBuf>, max_concurrent: usize) -> Self {
        Self {
            download_dir: download_dir.into(),
            max_concurrent,
            max_batch_size: constants::MAX_BATCH_SIZE,
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: constants::CONNECT_TIMEOUT,
            request_timeout: constants::REQUEST_TIMEOUT,
            cover_timeout: constants::COVER_TIMEOUT,
            cover_max_bytes: constants::COVER_MAX_BYTES,
            task_timeout: constants::TASK_TIMEOUT,
            max_retries: 0,
        }
    }

    /// 命令行参数 > `DOWNLOAD_PATH` 环境变量 > 配置文件 > 默认值
    pub fn from_cli(args: &Cli) -> AppResult<Self> {
        let external_config = load_or_create_external_config()?;
        Self::layered(args, external_config, std::env::var(constants::DOWNLOAD_PATH_ENV).ok())
    }

    pub(crate) fn layered(
        args: &Cli,
        external_config: ExternalConfig,
        env_download_dir: Option<String>,
    ) -> AppResult<Self> {
        let download_dir = args
            .output
            .clone()
            .or_else(|| env_download_dir.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
            .or(external_config.download_dir)
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_SAVE_DIR));

        let max_concurrent = args
            .workers
            .or(external_config.max_concurrent)
            .unwrap_or(constants::DEFAULT_MAX_CONCURRENT);

        let network = external_config.network;
        let mut config = Self::new(download_dir, max_concurrent);
        config.connect_timeout = network
            .connect_timeout_secs
            .map_or(constants::CONNECT_TIMEOUT, Duration::from_secs);
        config.request_timeout = network
            .timeout_secs
            .map_or(constants::REQUEST_TIMEOUT, Duration::from_secs);
        config.cover_timeout = network
            .cover_timeout_secs
            .map_or(constants::COVER_TIMEOUT, Duration::from_secs);
        config.max_retries = network.max_retries.unwrap_or(0);

        config.validate()?;
        debug!("生效的应用配置: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent == 0 {
            return Err(AppError::Config("最大并发数必须大于 0".to_string()));
        }
        if self.max_batch_size == 0 {
            return Err(AppError::Config("单次批量上限必须大于 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(feature = "testing")]
impl Default for AppConfig {
    fn default() -> Self {
        let mut config = Self::new(std::env::temp_dir().join("ncm-dl-test"), 3);
        config.user_agent = "test-agent/1.0".to_string();
        config.connect_timeout = Duration::from_secs(5);
        config.request_timeout = Duration::from_secs(15);
        config.cover_timeout = Duration::from_secs(5);
        config
    }
}
