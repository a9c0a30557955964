// src/models/mod.rs

pub mod api;

use crate::constants::defaults;
use crate::error::AppError;
use crate::symbols;
use crate::tagger::TaggingWarning;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

/// 音质等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    #[default]
    Standard,
    Exhigh,
    Lossless,
    Hires,
    Sky,
    Jyeffect,
    Jymaster,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 7] = [
        QualityLevel::Standard,
        QualityLevel::Exhigh,
        QualityLevel::Lossless,
        QualityLevel::Hires,
        QualityLevel::Sky,
        QualityLevel::Jyeffect,
        QualityLevel::Jymaster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLevel::Standard => "standard",
            QualityLevel::Exhigh => "exhigh",
            QualityLevel::Lossless => "lossless",
            QualityLevel::Hires => "hires",
            QualityLevel::Sky => "sky",
            QualityLevel::Jyeffect => "jyeffect",
            QualityLevel::Jymaster => "jymaster",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            QualityLevel::Standard => "标准音质",
            QualityLevel::Exhigh => "极高音质",
            QualityLevel::Lossless => "无损音质",
            QualityLevel::Hires => "Hi-Res音质",
            QualityLevel::Sky => "沉浸环绕声",
            QualityLevel::Jyeffect => "高清环绕声",
            QualityLevel::Jymaster => "超清母带",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityLevel::ALL
            .into_iter()
            .find(|q| q.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let valid = QualityLevel::ALL.map(|q| q.as_str()).join(", ");
                AppError::Config(format!("无效的音质参数 '{}'，支持: {}", s, valid))
            })
    }
}

/// 支持写入标签的三种容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Flac,
    M4a,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => ".mp3",
            AudioFormat::Flac => ".flac",
            AudioFormat::M4a => ".m4a",
        }
    }

    /// 接受 ".flac" 或 "flac"，大小写不敏感。
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "flac" => Some(AudioFormat::Flac),
            "m4a" | "mp4" => Some(AudioFormat::M4a),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension().trim_start_matches('.'))
    }
}

/// 解析完成的歌曲信息，是下载流水线的基本工作单元。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub id: u64,
    pub name: String,
    pub artists: String,
    pub album: String,
    pub cover_url: String,
    pub duration_secs: u64,
    pub track_number: u32,
    /// `YYYY-MM-DD`，未知时为空串
    pub release_date: String,
    pub download_url: String,
    pub file_type: String,
    pub file_size: u64,
    pub quality: QualityLevel,
    pub lyric: String,
    pub translated_lyric: String,
}

impl TrackDescriptor {
    /// 解析失败时用来占位的描述，只有 ID 与音质是真实的。
    pub fn unresolved(id: u64, quality: QualityLevel) -> Self {
        Self {
            id,
            name: defaults::TRACK_NAME.to_string(),
            artists: defaults::ARTIST.to_string(),
            album: defaults::ALBUM.to_string(),
            cover_url: String::new(),
            duration_secs: 0,
            track_number: 0,
            release_date: String::new(),
            download_url: String::new(),
            file_type: defaults::FILE_TYPE.to_string(),
            file_size: 0,
            quality,
            lyric: String::new(),
            translated_lyric: String::new(),
        }
    }

    /// 没有下载链接属于解析阶段的失败，必须在发起任何请求之前报告。
    pub fn ensure_resolved(&self) -> Result<(), AppError> {
        if self.download_url.trim().is_empty() {
            return Err(AppError::Resolution(format!(
                "音乐ID {} 无可用的下载链接",
                self.id
            )));
        }
        Ok(())
    }

    pub fn release_date(&self) -> Option<&str> {
        let date = self.release_date.trim();
        (!date.is_empty()).then_some(date)
    }

    pub fn release_year(&self) -> Option<&str> {
        self.release_date()
            .and_then(|date| date.split('-').next())
            .filter(|year| !year.is_empty())
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artists, self.name)
    }
}

/// 下载产物：落盘文件或内存缓冲，二者只会出现其一。
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    File(PathBuf),
    Memory(Vec<u8>),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DownloadStatus {
    Success,
    Existing,
    Rejected,
    ResolutionFailed,
    HttpError,
    NetworkError,
    ConnectionError,
    TimeoutError,
    EmptyBody,
    IoError,
    UnexpectedError,
}

impl DownloadStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DownloadStatus::Success | DownloadStatus::Existing)
    }

    pub fn get_display_info(
        &self,
    ) -> (
        &'static ColoredString,
        fn(ColoredString) -> ColoredString,
        &'static str,
    ) {
        match self {
            DownloadStatus::Success => (&symbols::OK, |s| s.green(), "下载并写入标签成功"),
            DownloadStatus::Existing => (&symbols::INFO, |s| s.cyan(), "文件已存在，跳过"),
            DownloadStatus::Rejected => (&symbols::WARN, |s| s.yellow(), "超过并发上限，已拒绝"),
            DownloadStatus::ResolutionFailed => (&symbols::ERROR, |s| s.red(), "获取歌曲信息失败"),
            DownloadStatus::HttpError => (&symbols::ERROR, |s| s.red(), "服务器返回错误"),
            DownloadStatus::NetworkError => (&symbols::ERROR, |s| s.red(), "网络请求失败"),
            DownloadStatus::ConnectionError => (&symbols::ERROR, |s| s.red(), "无法建立连接"),
            DownloadStatus::TimeoutError => (&symbols::WARN, |s| s.yellow(), "下载超时"),
            DownloadStatus::EmptyBody => (&symbols::ERROR, |s| s.red(), "下载内容为空"),
            DownloadStatus::IoError => (&symbols::ERROR, |s| s.red(), "本地文件读写错误"),
            DownloadStatus::UnexpectedError => {
                (&symbols::ERROR, |s| s.red(), "发生未预期的程序错误")
            }
        }
    }
}

impl From<&AppError> for DownloadStatus {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::Resolution(_) | AppError::Url(_) => DownloadStatus::ResolutionFailed,
            AppError::TooManyActiveDownloads { .. } | AppError::BatchTooLarge { .. } => {
                DownloadStatus::Rejected
            }
            AppError::Network(err)
            | AppError::NetworkMiddleware(reqwest_middleware::Error::Reqwest(err)) => {
                if err.is_timeout() {
                    DownloadStatus::TimeoutError
                } else if err.is_connect() {
                    DownloadStatus::ConnectionError
                } else if err.is_status() {
                    DownloadStatus::HttpError
                } else {
                    DownloadStatus::NetworkError
                }
            }
            AppError::NetworkMiddleware(_) => DownloadStatus::NetworkError,
            AppError::Timeout(_) => DownloadStatus::TimeoutError,
            AppError::EmptyBody => DownloadStatus::EmptyBody,
            AppError::Io(_) | AppError::TempFilePersist(_) => DownloadStatus::IoError,
            _ => DownloadStatus::UnexpectedError,
        }
    }
}

/// 单个歌曲下载的最终结果。无论成败都保留原始的歌曲信息以便调用方对应。
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub success: bool,
    pub artifact: Option<Artifact>,
    pub file_size: u64,
    pub error_message: String,
    pub status: DownloadStatus,
    pub tag_warning: Option<TaggingWarning>,
    pub descriptor: TrackDescriptor,
}

impl DownloadOutcome {
    pub fn file(
        descriptor: TrackDescriptor,
        path: PathBuf,
        file_size: u64,
        status: DownloadStatus,
    ) -> Self {
        Self {
            success: true,
            artifact: Some(Artifact::File(path)),
            file_size,
            error_message: String::new(),
            status,
            tag_warning: None,
            descriptor,
        }
    }

    pub fn memory(descriptor: TrackDescriptor, data: Vec<u8>) -> Self {
        Self {
            success: true,
            file_size: data.len() as u64,
            artifact: Some(Artifact::Memory(data)),
            error_message: String::new(),
            status: DownloadStatus::Success,
            tag_warning: None,
            descriptor,
        }
    }

    pub fn failed(descriptor: TrackDescriptor, error: &AppError) -> Self {
        Self {
            success: false,
            artifact: None,
            file_size: 0,
            error_message: error.to_string(),
            status: DownloadStatus::from(error),
            tag_warning: None,
            descriptor,
        }
    }

    pub fn with_tag_warning(mut self, warning: Option<TaggingWarning>) -> Self {
        self.tag_warning = warning;
        self
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        match &self.artifact {
            Some(Artifact::File(path)) => Some(path),
            _ => None,
        }
    }

    pub fn audio_data(&self) -> Option<&[u8]> {
        match &self.artifact {
            Some(Artifact::Memory(data)) => Some(data),
            _ => None,
        }
    }

    pub fn into_audio_data(self) -> Option<Vec<u8>> {
        match self.artifact {
            Some(Artifact::Memory(data)) => Some(data),
            _ => None,
        }
    }
}

/// 字节流的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SinkKind {
    #[default]
    File,
    Memory,
}

/// 批量下载的并发策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BatchMode {
    /// 固定大小的工作池，每个任务独立超时
    #[default]
    Pooled,
    /// 独立调度的任务句柄，由计数信号量限流
    Cooperative,
}

/// 某一时刻的磁盘下载进度
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub track_id: u64,
    pub filename: String,
    pub total_size: u64,
    pub current_size: u64,
    pub percent: f64,
    pub completed: bool,
}
