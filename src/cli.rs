// src/cli.rs

use crate::models::{BatchMode, QualityLevel};
use clap::{Parser, ValueEnum, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(&["ids", "all", "progress"]),
))]
pub struct Cli {
    // --- 运行模式 (Mode) ---
    /// 下载清单中指定ID的歌曲 (可重复或用逗号分隔)
    #[arg(long = "id", value_name = "ID", value_delimiter = ',', num_args = 1.., help_heading = "Mode")]
    pub ids: Vec<u64>,
    /// 下载清单中的全部歌曲
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub all: bool,
    /// 查看清单中歌曲在下载目录中的进度，不发起下载
    #[arg(short, long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub progress: bool,

    // --- 下载选项 (Options) ---
    /// 歌曲清单文件 (JSON 数组，每项为一首已解析的歌曲)
    #[arg(short, long, value_name = "FILE", help_heading = "Options")]
    pub manifest: PathBuf,
    /// 音质等级
    #[arg(short, long, value_enum, default_value_t = QualityLevel::Standard, help_heading = "Options")]
    pub quality: QualityLevel,
    /// 批量下载的并发策略
    #[arg(long, value_enum, default_value_t = BatchMode::Pooled, help_heading = "Options")]
    pub strategy: BatchMode,
    /// 设置最大并发下载数
    #[arg(short, long, value_parser = clap::value_parser!(usize), help_heading = "Options")]
    pub workers: Option<usize>,
    /// 设置文件保存目录 (默认读取 DOWNLOAD_PATH 或配置文件)
    #[arg(short, long, value_name = "DIR", help_heading = "Options")]
    pub output: Option<PathBuf>,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
