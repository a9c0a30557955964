// src/logger.rs

use crate::{cli::LogLevel, constants};
use log::{LevelFilter, warn};
use std::{env, fs, path::PathBuf};

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// `~/.ncm-dl/ncm-dl.log`，取不到主目录时退回系统临时目录。
pub fn log_file_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home
            .join(constants::CONFIG_DIR_NAME)
            .join(constants::LOG_FILE_NAME),
        None => {
            eprintln!("警告: 无法获取用户主目录，日志将写入临时目录。");
            env::temp_dir()
                .join(clap::crate_name!())
                .join(constants::LOG_FILE_NAME)
        }
    }
}

/// 日志只写文件，不输出到终端，避免打乱进度条。初始化失败不影响程序运行。
pub fn init_logger(level: LogLevel) {
    if level == LogLevel::Off {
        return;
    }

    let log_file_path = log_file_path();
    if let Some(dir) = log_file_path.parent()
        && let Err(e) = fs::create_dir_all(dir)
    {
        eprintln!("警告: 无法创建日志目录 {:?}: {}", dir, e);
    }

    let file_appender = match fern::log_file(&log_file_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "警告: 无法打开主日志文件 {:?} : {}。将尝试使用备用日志文件。",
                log_file_path, e
            );
            let fallback_path = env::temp_dir().join(format!(
                "{}-{}",
                clap::crate_name!(),
                constants::LOG_FALLBACK_FILE_NAME
            ));
            match fern::log_file(&fallback_path) {
                Ok(file) => {
                    warn!("日志将写入备用文件: {:?}", fallback_path);
                    file
                }
                Err(e_fb) => {
                    eprintln!(
                        "错误: 无法创建主日志和备用日志文件 {:?}: {}。日志将不会被记录到文件。",
                        fallback_path, e_fb
                    );
                    return;
                }
            }
        }
    };

    let result = fern::Dispatch::new()
        .level(LevelFilter::from(level))
        // 第三方库的调试输出过多
        .level_for("hyper_util", LevelFilter::Info)
        .level_for("lofty", LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{:<5}] [{}:{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                message
            ))
        })
        .chain(file_appender)
        .apply();

    if let Err(e) = result {
        eprintln!("警告: 日志系统初始化失败: {}", e);
    }
}
