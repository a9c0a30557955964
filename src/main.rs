// src/main.rs

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use ncm_dl::{cli::Cli, logger, run_from_cli, symbols};
use std::{env, sync::Arc, time::Duration};

#[tokio::main]
async fn main() {
    // 为 Windows 终端启用 ANSI 颜色支持。
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n{} 检测到 {}，用户强制中断程序。", *symbols::WARN, *symbols::CTRL_C);
            tokio::time::sleep(Duration::from_millis(100)).await;
            std::process::exit(130);
        }
    });

    let bin_name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| clap::crate_name!().to_string());
    let after_help = format!(
        "示例:\n  # 下载清单中的全部歌曲\n  {bin} -m tracks.json --all\n\n  # 以无损音质下载指定的两首歌曲到 music 目录\n  {bin} -m tracks.json --id 186016,185868 -q lossless -o music\n\n  # 查看下载进度\n  {bin} -m tracks.json --progress",
        bin = bin_name
    );
    let cmd = Cli::command().after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };

    logger::init_logger(args.log_level);

    if let Err(e) = run_from_cli(args).await {
        log::error!("程序执行出错: {}", e);
        eprintln!("\n{} {}", *symbols::ERROR, format!("程序执行出错: {}", e).red());
        std::process::exit(1);
    }
}
