// src/workflows.rs

use crate::{
    DownloadJobContext,
    error::{AppError, AppResult},
    models::{DownloadOutcome, SinkKind},
    resolver::TrackResolver,
    symbols, ui, utils,
};
use anyhow::anyhow;
use colored::*;
use log::{info, warn};
use std::sync::Arc;

/// 下载指定的歌曲。超过单批上限的请求按顺序拆成多批执行。
pub(crate) async fn run_downloads(context: &DownloadJobContext, ids: &[u64]) -> AppResult<()> {
    if ids.is_empty() {
        ui::warn("没有需要下载的歌曲。");
        return Ok(());
    }

    let config = context.downloader.config();
    let batch_size = config.max_batch_size;
    let save_dir = std::path::absolute(&config.download_dir)
        .unwrap_or_else(|_| config.download_dir.clone());
    info!("文件将保存到目录: {:?}", save_dir);

    ui::print_header(&format!("开始下载 {} 首歌曲", ids.len()));
    ui::info(&format!("文件将保存到目录: \"{}\"", save_dir.display()));
    ui::info(&format!(
        "音质: {} | 并发数: {} | 策略: {:?}",
        context.args.quality.display_name(),
        config.max_concurrent,
        context.args.strategy
    ));

    context.manager.start_batch(ids.len());
    let resolver: Arc<dyn TrackResolver> = context.resolver.clone();
    let pbar = ui::new_tasks_progress_bar(ids.len() as u64, "下载");

    for (i, chunk) in ids.chunks(batch_size).enumerate() {
        if ids.len() > batch_size {
            info!("执行第 {} 批，共 {} 首", i + 1, chunk.len());
        }
        let outcomes = context
            .downloader
            .fetch_batch_by_ids(
                Arc::clone(&resolver),
                chunk,
                context.args.quality,
                context.args.strategy,
                SinkKind::File,
            )
            .await?;
        for outcome in &outcomes {
            context.manager.record(outcome);
            pbar.println(describe_outcome(outcome));
            pbar.inc(1);
        }
    }
    pbar.finish_and_clear();

    context.manager.print_report();
    let stats = context.manager.get_stats();
    if stats.failed > 0 {
        return Err(AppError::Other(anyhow!(
            "{} 个下载任务失败。",
            stats.failed
        )));
    }
    Ok(())
}

fn describe_outcome(outcome: &DownloadOutcome) -> String {
    let (symbol, color_fn, default_msg) = outcome.status.get_display_info();
    let name = outcome
        .file_path()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| outcome.descriptor.display_name());

    if !outcome.success {
        return format!(
            "{} {} {}",
            symbol,
            name,
            color_fn(format!("失败: {} (详情: {})", default_msg, outcome.error_message).into())
        );
    }
    let line = format!(
        "{} {} ({})",
        symbol,
        name,
        utils::format_file_size(outcome.file_size)
    );
    match &outcome.tag_warning {
        Some(warning) => format!("{} {} {}", line, *symbols::TAG, warning.to_string().yellow()),
        None => line,
    }
}

/// 打印清单中每首歌曲在下载目录中的完成度，不发起下载。
pub(crate) async fn run_progress(context: &DownloadJobContext) -> AppResult<()> {
    let ids = context.resolver.ids();
    ui::print_header(&format!("下载进度 ({} 首)", ids.len()));
    if ids.is_empty() {
        ui::warn("歌曲清单为空。");
        return Ok(());
    }

    let mut completed = 0;
    for &id in ids {
        let track = match context.resolver.resolve(id, context.args.quality).await {
            Ok(track) => track,
            Err(e) => {
                warn!("进度查询时解析音乐ID {} 失败: {}", id, e);
                ui::error(&format!("音乐ID {}: {}", id, e));
                continue;
            }
        };
        let report = context.downloader.progress(&track)?;
        let symbol = if report.completed {
            completed += 1;
            &*symbols::OK
        } else {
            &*symbols::INFO
        };
        ui::plain(&format!(
            "{} {} {:>6.1}% ({} / {})",
            symbol,
            utils::truncate_text(&report.filename, 60),
            report.percent,
            utils::format_file_size(report.current_size),
            utils::format_file_size(report.total_size)
        ));
    }

    ui::print_sub_header("进度总结");
    ui::plain(&format!(
        "{} | 共 {} 首",
        format!("已完成: {}", completed).green(),
        ids.len()
    ));
    Ok(())
}
