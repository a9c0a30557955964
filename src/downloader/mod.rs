// src/downloader/mod.rs

mod batch;
mod budget;
mod fetcher;
mod orchestrator;
mod progress;
mod sink;

pub use budget::{BudgetPermit, ConcurrencyBudget};
pub use orchestrator::Downloader;

// 批量运行的统计与汇总报告，只在命令行前端使用
use crate::{models::DownloadOutcome, symbols, ui};
use colored::*;
use log::{error, info};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct DownloadStats {
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Default)]
struct ReportState {
    stats: DownloadStats,
    failed: Vec<(String, String)>,
    skipped: Vec<(String, String)>,
    tag_warnings: Vec<(String, String)>,
}

#[derive(Clone, Default)]
pub struct DownloadManager {
    state: Arc<Mutex<ReportState>>,
}

impl DownloadManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_batch(&self, total_tasks: usize) {
        info!("开始新一批下载任务，总数: {}", total_tasks);
        let mut state = self.lock();
        *state = ReportState::default();
        state.stats.total = total_tasks;
    }

    pub fn record(&self, outcome: &DownloadOutcome) {
        let name = outcome.descriptor.display_name();
        let mut state = self.lock();
        if !outcome.success {
            error!("'{}' 下载失败，状态: {:?}", name, outcome.status);
            state.stats.failed += 1;
            let (_, _, msg) = outcome.status.get_display_info();
            state.failed.push((name, msg.to_string()));
            return;
        }

        if outcome.status == crate::models::DownloadStatus::Existing {
            info!("跳过 '{}'，原因: 文件已存在", name);
            state.stats.skipped += 1;
            let (_, _, msg) = outcome.status.get_display_info();
            state.skipped.push((name.clone(), msg.to_string()));
        } else {
            state.stats.success += 1;
        }
        if let Some(warning) = &outcome.tag_warning {
            state.tag_warnings.push((name, warning.to_string()));
        }
    }

    pub fn get_stats(&self) -> DownloadStats {
        self.lock().stats.clone()
    }

    pub fn did_all_succeed(&self) -> bool {
        self.lock().stats.failed == 0
    }

    pub fn print_report(&self) {
        let state = self.lock();
        let stats = &state.stats;
        info!(
            "下载报告: Total={}, Success={}, Skipped={}, Failed={}",
            stats.total, stats.success, stats.skipped, stats.failed
        );

        if !state.skipped.is_empty() || !state.failed.is_empty() || !state.tag_warnings.is_empty()
        {
            ui::print_sub_header("下载详情报告");
            if !state.skipped.is_empty() {
                println!("\n{} 跳过的文件 ({}个):", *symbols::INFO, stats.skipped);
                print_grouped_report(&state.skipped, |s| s.cyan());
            }
            if !state.tag_warnings.is_empty() {
                println!(
                    "\n{} 标签不完整的文件 ({}个):",
                    *symbols::WARN,
                    state.tag_warnings.len()
                );
                print_grouped_report(&state.tag_warnings, |s| s.yellow());
            }
            if !state.failed.is_empty() {
                println!("\n{} 失败的文件 ({}个):", *symbols::ERROR, stats.failed);
                print_grouped_report(&state.failed, |s| s.red());
            }
        }
        ui::print_sub_header("任务总结");
        if stats.total > 0 && stats.failed == 0 {
            println!(
                "{} 所有 {} 个任务均已成功 ({} 个已跳过)。",
                *symbols::OK,
                stats.total,
                stats.skipped
            );
        } else {
            let summary = format!(
                "{} | {} | {}",
                format!("成功: {}", stats.success).green(),
                format!("失败: {}", stats.failed).red(),
                format!("跳过: {}", stats.skipped).yellow()
            );
            println!("{}", summary);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn print_grouped_report(
    items: &[(String, String)],
    color_fn: fn(ColoredString) -> ColoredString,
) {
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, reason) in items {
        grouped.entry(reason).or_default().push(name);
    }
    for (reason, mut names) in grouped {
        println!("  - {}", color_fn(format!("原因: {}", reason).into()));
        names.sort_unstable();
        for name in names {
            println!("    - {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{DownloadStatus, QualityLevel, TrackDescriptor},
    };
    use std::path::PathBuf;

    #[test]
    fn test_stats_follow_outcomes() {
        let manager = DownloadManager::new();
        manager.start_batch(3);
        let track = TrackDescriptor::unresolved(1, QualityLevel::Standard);

        manager.record(&DownloadOutcome::memory(track.clone(), vec![1]));
        manager.record(&DownloadOutcome::file(
            track.clone(),
            PathBuf::from("x.mp3"),
            1,
            DownloadStatus::Existing,
        ));
        manager.record(&DownloadOutcome::failed(track, &AppError::EmptyBody));

        assert_eq!(
            manager.get_stats(),
            DownloadStats {
                total: 3,
                success: 1,
                skipped: 1,
                failed: 1
            }
        );
        assert!(!manager.did_all_succeed());
    }
}
