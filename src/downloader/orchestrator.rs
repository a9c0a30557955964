// src/downloader/orchestrator.rs

use super::{
    batch::{self, BatchItem},
    budget::ConcurrencyBudget,
    fetcher::Fetcher,
    progress,
};
use crate::{
    client::RobustClient, config::AppConfig, error::*, models::*, resolver::TrackResolver,
};
use futures::FutureExt;
use log::{info, warn};
use std::sync::Arc;

/// 下载流水线的入口。并发上限在构造时确定，单曲内存下载与批量下载共用同一个上限。
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<Fetcher>,
    budget: ConcurrencyBudget,
    config: Arc<AppConfig>,
}

impl Downloader {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let client = Arc::new(RobustClient::new(Arc::clone(&config))?);
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Arc<AppConfig>, client: Arc<RobustClient>) -> Self {
        let budget = ConcurrencyBudget::new(config.max_concurrent);
        let fetcher = Fetcher::new(client, budget.clone(), Arc::clone(&config));
        Self {
            fetcher: Arc::new(fetcher),
            budget,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn budget(&self) -> &ConcurrencyBudget {
        &self.budget
    }

    /// 下载到 `download_dir`。目标文件已存在时直接返回，不发起请求。
    pub async fn fetch_to_file(&self, track: &TrackDescriptor) -> AppResult<DownloadOutcome> {
        self.fetcher.to_file(track).await
    }

    /// 下载到内存。活跃下载已达上限时立即返回 `TooManyActiveDownloads`。
    pub async fn fetch_to_memory(&self, track: &TrackDescriptor) -> AppResult<DownloadOutcome> {
        self.fetcher.to_memory(track).await
    }

    pub async fn fetch_by_id(
        &self,
        resolver: &dyn TrackResolver,
        track_id: u64,
        quality: QualityLevel,
        sink: SinkKind,
    ) -> AppResult<DownloadOutcome> {
        let track = resolver.resolve(track_id, quality).await?;
        self.fetcher.fetch(&track, sink).await
    }

    /// 批量下载。超过批量上限时整批拒绝；否则每一项都会得到一个结果，顺序与输入一致。
    pub async fn fetch_batch(
        &self,
        tracks: Vec<TrackDescriptor>,
        mode: BatchMode,
        sink: SinkKind,
    ) -> AppResult<Vec<DownloadOutcome>> {
        self.check_batch_size(tracks.len())?;
        let items = tracks
            .into_iter()
            .map(|track| {
                let fetcher = Arc::clone(&self.fetcher);
                BatchItem {
                    placeholder: track.clone(),
                    job: async move {
                        let result = fetcher.fetch(&track, sink).await;
                        result.unwrap_or_else(|e| DownloadOutcome::failed(track, &e))
                    }
                    .boxed(),
                }
            })
            .collect();
        Ok(self.run_batch(items, mode).await)
    }

    /// 与 `fetch_batch` 相同，但解析在各自的任务中完成，解析失败只影响对应的一项。
    pub async fn fetch_batch_by_ids(
        &self,
        resolver: Arc<dyn TrackResolver>,
        track_ids: &[u64],
        quality: QualityLevel,
        mode: BatchMode,
        sink: SinkKind,
    ) -> AppResult<Vec<DownloadOutcome>> {
        self.check_batch_size(track_ids.len())?;
        let items = track_ids
            .iter()
            .map(|&track_id| {
                let fetcher = Arc::clone(&self.fetcher);
                let resolver = Arc::clone(&resolver);
                let placeholder = TrackDescriptor::unresolved(track_id, quality);
                BatchItem {
                    placeholder: placeholder.clone(),
                    job: async move {
                        let track = match resolver.resolve(track_id, quality).await {
                            Ok(track) => track,
                            Err(e) => {
                                warn!("音乐ID {} 解析失败: {}", track_id, e);
                                return DownloadOutcome::failed(placeholder, &e);
                            }
                        };
                        let result = fetcher.fetch(&track, sink).await;
                        result.unwrap_or_else(|e| DownloadOutcome::failed(track, &e))
                    }
                    .boxed(),
                }
            })
            .collect();
        Ok(self.run_batch(items, mode).await)
    }

    pub fn progress(&self, track: &TrackDescriptor) -> AppResult<ProgressReport> {
        progress::inspect(&self.config.download_dir, track)
    }

    fn check_batch_size(&self, requested: usize) -> AppResult<()> {
        let max = self.config.max_batch_size;
        if requested > max {
            warn!("批量请求 {} 项，超过上限 {}，整批拒绝", requested, max);
            return Err(AppError::BatchTooLarge { requested, max });
        }
        Ok(())
    }

    async fn run_batch(&self, items: Vec<BatchItem>, mode: BatchMode) -> Vec<DownloadOutcome> {
        let total = items.len();
        let outcomes =
            batch::run(items, mode, self.config.max_concurrent, self.config.task_timeout).await;
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        info!("批量下载结束: {}/{} 成功", succeeded, total);
        outcomes
    }
}
