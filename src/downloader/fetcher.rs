// src/downloader/fetcher.rs

use super::{
    budget::ConcurrencyBudget,
    progress::target_path,
    sink::{ChunkSink, FileSink, MemorySink},
};
use crate::{
    client::{RobustClient, content_type_of},
    config::AppConfig,
    error::*,
    models::*,
    tagger::{TagEmbedder, TaggingWarning},
    utils,
};
use futures::StreamExt;
use log::{debug, error, info};
use reqwest::Response;
use std::{fs, path::Path, sync::Arc};
use url::Url;

/// 单首歌曲的下载与标签写入。缺少下载链接与超出并发上限以错误形式返回，
/// 其余失败都折叠进 `DownloadOutcome`。
pub(crate) struct Fetcher {
    client: Arc<RobustClient>,
    embedder: TagEmbedder,
    budget: ConcurrencyBudget,
    config: Arc<AppConfig>,
}

impl Fetcher {
    pub(crate) fn new(
        client: Arc<RobustClient>,
        budget: ConcurrencyBudget,
        config: Arc<AppConfig>,
    ) -> Self {
        let embedder = TagEmbedder::new(Arc::clone(&client), &config);
        Self {
            client,
            embedder,
            budget,
            config,
        }
    }

    pub(crate) async fn fetch(
        &self,
        track: &TrackDescriptor,
        sink: SinkKind,
    ) -> AppResult<DownloadOutcome> {
        match sink {
            SinkKind::File => self.to_file(track).await,
            SinkKind::Memory => self.to_memory(track).await,
        }
    }

    pub(crate) async fn to_file(&self, track: &TrackDescriptor) -> AppResult<DownloadOutcome> {
        track.ensure_resolved()?;
        let target = target_path(&self.config.download_dir, track);

        if let Ok(meta) = fs::metadata(&target)
            && meta.is_file()
        {
            info!("文件已存在，跳过下载: {:?}", target);
            return Ok(DownloadOutcome::file(
                track.clone(),
                target,
                meta.len(),
                DownloadStatus::Existing,
            ));
        }

        match self.download_file(track, &target).await {
            Ok((size, warning)) => {
                info!("下载完成: {:?} ({})", target, utils::format_file_size(size));
                Ok(
                    DownloadOutcome::file(track.clone(), target, size, DownloadStatus::Success)
                        .with_tag_warning(warning),
                )
            }
            Err(e) => {
                error!("下载 '{}' 失败: {}", track.display_name(), e);
                Ok(DownloadOutcome::failed(track.clone(), &e))
            }
        }
    }

    pub(crate) async fn to_memory(&self, track: &TrackDescriptor) -> AppResult<DownloadOutcome> {
        track.ensure_resolved()?;
        let _permit = self.budget.try_acquire()?;
        debug!(
            "内存下载开始 ({}/{}): {}",
            self.budget.active(),
            self.budget.max(),
            track.display_name()
        );

        match self.download_memory(track).await {
            Ok((data, warning)) => {
                info!(
                    "内存下载完成: {} ({})",
                    track.display_name(),
                    utils::format_file_size(data.len() as u64)
                );
                Ok(DownloadOutcome::memory(track.clone(), data).with_tag_warning(warning))
            }
            Err(e) => {
                error!("内存下载 '{}' 失败: {}", track.display_name(), e);
                Ok(DownloadOutcome::failed(track.clone(), &e))
            }
        }
    }

    async fn download_file(
        &self,
        track: &TrackDescriptor,
        target: &Path,
    ) -> AppResult<(u64, Option<TaggingWarning>)> {
        let url = Url::parse(track.download_url.trim())?;
        let res = self
            .client
            .get_stream(url, self.config.request_timeout, false)
            .await?;

        let mut sink = FileSink::create(target)?;
        if stream_into(res, &mut sink).await? == 0 {
            return Err(AppError::EmptyBody);
        }
        let pending = sink.finish()?;

        let ext = utils::determine_extension(&track.download_url, "");
        let format = AudioFormat::from_extension(ext).unwrap_or(AudioFormat::Mp3);
        let warning = self.embedder.embed_file(pending.path(), format, track).await;

        let size = pending.persist()?;
        Ok((size, warning))
    }

    async fn download_memory(
        &self,
        track: &TrackDescriptor,
    ) -> AppResult<(Vec<u8>, Option<TaggingWarning>)> {
        let url = Url::parse(track.download_url.trim())?;
        let res = self
            .client
            .get_stream(url, self.config.request_timeout, true)
            .await?;
        let content_type = content_type_of(&res).unwrap_or_default();
        let ext = utils::determine_extension(&track.download_url, &content_type);

        let mut sink = MemorySink::with_capacity(res.content_length().unwrap_or(track.file_size));
        if stream_into(res, &mut sink).await? == 0 {
            return Err(AppError::EmptyBody);
        }
        let data = sink.finish();

        let format = AudioFormat::from_extension(ext).unwrap_or(AudioFormat::Mp3);
        Ok(self.embedder.embed_in_memory(data, format, track).await)
    }
}

async fn stream_into<S: ChunkSink>(res: Response, sink: &mut S) -> AppResult<u64> {
    let mut stream = res.bytes_stream();
    while let Some(chunk) = stream.next().await {
        sink.write_chunk(&chunk?)?;
    }
    Ok(sink.written())
}
