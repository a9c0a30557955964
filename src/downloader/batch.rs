// src/downloader/batch.rs

use crate::{error::*, models::*};
use anyhow::anyhow;
use futures::{
    FutureExt, StreamExt,
    future::BoxFuture,
    stream::{self, FuturesUnordered},
};
use log::{debug, error, warn};
use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// 批量中的一项。`placeholder` 用于任务自身无法给出结果时（超时、panic）构造失败结果。
pub(crate) struct BatchItem {
    pub(crate) placeholder: TrackDescriptor,
    pub(crate) job: BoxFuture<'static, DownloadOutcome>,
}

pub(crate) async fn run(
    items: Vec<BatchItem>,
    mode: BatchMode,
    max_workers: usize,
    task_timeout: Duration,
) -> Vec<DownloadOutcome> {
    let max_workers = max_workers.clamp(1, items.len().max(1));
    debug!(
        "批量执行 {} 个任务，策略 {:?}，并发 {}",
        items.len(),
        mode,
        max_workers
    );
    match mode {
        BatchMode::Pooled => run_pooled(items, max_workers, task_timeout).await,
        BatchMode::Cooperative => run_cooperative(items, max_workers, task_timeout).await,
    }
}

/// 固定大小的工作池：同一时刻最多 `max_workers` 个任务在途，结果按提交顺序返回。
async fn run_pooled(
    items: Vec<BatchItem>,
    max_workers: usize,
    task_timeout: Duration,
) -> Vec<DownloadOutcome> {
    stream::iter(items)
        .map(|BatchItem { placeholder, job }| async move {
            match tokio::time::timeout(task_timeout, AssertUnwindSafe(job).catch_unwind()).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => {
                    error!("任务 '{}' 异常终止", placeholder.display_name());
                    DownloadOutcome::failed(placeholder, &AppError::Other(anyhow!("任务异常终止")))
                }
                Err(_) => {
                    warn!("任务 '{}' 超时", placeholder.display_name());
                    DownloadOutcome::failed(placeholder, &AppError::Timeout(task_timeout))
                }
            }
        })
        .buffered(max_workers)
        .collect()
        .await
}

/// 每个任务独立 spawn，由信号量限流。任务各自持有一个批次令牌的子令牌，超时即取消该令牌；
/// 批次 future 被丢弃时父令牌随之取消，所有未完成任务一并退出。
async fn run_cooperative(
    items: Vec<BatchItem>,
    max_workers: usize,
    task_timeout: Duration,
) -> Vec<DownloadOutcome> {
    let semaphore = Arc::new(Semaphore::new(max_workers));
    let batch_token = CancellationToken::new();
    let _batch_guard = batch_token.clone().drop_guard();

    let mut placeholders = Vec::with_capacity(items.len());
    let mut slots: Vec<Option<DownloadOutcome>> = vec![None; items.len()];
    let mut handles = FuturesUnordered::new();

    for (index, BatchItem { placeholder, job }) in items.into_iter().enumerate() {
        placeholders.push(placeholder);
        let semaphore = Arc::clone(&semaphore);
        let batch = batch_token.clone();
        let token = batch_token.child_token();

        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| AppError::Other(anyhow!("并发信号量已关闭: {}", e)))?;

            let watchdog = {
                let token = token.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(task_timeout).await;
                    token.cancel();
                })
            };

            let result = tokio::select! {
                biased;
                outcome = job => Ok(outcome),
                _ = token.cancelled() => Err(if batch.is_cancelled() {
                    AppError::UserInterrupt
                } else {
                    AppError::Timeout(task_timeout)
                }),
            };
            watchdog.abort();
            result
        });
        handles.push(handle.map(move |joined| (index, joined)));
    }

    while let Some((index, joined)) = handles.next().await {
        let placeholder = placeholders[index].clone();
        let outcome = match joined {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!("任务 '{}' 未完成: {}", placeholder.display_name(), e);
                DownloadOutcome::failed(placeholder, &e)
            }
            Err(join_err) => {
                error!("任务 '{}' 异常终止: {}", placeholder.display_name(), join_err);
                DownloadOutcome::failed(
                    placeholder,
                    &AppError::Other(anyhow!("任务异常终止: {}", join_err)),
                )
            }
        };
        slots[index] = Some(outcome);
    }

    slots
        .into_iter()
        .zip(placeholders)
        .map(|(slot, placeholder)| {
            slot.unwrap_or_else(|| {
                DownloadOutcome::failed(placeholder, &AppError::Other(anyhow!("任务未返回结果")))
            })
        })
        .collect()
}
