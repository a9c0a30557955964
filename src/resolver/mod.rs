// src/resolver/mod.rs

pub mod manifest;

pub use manifest::ManifestResolver;

use crate::{
    error::*,
    models::{QualityLevel, TrackDescriptor},
};
use async_trait::async_trait;

/// 把歌曲 ID 解析为可下载的歌曲信息。上游接口的细节全部藏在实现之后。
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, track_id: u64, quality: QualityLevel) -> AppResult<TrackDescriptor>;
}
