// src/resolver/manifest.rs

use super::TrackResolver;
use crate::{
    error::*,
    models::{QualityLevel, TrackDescriptor, api::RawTrack},
};
use anyhow::Context;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::{collections::HashMap, fs, path::Path};

/// 从本地 JSON 清单解析歌曲。清单是上游记录组成的数组，字段缺失时使用默认值。
#[derive(Debug, Clone, Default)]
pub struct ManifestResolver {
    order: Vec<u64>,
    records: HashMap<u64, RawTrack>,
}

impl ManifestResolver {
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取歌曲清单 '{}' 失败", path.display()))?;
        let records: Vec<RawTrack> = serde_json::from_str(&content)
            .with_context(|| format!("解析歌曲清单 '{}' 失败", path.display()))?;
        info!("从 '{}' 载入 {} 条歌曲记录", path.display(), records.len());
        Ok(Self::from_records(records))
    }

    /// 重复的 ID 以最后一条为准，但保留首次出现的位置。
    pub fn from_records(records: Vec<RawTrack>) -> Self {
        let mut resolver = Self::default();
        for record in records {
            let id = record.id;
            if resolver.records.insert(id, record).is_some() {
                warn!("清单中音乐ID {} 重复出现，使用最后一条记录", id);
            } else {
                resolver.order.push(id);
            }
        }
        resolver
    }

    /// 清单中的全部 ID，保持文件中的顺序
    pub fn ids(&self) -> &[u64] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[async_trait]
impl TrackResolver for ManifestResolver {
    async fn resolve(&self, track_id: u64, quality: QualityLevel) -> AppResult<TrackDescriptor> {
        let record = self
            .records
            .get(&track_id)
            .cloned()
            .ok_or_else(|| AppError::Resolution(format!("音乐ID {} 不在歌曲清单中", track_id)))?;
        let descriptor = record.into_descriptor(quality);
        debug!("解析音乐ID {} -> {}", track_id, descriptor.display_name());
        Ok(descriptor)
    }
}
