// src/models/api.rs

use super::{QualityLevel, TrackDescriptor};
use crate::constants::defaults;
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

// --- 上游返回的松散结构，只在解析边界出现一次 ---

#[derive(Deserialize, Debug, Clone)]
pub struct RawArtist {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RawAlbum {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "picUrl")]
    pub pic_url: Option<String>,
}

/// 发行时间在上游里既可能是毫秒时间戳，也可能已经是字符串。
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum RawPublishTime {
    Millis(i64),
    Text(String),
}

#[derive(Deserialize, Debug, Clone)]
pub struct RawTrack {
    pub id: u64,
    pub name: Option<String>,
    #[serde(rename = "publishTime")]
    pub publish_time: Option<RawPublishTime>,
    #[serde(alias = "artists")]
    pub artist_string: Option<String>,
    #[serde(default)]
    pub ar: Vec<RawArtist>,
    pub album: Option<String>,
    #[serde(default)]
    pub al: RawAlbum,
    pub pic_url: Option<String>,
    /// 秒
    pub duration: Option<u64>,
    /// 毫秒
    pub dt: Option<u64>,
    #[serde(alias = "no")]
    pub track_number: Option<u32>,
    #[serde(alias = "url")]
    pub download_url: Option<String>,
    #[serde(alias = "type")]
    pub file_type: Option<String>,
    #[serde(alias = "size")]
    pub file_size: Option<u64>,
    pub quality: Option<QualityLevel>,
    pub lyric: Option<String>,
    pub tlyric: Option<String>,
}

impl RawTrack {
    /// 把上游记录收敛为强类型的 `TrackDescriptor`，每个可选字段都给出明确的默认值。
    pub fn into_descriptor(self, requested_quality: QualityLevel) -> TrackDescriptor {
        let artists = self
            .artist_string
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                self.ar
                    .iter()
                    .map(|a| a.name.as_str())
                    .filter(|n| !n.is_empty())
                    .collect::<Vec<_>>()
                    .join("/")
            });

        TrackDescriptor {
            id: self.id,
            name: non_empty_or(self.name, defaults::TRACK_NAME),
            artists: non_empty_or(Some(artists), defaults::ARTIST),
            album: non_empty_or(self.album.or(self.al.name), defaults::ALBUM),
            cover_url: self.pic_url.or(self.al.pic_url).unwrap_or_default(),
            duration_secs: self
                .duration
                .or(self.dt.map(|ms| ms / 1000))
                .unwrap_or(0),
            track_number: self.track_number.unwrap_or(0),
            release_date: self
                .publish_time
                .map(|p| publish_time_to_date(&p))
                .unwrap_or_default(),
            download_url: self.download_url.unwrap_or_default().trim().to_string(),
            file_type: non_empty_or(self.file_type, defaults::FILE_TYPE).to_lowercase(),
            file_size: self.file_size.unwrap_or(0),
            quality: self.quality.unwrap_or(requested_quality),
            lyric: self.lyric.unwrap_or_default(),
            translated_lyric: self.tlyric.unwrap_or_default(),
        }
    }
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn publish_time_to_date(raw: &RawPublishTime) -> String {
    match raw {
        RawPublishTime::Millis(ms) => timestamp_to_date(*ms),
        RawPublishTime::Text(text) => {
            let text = text.trim();
            match text.parse::<i64>() {
                Ok(ms) if text.len() > 4 => timestamp_to_date(ms),
                _ => text.to_string(),
            }
        }
    }
}

/// 13位毫秒时间戳 -> `YYYY-MM-DD` (东八区)。11位的值先补齐到13位，其余长度视为无效。
pub fn timestamp_to_date(timestamp: i64) -> String {
    let mut millis = timestamp;
    if (10_i64.pow(10)..10_i64.pow(11)).contains(&millis) {
        millis *= 100;
    }
    if !(10_i64.pow(12)..10_i64.pow(13)).contains(&millis) {
        return String::new();
    }
    let Some(offset) = FixedOffset::east_opt(8 * 3600) else {
        return String::new();
    };
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.with_timezone(&offset).format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_date() {
        // 2011-05-14T16:00:00Z
        assert_eq!(timestamp_to_date(1_305_388_800_000), "2011-05-15");
        // 11位值补齐为13位
        assert_eq!(timestamp_to_date(13_053_888_000), "2011-05-15");
        assert_eq!(timestamp_to_date(2025), "");
        assert_eq!(timestamp_to_date(-1), "");
    }

    #[test]
    fn test_publish_time_text_passthrough() {
        let raw = RawPublishTime::Text("2020-01-02".to_string());
        assert_eq!(publish_time_to_date(&raw), "2020-01-02");
        let year_only = RawPublishTime::Text("2025".to_string());
        assert_eq!(publish_time_to_date(&year_only), "2025");
    }

    #[test]
    fn test_flat_record_into_descriptor() {
        let raw: RawTrack = serde_json::from_value(serde_json::json!({
            "id": 42,
            "name": "晴天",
            "artist_string": "周杰伦",
            "album": "叶惠美",
            "pic_url": "http://img/cover.jpg",
            "duration": 269,
            "track_number": 3,
            "download_url": " http://cdn/a.flac ",
            "file_type": "FLAC",
            "file_size": 1000,
            "publishTime": 1_059_580_800_000_i64,
            "lyric": "[00:00]歌词",
            "tlyric": ""
        }))
        .unwrap();

        let d = raw.into_descriptor(QualityLevel::Lossless);
        assert_eq!(d.artists, "周杰伦");
        assert_eq!(d.download_url, "http://cdn/a.flac");
        assert_eq!(d.file_type, "flac");
        assert_eq!(d.quality, QualityLevel::Lossless);
        assert_eq!(d.release_date, "2003-07-31");
        assert_eq!(d.track_number, 3);
    }

    #[test]
    fn test_detail_record_defaults() {
        let raw: RawTrack = serde_json::from_value(serde_json::json!({
            "id": 7,
            "ar": [{"name": "A"}, {"name": "B"}],
            "al": {"name": "Album", "picUrl": "http://img/p.png"},
            "dt": 181_000,
            "no": 2
        }))
        .unwrap();

        let d = raw.into_descriptor(QualityLevel::Standard);
        assert_eq!(d.name, defaults::TRACK_NAME);
        assert_eq!(d.artists, "A/B");
        assert_eq!(d.album, "Album");
        assert_eq!(d.cover_url, "http://img/p.png");
        assert_eq!(d.duration_secs, 181);
        assert_eq!(d.track_number, 2);
        assert_eq!(d.file_type, "mp3");
        assert!(d.download_url.is_empty());
        assert!(d.ensure_resolved().is_err());
    }
}
