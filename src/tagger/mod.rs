// src/tagger/mod.rs

pub mod cover;
mod fields;

pub use cover::compress_cover;

use self::fields::{RejectedField, TagDraft, apply_base_fields, format_for, tag_type_for};
use crate::{
    client::RobustClient,
    config::AppConfig,
    constants::tags,
    error::AppResult,
    models::{AudioFormat, TrackDescriptor},
};
use lofty::{
    config::{ParseOptions, WriteOptions},
    error::LoftyError,
    file::TaggedFileExt,
    io::{FileLike, Length, Truncate},
    picture::{MimeType, Picture, PictureType},
    probe::Probe,
    tag::{Tag, TagExt, TagType},
};
use log::{debug, info, warn};
use std::{
    fmt,
    fs::{File, OpenOptions},
    io::Cursor,
    path::Path,
    sync::Arc,
    time::Duration,
};

/// 标签写入分两步，警告会标明是哪一步失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStage {
    BaseTags,
    Cover,
}

impl fmt::Display for TagStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagStage::BaseTags => f.write_str("基础标签"),
            TagStage::Cover => f.write_str("封面"),
        }
    }
}

/// 非致命的标签写入问题。音频本身仍然可用，只是元数据不完整。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggingWarning {
    pub stage: TagStage,
    pub message: String,
}

impl TaggingWarning {
    fn new(stage: TagStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaggingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}写入失败: {}", self.stage, self.message)
    }
}

enum CoverArt {
    None,
    Skipped(String),
    Ready(Picture),
}

pub struct TagEmbedder {
    client: Arc<RobustClient>,
    cover_timeout: Duration,
    cover_max_bytes: usize,
}

impl TagEmbedder {
    pub fn new(client: Arc<RobustClient>, config: &AppConfig) -> Self {
        Self {
            client,
            cover_timeout: config.cover_timeout,
            cover_max_bytes: config.cover_max_bytes,
        }
    }

    /// 就地为磁盘上的音频文件写入标签。失败只会体现为返回的警告。
    pub async fn embed_file(
        &self,
        path: &Path,
        format: AudioFormat,
        track: &TrackDescriptor,
    ) -> Option<TaggingWarning> {
        let owned_path = path.to_path_buf();
        let owned_track = track.clone();
        let base = run_blocking(TagStage::BaseTags, move || -> AppResult<(File, TagDraft)> {
            let mut file = OpenOptions::new().read(true).write(true).open(&owned_path)?;
            let draft = write_base(&mut file, format, &owned_track)?;
            Ok((file, draft))
        })
        .await;
        let (mut file, mut draft) = match base {
            Ok(Ok(written)) => written,
            Ok(Err(e)) => {
                warn!("写入基础标签失败 {:?}: {}", path, e);
                return Some(TaggingWarning::new(TagStage::BaseTags, e.to_string()));
            }
            Err(warning) => return Some(warning),
        };

        let picture = match self.prepare_cover(track).await {
            CoverArt::None => return None,
            CoverArt::Skipped(reason) => return Some(TaggingWarning::new(TagStage::Cover, reason)),
            CoverArt::Ready(picture) => picture,
        };
        let cover = run_blocking(TagStage::Cover, move || -> AppResult<()> {
            write_cover(&mut file, &mut draft, picture).inspect_err(|_| {
                // 去掉封面重新保存，保证基础标签仍在
                draft.tag.remove_picture_type(PictureType::CoverFront);
                if let Err(e) = save_tag(&mut file, &draft) {
                    warn!("恢复基础标签失败: {}", e);
                }
            })
        })
        .await;
        match cover {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                warn!("写入封面失败 {:?}: {}", path, e);
                Some(TaggingWarning::new(TagStage::Cover, e.to_string()))
            }
            Err(warning) => Some(warning),
        }
    }

    /// 为内存中的音频写入标签，返回写入后的字节（失败时为写入前的最后一个完好版本）。
    pub async fn embed_in_memory(
        &self,
        data: Vec<u8>,
        format: AudioFormat,
        track: &TrackDescriptor,
    ) -> (Vec<u8>, Option<TaggingWarning>) {
        if data.is_empty() {
            warn!("音频数据为空，跳过标签写入: {}", track.display_name());
            return (data, None);
        }

        let snapshot = data.clone();
        let owned_track = track.clone();
        let base = run_blocking(TagStage::BaseTags, move || {
            let mut cursor = Cursor::new(data);
            let result = write_base(&mut cursor, format, &owned_track);
            (cursor, result)
        })
        .await;
        let (mut cursor, mut draft) = match base {
            Ok((cursor, Ok(draft))) => (cursor, draft),
            Ok((_, Err(e))) => {
                warn!("写入基础标签失败 ({}): {}", track.display_name(), e);
                return (
                    snapshot,
                    Some(TaggingWarning::new(TagStage::BaseTags, e.to_string())),
                );
            }
            Err(warning) => return (snapshot, Some(warning)),
        };
        drop(snapshot);

        let warning = match self.prepare_cover(track).await {
            CoverArt::None => None,
            CoverArt::Skipped(reason) => Some(TaggingWarning::new(TagStage::Cover, reason)),
            CoverArt::Ready(picture) => {
                let snapshot = cursor.get_ref().clone();
                let cover = run_blocking(TagStage::Cover, move || {
                    let result = write_cover(&mut cursor, &mut draft, picture);
                    (cursor, result)
                })
                .await;
                match cover {
                    Ok((tagged, Ok(()))) => {
                        cursor = tagged;
                        None
                    }
                    Ok((_, Err(e))) => {
                        warn!("写入封面失败 ({}): {}", track.display_name(), e);
                        cursor = Cursor::new(snapshot);
                        Some(TaggingWarning::new(TagStage::Cover, e.to_string()))
                    }
                    Err(warning) => {
                        cursor = Cursor::new(snapshot);
                        Some(warning)
                    }
                }
            }
        };

        let mut data = cursor.into_inner();
        data.shrink_to_fit();
        (data, warning)
    }

    async fn prepare_cover(&self, track: &TrackDescriptor) -> CoverArt {
        let url = track.cover_url.trim();
        if url.is_empty() {
            return CoverArt::None;
        }

        let (data, content_type) = match self.client.fetch_bytes(url, self.cover_timeout).await {
            Ok(res) => res,
            Err(e) => {
                warn!("封面下载失败 ({}): {}", url, e);
                return CoverArt::Skipped(format!("封面下载失败: {}", e));
            }
        };
        if data.is_empty() {
            warn!("封面内容为空: {}", url);
            return CoverArt::Skipped("封面内容为空".to_string());
        }

        if data.len() <= self.cover_max_bytes {
            let mime = cover::sniff_mime(&data, content_type.as_deref());
            return CoverArt::Ready(front_cover(mime, data));
        }

        info!(
            "封面过大 ({} 字节，上限 {} 字节)，尝试压缩",
            data.len(),
            self.cover_max_bytes
        );
        let max_bytes = self.cover_max_bytes;
        let compressed =
            tokio::task::spawn_blocking(move || compress_cover(&data, max_bytes)).await;
        match compressed {
            Ok(Ok(Some(jpeg))) => {
                debug!("封面压缩完成: {} 字节", jpeg.len());
                CoverArt::Ready(front_cover(MimeType::Jpeg, jpeg))
            }
            Ok(Ok(None)) => {
                warn!("封面压缩后仍超过上限，跳过封面");
                CoverArt::Skipped("封面压缩后仍超过大小上限".to_string())
            }
            Ok(Err(e)) => {
                warn!("封面压缩失败: {}", e);
                CoverArt::Skipped(e.to_string())
            }
            Err(e) => {
                warn!("封面压缩任务异常: {}", e);
                CoverArt::Skipped(e.to_string())
            }
        }
    }
}

fn front_cover(mime: MimeType, data: Vec<u8>) -> Picture {
    Picture::new_unchecked(
        PictureType::CoverFront,
        Some(mime),
        Some(tags::COVER_DESC.to_string()),
        data,
    )
}

/// 标签库的读写是同步的，放到阻塞线程池执行。
/// 标签库在畸形数据上可能 panic，这里把它收敛为对应阶段的警告。
async fn run_blocking<T, F>(stage: TagStage, job: F) -> Result<T, TaggingWarning>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job).await.map_err(|e| {
        warn!("{}写入任务异常终止: {}", stage, e);
        TaggingWarning::new(stage, format!("标签库内部错误: {}", e))
    })
}

/// 读取已有标签（保留其余帧），写入基础字段并立即保存。
/// 实际容器格式以内容探测结果为准，探测不出时沿用声明的格式。
fn write_base<F>(
    file: &mut F,
    declared: AudioFormat,
    track: &TrackDescriptor,
) -> AppResult<TagDraft>
where
    F: FileLike,
    LoftyError: From<<F as Truncate>::Error> + From<<F as Length>::Error>,
{
    file.rewind()?;
    let tagged = Probe::new(&mut *file)
        .options(ParseOptions::new().read_properties(false))
        .guess_file_type()?
        .read()?;

    let format = match format_for(tagged.file_type()) {
        Some(detected) if detected != declared => {
            debug!("声明格式为 {}，实际内容为 {}，按实际格式写入", declared, detected);
            detected
        }
        Some(detected) => detected,
        None => declared,
    };
    let tag_type = tag_type_for(format);
    let mut draft = TagDraft::new(
        tagged
            .tag(tag_type)
            .cloned()
            .unwrap_or_else(|| Tag::new(tag_type)),
    );

    for RejectedField(field) in apply_base_fields(&mut draft, format, track) {
        debug!("{} 格式不接受字段 {}，已跳过", format, field);
    }
    save_tag(file, &draft)?;
    Ok(draft)
}

fn write_cover<F>(file: &mut F, draft: &mut TagDraft, picture: Picture) -> AppResult<()>
where
    F: FileLike,
    LoftyError: From<<F as Truncate>::Error> + From<<F as Length>::Error>,
{
    draft.tag.remove_picture_type(PictureType::CoverFront);
    draft.tag.push_picture(picture);
    save_tag(file, draft)
}

fn save_tag<F>(file: &mut F, draft: &TagDraft) -> AppResult<()>
where
    F: FileLike,
    LoftyError: From<<F as Truncate>::Error> + From<<F as Length>::Error>,
{
    file.rewind()?;
    if draft.tag.tag_type() == TagType::Id3v2 {
        draft.to_id3v2().save_to(file, WriteOptions::default())?;
    } else {
        draft.tag.save_to(file, WriteOptions::default())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityLevel;
    use lofty::{
        file::AudioFile,
        flac::FlacFile,
        id3::v2::Frame,
        mpeg::MpegFile,
        tag::Accessor,
    };

    fn embedder() -> TagEmbedder {
        let config = AppConfig::new(std::env::temp_dir(), 1);
        let client = RobustClient::new(Arc::new(config.clone())).unwrap();
        TagEmbedder::new(Arc::new(client), &config)
    }

    fn track() -> TrackDescriptor {
        let mut track = TrackDescriptor::unresolved(1, QualityLevel::Standard);
        track.name = "T".into();
        track.artists = "A".into();
        track.album = "B".into();
        track.track_number = 5;
        track.release_date = "2020-03-04".into();
        track.download_url = "http://ok/a.mp3".into();
        track.lyric = "[00:01]原词".into();
        track.translated_lyric = "[00:01]译文".into();
        track
    }

    fn mp3_bytes() -> Vec<u8> {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        frame.repeat(20)
    }

    /// 只有 STREAMINFO 的 FLAC，`with_padding` 时追加一个 PADDING 块
    fn flac_bytes(with_padding: bool) -> Vec<u8> {
        let mut data = b"fLaC".to_vec();
        data.push(if with_padding { 0x00 } else { 0x80 });
        data.extend_from_slice(&[0, 0, 34]);
        data.extend_from_slice(&[0x10, 0x00, 0x10, 0x00, 0, 0, 0, 0, 0, 0]);
        // 44100Hz / 双声道 / 16bit / 0 个采样
        data.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0, 0, 0, 0]);
        data.extend_from_slice(&[0u8; 16]);
        if with_padding {
            data.extend_from_slice(&[0x81, 0, 0, 16]);
            data.extend_from_slice(&[0u8; 16]);
        }
        data
    }

    fn read_options() -> ParseOptions {
        ParseOptions::new().read_properties(false)
    }

    #[tokio::test]
    async fn test_id3_keeps_both_lyric_frames_after_save() {
        let (data, warning) = embedder()
            .embed_in_memory(mp3_bytes(), AudioFormat::Mp3, &track())
            .await;
        assert!(warning.is_none(), "{:?}", warning);

        let mpeg = MpegFile::read_from(&mut Cursor::new(data), read_options()).unwrap();
        let id3 = mpeg.id3v2().expect("ID3v2 tag should exist");
        assert_eq!(id3.title().as_deref(), Some("T"));
        assert_eq!(id3.track(), Some(5));

        let mut lyrics: Vec<(String, String)> = id3
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::UnsynchronizedText(uslt) => {
                    Some((uslt.description.clone(), uslt.content.clone()))
                }
                _ => None,
            })
            .collect();
        lyrics.sort();
        assert_eq!(
            lyrics,
            vec![
                ("Lyrics".to_string(), "[00:01]原词".to_string()),
                ("Translated Lyrics".to_string(), "[00:01]译文".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_rewriting_id3_replaces_lyrics_instead_of_duplicating() {
        let embedder = embedder();
        let mut track = track();
        let (first, _) = embedder
            .embed_in_memory(mp3_bytes(), AudioFormat::Mp3, &track)
            .await;
        track.translated_lyric.clear();
        let (second, warning) = embedder
            .embed_in_memory(first, AudioFormat::Mp3, &track)
            .await;
        assert!(warning.is_none());

        let mpeg = MpegFile::read_from(&mut Cursor::new(second), read_options()).unwrap();
        let uslt_count = mpeg
            .id3v2()
            .unwrap()
            .into_iter()
            .filter(|frame| matches!(frame, Frame::UnsynchronizedText(_)))
            .count();
        assert_eq!(uslt_count, 1);
    }

    #[tokio::test]
    async fn test_vorbis_fields_survive_save() {
        let (data, warning) = embedder()
            .embed_in_memory(flac_bytes(true), AudioFormat::Flac, &track())
            .await;
        assert!(warning.is_none(), "{:?}", warning);

        let flac = FlacFile::read_from(&mut Cursor::new(data), read_options()).unwrap();
        let vc = flac.vorbis_comments().expect("vorbis comments should exist");
        assert_eq!(vc.get("TITLE"), Some("T"));
        assert_eq!(vc.get("TRACKNUMBER"), Some("5"));
        assert_eq!(vc.get("YEAR"), Some("2020"));
        assert_eq!(vc.get("DATE"), Some("2020-03-04"));
        assert_eq!(vc.get("LYRICS"), Some("[00:01]原词"));
        assert_eq!(vc.get("TRANSLATEDLYRICS"), Some("[00:01]译文"));
    }

    #[tokio::test]
    async fn test_empty_date_writes_no_date_fields() {
        let mut track = track();
        track.release_date.clear();
        let (data, _) = embedder()
            .embed_in_memory(flac_bytes(true), AudioFormat::Flac, &track)
            .await;

        let flac = FlacFile::read_from(&mut Cursor::new(data), read_options()).unwrap();
        let vc = flac.vorbis_comments().unwrap();
        assert_eq!(vc.get("YEAR"), None);
        assert_eq!(vc.get("DATE"), None);
        assert_eq!(vc.get("TITLE"), Some("T"));
    }

    #[tokio::test]
    async fn test_tagging_panic_becomes_warning() {
        // 没有任何可复用空间的 FLAC，部分标签库版本在写入时会 panic
        let original = flac_bytes(false);
        let (data, warning) = embedder()
            .embed_in_memory(original.clone(), AudioFormat::Flac, &track())
            .await;

        assert!(!data.is_empty());
        if let Some(warning) = warning {
            assert_eq!(warning.stage, TagStage::BaseTags);
            assert_eq!(data, original);
        }
    }

    #[tokio::test]
    async fn test_blocking_panic_is_reported_for_its_stage() {
        let result: Result<(), _> = run_blocking(TagStage::Cover, || panic!("boom")).await;
        let warning = result.unwrap_err();
        assert_eq!(warning.stage, TagStage::Cover);
        assert!(warning.to_string().starts_with("封面写入失败"));
    }

    #[tokio::test]
    async fn test_blocking_job_leaves_runtime_free() {
        let slow = run_blocking(TagStage::BaseTags, || {
            std::thread::sleep(Duration::from_millis(300))
        });
        let tick = async {
            let start = std::time::Instant::now();
            tokio::time::sleep(Duration::from_millis(10)).await;
            start.elapsed()
        };
        let (slow, elapsed) = tokio::join!(slow, tick);
        assert!(slow.is_ok());
        assert!(elapsed < Duration::from_millis(200), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_file_tagging_survives_unreadable_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.part");
        std::fs::write(&path, b"garbage").unwrap();

        let warning = embedder()
            .embed_file(&path, AudioFormat::Mp3, &track())
            .await
            .expect("warning expected");
        assert_eq!(warning.stage, TagStage::BaseTags);
        assert_eq!(std::fs::read(&path).unwrap(), b"garbage");
    }
}
