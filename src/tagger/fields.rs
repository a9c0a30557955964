// src/tagger/fields.rs

use crate::{
    constants::tags,
    models::{AudioFormat, TrackDescriptor},
};
use lofty::{
    TextEncoding,
    file::FileType,
    id3::v2::{Frame, Id3v2Tag, UnsynchronizedTextFrame},
    tag::{Accessor, ItemKey, ItemValue, Tag, TagItem, TagType},
};
use log::debug;

pub(super) fn tag_type_for(format: AudioFormat) -> TagType {
    match format {
        AudioFormat::Mp3 => TagType::Id3v2,
        AudioFormat::Flac => TagType::VorbisComments,
        AudioFormat::M4a => TagType::Mp4Ilst,
    }
}

pub(super) fn format_for(file_type: FileType) -> Option<AudioFormat> {
    match file_type {
        FileType::Mpeg => Some(AudioFormat::Mp3),
        FileType::Flac => Some(AudioFormat::Flac),
        FileType::Mp4 => Some(AudioFormat::M4a),
        _ => None,
    }
}

/// 目标格式无法表示的字段。只记录，不会让整次写入失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct RejectedField(pub &'static str);

/// 一条 USLT 歌词帧。通用 `Tag` 转成 ID3v2 时会丢掉描述，
/// 两条歌词会互相覆盖，所以单独保存，落盘前再插入。
#[derive(Debug, Clone)]
struct LyricFrame {
    description: &'static str,
    text: String,
}

/// 待写入的标签：通用字段加上 ID3v2 专有的歌词帧
#[derive(Clone)]
pub(super) struct TagDraft {
    pub(super) tag: Tag,
    lyrics: Vec<LyricFrame>,
}

impl TagDraft {
    pub(super) fn new(tag: Tag) -> Self {
        Self {
            tag,
            lyrics: Vec::new(),
        }
    }

    /// 转为 ID3v2 标签，两条歌词以不同描述各占一帧。
    pub(super) fn to_id3v2(&self) -> Id3v2Tag {
        let mut id3 = Id3v2Tag::from(self.tag.clone());
        for lyric in &self.lyrics {
            id3.insert(Frame::UnsynchronizedText(UnsynchronizedTextFrame::new(
                TextEncoding::UTF8,
                tags::LYRICS_LANG,
                lyric.description.to_string(),
                lyric.text.clone(),
            )));
        }
        id3
    }
}

fn put_text(
    tag: &mut Tag,
    key: ItemKey,
    field: &'static str,
    value: &str,
) -> Result<(), RejectedField> {
    if tag.insert_text(key, value.to_string()) {
        Ok(())
    } else {
        Err(RejectedField(field))
    }
}

/// 直接以格式原生的键名写入（TYER / YEAR / TRANSLATEDLYRICS 等通用键表里没有的字段）。
fn put_native(tag: &mut Tag, native_key: &str, value: &str) {
    tag.insert_unchecked(TagItem::new(
        ItemKey::Unknown(native_key.to_string()),
        ItemValue::Text(value.to_string()),
    ));
}

/// 写入除封面以外的全部字段，返回目标格式拒收的字段。
pub(super) fn apply_base_fields(
    draft: &mut TagDraft,
    format: AudioFormat,
    track: &TrackDescriptor,
) -> Vec<RejectedField> {
    let tag = &mut draft.tag;
    let mut results = vec![
        put_text(tag, ItemKey::TrackTitle, "title", &track.name),
        put_text(tag, ItemKey::TrackArtist, "artist", &track.artists),
        put_text(tag, ItemKey::AlbumTitle, "album", &track.album),
    ];

    if track.track_number > 0 {
        tag.set_track(track.track_number);
    }

    // 日期为空时整组跳过，不写任何占位值
    match (track.release_date(), track.release_year()) {
        (Some(date), Some(year)) => {
            match format {
                AudioFormat::Mp3 => put_native(tag, tags::ID3_YEAR, year),
                AudioFormat::Flac => put_native(tag, tags::VORBIS_YEAR, year),
                AudioFormat::M4a => {}
            }
            results.push(put_text(tag, ItemKey::RecordingDate, "date", date));
        }
        _ => debug!("发行时间为空，跳过日期标签: {}", track.display_name()),
    }

    let lyric = track.lyric.trim();
    let translated = track.translated_lyric.trim();
    match format {
        AudioFormat::Mp3 => {
            if !lyric.is_empty() || !translated.is_empty() {
                tag.remove_key(&ItemKey::Lyrics);
            }
            for (description, text) in [
                (tags::LYRICS_DESC, lyric),
                (tags::TRANSLATED_LYRICS_DESC, translated),
            ] {
                if !text.is_empty() {
                    draft.lyrics.push(LyricFrame {
                        description,
                        text: text.to_string(),
                    });
                }
            }
        }
        AudioFormat::Flac => {
            if !lyric.is_empty() {
                results.push(put_text(tag, ItemKey::Lyrics, "lyrics", lyric));
            }
            if !translated.is_empty() {
                put_native(tag, tags::VORBIS_TRANSLATED_LYRICS, translated);
            }
        }
        // M4A 不写歌词
        AudioFormat::M4a => {}
    }

    results.into_iter().filter_map(Result::err).collect()
}
