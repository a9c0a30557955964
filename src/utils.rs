// src/utils.rs

use crate::{constants, models::TrackDescriptor};
use indicatif::HumanBytes;
use regex::Regex;
use std::sync::LazyLock;

static ILLEGAL_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// 生成可安全落盘的文件名。同样的输入永远得到同样的输出，不做冲突处理。
pub fn sanitize(name: &str) -> String {
    let replaced = ILLEGAL_CHARS_RE.replace_all(name, constants::FILENAME_PLACEHOLDER);
    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '.');
    let truncated: String = trimmed.chars().take(constants::MAX_FILENAME_CHARS).collect();
    if truncated.is_empty() {
        constants::FALLBACK_FILENAME.to_string()
    } else {
        truncated
    }
}

/// "歌手 - 歌名" 形式的文件名主干（不含扩展名）
pub fn track_file_stem(track: &TrackDescriptor) -> String {
    sanitize(&track.display_name())
}

/// 先看 URL，再看 Content-Type，都没有线索时默认 `.mp3`。
pub fn determine_extension(url: &str, content_type: &str) -> &'static str {
    let url = url.to_lowercase();
    for ext in [".flac", ".mp3", ".m4a"] {
        if url.contains(ext) {
            return ext;
        }
    }

    let content_type = content_type.to_lowercase();
    if content_type.contains("flac") {
        ".flac"
    } else if content_type.contains("mpeg") || content_type.contains("mp3") {
        ".mp3"
    } else if content_type.contains("mp4") || content_type.contains("m4a") {
        ".m4a"
    } else {
        ".mp3"
    }
}

pub fn format_file_size(bytes: u64) -> String {
    HumanBytes(bytes).to_string()
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 { text.to_string() } else { format!("{}...", &text[..end_pos]) }
}
