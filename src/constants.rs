// src/constants.rs

use std::time::Duration;

pub const UI_WIDTH: usize = 88;
pub const MAX_FILENAME_CHARS: usize = 200;
pub const FILENAME_PLACEHOLDER: &str = " & ";
pub const FALLBACK_FILENAME: &str = "unknown";
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const DEFAULT_SAVE_DIR: &str = "downloads";
pub const DOWNLOAD_PATH_ENV: &str = "DOWNLOAD_PATH";
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub const DEFAULT_MAX_CONCURRENT: usize = 3;
pub const MAX_BATCH_SIZE: usize = 10;
pub const CHUNK_SIZE: usize = 8 * 1024;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const COVER_TIMEOUT: Duration = Duration::from_secs(10);
pub const TASK_TIMEOUT: Duration = Duration::from_secs(60);
pub const COVER_MAX_BYTES: usize = 5 * 1024 * 1024;

pub mod tags {
    pub const LYRICS_LANG: [u8; 3] = *b"XXX";
    pub const LYRICS_DESC: &str = "Lyrics";
    pub const TRANSLATED_LYRICS_DESC: &str = "Translated Lyrics";
    pub const VORBIS_TRANSLATED_LYRICS: &str = "TRANSLATEDLYRICS";
    pub const VORBIS_YEAR: &str = "YEAR";
    pub const ID3_YEAR: &str = "TYER";
    pub const COVER_DESC: &str = "Cover";
}

pub mod defaults {
    pub const TRACK_NAME: &str = "未知歌曲";
    pub const ARTIST: &str = "未知艺术家";
    pub const ALBUM: &str = "未知专辑";
    pub const FILE_TYPE: &str = "mp3";
}
