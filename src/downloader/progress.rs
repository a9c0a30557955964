// src/downloader/progress.rs

use crate::{error::*, models::*, utils};
use log::debug;
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// 歌曲在下载目录中的最终路径，扩展名只取自下载链接。
pub(crate) fn target_path(download_dir: &Path, track: &TrackDescriptor) -> PathBuf {
    let ext = utils::determine_extension(&track.download_url, "");
    download_dir.join(format!("{}{}", utils::track_file_stem(track), ext))
}

/// 对比磁盘上的文件大小与声明的大小，得到某一时刻的完成度。
pub(crate) fn inspect(download_dir: &Path, track: &TrackDescriptor) -> AppResult<ProgressReport> {
    let path = target_path(download_dir, track);
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let current_size = match fs::metadata(&path) {
        Ok(meta) => Some(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    debug!("进度查询 {:?}: 当前 {:?} / 声明 {}", path, current_size, track.file_size);

    Ok(build_report(track, filename, current_size))
}

fn build_report(track: &TrackDescriptor, filename: String, current_size: Option<u64>) -> ProgressReport {
    let total_size = track.file_size;
    let (current, percent, completed) = match current_size {
        Some(current) => {
            let percent = if total_size > 0 {
                (current as f64 / total_size as f64 * 100.0).min(100.0)
            } else {
                0.0
            };
            (current, percent, current >= total_size)
        }
        None => (0, 0.0, false),
    };

    ProgressReport {
        track_id: track.id,
        filename,
        total_size,
        current_size: current,
        percent,
        completed,
    }
}
