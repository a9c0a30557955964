// src/downloader/sink.rs

use crate::{constants, error::*};
use log::debug;
use std::{
    fs,
    io::{BufWriter, Cursor, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// 下载字节流的去向。每个 sink 只属于创建它的那一次下载。
pub(crate) trait ChunkSink {
    fn write_chunk(&mut self, chunk: &[u8]) -> AppResult<()>;
    fn written(&self) -> u64;
}

/// 写入目标目录下的临时文件，标签写完后再原子地改名为最终路径。
/// 中途失败时临时文件随 drop 删除，目标路径上不会留下残缺文件。
pub(crate) struct FileSink {
    writer: BufWriter<NamedTempFile>,
    target: PathBuf,
    written: u64,
}

impl FileSink {
    pub(crate) fn create(target: &Path) -> AppResult<Self> {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let temp = tempfile::Builder::new()
            .prefix(".ncm-dl-")
            .suffix(".part")
            .tempfile_in(dir)?;
        debug!("创建临时文件 {:?} -> {:?}", temp.path(), target);
        Ok(Self {
            writer: BufWriter::with_capacity(constants::CHUNK_SIZE, temp),
            target: target.to_path_buf(),
            written: 0,
        })
    }

    /// 刷新缓冲并交出临时文件，此时内容已完整但尚未出现在目标路径上。
    pub(crate) fn finish(self) -> AppResult<PendingFile> {
        let temp = self.writer.into_inner().map_err(|e| e.into_error())?;
        Ok(PendingFile {
            temp,
            target: self.target,
        })
    }
}

impl ChunkSink for FileSink {
    fn write_chunk(&mut self, chunk: &[u8]) -> AppResult<()> {
        self.writer.write_all(chunk)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }
}

pub(crate) struct PendingFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl PendingFile {
    pub(crate) fn path(&self) -> &Path {
        self.temp.path()
    }

    /// 改名到目标路径并返回最终大小。已存在的同名文件会被覆盖。
    pub(crate) fn persist(self) -> AppResult<u64> {
        let file = self.temp.persist(&self.target)?;
        let size = file.metadata()?.len();
        Ok(size)
    }
}

/// 内存中的可增长缓冲区
pub(crate) struct MemorySink {
    cursor: Cursor<Vec<u8>>,
}

impl MemorySink {
    pub(crate) fn with_capacity(hint: u64) -> Self {
        // 声明的大小只作参考，避免被异常值撑爆
        let capacity = usize::try_from(hint).unwrap_or(0).min(64 * 1024 * 1024);
        Self {
            cursor: Cursor::new(Vec::with_capacity(capacity)),
        }
    }

    /// 游标归零后交出缓冲区
    pub(crate) fn finish(mut self) -> Vec<u8> {
        self.cursor.set_position(0);
        self.cursor.into_inner()
    }
}

impl ChunkSink for MemorySink {
    fn write_chunk(&mut self, chunk: &[u8]) -> AppResult<()> {
        self.cursor.write_all(chunk)?;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_sink_only_appears_after_persist() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("A - T.mp3");

        let mut sink = FileSink::create(&target).unwrap();
        sink.write_chunk(b"hello ").unwrap();
        sink.write_chunk(b"world").unwrap();
        assert_eq!(sink.written(), 11);

        let pending = sink.finish().unwrap();
        assert!(!target.exists());
        assert_eq!(fs::read(pending.path()).unwrap(), b"hello world");

        assert_eq!(pending.persist().unwrap(), 11);
        assert_eq!(fs::read(&target).unwrap(), b"hello world");
    }

    #[test]
    fn test_dropped_file_sink_leaves_nothing() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("sub").join("x.flac");
        {
            let mut sink = FileSink::create(&target).unwrap();
            sink.write_chunk(&[0u8; 100]).unwrap();
            let _pending = sink.finish().unwrap();
        }
        assert!(!target.exists());
        assert_eq!(fs::read_dir(target.parent().unwrap()).unwrap().count(), 0);
    }

    #[test]
    fn test_memory_sink_collects_chunks() {
        let mut sink = MemorySink::with_capacity(4);
        sink.write_chunk(b"ab").unwrap();
        sink.write_chunk(b"cd").unwrap();
        assert_eq!(sink.written(), 4);
        assert_eq!(sink.finish(), b"abcd");
    }
}
