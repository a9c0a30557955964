// tests/common/mod.rs

#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lofty::{
    config::ParseOptions,
    file::TaggedFileExt,
    probe::Probe,
    tag::{Tag, TagType},
};
use ncm_dl::{
    config::AppConfig,
    downloader::Downloader,
    models::{QualityLevel, TrackDescriptor},
};
use std::{io::Cursor, path::Path, time::Duration};

/// 由若干个静音 MPEG-1 Layer III 帧 (128kbps / 44.1kHz) 拼成的最小 MP3
pub fn mp3_bytes() -> Vec<u8> {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
    frame.repeat(20)
}

/// 最小 FLAC：STREAMINFO (44.1kHz / 双声道 / 16bit) 加一个 16 字节的 PADDING 块
pub fn flac_bytes() -> Vec<u8> {
    let mut data = flac_header_only();
    data[4] = 0x00;
    data.extend_from_slice(&[0x81, 0, 0, 16]);
    data.extend_from_slice(&[0u8; 16]);
    data
}

/// 只有一个 STREAMINFO 块（已标记为最后一块）的 FLAC
pub fn flac_header_only() -> Vec<u8> {
    let mut data = b"fLaC".to_vec();
    data.extend_from_slice(&[0x80, 0, 0, 34]);
    data.extend_from_slice(&[0x10, 0x00, 0x10, 0x00, 0, 0, 0, 0, 0, 0]);
    data.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0, 0, 0, 0]);
    data.extend_from_slice(&[0u8; 16]);
    data
}

fn atom(name: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(name);
    out.extend_from_slice(body);
    out
}

/// 最小 M4A：ftyp + 只含 mvhd 的 moov + 一小段 mdat
pub fn m4a_bytes() -> Vec<u8> {
    let mut ftyp = b"M4A ".to_vec();
    ftyp.extend_from_slice(&[0, 0, 0, 0]);
    ftyp.extend_from_slice(b"M4A isom");

    let mut mvhd = vec![0u8; 4]; // version + flags
    mvhd.extend_from_slice(&[0u8; 8]); // creation / modification
    mvhd.extend_from_slice(&1000u32.to_be_bytes());
    mvhd.extend_from_slice(&0u32.to_be_bytes());
    mvhd.extend_from_slice(&0x0001_0000u32.to_be_bytes());
    mvhd.extend_from_slice(&0x0100u16.to_be_bytes());
    mvhd.extend_from_slice(&[0u8; 10]);
    for value in [0x0001_0000u32, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000] {
        mvhd.extend_from_slice(&value.to_be_bytes());
    }
    mvhd.extend_from_slice(&[0u8; 24]);
    mvhd.extend_from_slice(&2u32.to_be_bytes());

    let mut data = atom(b"ftyp", &ftyp);
    data.extend(atom(b"moov", &atom(b"mvhd", &mvhd)));
    data.extend(atom(b"mdat", &[0u8; 32]));
    data
}

pub fn png_cover() -> Vec<u8> {
    let img = RgbImage::from_pixel(4, 4, Rgb([200, 30, 30]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// 噪点图几乎无法压缩，用来触发封面大小上限
pub fn noisy_png(size: u32) -> Vec<u8> {
    let mut seed: u32 = 0x2545_F491;
    let img = RgbImage::from_fn(size, size, |_, _| {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let [r, g, b, _] = seed.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn track(id: u64, download_url: &str) -> TrackDescriptor {
    TrackDescriptor {
        id,
        name: "T".into(),
        artists: "A".into(),
        album: "B".into(),
        cover_url: String::new(),
        duration_secs: 26,
        track_number: 1,
        release_date: "2011-05-15".into(),
        download_url: download_url.into(),
        file_type: "mp3".into(),
        file_size: 417 * 20,
        quality: QualityLevel::Standard,
        lyric: "[00:00.00]歌词".into(),
        translated_lyric: String::new(),
    }
}

pub fn config(dir: &Path, max_concurrent: usize) -> AppConfig {
    let mut config = AppConfig::new(dir, max_concurrent);
    config.request_timeout = Duration::from_secs(5);
    config.cover_timeout = Duration::from_secs(2);
    config.task_timeout = Duration::from_secs(10);
    config
}

pub fn downloader(dir: &Path, max_concurrent: usize) -> Downloader {
    Downloader::new(config(dir, max_concurrent)).expect("downloader should build")
}

pub fn read_id3(bytes: &[u8]) -> Tag {
    read_tag(bytes, TagType::Id3v2)
}

/// 只读标签、不解析音频属性，测试用的音频没有有效帧
pub fn read_tag(bytes: &[u8], tag_type: TagType) -> Tag {
    let tagged = Probe::new(Cursor::new(bytes))
        .options(ParseOptions::new().read_properties(false))
        .guess_file_type()
        .unwrap()
        .read()
        .unwrap();
    tagged
        .tag(tag_type)
        .cloned()
        .unwrap_or_else(|| panic!("{:?} tag should exist", tag_type))
}

/// 只接受连接、从不应答的服务端，返回其基础地址
pub async fn stalled_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}
