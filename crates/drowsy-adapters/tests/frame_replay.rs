//! Integration tests for replaying frame directories.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use drowsy_adapters::{FrameDirWriter, FsFrameSource, HeadlessDisplay};
use drowsy_core::{FrameDisplay, FrameSource};
use image::{Rgb, RgbImage};

fn write_frame(dir: &Path, name: &str, shade: u8) {
    RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
        .save(dir.join(name))
        .expect("write fixture");
}

#[test]
fn test_frames_replayed_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "frame_003.png", 30);
    write_frame(dir.path(), "frame_001.png", 10);
    write_frame(dir.path(), "frame_002.bmp", 20);
    std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

    let mut source = FsFrameSource::open(dir.path()).unwrap();
    assert_eq!(source.len_hint(), Some(3));

    let mut seen = Vec::new();
    while let Some(frame) = source.read().unwrap() {
        assert_eq!((frame.width(), frame.height()), (8, 6));
        seen.push((frame.index, frame.image.to_rgb8().get_pixel(0, 0).0[0]));
    }

    assert_eq!(seen, vec![(1, 10), (2, 20), (3, 30)]);
    // Exhausted sources keep answering end of stream.
    assert!(source.read().unwrap().is_none());
}

#[test]
fn test_jpeg_frames_load() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "a.jpg", 128);

    let mut source = FsFrameSource::open(dir.path()).unwrap();
    let frame = source.read().unwrap().expect("one frame");
    assert!(frame.source.ends_with("a.jpg"));
}

#[test]
fn test_empty_directory_is_end_of_stream() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = FsFrameSource::open(dir.path()).unwrap();
    assert_eq!(source.len_hint(), Some(0));
    assert!(source.read().unwrap().is_none());
}

#[test]
fn test_corrupt_frame_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("broken.png"), b"definitely not png").unwrap();

    let mut source = FsFrameSource::open(dir.path()).unwrap();
    let err = source.read().unwrap_err();
    assert!(format!("{err:#}").contains("broken.png"));
}

#[test]
fn test_writer_mirrors_replay() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_frame(input.path(), "1.png", 1);
    write_frame(input.path(), "2.png", 2);

    let mut source = FsFrameSource::open(input.path()).unwrap();
    let mut writer = FrameDirWriter::new(output.path(), HeadlessDisplay).unwrap();
    while let Some(frame) = source.read().unwrap() {
        writer.show(frame.index, &frame.image.to_rgb8()).unwrap();
    }

    assert_eq!(writer.written(), 2);
    assert!(output.path().join("frame_000001.png").exists());
    assert!(output.path().join("frame_000002.png").exists());
}
