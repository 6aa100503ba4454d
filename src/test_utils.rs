/**
 * Test helpers: fixed datetimes, pinned modification times, captured
 * console output and synthetic media files
 */

use chrono::NaiveDateTime;
use filetime::FileTime;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use crate::video::QUICKTIME_EPOCH_OFFSET;

pub fn datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Pins the modification time, reading `s` as UTC wall time.
pub fn set_mtime(path: &Path, s: &str) {
    let seconds = datetime(s).and_utc().timestamp();
    filetime::set_file_mtime(path, FileTime::from_unix_time(seconds, 0)).unwrap();
}

#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const TAG_EXIF_IFD_POINTER: u16 = 0x8769;

/// Minimal JPEG whose APP1 segment carries a DateTimeOriginal tag.
pub fn jpeg_with_datetime_original(value: &str) -> Vec<u8> {
    jpeg_with_exif_fields(&[(0x9003, value)])
}

/// Minimal JPEG with ASCII EXIF fields. Tags below 0x8000 go to IFD0,
/// the rest to the Exif sub-IFD.
pub fn jpeg_with_exif_fields(fields: &[(u16, &str)]) -> Vec<u8> {
    let tiff = tiff_with_fields(fields);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    let segment_len = (2 + 6 + tiff.len()) as u16;
    jpeg.extend_from_slice(&segment_len.to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

fn tiff_with_fields(fields: &[(u16, &str)]) -> Vec<u8> {
    let mut primary: Vec<(u16, &str)> = fields.iter().copied().filter(|(t, _)| *t < 0x8000).collect();
    let mut exif: Vec<(u16, &str)> = fields.iter().copied().filter(|(t, _)| *t >= 0x8000).collect();
    primary.sort_by_key(|(tag, _)| *tag);
    exif.sort_by_key(|(tag, _)| *tag);

    let ifd_size = |entries: usize| 2 + 12 * entries + 4;
    let primary_offset = 8;
    let exif_offset = primary_offset + ifd_size(primary.len() + 1);
    let mut data_offset = exif_offset + ifd_size(exif.len());

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&(primary_offset as u32).to_le_bytes());

    let mut data = Vec::new();
    let mut write_ascii_entry = |tiff: &mut Vec<u8>, tag: u16, value: &str| {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        tiff.extend_from_slice(&tag.to_le_bytes());
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        if bytes.len() <= 4 {
            bytes.resize(4, 0);
            tiff.extend_from_slice(&bytes);
        } else {
            tiff.extend_from_slice(&(data_offset as u32).to_le_bytes());
            data_offset += bytes.len();
            data.extend_from_slice(&bytes);
        }
    };

    // IFD0: ASCII fields plus the pointer to the Exif IFD, in tag order.
    tiff.extend_from_slice(&((primary.len() + 1) as u16).to_le_bytes());
    for (tag, value) in &primary {
        write_ascii_entry(&mut tiff, *tag, value);
    }
    tiff.extend_from_slice(&TAG_EXIF_IFD_POINTER.to_le_bytes());
    tiff.extend_from_slice(&4u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&(exif_offset as u32).to_le_bytes());
    tiff.extend_from_slice(&0u32.to_le_bytes());

    tiff.extend_from_slice(&(exif.len() as u16).to_le_bytes());
    for (tag, value) in &exif {
        write_ascii_entry(&mut tiff, *tag, value);
    }
    tiff.extend_from_slice(&0u32.to_le_bytes());

    tiff.extend_from_slice(&data);
    tiff
}

/// Minimal `ftyp` + `moov/mvhd` file with the creation time given as UTC
/// wall time; `None` writes a zero creation time.
pub fn mp4_with_creation_time(created: Option<&str>, version: u8) -> Vec<u8> {
    let seconds = created
        .map(|s| (datetime(s).and_utc().timestamp() + QUICKTIME_EPOCH_OFFSET) as u64)
        .unwrap_or(0);

    let mut mvhd_body = vec![version, 0, 0, 0];
    if version == 1 {
        mvhd_body.extend_from_slice(&seconds.to_be_bytes());
        mvhd_body.extend_from_slice(&seconds.to_be_bytes());
        mvhd_body.extend_from_slice(&1000u32.to_be_bytes());
        mvhd_body.extend_from_slice(&0u64.to_be_bytes());
    } else {
        mvhd_body.extend_from_slice(&(seconds as u32).to_be_bytes());
        mvhd_body.extend_from_slice(&(seconds as u32).to_be_bytes());
        mvhd_body.extend_from_slice(&1000u32.to_be_bytes());
        mvhd_body.extend_from_slice(&0u32.to_be_bytes());
    }
    mvhd_body.resize(mvhd_body.len() + 80, 0);

    let mut file = atom(b"ftyp", b"isom\0\0\0\0isommp42");
    file.extend(atom(b"free", &[0; 8]));
    file.extend(atom(b"moov", &atom(b"mvhd", &mvhd_body)));
    file
}

fn atom(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}
