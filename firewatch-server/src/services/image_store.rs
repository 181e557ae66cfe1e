use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::macros::format_description;
use tokio::fs;

use crate::configs::Images;
use crate::errors::ImageError;

#[derive(Clone, Debug)]
pub struct StoredImage {
    pub file_path: PathBuf,
    pub file_name: String,
    pub size: usize,
    pub width: u16,
    pub height: u16,
}

/// Writes captures under the image directory and keeps a copy of the latest one.
#[derive(Clone, Debug)]
pub struct ImageStore {
    directory: PathBuf,
    latest_path: PathBuf,
}

impl ImageStore {
    pub fn new(images: &Images) -> Self {
        Self {
            directory: PathBuf::from(&images.directory),
            latest_path: PathBuf::from(&images.latest_path),
        }
    }

    pub fn latest_path(&self) -> &Path {
        &self.latest_path
    }

    pub async fn ensure_directories(&self) -> Result<(), ImageError> {
        fs::create_dir_all(&self.directory).await?;
        if let Some(parent) = self.latest_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        Ok(())
    }

    /// Validates `data` as a JPEG before anything touches the disk.
    pub async fn save(
        &self,
        data: &[u8],
        captured_at: OffsetDateTime,
    ) -> Result<StoredImage, ImageError> {
        let (width, height) = jpeg_dimensions(data)?;

        let file_name = capture_file_name(captured_at);
        let file_path = self.directory.join(&file_name);
        fs::write(&file_path, data).await?;
        fs::copy(&file_path, &self.latest_path).await?;

        Ok(StoredImage {
            file_path,
            file_name,
            size: data.len(),
            width,
            height,
        })
    }
}

pub fn capture_file_name(captured_at: OffsetDateTime) -> String {
    let stamp = captured_at
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]_[subsecond digits:3]"
        ))
        .unwrap_or_else(|_| captured_at.unix_timestamp().to_string());

    format!("fire_capture_{stamp}.jpg")
}

/// Reads width and height from the first SOFn frame header of a JPEG stream.
pub fn jpeg_dimensions(data: &[u8]) -> Result<(u16, u16), ImageError> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return Err(ImageError::Malformed("missing start of image marker"));
    }

    let mut offset = 2;
    loop {
        if data.get(offset) != Some(&0xFF) {
            return Err(ImageError::Malformed("expected segment marker"));
        }
        while data.get(offset) == Some(&0xFF) {
            offset += 1;
        }

        let marker = *data
            .get(offset)
            .ok_or(ImageError::Malformed("truncated segment marker"))?;
        offset += 1;

        match marker {
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return Err(ImageError::Malformed("no frame header before scan data")),
            _ => {}
        }

        let length = read_u16(data, offset)? as usize;
        if length < 2 {
            return Err(ImageError::Malformed("invalid segment length"));
        }

        if is_frame_header(marker) {
            let height = read_u16(data, offset + 3)?;
            let width = read_u16(data, offset + 5)?;
            if width == 0 || height == 0 {
                return Err(ImageError::Malformed("zero image dimension"));
            }
            return Ok((width, height));
        }

        offset += length;
    }
}

fn is_frame_header(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, ImageError> {
    match data.get(offset..offset + 2) {
        Some(&[high, low]) => Ok(u16::from_be_bytes([high, low])),
        _ => Err(ImageError::Malformed("truncated segment")),
    }
}
