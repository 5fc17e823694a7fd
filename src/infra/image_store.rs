use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::ImageFormat;
use tracing::debug;

use crate::app::ports::ImageStorePort;
use crate::common::error::{PrepError, Result};
use crate::domain::ImagePayload;

fn encoded<'p>(id: &str, payload: &'p ImagePayload) -> Result<&'p [u8]> {
    match payload {
        ImagePayload::Encoded(bytes) if !bytes.is_empty() => Ok(bytes.as_slice()),
        _ => Err(PrepError::DataIntegrity(format!("Invalid image object for ID {}", id))),
    }
}

/// Writes images to the local filesystem as JPEG, re-encoding whatever the
/// dataset stored.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageStore;

impl ImageStorePort for FsImageStore {
    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        Ok(())
    }

    fn check(&self, id: &str, payload: &ImagePayload) -> Result<()> {
        image::guess_format(encoded(id, payload)?)?;
        Ok(())
    }

    fn write_image(&self, id: &str, payload: &ImagePayload, path: &Path) -> Result<()> {
        let decoded = image::load_from_memory(encoded(id, payload)?)?;
        // JPEG has no alpha channel
        decoded.to_rgb8().save_with_format(path, ImageFormat::Jpeg)?;
        debug!(id = %id, path = %path.display(), "image written");
        Ok(())
    }
}

/// Keeps written payloads in memory; used for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    dirs: Mutex<Vec<PathBuf>>,
    images: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.images
            .lock()
            .map(|images| images.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().map(|dirs| dirs.clone()).unwrap_or_default()
    }
}

impl ImageStorePort for InMemoryImageStore {
    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        let mut dirs = self
            .dirs
            .lock()
            .map_err(|_| PrepError::Config("image store lock poisoned".to_string()))?;
        if !dirs.iter().any(|d| d == dir) {
            dirs.push(dir.to_path_buf());
        }
        Ok(())
    }

    fn check(&self, id: &str, payload: &ImagePayload) -> Result<()> {
        encoded(id, payload).map(|_| ())
    }

    fn write_image(&self, id: &str, payload: &ImagePayload, path: &Path) -> Result<()> {
        let bytes = encoded(id, payload)?.to_vec();
        self.images
            .lock()
            .map_err(|_| PrepError::Config("image store lock poisoned".to_string()))?
            .insert(path.to_path_buf(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes() -> Vec<u8> {
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 3, Rgba([10, 200, 30, 128]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn fs_store_reencodes_as_jpeg() {
        let dir = tempdir().unwrap();
        let store = FsImageStore;
        let out_dir = dir.path().join("images");
        store.ensure_dir(&out_dir).unwrap();
        store.ensure_dir(&out_dir).unwrap();

        let path = out_dir.join("a.jpg");
        store
            .write_image("a", &ImagePayload::Encoded(png_bytes()), &path)
            .unwrap();

        let written = fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn fs_store_rejects_garbage_and_missing_payloads() {
        let dir = tempdir().unwrap();
        let store = FsImageStore;
        let path = dir.path().join("bad.jpg");

        let garbage = ImagePayload::Encoded(b"definitely not an image".to_vec());
        assert!(store.check("bad", &garbage).is_err());
        assert!(store.write_image("bad", &garbage, &path).is_err());
        assert!(store.check("none", &ImagePayload::Missing).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn fs_store_check_accepts_real_image() {
        assert!(FsImageStore
            .check("ok", &ImagePayload::Encoded(png_bytes()))
            .is_ok());
    }

    #[test]
    fn in_memory_store_records_writes() {
        let store = InMemoryImageStore::new();
        store.ensure_dir(Path::new("out")).unwrap();
        store.ensure_dir(Path::new("out")).unwrap();
        store
            .write_image("x", &ImagePayload::Encoded(vec![1, 2]), Path::new("out/x.jpg"))
            .unwrap();
        assert!(store
            .write_image("y", &ImagePayload::Missing, Path::new("out/y.jpg"))
            .is_err());

        assert_eq!(store.created_dirs(), vec![PathBuf::from("out")]);
        assert_eq!(store.written_paths(), vec![PathBuf::from("out/x.jpg")]);
    }
}
