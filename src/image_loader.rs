use crate::error::LayerError;
use crate::render::Bitmap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Outcome of asking for an image layer's picture.
#[derive(Debug)]
pub enum ImageRequest {
    Ready(Bitmap),
    /// Still loading; ask again later
    Pending,
    Failed(LayerError),
}

/// Supplies the pictures used by image and parallax layers.
pub trait ImageLoader {
    fn load_parallax_image(&mut self, path: &str, frame: u32) -> ImageRequest;
}

/// Reads images from disk, resolving layer image paths by file name
/// under one directory.
pub struct DirectoryImageLoader {
    root: PathBuf,
}

impl DirectoryImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let name = Path::new(path)
            .file_name()
            .map(Path::new)
            .unwrap_or_else(|| Path::new(path));
        self.root.join(name)
    }
}

impl ImageLoader for DirectoryImageLoader {
    fn load_parallax_image(&mut self, path: &str, _frame: u32) -> ImageRequest {
        let full = self.resolve(path);
        tracing::debug!(path, resolved = %full.display(), "loading layer image");
        let bytes = match std::fs::read(&full) {
            Ok(bytes) => bytes,
            Err(e) => {
                return ImageRequest::Failed(LayerError::ImageLoad {
                    path: path.to_owned(),
                    reason: e.to_string(),
                })
            }
        };
        match Bitmap::decode(&bytes) {
            Ok(bitmap) => ImageRequest::Ready(bitmap),
            Err(reason) => ImageRequest::Failed(LayerError::ImageLoad {
                path: path.to_owned(),
                reason,
            }),
        }
    }
}

/// Images handed over by the host, e.g. after an async load finished.
/// Paths not yet known are reported as pending.
#[derive(Debug, Default)]
pub struct PreloadedImages {
    images: HashMap<String, Result<Bitmap, String>>,
}

impl PreloadedImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bitmap: Bitmap) {
        self.images.insert(path.into(), Ok(bitmap));
    }

    pub fn insert_failure(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.images.insert(path.into(), Err(reason.into()));
    }
}

impl ImageLoader for PreloadedImages {
    fn load_parallax_image(&mut self, path: &str, _frame: u32) -> ImageRequest {
        match self.images.get(path) {
            Some(Ok(bitmap)) => ImageRequest::Ready(bitmap.clone()),
            Some(Err(reason)) => ImageRequest::Failed(LayerError::ImageLoad {
                path: path.to_owned(),
                reason: reason.clone(),
            }),
            None => ImageRequest::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_loader_resolves_by_file_name() {
        let loader = DirectoryImageLoader::new("/assets/parallaxes");
        assert_eq!(
            loader.resolve("../img/parallaxes/Sea.png"),
            PathBuf::from("/assets/parallaxes/Sea.png")
        );
    }

    #[test]
    fn missing_file_is_a_failed_request() {
        let mut loader = DirectoryImageLoader::new(std::env::temp_dir());
        match loader.load_parallax_image("definitely_not_here_0f3a.png", 0) {
            ImageRequest::Failed(LayerError::ImageLoad { path, .. }) => {
                assert_eq!(path, "definitely_not_here_0f3a.png")
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn preloaded_images_report_pending_until_inserted() {
        let mut images = PreloadedImages::new();
        assert!(matches!(
            images.load_parallax_image("sky.png", 0),
            ImageRequest::Pending
        ));
        images.insert("sky.png", Bitmap::new(4, 4).unwrap());
        assert!(matches!(
            images.load_parallax_image("sky.png", 0),
            ImageRequest::Ready(_)
        ));
    }
}
