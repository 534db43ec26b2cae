use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::segment::Window;

/// The media being transcribed. Opaque to the assembly pipeline.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub source: Option<PathBuf>,
    pub duration: f64,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no fragment for window {index} at {}", .path.display())]
    Missing { index: usize, path: PathBuf },
    #[error("failed reading fragment {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can turn one media window into raw fragment text.
pub trait TranscriptionClient {
    fn transcribe(&mut self, window: &Window, media: &MediaPayload) -> Result<String, ClientError>;
}

/// Serves previously captured fragment responses from `window-NNN.txt`
/// files, one per zero-based window index.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    dir: PathBuf,
}

impl DirectoryClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn fragment_path(&self, index: usize) -> PathBuf {
        fragment_path(&self.dir, index)
    }
}

pub fn fragment_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("window-{index:03}.txt"))
}

impl TranscriptionClient for DirectoryClient {
    fn transcribe(&mut self, window: &Window, _media: &MediaPayload) -> Result<String, ClientError> {
        let path = self.fragment_path(window.index);
        if !path.exists() {
            return Err(ClientError::Missing {
                index: window.index,
                path,
            });
        }
        fs::read_to_string(&path).map_err(|source| ClientError::Io { path, source })
    }
}
