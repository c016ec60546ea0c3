use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Coarse classification derived from the file extension (or folder-ness).
/// Extension tables follow <https://github.com/dyne/file-extension-list>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Folder,
    Archive,
    Other,
}

impl FileCategory {
    /// Classify a lower-cased extension. Unknown extensions map to `Other`.
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "bmp" | "dib" | "jpeg" | "jpg" | "jpe" | "jp2" | "png" | "webp" | "avif" | "pbm"
            | "pgm" | "ppm" | "pxm" | "pnm" | "pfm" | "sr" | "ras" | "tiff" | "tif" | "exr"
            | "hdr" | "pic" | "3dm" | "3ds" | "max" | "dds" | "gif" | "psd" | "xcf" | "tga"
            | "thm" | "ai" | "eps" | "ps" | "svg" | "dwg" | "dxf" | "gpx" | "kml" | "kmz" => {
                FileCategory::Image
            }
            "3g2" | "3gp" | "aaf" | "asf" | "avchd" | "avi" | "drc" | "flv" | "m2v" | "m4p"
            | "m4v" | "mkv" | "mng" | "mov" | "mp2" | "mp4" | "mpe" | "mpeg" | "mpg" | "mpv"
            | "mxf" | "nsv" | "ogg" | "ogv" | "ogm" | "qt" | "rm" | "rmvb" | "roq" | "srt"
            | "svi" | "vob" | "webm" | "wmv" | "yuv" => FileCategory::Video,
            "aac" | "aiff" | "ape" | "au" | "flac" | "gsm" | "it" | "m3u" | "m4a" | "mid"
            | "mod" | "mp3" | "mpa" | "pls" | "ra" | "s3m" | "sid" | "wav" | "wma" | "xm" => {
                FileCategory::Audio
            }
            "doc" | "docx" | "ebook" | "log" | "md" | "msg" | "odt" | "org" | "pages" | "pdf"
            | "rtf" | "rst" | "tex" | "txt" | "wpd" | "wps" => FileCategory::Document,
            "7z" | "a" | "apk" | "ar" | "bz2" | "cab" | "cpio" | "deb" | "dmg" | "egg" | "gz"
            | "iso" | "jar" | "lha" | "mar" | "pea" | "rar" | "rpm" | "s7z" | "shar" | "tar"
            | "tbz2" | "tgz" | "tlz" | "war" | "whl" | "xpi" | "zip" | "zipx" | "xz" | "pak" => {
                FileCategory::Archive
            }
            _ => FileCategory::Other,
        }
    }

    /// Classify a path: directories are `Folder`, everything else goes by the
    /// lower-cased extension.
    pub fn categorize(path: &Path, is_dir: bool) -> Self {
        if is_dir {
            return FileCategory::Folder;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => Self::from_extension(&ext.to_lowercase()),
            None => FileCategory::Other,
        }
    }
}

/// One indexed filesystem entry. Immutable once produced by the indexer;
/// `path` is the unique key within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexedObject {
    pub path: PathBuf,
    /// `None` when `path` is itself one of the include roots.
    pub parent_path: Option<PathBuf>,
    /// Always 0 for folders.
    pub size_bytes: u64,
    pub category: FileCategory,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl IndexedObject {
    /// Lower-cased file name, used for duplicate-name grouping.
    pub fn file_name_lowercase(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// A recoverable per-item failure. Collected across all phases of a run into
/// one flat list; never blocks whatever results were computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub path: PathBuf,
    pub message: String,
    pub detail: Option<String>,
}

impl Warning {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Capture an error with its source chain as the detail text.
    pub fn from_error(path: impl Into<PathBuf>, error: &dyn std::error::Error) -> Self {
        let mut detail = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            if !detail.is_empty() {
                detail.push_str(": ");
            }
            detail.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            path: path.into(),
            message: error.to_string(),
            detail: (!detail.is_empty()).then_some(detail),
        }
    }
}
