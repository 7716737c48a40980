//! Naming and classification of uploaded files.
//!
//! The original filename is untrusted. It only feeds the extension, the
//! display name and the category; disk objects are always addressed by a
//! generated stored name.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::{LanshareError, Result};

/// Name used when sanitizing leaves nothing.
pub const FALLBACK_NAME: &str = "file";

const IMAGE_EXT: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp"];
const VIDEO_EXT: &[&str] = &[".mp4", ".mov", ".mkv", ".avi", ".webm", ".m4v"];
const ARCHIVE_EXT: &[&str] = &[".zip", ".rar", ".7z", ".tar", ".gz"];
const DOC_EXT: &[&str] = &[
    ".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx", ".pdf", ".txt", ".md", ".rtf",
];

/// File category, derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Image,
    Video,
    Archive,
    Doc,
    Other,
}

impl Category {
    /// All categories.
    pub const ALL: [Category; 5] = [
        Category::Image,
        Category::Video,
        Category::Archive,
        Category::Doc,
        Category::Other,
    ];

    /// Name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Video => "video",
            Category::Archive => "archive",
            Category::Doc => "doc",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = LanshareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Category::Image),
            "video" => Ok(Category::Video),
            "archive" => Ok(Category::Archive),
            "doc" => Ok(Category::Doc),
            "other" => Ok(Category::Other),
            _ => Err(LanshareError::Validation(format!("unknown category: {s}"))),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = LanshareError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Last path component, for either separator style.
fn base_name(name: &str) -> &str {
    name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or("")
}

/// Split a base name into stem and extension (without the dot).
///
/// Leading dots do not start an extension, so `.bashrc` has none.
fn split_extension(base: &str) -> (&str, &str) {
    let leading = base.len() - base.trim_start_matches('.').len();
    match base[leading..].rfind('.') {
        Some(idx) => {
            let idx = leading + idx;
            (&base[..idx], &base[idx + 1..])
        }
        None => (base, ""),
    }
}

/// Lowercase extension including the leading dot, or empty.
pub fn extension_of(name: &str) -> String {
    let (_, ext) = split_extension(base_name(name));
    if ext.is_empty() {
        String::new()
    } else {
        format!(".{}", ext.to_lowercase())
    }
}

fn is_safe_extension(ext: &str) -> bool {
    ext.len() > 1
        && ext.starts_with('.')
        && ext[1..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Generate a fresh stored name: 32 random hex characters plus the extension.
///
/// Extensions with characters outside `[A-Za-z0-9_-]` are left off so the
/// stored name is always a plain filename.
pub fn generate_stored_name(orig_name: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let ext = extension_of(orig_name);
    if is_safe_extension(&ext) {
        format!("{token}{ext}")
    } else {
        token
    }
}

fn clean_component(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                Some(c)
            } else {
                None
            }
        })
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Make a filename safe for display and filesystem-facing use.
///
/// Drops directories, replaces whitespace with `_`, removes everything outside
/// ASCII alphanumerics and `._-`. The extension is cleaned separately so it
/// survives an unprintable stem (`日本語.pdf` becomes `file.pdf`).
pub fn sanitize(name: &str) -> String {
    let (stem, ext) = split_extension(base_name(name));
    let stem = clean_component(stem);
    let ext = clean_component(ext);

    let stem = if stem.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        stem
    };

    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

/// Classify an extension. Case-insensitive; unknown extensions are `Other`.
pub fn classify(ext: &str) -> Category {
    let ext = ext.to_lowercase();
    let ext = ext.as_str();
    if IMAGE_EXT.contains(&ext) {
        Category::Image
    } else if VIDEO_EXT.contains(&ext) {
        Category::Video
    } else if ARCHIVE_EXT.contains(&ext) {
        Category::Archive
    } else if DOC_EXT.contains(&ext) {
        Category::Doc
    } else {
        Category::Other
    }
}

/// Best-effort content type for a (sanitized) filename.
pub fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}
