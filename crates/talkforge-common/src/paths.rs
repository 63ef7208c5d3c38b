//! Path utilities for detecting file types by extension.
//!
//! Used by the artifact locator to recognise rendered videos and by the
//! fetcher to keep a sensible extension on downloaded portraits.

use std::path::Path;

/// List of recognised video file extensions.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "webm", "avi", "m4v"];

/// List of recognised image file extensions.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

fn has_extension(path: &Path, known: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| known.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a path has a video file extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use talkforge_common::paths::is_video_file;
///
/// assert!(is_video_file(Path::new("infinitetalk_res_001.mp4")));
/// assert!(!is_video_file(Path::new("request.json")));
/// ```
pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

/// Check if a path has an image file extension.
pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Pick the extension for a downloaded image from its URL path.
///
/// Falls back to `png` when the URL does not end in a known image extension,
/// e.g. for signed URLs or content-addressed blobs.
///
/// ```
/// use talkforge_common::paths::image_extension_from_url;
///
/// assert_eq!(image_extension_from_url("https://cdn.example/face.JPG?sig=1"), "jpg");
/// assert_eq!(image_extension_from_url("https://cdn.example/blob/abc"), "png");
/// ```
pub fn image_extension_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    let candidate = Path::new(last);
    if is_image_file(candidate) {
        candidate
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "png".to_string())
    } else {
        "png".to_string()
    }
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}
