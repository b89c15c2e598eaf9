use std::path::Path;

/// Episode containers found next to subtitles in a season folder.
pub const VIDEO_EXTENSIONS: [&str; 12] = [
    "mkv", "mp4", "m4v", "avi", "mov", "webm", "flv", "wmv", "mpg", "mpeg", "ts", "m2ts",
];

pub fn is_video_file(path: &Path) -> bool {
    if let Some(extension) = path.extension() {
        if let Some(ext_str) = extension.to_str() {
            return VIDEO_EXTENSIONS
                .iter()
                .any(|known| ext_str.eq_ignore_ascii_case(known));
        }
    }
    false
}
