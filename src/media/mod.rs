pub mod identity;
pub mod subtitles;
pub mod video;
