pub mod blazeface_detector_provider;
pub mod ffmpeg_media_backend;
