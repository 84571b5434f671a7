pub mod blur_image_use_case;
pub mod blur_live_use_case;
pub mod blur_video_use_case;
pub mod detection_fallback;
pub mod detector_provider;
pub mod infrastructure;
pub mod media_backend;
pub mod orchestrator;
pub mod output_paths;
pub mod pipeline_logger;
