use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// FourCC stored in the AVI stream header so players pick an MPEG-4 Part 2
/// decoder.
const XVID_TAG: u32 = u32::from_le_bytes(*b"XVID");

/// Fallback when the metadata carries no usable rate.
const FALLBACK_FPS: i32 = 25;

/// Encodes RGB frames to an MPEG-4 (XVID-tagged) AVI file via ffmpeg-next.
///
/// Every frame advances the clock by exactly `1 / fps`, so the output plays
/// at the configured rate no matter how the frames were captured.
pub struct FfmpegWriter {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    fps: i32,
    frame_count: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            fps: FALLBACK_FPS,
            frame_count: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frame_count
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx.stream(0).ok_or("output stream missing")?.time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps), ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if metadata.width == 0 || metadata.height == 0 {
            return Err("cannot encode a video with zero-sized frames".into());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let fps = metadata.fps.round() as i32;
        self.fps = if fps <= 0 { FALLBACK_FPS } else { fps };
        self.width = metadata.width;
        self.height = metadata.height;

        let mut octx = ffmpeg_next::format::output_as(path, "avi")?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, self.fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.fps, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        unsafe {
            (*ost.parameters().as_mut_ptr()).codec_tag = XVID_TAG;
        }

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::debug!(
            "Opened {} for {}x{} MPEG-4 at {} fps",
            path.display(),
            self.width,
            self.height,
            self.fps
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        if frame.width() != self.width || frame.height() != self.height || frame.channels() != 3 {
            return Err(format!(
                "frame {} is {}x{}x{}, writer expects {}x{}x3",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                self.width,
                self.height
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let row_bytes = self.width as usize * 3;
        let data = rgb_frame.data_mut(0);
        for (row, src_row) in frame.data().chunks_exact(row_bytes).enumerate() {
            data[row * stride..row * stride + row_bytes].copy_from_slice(src_row);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame)?;
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
            log::debug!("Finalized video with {} frames", self.frame_count);
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        Ok(())
    }
}
