use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{VideoReader, VideoSource};

/// Decodes frames from a video file or capture device via ffmpeg-next.
///
/// Converts each decoded frame to RGB24 and stamps it with a millisecond
/// timestamp taken from the packet pts, falling back to `index / fps`.
/// Timestamps are clamped so they never go backwards.
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
    metadata: Option<VideoMetadata>,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
            metadata: None,
        }
    }

    fn decoding_iter(&mut self) -> Result<FfmpegFrameIter<'_>, Box<dyn std::error::Error>> {
        let fallback_fps = self.metadata.as_ref().map(|m| m.fps).unwrap_or(0.0);
        let ictx = self.input_ctx.as_mut().ok_or("FfmpegReader: not opened")?;

        let stream = ictx
            .stream(self.video_stream_index)
            .ok_or("video stream disappeared")?;
        let time_base = stream.time_base();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(FfmpegFrameIter {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index: self.video_stream_index,
            time_base,
            fallback_fps,
            frame_index: 0,
            last_timestamp_ms: None,
            flushing: false,
            done: false,
        })
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = open_input(source)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps: rational_to_f64(stream.rate()),
            total_frames: stream.frames().max(0) as usize,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: match source {
                VideoSource::File(path) => Some(path.clone()),
                VideoSource::Camera(_) => None,
            },
        };
        log::info!(
            "Opened {source}: {}x{} @ {:.2} fps ({})",
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.codec
        );

        self.video_stream_index = video_stream_index;
        self.metadata = Some(metadata.clone());
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.decoding_iter() {
            Ok(iter) => Box::new(iter),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.metadata = None;
    }
}

fn open_input(
    source: &VideoSource,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    match source {
        VideoSource::File(path) => Ok(ffmpeg_next::format::input(path)?),
        VideoSource::Camera(index) => {
            let (format_name, device) = camera_device(*index);
            let format = ffmpeg_next::device::input::video()
                .find(|f| f.name() == format_name)
                .ok_or_else(|| format!("capture backend '{format_name}' is not available"))?;
            let ctx = ffmpeg_next::format::open_with(
                &device,
                &ffmpeg_next::format::Format::Input(format),
                ffmpeg_next::Dictionary::new(),
            )?;
            Ok(ctx.input())
        }
    }
}

/// libavdevice input format and device string for a camera index.
///
/// dshow addresses devices by name, so on Windows the index is passed as
/// the device name and only works for devices actually named that way.
pub fn camera_device(index: u32) -> (&'static str, String) {
    #[cfg(target_os = "macos")]
    {
        ("avfoundation", index.to_string())
    }
    #[cfg(target_os = "windows")]
    {
        ("dshow", format!("video={index}"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        ("v4l2", format!("/dev/video{index}"))
    }
}

fn rational_to_f64(rate: ffmpeg_next::Rational) -> f64 {
    if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}

/// Lazy iterator that decodes video frames one at a time, avoiding the need
/// to buffer the entire video in memory.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    time_base: ffmpeg_next::Rational,
    fallback_fps: f64,
    frame_index: usize,
    last_timestamp_ms: Option<i64>,
    flushing: bool,
    done: bool,
}

impl FfmpegFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }

        let pts_ms = decoded
            .timestamp()
            .or(decoded.pts())
            .and_then(|pts| pts_to_ms(pts, self.time_base));
        let timestamp_ms = next_timestamp_ms(
            pts_ms,
            self.frame_index,
            self.fallback_fps,
            self.last_timestamp_ms,
        );
        self.last_timestamp_ms = Some(timestamp_ms);

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index)
            .with_timestamp_ms(timestamp_ms);
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

fn pts_to_ms(pts: i64, time_base: ffmpeg_next::Rational) -> Option<i64> {
    let (num, den) = (time_base.numerator() as i64, time_base.denominator() as i64);
    if den == 0 {
        return None;
    }
    pts.checked_mul(num)?.checked_mul(1000).map(|v| v / den)
}

/// Picks the timestamp for the next frame: the stream's own clock when it
/// has one, else `index / fps`, never earlier than the previous frame.
fn next_timestamp_ms(
    pts_ms: Option<i64>,
    frame_index: usize,
    fallback_fps: f64,
    previous: Option<i64>,
) -> i64 {
    let candidate = pts_ms.unwrap_or_else(|| {
        if fallback_fps > 0.0 {
            (frame_index as f64 * 1000.0 / fallback_fps).round() as i64
        } else {
            previous.map_or(0, |p| p + 1)
        }
    });
    match previous {
        Some(p) => candidate.max(p),
        None => candidate.max(0),
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
