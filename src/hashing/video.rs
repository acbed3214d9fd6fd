//! Video stream access for frame sampling.
//!
//! The perceptual hasher talks to video files through the [`VideoOpener`] and
//! [`FrameSource`] seams so the decoding backend stays swappable. The shipped
//! backend uses FFmpeg behind the `ffmpeg` cargo feature; without it every
//! video reads as unopenable and hashes to an empty signature, which the
//! similarity rules already treat as "matches nothing".

use std::path::Path;

use image::RgbImage;

/// Stream-level metadata for scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VideoProbe {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Duration in seconds, 0.0 when unknown.
    pub duration_secs: f64,
}

/// An open video stream that can decode individual frames.
///
/// Frames are requested in ascending index order within one hashing pass,
/// which lets sequential decoders avoid seeking backwards.
pub trait FrameSource {
    /// Total frame count, or a value <= 0 when unknown.
    fn frame_count(&mut self) -> i64;

    /// Decode the frame at the given index, if possible.
    fn decode_frame(&mut self, index: i64) -> Option<RgbImage>;
}

/// Opens video files for frame decoding and metadata probing.
pub trait VideoOpener: Send + Sync {
    /// Open a stream, or `None` if the file cannot be decoded.
    fn open(&self, path: &Path) -> Option<Box<dyn FrameSource>>;

    /// Probe stream metadata, or `None` if the file cannot be read.
    fn probe(&self, path: &Path) -> Option<VideoProbe>;
}

/// Opener used when no decoding backend is compiled in.
///
/// Every file reads as unopenable, so videos cluster on exact content only.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedOpener;

impl VideoOpener for UnsupportedOpener {
    fn open(&self, _path: &Path) -> Option<Box<dyn FrameSource>> {
        None
    }

    fn probe(&self, _path: &Path) -> Option<VideoProbe> {
        None
    }
}

/// The default opener for this build.
#[must_use]
pub fn default_opener() -> std::sync::Arc<dyn VideoOpener> {
    #[cfg(feature = "ffmpeg")]
    {
        std::sync::Arc::new(ffmpeg::FfmpegOpener::new())
    }
    #[cfg(not(feature = "ffmpeg"))]
    {
        std::sync::Arc::new(UnsupportedOpener)
    }
}

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg {
    //! FFmpeg-backed video decoding.

    use std::path::Path;
    use std::sync::Once;

    use ffmpeg_next as ffmpeg;
    use ffmpeg_next::format::Pixel;
    use ffmpeg_next::media::Type;
    use ffmpeg_next::software::scaling;
    use image::RgbImage;

    use super::{FrameSource, VideoOpener, VideoProbe};

    static INIT: Once = Once::new();

    fn ensure_init() {
        INIT.call_once(|| {
            if let Err(e) = ffmpeg::init() {
                log::warn!("FFmpeg initialization failed: {}", e);
            }
        });
    }

    /// Opens videos through FFmpeg.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FfmpegOpener;

    impl FfmpegOpener {
        /// Create a new opener, initializing FFmpeg once per process.
        #[must_use]
        pub fn new() -> Self {
            ensure_init();
            Self
        }
    }

    impl VideoOpener for FfmpegOpener {
        fn open(&self, path: &Path) -> Option<Box<dyn FrameSource>> {
            match FfmpegSource::open(path) {
                Ok(source) => Some(Box::new(source)),
                Err(e) => {
                    log::debug!("FFmpeg cannot open {}: {}", path.display(), e);
                    None
                }
            }
        }

        fn probe(&self, path: &Path) -> Option<VideoProbe> {
            let input = ffmpeg::format::input(&path).ok()?;
            let stream = input.streams().best(Type::Video)?;
            let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .ok()?
                .decoder()
                .video()
                .ok()?;
            let duration_secs = if stream.duration() > 0 {
                stream.duration() as f64 * f64::from(stream.time_base())
            } else {
                0.0
            };
            Some(VideoProbe {
                width: decoder.width(),
                height: decoder.height(),
                duration_secs,
            })
        }
    }

    /// Sequentially decoding frame source over one video stream.
    pub struct FfmpegSource {
        input: ffmpeg::format::context::Input,
        decoder: ffmpeg::decoder::Video,
        stream_index: usize,
        frame_count: i64,
        next_index: i64,
    }

    impl FfmpegSource {
        fn open(path: &Path) -> Result<Self, ffmpeg::Error> {
            let input = ffmpeg::format::input(&path)?;
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or(ffmpeg::Error::StreamNotFound)?;
            let stream_index = stream.index();
            let frame_count = stream.frames();

            let context =
                ffmpeg::codec::context::Context::from_parameters(stream.parameters())?;
            let mut decoder = context.decoder().video()?;
            // Many of these decoders run at once; the workers are the
            // parallelism, not the codec.
            decoder.set_threading(ffmpeg::threading::Config {
                kind: ffmpeg::threading::Type::None,
                count: 1,
            });

            Ok(Self {
                input,
                decoder,
                stream_index,
                frame_count,
                next_index: 0,
            })
        }

        fn decode_next(&mut self) -> Option<RgbImage> {
            let mut decoded = ffmpeg::frame::Video::empty();
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                if self.decoder.send_packet(&packet).is_err() {
                    continue;
                }
                if self.decoder.receive_frame(&mut decoded).is_ok() {
                    self.next_index += 1;
                    return rgb_frame(&self.decoder, &decoded);
                }
            }
            None
        }
    }

    impl FrameSource for FfmpegSource {
        fn frame_count(&mut self) -> i64 {
            self.frame_count
        }

        fn decode_frame(&mut self, index: i64) -> Option<RgbImage> {
            if index < self.next_index {
                return None;
            }
            // Decode forward, discarding frames up to the requested index.
            let mut frame = None;
            while self.next_index <= index {
                frame = self.decode_next();
                frame.as_ref()?;
            }
            frame
        }
    }

    fn rgb_frame(
        decoder: &ffmpeg::decoder::Video,
        frame: &ffmpeg::frame::Video,
    ) -> Option<RgbImage> {
        let mut scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )
        .ok()?;

        let mut rgb = ffmpeg::frame::Video::empty();
        scaler.run(frame, &mut rgb).ok()?;

        let width = rgb.width();
        let height = rgb.height();
        let stride = rgb.stride(0);
        let data = rgb.data(0);

        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + width as usize * 3]);
        }
        RgbImage::from_raw(width, height, pixels)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgb;

    /// In-memory frame source for tests; records which indices were decoded.
    pub(crate) struct SyntheticSource {
        frames: Vec<RgbImage>,
        pub(crate) decoded_indices: Vec<i64>,
    }

    impl SyntheticSource {
        /// A source whose frames are all the same solid color.
        pub(crate) fn uniform(count: usize, color: Rgb<u8>) -> Self {
            let frames = (0..count)
                .map(|_| RgbImage::from_pixel(16, 16, color))
                .collect();
            Self {
                frames,
                decoded_indices: Vec::new(),
            }
        }
    }

    impl FrameSource for SyntheticSource {
        fn frame_count(&mut self) -> i64 {
            self.frames.len() as i64
        }

        fn decode_frame(&mut self, index: i64) -> Option<RgbImage> {
            self.decoded_indices.push(index);
            self.frames.get(index as usize).cloned()
        }
    }

    #[test]
    fn test_unsupported_opener_opens_nothing() {
        let opener = UnsupportedOpener;
        assert!(opener.open(Path::new("/some/video.mp4")).is_none());
        assert!(opener.probe(Path::new("/some/video.mp4")).is_none());
    }
}
