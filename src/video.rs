use std::path::Path;
use std::sync::Once;

use ffmpeg::util::frame::video::Video;
use ffmpeg_next::{self as ffmpeg, codec, decoder, encoder, format, media, software, Packet, Rational};
use image::RgbImage;
use tracing::{debug, info};

use crate::error::{Result, VideoError};

static INIT: Once = Once::new();

pub(crate) fn init() -> Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = ffmpeg::init();
    });
    result.map_err(VideoError::from)
}

pub(crate) fn fourcc(tag: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*tag)
}

/// Destination for finished frames, in presentation order.
pub(crate) trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    fn finish(self) -> Result<()>
    where
        Self: Sized;
}

/// MPEG-4 Part 2 writer tagged `XVID` when muxing AVI.
pub(crate) struct XvidWriter {
    output: format::context::Output,
    encoder: encoder::Video,
    scaler: software::scaling::context::Context,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    width: u32,
    height: u32,
    next_pts: i64,
}

impl XvidWriter {
    pub(crate) fn create(path: &Path, width: u32, height: u32, fps: i32) -> Result<Self> {
        init()?;

        let mut output = format::output(&path)?;
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);
        let is_avi = output.format().name() == "avi";

        let codec = encoder::find(codec::Id::MPEG4)
            .ok_or_else(|| VideoError::Encode("MPEG-4 encoder not available".to_string()))?;
        let mut output_stream = output.add_stream(codec)?;
        let stream_index = output_stream.index();

        let mut video_encoder = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        let encoder_time_base = Rational(1, fps);
        video_encoder.set_width(width);
        video_encoder.set_height(height);
        video_encoder.set_format(format::Pixel::YUV420P);
        video_encoder.set_time_base(encoder_time_base);
        video_encoder.set_frame_rate(Some(Rational(fps, 1)));
        video_encoder.set_bit_rate(2_000_000);
        if global_header {
            video_encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        if is_avi {
            // SAFETY: the context is owned by `video_encoder` and not yet opened.
            unsafe {
                (*video_encoder.as_mut_ptr()).codec_tag = fourcc(b"XVID");
            }
        }

        let opened_encoder = video_encoder.open_as(codec)?;
        output_stream.set_parameters(&opened_encoder);
        output_stream.set_time_base(encoder_time_base);

        output.write_header()?;
        let stream_time_base = output
            .stream(stream_index)
            .ok_or(VideoError::Ffmpeg(ffmpeg::Error::StreamNotFound))?
            .time_base();

        let scaler = software::scaling::context::Context::get(
            format::Pixel::RGB24,
            width,
            height,
            format::Pixel::YUV420P,
            width,
            height,
            software::scaling::Flags::BILINEAR,
        )?;

        info!(
            "Opened {} ({}x{} @ {} fps, tag {})",
            path.display(),
            width,
            height,
            fps,
            if is_avi { "XVID" } else { "default" }
        );

        Ok(Self {
            output,
            encoder: opened_encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width,
            height,
            next_pts: 0,
        })
    }

    fn receive_and_write_packets(&mut self) -> Result<()> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.output)?;
        }
        Ok(())
    }
}

impl FrameSink for XvidWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(VideoError::Encode(format!(
                "frame is {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let mut rgb_frame = Video::new(format::Pixel::RGB24, self.width, self.height);
        let row_bytes = self.width as usize * 3;
        let stride = rgb_frame.stride(0);
        let plane = rgb_frame.data_mut(0);
        for (y, row) in frame.as_raw().chunks_exact(row_bytes).enumerate() {
            plane[y * stride..y * stride + row_bytes].copy_from_slice(row);
        }

        let mut yuv_frame = Video::empty();
        self.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder.send_frame(&yuv_frame)?;
        self.receive_and_write_packets()
    }

    fn finish(mut self) -> Result<()> {
        self.encoder.send_eof()?;
        self.receive_and_write_packets()?;
        self.output.write_trailer()?;
        debug!("Wrote {} frames", self.next_pts);
        Ok(())
    }
}

/// Decodes the container at `input_path` and counts its video frames.
pub(crate) fn count_video_frames(input_path: &Path) -> Result<usize> {
    init()?;

    let mut input = format::input(&input_path)?;
    let video_stream_index = input
        .streams()
        .best(media::Type::Video)
        .ok_or(VideoError::Ffmpeg(ffmpeg::Error::StreamNotFound))?
        .index();

    let video_stream = input
        .stream(video_stream_index)
        .ok_or(VideoError::Ffmpeg(ffmpeg::Error::StreamNotFound))?;
    let mut decoder = codec::context::Context::from_parameters(video_stream.parameters())?
        .decoder()
        .video()?;

    let mut frame_count = 0;
    let mut receive_decoded_frames = |decoder: &mut decoder::Video| {
        let mut decoded = Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            frame_count += 1;
        }
    };

    for (stream, packet) in input.packets() {
        if stream.index() == video_stream_index {
            decoder.send_packet(&packet)?;
            receive_decoded_frames(&mut decoder);
        }
    }
    decoder.send_eof()?;
    receive_decoded_frames(&mut decoder);

    Ok(frame_count)
}
