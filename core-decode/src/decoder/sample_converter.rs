//! # Sample Format Converter
//!
//! Converts decoded frames to the fixed output format: 16-bit signed
//! little-endian PCM, interleaved. Channel count and sample rate pass through
//! unchanged.

use crate::error::{DecoderError, Result};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;
use tracing::trace;

/// Bytes per output sample (one channel).
pub const OUTPUT_BYTES_PER_SAMPLE: usize = 2;

/// Append `buffer` to `out` as interleaved 16-bit little-endian bytes.
///
/// Frames that are already 16-bit are copied verbatim; other formats are
/// scaled by the codec library's sample conversions.
pub fn interleave_s16le(buffer: &AudioBufferRef<'_>, out: &mut Vec<u8>) {
    match buffer {
        AudioBufferRef::S16(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::U8(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::U16(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::U24(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::U32(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::S8(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::S24(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::S32(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::F32(buf) => append_interleaved(&**buf, out),
        AudioBufferRef::F64(buf) => append_interleaved(&**buf, out),
    }
}

/// Convert and interleave samples of any type.
fn append_interleaved<T>(buf: &AudioBuffer<T>, out: &mut Vec<u8>)
where
    T: Sample + IntoSample<i16>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    out.reserve(num_frames * num_channels * OUTPUT_BYTES_PER_SAMPLE);

    for frame_idx in 0..num_frames {
        for chan_idx in 0..num_channels {
            let sample: i16 = buf.chan(chan_idx)[frame_idx].into_sample();
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
}

/// Number of channels carried by a decoded frame.
pub(crate) fn frame_channels(buffer: &AudioBufferRef<'_>) -> usize {
    buffer.spec().channels.count()
}

/// Pull-based format converter.
///
/// Each source frame is converted in full into an internal queue; callers then
/// drain the queue into destination buffers of any size, including sizes that
/// split a sample. Passing no source drains what is queued, which is how the
/// decoder flushes the converter after the codec runs dry.
#[derive(Debug)]
pub struct SampleConverter {
    channels: usize,
    queue: Vec<u8>,
    cursor: usize,
}

impl SampleConverter {
    /// Create a converter for frames with `channels` channels.
    pub fn new(channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(DecoderError::ConverterInit(
                "channel count must be > 0".to_string(),
            ));
        }

        Ok(Self {
            channels,
            queue: Vec::new(),
            cursor: 0,
        })
    }

    /// Convert `src` (if any) and copy queued output into `dst`.
    ///
    /// Returns the number of bytes written. Zero means the converter holds
    /// nothing more: without a source this is "need a new frame", in flush
    /// mode it is "done".
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::ConversionFailed`] if a frame's channel layout
    /// differs from the one the converter was created for.
    pub fn convert(&mut self, src: Option<&AudioBufferRef<'_>>, dst: &mut [u8]) -> Result<usize> {
        if let Some(frame) = src {
            let channels = frame_channels(frame);
            if channels != self.channels {
                return Err(DecoderError::ConversionFailed(format!(
                    "frame has {} channels, converter expects {}",
                    channels, self.channels
                )));
            }

            self.compact();
            interleave_s16le(frame, &mut self.queue);
            trace!(
                "Queued {} converted frames ({} bytes pending)",
                frame.frames(),
                self.buffered()
            );
        }

        let count = dst.len().min(self.buffered());
        dst[..count].copy_from_slice(&self.queue[self.cursor..self.cursor + count]);
        self.cursor += count;

        Ok(count)
    }

    /// Bytes converted but not yet handed out.
    pub fn buffered(&self) -> usize {
        self.queue.len() - self.cursor
    }

    /// Drop everything queued, e.g. after a seek.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.cursor = 0;
    }

    fn compact(&mut self) {
        if self.cursor > 0 {
            self.queue.drain(..self.cursor);
            self.cursor = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::audio::{AsAudioBufferRef, Channels, SignalSpec};

    fn mono_u8(samples: &[u8]) -> AudioBuffer<u8> {
        let spec = SignalSpec::new(8000, Channels::FRONT_LEFT);
        let mut buf = AudioBuffer::<u8>::new(samples.len() as u64, spec);
        buf.render_reserved(Some(samples.len()));
        buf.chan_mut(0).copy_from_slice(samples);
        buf
    }

    fn stereo_i16(left: &[i16], right: &[i16]) -> AudioBuffer<i16> {
        let spec = SignalSpec::new(44100, Channels::FRONT_LEFT | Channels::FRONT_RIGHT);
        let mut buf = AudioBuffer::<i16>::new(left.len() as u64, spec);
        buf.render_reserved(Some(left.len()));
        buf.chan_mut(0).copy_from_slice(left);
        buf.chan_mut(1).copy_from_slice(right);
        buf
    }

    #[test]
    fn test_rejects_zero_channels() {
        assert!(matches!(
            SampleConverter::new(0),
            Err(DecoderError::ConverterInit(_))
        ));
    }

    #[test]
    fn test_interleave_s16_is_verbatim() {
        let buf = stereo_i16(&[1, -2], &[300, i16::MIN]);
        let mut out = Vec::new();
        interleave_s16le(&buf.as_audio_buffer_ref(), &mut out);

        let mut expected = Vec::new();
        for s in [1i16, 300, -2, i16::MIN] {
            expected.extend_from_slice(&s.to_le_bytes());
        }
        assert_eq!(out, expected);
    }

    #[test]
    fn test_u8_midpoint_converts_to_silence() {
        let buf = mono_u8(&[128, 128]);
        let mut out = Vec::new();
        interleave_s16le(&buf.as_audio_buffer_ref(), &mut out);
        assert_eq!(out, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_convert_drains_across_small_buffers() {
        let buf = mono_u8(&[128, 129, 130]);
        let mut converter = SampleConverter::new(1).unwrap();

        let mut dst = [0u8; 3];
        let first = converter.convert(Some(&buf.as_audio_buffer_ref()), &mut dst).unwrap();
        assert_eq!(first, 3);
        assert_eq!(converter.buffered(), 3);

        let second = converter.convert(None, &mut dst).unwrap();
        assert_eq!(second, 3);

        // Queue empty: zero means a new frame is needed (or flush is done)
        assert_eq!(converter.convert(None, &mut dst).unwrap(), 0);
    }

    #[test]
    fn test_convert_rejects_channel_mismatch() {
        let buf = stereo_i16(&[0], &[0]);
        let mut converter = SampleConverter::new(1).unwrap();
        let mut dst = [0u8; 8];

        assert!(matches!(
            converter.convert(Some(&buf.as_audio_buffer_ref()), &mut dst),
            Err(DecoderError::ConversionFailed(_))
        ));
    }

    #[test]
    fn test_reset_drops_pending_output() {
        let buf = mono_u8(&[1, 2, 3, 4]);
        let mut converter = SampleConverter::new(1).unwrap();
        let mut dst = [0u8; 2];

        converter.convert(Some(&buf.as_audio_buffer_ref()), &mut dst).unwrap();
        assert!(converter.buffered() > 0);

        converter.reset();
        assert_eq!(converter.buffered(), 0);
        assert_eq!(converter.convert(None, &mut dst).unwrap(), 0);
    }
}
