//! # Symphonia Container & Codec Adapter
//!
//! Bridges a [`SharedStream`] to Symphonia's pull-style I/O, selects the audio
//! track to decode and owns the demuxer and codec contexts.
//!
//! Symphonia decodes one packet into one frame synchronously. The adapter
//! exposes that as a send/receive pair with a single pending-frame slot so the
//! decode state machine can pause between feeding a packet and collecting its
//! frame, and can signal the drain at end of input explicitly.

use crate::config::DecoderConfig;
use crate::decoder::format_detector::{FormatDetector, SourceCodec};
use crate::error::{DecoderError, Result};
use crate::runtime::Registries;
use crate::stream::{SeekOrigin, SharedStream};
use std::io::{self, Read, Seek, SeekFrom};
use symphonia::core::audio::AudioBufferRef;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::SampleFormat;
use symphonia::core::units::TimeBase;
use tracing::{debug, error, info, instrument, trace, warn};

// ============================================================================
// Stream Bridge
// ============================================================================

/// `MediaSource` over a shared [`AudioStream`](crate::stream::AudioStream).
///
/// The stream is locked only for the duration of each read or seek.
struct StreamSource {
    stream: SharedStream,
}

impl Read for StreamSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.lock().read(buf)
    }
}

impl Seek for StreamSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            SeekFrom::Start(position) => {
                let offset = i64::try_from(position).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek position overflow")
                })?;
                (offset, SeekOrigin::Begin)
            }
            SeekFrom::Current(delta) => (delta, SeekOrigin::Current),
            SeekFrom::End(delta) => (delta, SeekOrigin::End),
        };

        self.stream.lock().seek(offset, origin)
    }
}

impl MediaSource for StreamSource {
    fn is_seekable(&self) -> bool {
        self.stream.lock().is_seekable()
    }

    fn byte_len(&self) -> Option<u64> {
        self.stream.lock().size()
    }
}

// ============================================================================
// Adapter Types
// ============================================================================

/// Immutable facts about the selected track, fixed at open time.
#[derive(Debug, Clone)]
pub(crate) struct TrackInfo {
    pub(crate) track_id: u32,
    pub(crate) codec: SourceCodec,
    pub(crate) channels: usize,
    pub(crate) sample_rate: u32,
    pub(crate) time_base: Option<TimeBase>,
    pub(crate) start_ts: u64,
    pub(crate) sample_count: u64,
    pub(crate) sample_format: Option<SampleFormat>,
}

impl TrackInfo {
    /// Container timestamp of `sample_offset` samples past the track start.
    pub(crate) fn ts_for_sample(&self, sample_offset: u64) -> u64 {
        let offset = match self.time_base {
            Some(tb) if tb.numer > 0 && self.sample_rate > 0 => {
                let ts = u128::from(sample_offset) * u128::from(tb.denom)
                    / (u128::from(tb.numer) * u128::from(self.sample_rate));
                u64::try_from(ts).unwrap_or(u64::MAX)
            }
            _ => sample_offset,
        };

        self.start_ts.saturating_add(offset)
    }

    /// Number of samples spanned by `duration` container ticks.
    fn samples_for_duration(&self, duration: u64) -> u64 {
        match self.time_base {
            Some(tb) if tb.denom > 0 => {
                let samples = u128::from(duration)
                    * u128::from(tb.numer)
                    * u128::from(self.sample_rate)
                    / u128::from(tb.denom);
                u64::try_from(samples).unwrap_or(u64::MAX)
            }
            _ => duration,
        }
    }
}

/// Outcome of pulling one packet from the demuxer.
pub(crate) enum PacketRead {
    /// A packet of the selected track.
    Packet(Packet),
    /// A packet of a discarded track.
    Skipped,
    /// The container has no more packets.
    EndOfStream,
}

/// Outcome of feeding the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendStatus {
    /// Input accepted; a frame may now be received.
    Accepted,
    /// The packet was rejected and the codec needs different input.
    NeedsInput,
    /// The codec has already been drained.
    EndOfStream,
}

/// Outcome of asking the codec for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReceiveStatus {
    /// A frame is available through [`SymphoniaContainer::frame`].
    Frame,
    /// No frame until another packet is sent.
    NeedsInput,
    /// The codec was drained and holds nothing more.
    EndOfStream,
}

/// Counts consecutive packets the codec rejected as corrupt.
#[derive(Debug, Clone, Copy)]
struct ErrorBudget {
    consecutive: usize,
    max: usize,
}

impl ErrorBudget {
    fn new(max: usize) -> Self {
        Self { consecutive: 0, max }
    }

    /// Record a rejected packet. Returns `true` once the budget is spent.
    fn record(&mut self) -> bool {
        self.consecutive += 1;
        self.consecutive >= self.max
    }

    fn clear(&mut self) {
        self.consecutive = 0;
    }
}

// ============================================================================
// Container Adapter
// ============================================================================

/// Demuxer and codec contexts for one open session.
///
/// Dropping the adapter releases the format reader (and with it the buffered
/// stream and the shared stream handle) and the codec.
pub(crate) struct SymphoniaContainer {
    reader: Box<dyn FormatReader>,
    codec: Box<dyn Decoder>,
    track: TrackInfo,
    frame_ready: bool,
    drain_sent: bool,
    errors: ErrorBudget,
}

impl SymphoniaContainer {
    /// Open `stream`, select the first supported audio track and open its codec.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The stream is not open, readable and seekable
    /// - The container is not recognized
    /// - No track carries a supported codec
    /// - The codec cannot be created
    #[instrument(skip_all)]
    pub(crate) fn open(
        stream: SharedStream,
        registries: &Registries,
        config: &DecoderConfig,
    ) -> Result<Self> {
        {
            let guard = stream.lock();
            if !guard.is_open() {
                return Err(DecoderError::StreamUnusable("stream is not open".to_string()));
            }
            if !guard.is_readable() {
                return Err(DecoderError::StreamUnusable("stream is not readable".to_string()));
            }
            if !guard.is_seekable() {
                return Err(DecoderError::StreamUnusable("stream is not seekable".to_string()));
            }
        }

        // Step 1: Bounded I/O buffer over the stream
        let source = Box::new(StreamSource { stream }) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(
            source,
            MediaSourceStreamOptions {
                buffer_len: config.io_buffer_len,
            },
        );

        // Step 2: Probe against the registered containers only
        let probed = registries
            .probe
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Container probe failed: {}", e);
                DecoderError::InvalidFormat(format!("Failed to probe container: {}", e))
            })?;

        let mut reader = probed.format;

        // Step 3: First track with a supported codec; every other track is discarded
        let (track, codec) = reader
            .tracks()
            .iter()
            .find_map(|t| FormatDetector::detect_codec(t.codec_params.codec).map(|c| (t, c)))
            .ok_or_else(|| {
                error!("No supported audio track found");
                DecoderError::NoSupportedTrack
            })?;

        let params = track.codec_params.clone();
        let track_id = track.id;
        let discarded = reader.tracks().len() - 1;
        debug!(
            "Selected track {} ({:?}), discarding {} other tracks",
            track_id, codec, discarded
        );

        // Step 4: Audio parameters
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| DecoderError::InvalidFormat("Missing sample rate".to_string()))?;

        let channels = params
            .channels
            .map(|ch| ch.count())
            .ok_or_else(|| DecoderError::InvalidFormat("Missing channel layout".to_string()))?;

        let mut info = TrackInfo {
            track_id,
            codec,
            channels,
            sample_rate,
            time_base: params.time_base,
            start_ts: params.start_ts,
            sample_count: 0,
            sample_format: params.sample_format,
        };

        // Step 5: Codec context
        let codec_ctx = registries
            .codecs
            .make(&params, &DecoderOptions::default())
            .map_err(|e| {
                error!("Failed to create codec: {}", e);
                DecoderError::CodecOpen(format!("Failed to create codec decoder: {}", e))
            })?;

        // Step 6: Duration, from metadata first and by scanning as a fallback
        info.sample_count = match params.n_frames {
            Some(frames) if frames > 0 => frames,
            _ if config.scan_duration => scan_duration(reader.as_mut(), &info)?,
            _ => {
                warn!("Track reports no duration and scanning is disabled");
                0
            }
        };

        info!(
            "Opened {:?} track: {} Hz, {} channels, {} samples",
            info.codec, info.sample_rate, info.channels, info.sample_count
        );

        Ok(Self {
            reader,
            codec: codec_ctx,
            track: info,
            frame_ready: false,
            drain_sent: false,
            errors: ErrorBudget::new(config.max_consecutive_decode_errors),
        })
    }

    /// Facts about the selected track.
    pub(crate) fn track(&self) -> &TrackInfo {
        &self.track
    }

    /// Pull the next packet from the demuxer.
    pub(crate) fn read_packet(&mut self) -> Result<PacketRead> {
        let packet = match self.reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("Container exhausted");
                return Ok(PacketRead::EndOfStream);
            }
            Err(SymphoniaError::ResetRequired) => {
                warn!("Container track list changed mid-stream");
                return Err(DecoderError::DecodeFailed(
                    "Track list changed, reset required".to_string(),
                ));
            }
            Err(e) => {
                error!("Failed to read packet: {}", e);
                return Err(DecoderError::DecodeFailed(format!(
                    "Failed to read packet: {}",
                    e
                )));
            }
        };

        // Consume any metadata that arrived with this packet
        while !self.reader.metadata().is_latest() {
            self.reader.metadata().pop();
        }

        if packet.track_id() != self.track.track_id {
            trace!("Skipping packet of discarded track {}", packet.track_id());
            return Ok(PacketRead::Skipped);
        }

        Ok(PacketRead::Packet(packet))
    }

    /// Feed a packet to the codec, or `None` to signal that input is exhausted.
    ///
    /// A corrupt packet is dropped and reported as [`SendStatus::NeedsInput`]
    /// until the configured number of consecutive failures is exceeded.
    pub(crate) fn send_packet(&mut self, packet: Option<&Packet>) -> Result<SendStatus> {
        let Some(packet) = packet else {
            if self.drain_sent {
                return Ok(SendStatus::EndOfStream);
            }
            debug!("Draining codec");
            self.drain_sent = true;
            return Ok(SendStatus::Accepted);
        };

        if self.frame_ready {
            // The previous frame was never collected
            return Ok(SendStatus::NeedsInput);
        }

        match self.codec.decode(packet) {
            Ok(_) => {
                self.errors.clear();
                self.frame_ready = true;
                Ok(SendStatus::Accepted)
            }
            Err(SymphoniaError::DecodeError(err)) => self.reject_packet(packet, err.to_string()),
            Err(SymphoniaError::IoError(err)) => self.reject_packet(packet, err.to_string()),
            Err(e) => {
                error!("Fatal codec error: {}", e);
                Err(DecoderError::DecodeFailed(format!(
                    "Failed to decode packet: {}",
                    e
                )))
            }
        }
    }

    fn reject_packet(&mut self, packet: &Packet, reason: String) -> Result<SendStatus> {
        let exhausted = self.errors.record();
        warn!(
            "Skipping corrupt packet at ts {} (attempt {}/{}): {}",
            packet.ts(),
            self.errors.consecutive,
            self.errors.max,
            reason
        );

        if exhausted {
            error!("Too many consecutive decode errors, stream may be corrupted");
            return Err(DecoderError::DecodeFailed(format!(
                "Codec rejected {} consecutive packets: {}",
                self.errors.consecutive, reason
            )));
        }

        Ok(SendStatus::NeedsInput)
    }

    /// Collect the frame produced by the last accepted packet.
    pub(crate) fn receive_frame(&mut self) -> ReceiveStatus {
        if self.frame_ready {
            self.frame_ready = false;
            ReceiveStatus::Frame
        } else if self.drain_sent {
            ReceiveStatus::EndOfStream
        } else {
            ReceiveStatus::NeedsInput
        }
    }

    /// The most recently received frame.
    ///
    /// Valid until the next packet is sent.
    pub(crate) fn frame(&self) -> AudioBufferRef<'_> {
        self.codec.last_decoded()
    }

    /// Seek to the frame boundary at or before `ts` and flush the codec.
    ///
    /// Returns the timestamp the container actually landed on.
    pub(crate) fn seek(&mut self, ts: u64) -> Result<u64> {
        let seeked = self
            .reader
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts,
                    track_id: self.track.track_id,
                },
            )
            .map_err(|e| {
                error!("Seek to ts {} failed: {}", ts, e);
                DecoderError::SeekFailed(e.to_string())
            })?;

        self.codec.reset();
        self.frame_ready = false;
        self.drain_sent = false;
        self.errors.clear();

        debug!(
            "Seeked to ts {} (requested {})",
            seeked.actual_ts, seeked.required_ts
        );
        Ok(seeked.actual_ts)
    }
}

/// Count the samples of `track` by walking every packet once, then return to
/// the start of the track.
fn scan_duration(reader: &mut dyn FormatReader, track: &TrackInfo) -> Result<u64> {
    debug!("Track reports no duration, scanning packets");

    let mut ticks: u64 = 0;
    loop {
        match reader.next_packet() {
            Ok(packet) if packet.track_id() == track.track_id => {
                ticks = ticks.saturating_add(packet.dur());
            }
            Ok(_) => {}
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                error!("Duration scan failed: {}", e);
                return Err(DecoderError::InvalidFormat(format!(
                    "Failed to scan duration: {}",
                    e
                )));
            }
        }
    }

    reader
        .seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: track.start_ts,
                track_id: track.track_id,
            },
        )
        .map_err(|e| {
            error!("Failed to return to track start after scan: {}", e);
            DecoderError::InvalidFormat(format!("Failed to rewind after duration scan: {}", e))
        })?;

    let samples = track.samples_for_duration(ticks);
    debug!("Duration scan found {} samples", samples);
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(time_base: Option<TimeBase>, sample_rate: u32, start_ts: u64) -> TrackInfo {
        TrackInfo {
            track_id: 0,
            codec: SourceCodec::Pcm16,
            channels: 2,
            sample_rate,
            time_base,
            start_ts,
            sample_count: 0,
            sample_format: None,
        }
    }

    #[test]
    fn test_ts_for_sample_with_sample_rate_time_base() {
        let info = track(Some(TimeBase::new(1, 8000)), 8000, 0);
        assert_eq!(info.ts_for_sample(2000), 2000);
    }

    #[test]
    fn test_ts_for_sample_scales_proportionally() {
        // Millisecond time base at 8 kHz: 8 samples per tick
        let info = track(Some(TimeBase::new(1, 1000)), 8000, 10);
        assert_eq!(info.ts_for_sample(8000), 1010);
        assert_eq!(info.ts_for_sample(4), 10);
    }

    #[test]
    fn test_ts_for_sample_without_time_base() {
        let info = track(None, 44100, 0);
        assert_eq!(info.ts_for_sample(1234), 1234);
    }

    #[test]
    fn test_error_budget_fails_on_last_allowed_rejection() {
        let mut budget = ErrorBudget::new(3);
        assert!(!budget.record());
        assert!(!budget.record());
        assert!(budget.record());
    }

    #[test]
    fn test_error_budget_resets_after_good_packet() {
        let mut budget = ErrorBudget::new(2);
        assert!(!budget.record());
        budget.clear();
        assert!(!budget.record());
        assert!(budget.record());

        let mut strict = ErrorBudget::new(1);
        assert!(strict.record());
    }

    #[test]
    fn test_samples_for_duration() {
        let info = track(Some(TimeBase::new(1, 1000)), 8000, 0);
        assert_eq!(info.samples_for_duration(500), 4000);

        let native = track(Some(TimeBase::new(1, 44100)), 44100, 0);
        assert_eq!(native.samples_for_duration(1152), 1152);
    }
}
