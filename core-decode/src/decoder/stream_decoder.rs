//! # Stream Decoder
//!
//! Public entry point: open a seekable stream, pull 16-bit PCM into caller
//! buffers, reposition, and query the stream's properties.

use crate::config::DecoderConfig;
use crate::decoder::format_detector::{FormatDetector, SourceCodec};
use crate::decoder::machine::{DecodeState, Session};
use crate::decoder::sample_converter::SampleConverter;
use crate::decoder::symphonia::SymphoniaContainer;
use crate::error::{DecoderError, Result};
use crate::runtime;
use crate::stream::SharedStream;
use tracing::{debug, info, instrument, warn};

/// Streaming decoder producing interleaved 16-bit little-endian PCM.
///
/// A decoder is either closed or holds one open session. All queries answer
/// with a neutral value (`false`, `0`, `None`) while closed.
///
/// # Example
///
/// ```no_run
/// use core_decode::{init_current_thread, shared, FileStream, StreamDecoder};
/// use core_runtime::LoggingConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// init_current_thread(&LoggingConfig::default())?;
///
/// let mut decoder = StreamDecoder::new();
/// decoder.open(shared(FileStream::open("clip.wav")?))?;
///
/// let mut pcm = vec![0u8; decoder.get_data_size() as usize];
/// let written = decoder.decode(&mut pcm)?;
/// assert_eq!(written as u64, decoder.get_decoded_size());
/// # Ok(())
/// # }
/// ```
pub struct StreamDecoder {
    config: DecoderConfig,
    session: Option<Session>,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    /// Create a closed decoder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: DecoderConfig::default(),
            session: None,
        }
    }

    /// Create a closed decoder with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::Config`] if the configuration is invalid.
    pub fn with_config(config: DecoderConfig) -> Result<Self> {
        config.validate().map_err(DecoderError::Config)?;
        Ok(Self {
            config,
            session: None,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open `stream` for decoding.
    ///
    /// Any session already open is closed first. On failure the decoder stays
    /// closed and everything acquired during the attempt is released.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The calling thread was not initialized with
    ///   [`init_current_thread`](crate::runtime::init_current_thread)
    /// - The stream is not open, readable and seekable
    /// - The container is not recognized or holds no supported track
    /// - The codec or format converter cannot be set up
    #[instrument(skip(self, stream))]
    pub fn open(&mut self, stream: SharedStream) -> Result<()> {
        if self.session.is_some() {
            debug!("Reopening: closing current session");
            self.close();
        }

        let registries = runtime::registries()?;
        let container = SymphoniaContainer::open(stream, registries, &self.config)?;

        let track = container.track();
        let converter = if FormatDetector::needs_conversion(track.codec, track.sample_format) {
            debug!("{:?} frames will be converted to 16-bit", track.codec);
            Some(SampleConverter::new(track.channels)?)
        } else {
            None
        };

        let session = Session::new(container, converter);
        info!(
            "Decoder open: {} bytes of PCM available",
            session.total_bytes()
        );
        self.session = Some(session);

        Ok(())
    }

    /// Release the session and the decoder's stream handle. Idempotent.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("Decoder closed");
        }
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Fill `buf` with decoded PCM, returning the number of bytes written.
    ///
    /// Fewer bytes than requested means the end of the track was reached or
    /// decoding failed; check [`is_completed`](Self::is_completed) and
    /// [`is_failed`](Self::is_failed). Once either is set, further calls
    /// return `Ok(0)`. An empty `buf` returns `Ok(0)` without touching the
    /// session.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::NotOpen`] if no stream is open.
    pub fn decode(&mut self, buf: &mut [u8]) -> Result<usize> {
        let session = self.session.as_mut().ok_or(DecoderError::NotOpen)?;

        if buf.is_empty() {
            return Ok(0);
        }

        Ok(session.run(buf))
    }

    /// Return to the start of the track.
    ///
    /// Also recovers a failed or completed session.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::NotOpen`] if no stream is open, or
    /// [`DecoderError::SeekFailed`] if the container cannot seek, in which
    /// case the decoder is left failed.
    #[instrument(skip(self))]
    pub fn rewind(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(DecoderError::NotOpen)?;
        session.rewind()
    }

    /// Reposition to `sample_offset` samples (per channel) into the track.
    ///
    /// Zero is equivalent to [`rewind`](Self::rewind). Decoding resumes at the
    /// frame boundary at or before the target, so the first call after a
    /// reposition may replay a little audio from before it.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::PositionOutOfRange`] without changing state if
    /// `sample_offset` is not less than the sample count,
    /// [`DecoderError::NotOpen`] if no stream is open, or
    /// [`DecoderError::SeekFailed`] if the container cannot seek.
    #[instrument(skip(self))]
    pub fn set_position(&mut self, sample_offset: u64) -> Result<()> {
        let session = self.session.as_mut().ok_or(DecoderError::NotOpen)?;

        if sample_offset == 0 {
            return session.rewind();
        }

        let total = session.total_samples();
        if sample_offset >= total {
            warn!(
                "Position {} is outside the track ({} samples)",
                sample_offset, total
            );
            return Err(DecoderError::PositionOutOfRange {
                offset: sample_offset,
                total,
            });
        }

        session.seek_to_sample(sample_offset)
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Whether a stream is open.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the open session hit a fatal error.
    pub fn is_failed(&self) -> bool {
        self.state() == Some(DecodeState::Failed)
    }

    /// Whether the open session produced all of its data.
    pub fn is_completed(&self) -> bool {
        self.state() == Some(DecodeState::Completed)
    }

    /// Current state of the decode loop, or `None` while closed.
    pub fn state(&self) -> Option<DecodeState> {
        self.session.as_ref().map(Session::state)
    }

    /// Description of the error that failed the session, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.session.as_ref().and_then(Session::last_error)
    }

    // ========================================================================
    // Stream properties
    // ========================================================================

    /// Codec of the selected track.
    pub fn codec(&self) -> Option<SourceCodec> {
        self.session.as_ref().map(|s| s.track().codec)
    }

    /// Whether the open track is 8-bit or 16-bit PCM. `false` when closed.
    pub fn is_pcm(&self) -> bool {
        self.codec().is_some_and(|c| c.is_pcm())
    }

    /// Whether the open track is IMA-ADPCM. `false` when closed.
    pub fn is_ima_adpcm(&self) -> bool {
        self.codec() == Some(SourceCodec::ImaAdpcm)
    }

    /// Whether the open track is MP3. `false` when closed.
    pub fn is_mp3(&self) -> bool {
        self.codec() == Some(SourceCodec::Mp3)
    }

    /// Whether decoded frames pass through the format converter.
    pub fn uses_converter(&self) -> bool {
        self.session.as_ref().is_some_and(Session::uses_converter)
    }

    /// Channel count of the open track, or 0 when closed.
    pub fn get_channel_count(&self) -> u16 {
        self.session
            .as_ref()
            .map_or(0, |s| u16::try_from(s.track().channels).unwrap_or(u16::MAX))
    }

    /// Sample rate in Hz of the open track, or 0 when closed.
    pub fn get_sample_rate(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.track().sample_rate)
    }

    /// Bytes per output sample across all channels.
    pub fn get_sample_size(&self) -> usize {
        self.session.as_ref().map_or(0, Session::sample_size)
    }

    /// Samples per channel in the track.
    pub fn get_sample_count(&self) -> u64 {
        self.session.as_ref().map_or(0, Session::total_samples)
    }

    /// Total bytes of output the track decodes to.
    pub fn get_data_size(&self) -> u64 {
        self.session.as_ref().map_or(0, Session::total_bytes)
    }

    /// Output bytes produced so far, counted from the track start.
    pub fn get_decoded_size(&self) -> u64 {
        self.session.as_ref().map_or(0, Session::decoded_offset)
    }
}

impl std::fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("codec", &self.codec())
            .field("decoded", &self.get_decoded_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_decoder_queries_are_neutral() {
        let decoder = StreamDecoder::new();

        assert!(!decoder.is_open());
        assert!(!decoder.is_failed());
        assert!(!decoder.is_completed());
        assert!(!decoder.is_pcm());
        assert!(!decoder.is_mp3());
        assert!(!decoder.is_ima_adpcm());
        assert!(!decoder.uses_converter());
        assert_eq!(decoder.state(), None);
        assert_eq!(decoder.codec(), None);
        assert_eq!(decoder.get_channel_count(), 0);
        assert_eq!(decoder.get_sample_rate(), 0);
        assert_eq!(decoder.get_sample_size(), 0);
        assert_eq!(decoder.get_sample_count(), 0);
        assert_eq!(decoder.get_data_size(), 0);
        assert_eq!(decoder.get_decoded_size(), 0);
        assert!(decoder.last_error().is_none());
    }

    #[test]
    fn test_closed_decoder_operations_fail() {
        let mut decoder = StreamDecoder::new();
        let mut buf = [0u8; 16];

        assert!(matches!(decoder.decode(&mut buf), Err(DecoderError::NotOpen)));
        assert!(matches!(decoder.rewind(), Err(DecoderError::NotOpen)));
        assert!(matches!(decoder.set_position(10), Err(DecoderError::NotOpen)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut decoder = StreamDecoder::new();
        decoder.close();
        decoder.close();
        assert!(!decoder.is_open());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = DecoderConfig {
            io_buffer_len: 1000,
            ..DecoderConfig::default()
        };
        assert!(matches!(
            StreamDecoder::with_config(config),
            Err(DecoderError::Config(_))
        ));
    }
}
