//! # Decode State Machine
//!
//! Drives one open session from container packets to 16-bit output bytes.
//! Progress survives across `decode` calls: when the caller's buffer fills
//! mid-frame, the next call resumes exactly where the previous one stopped.
//!
//! ```text
//! ReadPacket ──▶ SendPacket ──▶ ReceiveFrame ──▶ OutputFrame ──┐
//!     ▲              │              │    │                     │
//!     └──────────────┘              │    └──▶ ConvertSamples ──┤
//!     ▲                             │                          │
//!     └─────────────────────────────┴──────────────────────────┘
//! ```
//!
//! `Rewind`, `Failed` and `Completed` sit outside the main loop.

use crate::decoder::sample_converter::{
    frame_channels, interleave_s16le, SampleConverter, OUTPUT_BYTES_PER_SAMPLE,
};
use crate::decoder::symphonia::{
    PacketRead, ReceiveStatus, SendStatus, SymphoniaContainer, TrackInfo,
};
use crate::error::{DecoderError, Result};
use serde::{Deserialize, Serialize};
use symphonia::core::formats::Packet;
use tracing::{debug, error, info, trace};

/// Where an open decoder is in its decode loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeState {
    /// Pull the next packet from the container.
    ReadPacket,
    /// Feed the pending packet (or the drain signal) to the codec.
    SendPacket,
    /// Collect a decoded frame from the codec.
    ReceiveFrame,
    /// Drain the format converter into the output buffer.
    ConvertSamples,
    /// Copy the current 16-bit frame into the output buffer.
    OutputFrame,
    /// Return to the start of the track.
    Rewind,
    /// A fatal error occurred; only a rewind or reposition recovers.
    Failed,
    /// All decodable data has been produced.
    Completed,
}

impl DecodeState {
    /// `true` for [`DecodeState::Failed`] and [`DecodeState::Completed`].
    pub fn is_terminal(&self) -> bool {
        matches!(self, DecodeState::Failed | DecodeState::Completed)
    }
}

/// Current 16-bit frame and how much of it has been handed out.
#[derive(Debug, Default)]
struct FrameWindow {
    bytes: Vec<u8>,
    offset: usize,
}

impl FrameWindow {
    fn clear(&mut self) {
        self.bytes.clear();
        self.offset = 0;
    }

    fn remaining(&self) -> &[u8] {
        &self.bytes[self.offset..]
    }
}

/// One open decoding session.
pub(crate) struct Session {
    container: SymphoniaContainer,
    converter: Option<SampleConverter>,
    state: DecodeState,
    pending_packet: Option<Packet>,
    window: FrameWindow,
    frame_pending: bool,
    draining: bool,
    flushing: bool,
    decoded_offset: u64,
    sample_size: usize,
    total_samples: u64,
    total_bytes: u64,
    last_error: Option<String>,
}

impl Session {
    /// Wrap an opened container. A track with no decodable data starts out
    /// completed.
    pub(crate) fn new(container: SymphoniaContainer, converter: Option<SampleConverter>) -> Self {
        let track = container.track();
        let sample_size = track.channels * OUTPUT_BYTES_PER_SAMPLE;
        let total_samples = track.sample_count;
        let total_bytes = total_samples.saturating_mul(sample_size as u64);

        let state = if total_bytes == 0 {
            info!("Track has no decodable data");
            DecodeState::Completed
        } else {
            DecodeState::ReadPacket
        };

        Self {
            container,
            converter,
            state,
            pending_packet: None,
            window: FrameWindow::default(),
            frame_pending: false,
            draining: false,
            flushing: false,
            decoded_offset: 0,
            sample_size,
            total_samples,
            total_bytes,
            last_error: None,
        }
    }

    pub(crate) fn track(&self) -> &TrackInfo {
        self.container.track()
    }

    pub(crate) fn state(&self) -> DecodeState {
        self.state
    }

    pub(crate) fn uses_converter(&self) -> bool {
        self.converter.is_some()
    }

    pub(crate) fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub(crate) fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub(crate) fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub(crate) fn decoded_offset(&self) -> u64 {
        self.decoded_offset
    }

    pub(crate) fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Run the state machine until `out` is full or a terminal state is reached.
    ///
    /// Output never goes past the track's data size; reaching it completes the
    /// session. Returns the number of bytes written, including any written
    /// before a failure.
    pub(crate) fn run(&mut self, out: &mut [u8]) -> usize {
        let remaining = self.total_bytes.saturating_sub(self.decoded_offset);
        let limit = usize::try_from(remaining).map_or(out.len(), |r| r.min(out.len()));
        let out = &mut out[..limit];

        let mut written = 0;
        while written < out.len() {
            let before = self.state;
            match self.state {
                DecodeState::ReadPacket => self.read_packet(),
                DecodeState::SendPacket => self.send_packet(),
                DecodeState::ReceiveFrame => self.receive_frame(),
                DecodeState::ConvertSamples => written += self.convert_samples(&mut out[written..]),
                DecodeState::OutputFrame => written += self.output_frame(&mut out[written..]),
                // Rewind is only held inside `rewind()`
                DecodeState::Rewind | DecodeState::Failed | DecodeState::Completed => break,
            }

            if self.state != before {
                trace!("Decode state {:?} -> {:?}", before, self.state);
            }
        }

        self.decoded_offset += written as u64;

        if self.decoded_offset >= self.total_bytes && self.state != DecodeState::Failed {
            if self.state != DecodeState::Completed {
                debug!("Reached end of track data at {} bytes", self.decoded_offset);
            }
            self.state = DecodeState::Completed;
        }

        written
    }

    /// Reposition to `sample_offset` samples past the track start.
    ///
    /// Clears all resumption state and restarts at `ReadPacket`. On failure
    /// the session enters `Failed`.
    pub(crate) fn seek_to_sample(&mut self, sample_offset: u64) -> Result<()> {
        let ts = self.container.track().ts_for_sample(sample_offset);

        self.pending_packet = None;
        self.window.clear();
        self.frame_pending = false;
        self.draining = false;
        self.flushing = false;
        if let Some(converter) = self.converter.as_mut() {
            converter.reset();
        }

        match self.container.seek(ts) {
            Ok(_) => {
                self.decoded_offset = sample_offset.saturating_mul(self.sample_size as u64);
                self.last_error = None;
                self.state = if self.decoded_offset >= self.total_bytes {
                    DecodeState::Completed
                } else {
                    DecodeState::ReadPacket
                };
                debug!(
                    "Positioned at sample {} ({} bytes decoded)",
                    sample_offset, self.decoded_offset
                );
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Enter `Rewind` and return to the start of the track.
    pub(crate) fn rewind(&mut self) -> Result<()> {
        self.state = DecodeState::Rewind;
        self.seek_to_sample(0)
    }

    fn fail(&mut self, err: &DecoderError) {
        error!("Decoding failed in state {:?}: {}", self.state, err);
        self.last_error = Some(err.to_string());
        self.state = DecodeState::Failed;
    }

    fn read_packet(&mut self) {
        match self.container.read_packet() {
            Ok(PacketRead::Packet(packet)) => {
                self.pending_packet = Some(packet);
                self.state = DecodeState::SendPacket;
            }
            Ok(PacketRead::Skipped) => {}
            Ok(PacketRead::EndOfStream) => {
                self.pending_packet = None;
                self.draining = true;
                self.state = DecodeState::SendPacket;
            }
            Err(e) => self.fail(&e),
        }
    }

    fn send_packet(&mut self) {
        let packet = if self.draining {
            None
        } else {
            self.pending_packet.take()
        };

        match self.container.send_packet(packet.as_ref()) {
            Ok(SendStatus::Accepted) => self.state = DecodeState::ReceiveFrame,
            Ok(SendStatus::NeedsInput) if self.draining => self.fail(&DecoderError::DecodeFailed(
                "codec requested input while draining".to_string(),
            )),
            Ok(SendStatus::NeedsInput) => self.state = DecodeState::ReadPacket,
            Ok(SendStatus::EndOfStream) => self.state = DecodeState::Completed,
            Err(e) => self.fail(&e),
        }
    }

    fn receive_frame(&mut self) {
        match self.container.receive_frame() {
            ReceiveStatus::Frame if self.converter.is_some() => {
                self.frame_pending = true;
                self.state = DecodeState::ConvertSamples;
            }
            ReceiveStatus::Frame => {
                let expected = self.container.track().channels;
                let frame = self.container.frame();
                let channels = frame_channels(&frame);

                if channels == expected {
                    self.window.clear();
                    interleave_s16le(&frame, &mut self.window.bytes);
                    self.state = DecodeState::OutputFrame;
                } else {
                    drop(frame);
                    self.fail(&DecoderError::DecodeFailed(format!(
                        "frame has {} channels, track declares {}",
                        channels, expected
                    )));
                }
            }
            ReceiveStatus::NeedsInput => self.state = DecodeState::ReadPacket,
            ReceiveStatus::EndOfStream if self.converter.is_some() => {
                self.flushing = true;
                self.state = DecodeState::ConvertSamples;
            }
            ReceiveStatus::EndOfStream => self.state = DecodeState::Completed,
        }
    }

    fn convert_samples(&mut self, out: &mut [u8]) -> usize {
        let Some(converter) = self.converter.as_mut() else {
            self.fail(&DecoderError::ConversionFailed(
                "no converter configured".to_string(),
            ));
            return 0;
        };

        let result = if self.frame_pending {
            let frame = self.container.frame();
            converter.convert(Some(&frame), out)
        } else {
            converter.convert(None, out)
        };
        self.frame_pending = false;

        match result {
            Ok(0) if self.flushing => {
                self.state = DecodeState::Completed;
                0
            }
            Ok(0) => {
                self.state = DecodeState::ReceiveFrame;
                0
            }
            Ok(count) => count,
            Err(e) => {
                self.fail(&e);
                0
            }
        }
    }

    fn output_frame(&mut self, out: &mut [u8]) -> usize {
        let remaining = self.window.remaining();
        let count = remaining.len().min(out.len());
        out[..count].copy_from_slice(&remaining[..count]);
        self.window.offset += count;

        if self.window.remaining().is_empty() {
            self.state = DecodeState::ReceiveFrame;
        }

        count
    }
}
