//! Shared fixtures for core-decode integration tests.

#![allow(dead_code)]

use core_decode::{init_current_thread, shared, MemoryStream, SharedStream, StreamDecoder};
use core_runtime::{LogLevel, LoggingConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Cursor;

/// Bytes per mono IMA-ADPCM block.
pub const IMA_BLOCK_ALIGN: usize = 256;
/// Samples decoded from one mono IMA-ADPCM block: the header sample plus
/// two per data byte.
pub const IMA_SAMPLES_PER_BLOCK: usize = 505;

/// MPEG-1 Layer III, 128 kbps, 44100 Hz, mono, no padding.
const MP3_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];
const MP3_FRAME_LEN: usize = 417;
/// Samples decoded from one MPEG-1 Layer III frame.
pub const MP3_SAMPLES_PER_FRAME: usize = 1152;

/// Initialize the decoder runtime for the calling test thread.
pub fn init() {
    let logging = LoggingConfig::default().with_level(LogLevel::Warn);
    init_current_thread(&logging).expect("decoder runtime init");
}

/// Deterministic 8-bit sample pattern.
pub fn ramp_i8(count: usize) -> Vec<i8> {
    (0..count).map(|i| ((i * 7) % 256) as u8 as i8).collect()
}

/// Deterministic 16-bit sample pattern.
pub fn ramp_i16(count: usize) -> Vec<i16> {
    (0..count)
        .map(|i| ((i as i32 * 331) % 65536 - 32768) as i16)
        .collect()
}

/// In-memory 8-bit PCM WAV file.
pub fn wav_u8(channels: u16, sample_rate: u32, samples: &[i8]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// In-memory 16-bit PCM WAV file. `samples` are interleaved.
pub fn wav_i16(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Mono IMA-ADPCM blocks with seeded random content.
///
/// The block at index `corrupt`, if any, carries an out-of-range step index
/// and is rejected by the codec. Every other block matches the uncorrupted
/// output for the same seed.
pub fn ima_blocks(count: usize, seed: u64, corrupt: Option<usize>) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(count * IMA_BLOCK_ALIGN);

    for block in 0..count {
        let predictor: i16 = rng.gen_range(-8000..8000);
        let step_index: u8 = rng.gen_range(0..=88);
        data.extend_from_slice(&predictor.to_le_bytes());
        data.push(if corrupt == Some(block) { 0xFF } else { step_index });
        data.push(0);
        data.extend((0..IMA_BLOCK_ALIGN - 4).map(|_| rng.gen::<u8>()));
    }
    data
}

fn riff_chunk(out: &mut Vec<u8>, id: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
}

/// In-memory mono IMA-ADPCM WAV file over `blocks` from [`ima_blocks`].
pub fn wav_ima_adpcm(sample_rate: u32, blocks: &[u8]) -> Vec<u8> {
    let block_count = blocks.len() / IMA_BLOCK_ALIGN;
    let sample_count = (block_count * IMA_SAMPLES_PER_BLOCK) as u32;
    let byte_rate = sample_rate * IMA_BLOCK_ALIGN as u32 / IMA_SAMPLES_PER_BLOCK as u32;

    let mut fmt = Vec::with_capacity(20);
    fmt.extend_from_slice(&0x0011u16.to_le_bytes()); // WAVE_FORMAT_IMA_ADPCM
    fmt.extend_from_slice(&1u16.to_le_bytes());
    fmt.extend_from_slice(&sample_rate.to_le_bytes());
    fmt.extend_from_slice(&byte_rate.to_le_bytes());
    fmt.extend_from_slice(&(IMA_BLOCK_ALIGN as u16).to_le_bytes());
    fmt.extend_from_slice(&4u16.to_le_bytes());
    fmt.extend_from_slice(&2u16.to_le_bytes()); // extension size
    fmt.extend_from_slice(&(IMA_SAMPLES_PER_BLOCK as u16).to_le_bytes());

    let mut body = b"WAVE".to_vec();
    riff_chunk(&mut body, b"fmt ", &fmt);
    riff_chunk(&mut body, b"fact", &sample_count.to_le_bytes());
    riff_chunk(&mut body, b"data", blocks);

    let mut out = Vec::with_capacity(body.len() + 8);
    riff_chunk(&mut out, b"RIFF", &body);
    out
}

/// Raw MP3 stream of `frames` silent frames with no Xing or VBRI header.
pub fn mp3_silence(frames: usize) -> Vec<u8> {
    let mut frame = vec![0u8; MP3_FRAME_LEN];
    frame[..4].copy_from_slice(&MP3_HEADER);
    frame.repeat(frames)
}

/// Output bytes expected for 8-bit input: each sample widened to 16 bits.
pub fn widened_u8(samples: &[i8]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| ((s as i16) << 8).to_le_bytes())
        .collect()
}

/// Output bytes expected for 16-bit input: the samples themselves.
pub fn le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

pub fn memory(bytes: Vec<u8>) -> SharedStream {
    shared(MemoryStream::new(bytes))
}

/// Open a decoder over an in-memory file.
pub fn open_decoder(bytes: Vec<u8>) -> StreamDecoder {
    let mut decoder = StreamDecoder::new();
    decoder.open(memory(bytes)).expect("open decoder");
    decoder
}

/// Decode everything that remains, in chunks of `chunk` bytes.
pub fn decode_all(decoder: &mut StreamDecoder, chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];
    loop {
        let written = decoder.decode(&mut buf).unwrap();
        if written == 0 {
            break;
        }
        out.extend_from_slice(&buf[..written]);
    }
    out
}
