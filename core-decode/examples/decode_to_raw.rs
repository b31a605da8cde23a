//! # Decode To Raw PCM Example
//!
//! Decodes an audio file into a headerless 16-bit little-endian PCM file,
//! pulling output through a small fixed buffer the way an audio mixer would.
//!
//! Run with: `cargo run --example decode_to_raw --package core-decode -- <input> <output.raw>`

use core_decode::{init_current_thread, shared, FileStream, StreamDecoder};
use core_runtime::{LogLevel, LoggingConfig};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

/// Size of the mixer-style pull buffer.
const CHUNK_BYTES: usize = 4096;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        eprintln!("usage: decode_to_raw <input> <output.raw>");
        std::process::exit(2);
    };

    init_current_thread(&LoggingConfig::default().with_level(LogLevel::Info))?;

    let mut decoder = StreamDecoder::new();
    decoder.open(shared(FileStream::open(&input)?))?;

    println!("Input:       {}", input);
    println!("Codec:       {:?}", decoder.codec());
    println!("Channels:    {}", decoder.get_channel_count());
    println!("Sample rate: {} Hz", decoder.get_sample_rate());
    println!("Samples:     {}", decoder.get_sample_count());
    println!("PCM bytes:   {}", decoder.get_data_size());

    let mut writer = BufWriter::new(File::create(&output)?);
    let mut buf = vec![0u8; CHUNK_BYTES];
    let started = Instant::now();

    loop {
        let written = decoder.decode(&mut buf)?;
        if written == 0 {
            break;
        }
        writer.write_all(&buf[..written])?;
    }
    writer.flush()?;

    if decoder.is_failed() {
        eprintln!(
            "Decoding stopped early: {}",
            decoder.last_error().unwrap_or("unknown error")
        );
    }

    println!(
        "Wrote {} bytes to {} in {:.2?}",
        decoder.get_decoded_size(),
        output,
        started.elapsed()
    );

    decoder.close();
    Ok(())
}
