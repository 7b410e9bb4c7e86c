use std::fs;
use std::io;
use std::process::Command;

use crate::error::{Error, Result};

/// LZMA-alone compression as a capability.
///
/// RomFS file bodies and the rootfs payload are compressed through this
/// trait so the engine never cares where the bytes come from; tests plug in
/// a deterministic in-process encoder.
pub trait LzmaEncode {
    /// Compresses `data` into the classic LZMA-alone format: one properties
    /// byte, 4-byte little-endian dictionary size, 8-byte little-endian
    /// uncompressed size, then the stream.
    fn encode(&self, data: &[u8], dict_bits: u32) -> Result<Vec<u8>>;
}

/// Drives an external LZMA-alone encoder binary.
///
/// The device's loader insists on a concrete uncompressed size in the
/// 13-byte header and refuses the unknown-size marker that library encoders
/// tend to emit, so production encoding shells out to an encoder known to
/// write the classic format.
pub struct AloneEncoder {
    pub command: String,
}

impl Default for AloneEncoder {
    fn default() -> AloneEncoder {
        AloneEncoder { command: "lzma_alone".to_string() }
    }
}

impl LzmaEncode for AloneEncoder {
    fn encode(&self, data: &[u8], dict_bits: u32) -> Result<Vec<u8>> {
        // The scratch directory is removed on every exit path when `dir`
        // drops, including encoder failure.
        let dir = tempfile::tempdir()?;
        let inpath = dir.path().join("in.bin");
        fs::write(&inpath, data)?;

        let output = Command::new(&self.command)
            .arg("e")
            .arg(format!("-d{}", dict_bits))
            .arg("-so")
            .arg(&inpath)
            .output()?;
        if !output.status.success() {
            return Err(Error::EncoderFailed { status: output.status });
        }
        Ok(output.stdout)
    }
}

/// Decompresses an LZMA-alone stream in process.
pub fn lzma_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut input = io::Cursor::new(data);
    let mut output = Vec::new();
    lzma_rs::lzma_decompress(&mut input, &mut output)
        .map_err(|_| Error::DecompressionFailed)?;
    Ok(output)
}

/// In-process stand-in for the external encoder, used by the tests.
///
/// lzma-rs compresses poorly but writes a well-formed LZMA-alone header
/// with a concrete size, which is all the round-trip tests need.
#[cfg(test)]
pub(crate) struct InProcessEncoder;

#[cfg(test)]
impl LzmaEncode for InProcessEncoder {
    fn encode(&self, data: &[u8], _dict_bits: u32) -> Result<Vec<u8>> {
        let options = lzma_rs::compress::Options {
            unpacked_size: lzma_rs::compress::UnpackedSize::WriteToHeader(Some(data.len() as u64)),
        };
        let mut input = io::Cursor::new(data);
        let mut output = Vec::new();
        lzma_rs::lzma_compress_with_options(&mut input, &mut output, &options)?;
        Ok(output)
    }
}
