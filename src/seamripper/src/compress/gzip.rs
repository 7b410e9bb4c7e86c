use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};

use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const XFL_OFFSET: usize = 8;
const OS_OFFSET: usize = 9;
const OS_UNIX: u8 = 3;

/// Decompresses a gzipped configuration blob.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 2 || data[..2] != GZIP_MAGIC {
        let found = data.iter().take(2).fold(0u32, |acc, &b| acc << 8 | u32::from(b));
        return Err(Error::BadMagic { format: "gzip", found });
    }
    let mut output = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut output)
        .map_err(|_| Error::DecompressionFailed)?;
    Ok(output)
}

/// Recompresses a configuration blob with the member header the device
/// accepts: zero MTIME, `XFL` forced to 0 where it would read 2 or 4, and
/// the OS byte set to Unix.
pub fn compress_for_device(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzBuilder::new().mtime(0).write(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    let mut output = encoder.finish()?;
    if output[XFL_OFFSET] == 2 || output[XFL_OFFSET] == 4 {
        output[XFL_OFFSET] = 0;
    }
    output[OS_OFFSET] = OS_UNIX;
    Ok(output)
}
