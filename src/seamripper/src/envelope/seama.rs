use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use md5::{Digest, Md5};

use crate::cursor::ByteCursor;
use crate::diag::Warning;
use crate::error::{Error, Result};

/// # SEAMA envelope
///
/// The outer container of the firmware, the configuration blob and the
/// language pack. All header words are big-endian:
///
/// | Offset | Size     | Field    | Description |
/// | ------ | -------- | -------- | ----------- |
/// | 0x00   | 4        | Magic    | Always `0x5EA3A417`. |
/// | 0x04   | 4        | MetaLen  | Length of the meta block. |
/// | 0x08   | 4        | DataLen  | Length of the payload. |
/// | 0x0c   | 16       | MD5      | MD5 digest of the payload. |
/// | 0x1c   | MetaLen  | Meta     | Opaque device metadata, preserved on rebuild. |
/// | ...    | DataLen  | Data     | The payload. |
///
/// Anything after the payload is kept as `surplus`; well-formed images have
/// none.
pub struct Seama {
    pub magic: u32,
    pub meta_len: u32,
    pub data_len: u32,
    pub md5: [u8; 16],
    pub meta: Vec<u8>,
    pub data: Vec<u8>,
    pub surplus: Vec<u8>,
}

impl Seama {
    pub const MAGIC: u32 = 0x5ea3_a417;
    pub const HEADER_SIZE: usize = 0x1c;

    /// Splits a buffer into header, meta, payload and surplus.
    ///
    /// Decoding succeeds on any buffer long enough to hold the header;
    /// everything else is a matter for [`Seama::verify`].
    pub fn decode(buffer: &[u8]) -> Result<Seama> {
        if buffer.len() < Self::HEADER_SIZE {
            return Err(Error::TruncatedHeader("SEAMA"));
        }

        let mut cursor = ByteCursor::<BigEndian>::new(buffer);
        let magic = cursor.read_u32()?;
        let meta_len = cursor.read_u32()?;
        let data_len = cursor.read_u32()?;
        let md5: [u8; 16] = cursor.read_block(16)?.try_into().unwrap();

        // Slices are clamped: a truncated payload still decodes and gets
        // flagged by verify().
        let meta_end = (Self::HEADER_SIZE + meta_len as usize).min(buffer.len());
        let data_end = (meta_end + data_len as usize).min(buffer.len());

        Ok(Seama {
            magic,
            meta_len,
            data_len,
            md5,
            meta: buffer[Self::HEADER_SIZE..meta_end].to_vec(),
            data: buffer[meta_end..data_end].to_vec(),
            surplus: buffer[data_end..].to_vec(),
        })
    }

    /// Checks the envelope invariants and returns every violation found.
    pub fn verify(&self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        if self.magic != Self::MAGIC {
            warnings.push(Warning::SeamaMagic { found: self.magic });
        }
        if !self.surplus.is_empty() {
            warnings.push(Warning::SurplusData { len: self.surplus.len() });
        }
        if self.data.len() < self.data_len as usize {
            warnings.push(Warning::ShortData {
                have: self.data.len(),
                declared: self.data_len,
            });
        }
        let digest: [u8; 16] = Md5::digest(&self.data).into();
        if digest != self.md5 {
            warnings.push(Warning::Md5Mismatch);
        }
        warnings
    }

    /// Emits a fresh envelope around `data`, carrying `meta` over unchanged.
    ///
    /// The digest and both length words are recomputed; nothing depends on a
    /// previously decoded buffer.
    pub fn encode(data: &[u8], meta: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::HEADER_SIZE + meta.len() + data.len());
        let mut word = [0u8; 4];
        BigEndian::write_u32(&mut word, Self::MAGIC);
        out.extend_from_slice(&word);
        BigEndian::write_u32(&mut word, meta.len() as u32);
        out.extend_from_slice(&word);
        BigEndian::write_u32(&mut word, data.len() as u32);
        out.extend_from_slice(&word);
        let digest: [u8; 16] = Md5::digest(data).into();
        out.extend_from_slice(&digest);
        out.extend_from_slice(meta);
        out.extend_from_slice(data);
        out
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl fmt::Display for Seama {
    /// Field dump in the style of the inspection tools: hex for integers and
    /// digests, decoded text for the meta block.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:15}: {:#x}", "magic", self.magic)?;
        writeln!(f, "{:15}: {:#x}", "meta_len", self.meta_len)?;
        writeln!(f, "{:15}: {:#x}", "data_len", self.data_len)?;
        writeln!(f, "{:15}: {}", "md5", hex(&self.md5))?;
        write!(f, "{:15}: {}", "meta", String::from_utf8_lossy(&self.meta))
    }
}
