use byteorder::LittleEndian;

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// # RomFS superblock
///
/// The first 32 bytes of the image, little-endian:
///
/// | Offset | Size | Field      | Description |
/// | ------ | ---- | ---------- | ----------- |
/// | 0x00   | 4    | Magic      | Filesystem identifier. |
/// | 0x04   | 4    | EntryCount | Number of records in the entry table. |
/// | 0x08   | 4    | MaxSize    | Image size ceiling in bytes, a multiple of 32. |
/// | 0x0c   | 4    | DevId      | Conventionally `0x01020304`. |
/// | 0x10   | 16   | Signature  | Opaque vendor signature. |
pub struct Superblock {
    pub magic: u32,
    pub entry_count: u32,
    pub max_size: u32,
    pub dev_id: u32,
    pub signature: [u8; 16],
}

impl Superblock {
    pub const SIZE: usize = 0x20;

    /// Offset of the `MaxSize` field, patched in place when a rebuild grows
    /// past the recorded ceiling.
    pub const MAX_SIZE_OFFSET: usize = 0x8;

    pub fn from(slice: &[u8]) -> Result<Superblock> {
        if slice.len() < Self::SIZE {
            return Err(Error::TruncatedHeader("RomFS superblock"));
        }
        let mut cursor = ByteCursor::<LittleEndian>::new(slice);
        Ok(Superblock {
            magic: cursor.read_u32()?,
            entry_count: cursor.read_u32()?,
            max_size: cursor.read_u32()?,
            dev_id: cursor.read_u32()?,
            signature: cursor.read_block(16)?.try_into().unwrap(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_fields() {
        let mut bytes = vec![0u8; Superblock::SIZE];
        bytes[0..4].copy_from_slice(&0x2f52_4f4du32.to_le_bytes());
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        bytes[8..12].copy_from_slice(&0x0001_0000u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&0x0102_0304u32.to_le_bytes());
        bytes[16..32].copy_from_slice(b"0123456789abcdef");

        let superblock = Superblock::from(&bytes).unwrap();
        assert_eq!(superblock.entry_count, 7);
        assert_eq!(superblock.max_size, 0x10000);
        assert_eq!(superblock.dev_id, 0x01020304);
        assert_eq!(&superblock.signature, b"0123456789abcdef");
    }

    #[test]
    fn rejects_short_buffers() {
        assert!(matches!(
            Superblock::from(&[0u8; 0x10]),
            Err(Error::TruncatedHeader(_))
        ));
    }
}
