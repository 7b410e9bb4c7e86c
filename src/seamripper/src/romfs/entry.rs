use byteorder::{ByteOrder, LittleEndian};

use crate::cursor::ByteCursor;
use crate::error::Result;

/// # RomFS entry record
///
/// One 32-byte record per file or directory, little-endian:
///
/// | Offset | Size | Field            | Description |
/// | ------ | ---- | ---------------- | ----------- |
/// | 0x00   | 4    | Type             | Bit 0 marks a directory; see the masks below. |
/// | 0x04   | 4    | Nlink            | Link count. |
/// | 0x08   | 2+2  | Uid/Gid          | Owner and group. |
/// | 0x0c   | 4    | Size             | On-disk byte length of the body. |
/// | 0x10   | 4    | Ctime            | Creation time in seconds. |
/// | 0x14   | 4    | Offset           | Absolute offset of the body in the image. |
/// | 0x18   | 4    | SizeDecompressed | 0 means stored raw, otherwise the LZMA uncompressed length. |
/// | 0x1c   | 4    | EntryUid         | Four ASCII decimal digits indexing the entry table. |
pub struct Entry {
    pub type_flags: u32,
    pub nlink: u32,
    pub user_id: u16,
    pub group_id: u16,
    pub size: u32,
    pub ctime: u32,
    pub offset: u32,
    pub size_decompressed: u32,
    pub uid: u32,
}

impl Entry {
    pub const SIZE: usize = 0x20;

    pub const DIR_STRUCT_MASK: u32 = 0x0000_0001;
    pub const DATA_MASK: u32 = 0x0000_0008;
    // This is wrong - probably these are permissions
    pub const COMPRESSED_MASK: u32 = 0x005b_0000;

    pub fn from(slice: &[u8; Self::SIZE]) -> Result<Entry> {
        let mut cursor = ByteCursor::<LittleEndian>::new(slice);
        Ok(Entry {
            type_flags: cursor.read_u32()?,
            nlink: cursor.read_u32()?,
            user_id: cursor.read_u16()?,
            group_id: cursor.read_u16()?,
            size: cursor.read_u32()?,
            ctime: cursor.read_u32()?,
            offset: cursor.read_u32()?,
            size_decompressed: cursor.read_u32()?,
            uid: parse_uid(cursor.read_block(4)?)?,
        })
    }

    pub fn is_directory(&self) -> bool {
        self.type_flags & Self::DIR_STRUCT_MASK != 0
    }

    /// Writes the mutable fields back into a 32-byte record slot.
    ///
    /// The owner, group and the ASCII uid digits are left untouched.
    pub fn patch(&self, slot: &mut [u8; Self::SIZE]) {
        LittleEndian::write_u32(&mut slot[0x0..0x4], self.type_flags);
        LittleEndian::write_u32(&mut slot[0x4..0x8], self.nlink);
        LittleEndian::write_u32(&mut slot[0xc..0x10], self.size);
        LittleEndian::write_u32(&mut slot[0x10..0x14], self.ctime);
        LittleEndian::write_u32(&mut slot[0x14..0x18], self.offset);
        LittleEndian::write_u32(&mut slot[0x18..0x1c], self.size_decompressed);
    }
}

/// Entry uids are stored as four ASCII decimal digits, e.g. `b"0017"`.
fn parse_uid(digits: &[u8]) -> Result<u32> {
    let text = std::str::from_utf8(digits)
        .map_err(|_| invalid_uid(digits))?;
    text.trim_start().parse().map_err(|_| invalid_uid(digits))
}

fn invalid_uid(digits: &[u8]) -> crate::Error {
    crate::Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("entry uid is not decimal: {:?}", digits),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uid: &[u8; 4]) -> [u8; Entry::SIZE] {
        let mut bytes = [0u8; Entry::SIZE];
        bytes[0..4].copy_from_slice(&(Entry::DATA_MASK | Entry::COMPRESSED_MASK).to_le_bytes());
        bytes[4..8].copy_from_slice(&1u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&0x100u32.to_le_bytes());
        bytes[16..20].copy_from_slice(&1_600_000_000u32.to_le_bytes());
        bytes[20..24].copy_from_slice(&0x400u32.to_le_bytes());
        bytes[24..28].copy_from_slice(&0x1000u32.to_le_bytes());
        bytes[28..32].copy_from_slice(uid);
        bytes
    }

    #[test]
    fn decodes_a_record() {
        let entry = Entry::from(&record(b"0017")).unwrap();
        assert_eq!(entry.uid, 17);
        assert_eq!(entry.size, 0x100);
        assert_eq!(entry.offset, 0x400);
        assert_eq!(entry.size_decompressed, 0x1000);
        assert!(!entry.is_directory());
    }

    #[test]
    fn rejects_non_decimal_uid() {
        assert!(Entry::from(&record(b"00x7")).is_err());
    }

    #[test]
    fn patch_preserves_owner_and_uid_digits() {
        let mut slot = record(b"0003");
        let mut entry = Entry::from(&slot).unwrap();
        entry.size = 0x42;
        entry.offset = 0x2000;
        entry.size_decompressed = 0;
        entry.patch(&mut slot);

        let reread = Entry::from(&slot).unwrap();
        assert_eq!(reread.size, 0x42);
        assert_eq!(reread.offset, 0x2000);
        assert_eq!(reread.size_decompressed, 0);
        assert_eq!(reread.uid, 3);
        assert_eq!(&slot[28..32], b"0003");
    }
}
