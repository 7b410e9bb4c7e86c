use byteorder::LittleEndian;

use crate::cursor::ByteCursor;

/// # Directory record block
///
/// The body of a directory entry is a sequence of variable-length records,
/// each padded out to a whole multiple of 32 bytes:
///
/// | Offset | Size | Field | Description |
/// | ------ | ---- | ----- | ----------- |
/// | 0x00   | 4    | Uid   | Entry table index of the child. |
/// | 0x04   | 4    | -     | Reserved. |
/// | 0x08   | ...  | Name  | NUL-terminated child name. |
///
/// A directory lists itself first (its own uid, name `.`) followed by its
/// parent (`..`); those two mark the block as a directory listing and are
/// not children.
pub struct DirBlock {
    /// Uid from the block's own `.` record.
    pub own_uid: Option<u32>,
    /// Children in listing order, dot entries excluded.
    pub children: Vec<(u32, String)>,
}

impl DirBlock {
    pub const SLOT_SIZE: usize = 0x20;

    /// Iterates records until the block is exhausted.
    ///
    /// Trailing truncation terminates the walk quietly; directory blocks in
    /// the wild are exact, but a damaged image should still list what it
    /// can.
    pub fn from(data: &[u8]) -> DirBlock {
        let mut cursor = ByteCursor::<LittleEndian>::new(data);
        let mut own_uid = None;
        let mut children = Vec::new();

        loop {
            let record = (|| -> std::io::Result<(u32, String)> {
                let uid = cursor.read_u32()?;
                cursor.read_u32()?; // reserved
                let name = cursor.read_cstr()?;
                Ok((uid, name))
            })();
            let (uid, name) = match record {
                Ok(record) => record,
                Err(_) => break,
            };

            if own_uid.is_none() {
                own_uid = Some(uid);
            }
            if name != "." && name != ".." {
                children.push((uid, name.clone()));
            }

            // Pad the record (terminator included) to the next 32-byte slot.
            let used = (8 + name.len()) % Self::SLOT_SIZE;
            let pad = Self::SLOT_SIZE - used;
            if cursor.skip(pad.min(cursor.remaining())).is_err() || cursor.remaining() == 0 {
                break;
            }
        }

        DirBlock { own_uid, children }
    }
}
