use std::io::{Error, ErrorKind, Result};
use std::marker::PhantomData;

use byteorder::ByteOrder;

fn eof() -> Error {
    Error::new(ErrorKind::UnexpectedEof, "read past end of buffer")
}

/// A positioned view over a byte buffer with a fixed byte order.
///
/// All container layers use this for their fixed-layout records: SEAMA,
/// uImage and sealpac are big-endian, RomFS is little-endian. Reads past the
/// end fail with `UnexpectedEof`; nothing wraps.
pub struct ByteCursor<'a, E: ByteOrder> {
    data: &'a [u8],
    index: usize,
    endian: PhantomData<E>,
}

impl<'a, E: ByteOrder> ByteCursor<'a, E> {
    pub fn new(data: &'a [u8]) -> ByteCursor<'a, E> {
        ByteCursor { data, index: 0, endian: PhantomData }
    }

    pub fn position(&self) -> usize {
        self.index
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(eof());
        }
        let block = &self.data[self.index..self.index + count];
        self.index += count;
        Ok(block)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(E::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(E::read_u32(self.take(4)?))
    }

    /// Reads a raw block of `count` bytes.
    pub fn read_block(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    /// Reads up to (and not including) the next NUL byte.
    ///
    /// The terminator is left in place; record formats that pad past it
    /// account for it in their own padding arithmetic.
    pub fn read_cstr(&mut self) -> Result<String> {
        let rest = &self.data[self.index..];
        let len = rest.iter().position(|&b| b == 0).ok_or_else(eof)?;
        self.index += len;
        Ok(String::from_utf8_lossy(&rest[..len]).into_owned())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }
}

/// Writes a u32 at an absolute offset, for patching fields in place.
pub fn write_u32_at<E: ByteOrder>(data: &mut [u8], offset: usize, value: u32) -> Result<()> {
    if offset + 4 > data.len() {
        return Err(eof());
    }
    E::write_u32(&mut data[offset..offset + 4], value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, LittleEndian};

    #[test]
    fn reads_track_the_offset() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xaa, b'h', b'i', 0x00, 0xbb];
        let mut cursor = ByteCursor::<BigEndian>::new(&data);

        assert_eq!(cursor.read_u16().unwrap(), 0x0102);
        assert_eq!(cursor.read_u16().unwrap(), 0x0304);
        assert_eq!(cursor.read_block(1).unwrap(), &[0xaa]);
        assert_eq!(cursor.read_cstr().unwrap(), "hi");
        // read_cstr stops before the terminator
        assert_eq!(cursor.position(), 7);
        cursor.skip(1).unwrap();
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn endianness_is_a_type_parameter() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut big = ByteCursor::<BigEndian>::new(&data);
        let mut little = ByteCursor::<LittleEndian>::new(&data);
        assert_eq!(big.read_u32().unwrap(), 0x01020304);
        assert_eq!(little.read_u32().unwrap(), 0x04030201);
    }

    #[test]
    fn reading_past_the_end_fails() {
        let mut cursor = ByteCursor::<LittleEndian>::new(&[0x01, 0x02]);
        let err = cursor.read_u32().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        // a failed read does not move the cursor
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn patching_a_word_in_place() {
        let mut data = vec![0u8; 8];
        write_u32_at::<LittleEndian>(&mut data, 4, 0xdeadbeef).unwrap();
        assert_eq!(&data[4..], &[0xef, 0xbe, 0xad, 0xde]);
        assert!(write_u32_at::<LittleEndian>(&mut data, 6, 0).is_err());
    }
}
