use std::borrow::Cow;
use std::str;

/// A little-endian byte buffer meant for reading PE images and metadata.
///
/// Example usage:
///
/// ```
/// use std::borrow::Cow;
/// let mut bb = enumgen_buffer::ByteBuffer::new(&[0x34, 0x12, 0x81, 0x02, b'#', b'~', 0]);
/// assert_eq!(bb.read_u16(), Ok(0x1234));
/// assert_eq!(bb.read_compressed_uint(), Ok(0x102));
/// assert_eq!(bb.read_string(), Ok(Cow::Borrowed("#~")));
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &[u8]) -> ByteBuffer {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Move the read position to an absolute offset. Seeking to the very end
    /// is allowed, seeking past it is not.
    pub fn seek(&mut self, index: usize) -> Result<(), ()> {
        if index > self.data.len() {
            Err(())
        } else {
            self.index = index;
            Ok(())
        }
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, ()> {
        if self.index >= self.data.len() {
            Err(())
        } else {
            let value = self.data[self.index];
            self.index += 1;
            Ok(value)
        }
    }

    /// Try to read `len` raw bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ()> {
        match self.index.checked_add(len) {
            Some(end) if end <= self.data.len() => {
                let value = &self.data[self.index..end];
                self.index = end;
                Ok(value)
            }
            _ => Err(()),
        }
    }

    /// Try to read a little-endian unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16, ()> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Try to read a little-endian unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32, ()> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Try to read a little-endian unsigned 64-bit integer.
    pub fn read_u64(&mut self) -> Result<u64, ()> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Try to read an ECMA-335 compressed unsigned integer (II.23.2). These
    /// are big-endian and take 1, 2 or 4 bytes depending on the top bits of
    /// the first byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32, ()> {
        let first = self.read_byte()? as u32;

        if first & 0x80 == 0 {
            Ok(first)
        } else if first & 0xC0 == 0x80 {
            let second = self.read_byte()? as u32;
            Ok(((first & 0x3F) << 8) | second)
        } else if first & 0xE0 == 0xC0 {
            let rest = self.read_bytes(3)?;
            Ok(((first & 0x1F) << 24)
                | ((rest[0] as u32) << 16)
                | ((rest[1] as u32) << 8)
                | rest[2] as u32)
        } else {
            Err(())
        }
    }

    /// Try to read a null-terminated UTF-8 string starting at the current
    /// index. This string is returned as a slice so it just aliases the
    /// underlying memory.
    pub fn read_string(&mut self) -> Result<Cow<'a, str>, ()> {
        let start = self.index;

        while self.index < self.data.len() {
            if self.data[self.index] == 0 {
                self.index += 1;
                return Ok(String::from_utf8_lossy(&self.data[start..self.index - 1]));
            }

            self.index += 1;
        }

        Err(())
    }
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(0));
    assert_eq!(read(&[254]), Ok(254));
    assert_eq!(read(&[255]), Ok(255));
}

#[test]
fn read_bytes() {
    let read = |bytes, len| ByteBuffer::new(bytes).read_bytes(len);
    assert_eq!(read(&[], 0), Ok(vec![].as_slice()));
    assert_eq!(read(&[], 1), Err(()));
    assert_eq!(read(&[0], 1), Ok(vec![0].as_slice()));
    assert_eq!(read(&[0], usize::MAX), Err(()));

    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3), Ok(vec![1, 2, 3].as_slice()));
    assert_eq!(bb.read_bytes(2), Ok(vec![4, 5].as_slice()));
    assert_eq!(bb.read_bytes(1), Err(()));
}

#[test]
fn read_fixed_width() {
    let mut bb = ByteBuffer::new(&[
        0x4D, 0x5A, 0x50, 0x45, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    ]);
    assert_eq!(bb.read_u16(), Ok(0x5A4D));
    assert_eq!(bb.read_u32(), Ok(0x4550));
    assert_eq!(bb.read_u64(), Ok(0x0807060504030201));
    assert_eq!(bb.read_u16(), Err(()));
}

#[test]
fn read_compressed_uint() {
    let read = |bytes| ByteBuffer::new(bytes).read_compressed_uint();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0x03]), Ok(0x03));
    assert_eq!(read(&[0x7F]), Ok(0x7F));
    assert_eq!(read(&[0x80, 0x80]), Ok(0x80));
    assert_eq!(read(&[0xAE, 0x57]), Ok(0x2E57));
    assert_eq!(read(&[0xBF, 0xFF]), Ok(0x3FFF));
    assert_eq!(read(&[0xC0, 0x00, 0x40, 0x00]), Ok(0x4000));
    assert_eq!(read(&[0xDF, 0xFF, 0xFF, 0xFF]), Ok(0x1FFFFFFF));
    assert_eq!(read(&[0x80]), Err(()));
    assert_eq!(read(&[0xE0]), Err(()));
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert_eq!(read(&[]), Err(()));
    assert_eq!(read(&[0]), Ok(Cow::Borrowed("")));
    assert_eq!(read(&[97]), Err(()));
    assert_eq!(read(&[97, 0]), Ok(Cow::Borrowed("a")));
    assert_eq!(read(&[97, 98, 99, 0]), Ok(Cow::Borrowed("abc")));
}

#[test]
fn seek() {
    let mut bb = ByteBuffer::new(&[1, 2, 3]);
    assert_eq!(bb.seek(2), Ok(()));
    assert_eq!(bb.read_byte(), Ok(3));
    assert_eq!(bb.seek(3), Ok(()));
    assert_eq!(bb.read_byte(), Err(()));
    assert_eq!(bb.seek(4), Err(()));
    assert_eq!(bb.index(), 3);
}

/// A little-endian byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = enumgen_buffer::ByteBufferMut::new();
/// bb.write_u16(0x5A4D);
/// bb.write_compressed_uint(0x2E57).unwrap();
/// bb.write_string("#~");
/// assert_eq!(bb.data(), [0x4D, 0x5A, 0xAE, 0x57, b'#', b'~', 0]);
/// ```
///
#[derive(Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Borrow everything written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    /// Write `count` zero bytes to the end of the buffer.
    pub fn write_zeros(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, 0);
    }

    /// Pad with zero bytes until the length is a multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        let rem = self.data.len() % alignment;
        if rem != 0 {
            self.write_zeros(alignment - rem);
        }
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an ECMA-335 compressed unsigned integer. Values above
    /// `0x1FFFFFFF` cannot be represented.
    pub fn write_compressed_uint(&mut self, value: u32) -> Result<(), ()> {
        if value <= 0x7F {
            self.write_byte(value as u8);
        } else if value <= 0x3FFF {
            self.write_bytes(&(0x8000 | value as u16).to_be_bytes());
        } else if value <= 0x1FFF_FFFF {
            self.write_bytes(&(0xC000_0000 | value).to_be_bytes());
        } else {
            return Err(());
        }
        Ok(())
    }

    /// Write a null-terminated UTF-8 string to the end of the buffer.
    pub fn write_string(&mut self, value: &str) {
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
    }

    /// Write a variable-length signed 64-bit integer to the end of the buffer.
    pub fn write_var_int64(&mut self, value: i64) {
        self.write_var_uint64(((value << 1) ^ (value >> 63)) as u64);
    }

    /// Write a variable-length unsigned 64-bit integer to the end of the buffer.
    pub fn write_var_uint64(&mut self, mut value: u64) {
        let mut i = 0;
        while value > 127 && i < 8 {
            self.write_byte((value as u8 & 127) | 128);
            value >>= 7;
            i += 1;
        }
        self.write_byte(value as u8);
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_bytes() {
    let mut bb = ByteBufferMut::new();
    bb.write_bytes(&[1, 2, 3]);
    bb.write_bytes(&[]);
    bb.write_bytes(&[4, 5]);
    assert_eq!(bb.data(), [1, 2, 3, 4, 5]);
}

#[test]
fn write_fixed_width() {
    assert_eq!(write_once(|bb| bb.write_u16(0x5A4D)), [0x4D, 0x5A]);
    assert_eq!(write_once(|bb| bb.write_u32(0x424A5342)), *b"BSJB");
    assert_eq!(
        write_once(|bb| bb.write_u64(0x0000_1600_3301_FA00)),
        [0x00, 0xFA, 0x01, 0x33, 0x00, 0x16, 0x00, 0x00]
    );
}

#[test]
fn write_compressed_uint() {
    let write = |value| {
        let mut bb = ByteBufferMut::new();
        bb.write_compressed_uint(value).map(|_| bb.data())
    };
    assert_eq!(write(0x03), Ok(vec![0x03]));
    assert_eq!(write(0x7F), Ok(vec![0x7F]));
    assert_eq!(write(0x80), Ok(vec![0x80, 0x80]));
    assert_eq!(write(0x2E57), Ok(vec![0xAE, 0x57]));
    assert_eq!(write(0x3FFF), Ok(vec![0xBF, 0xFF]));
    assert_eq!(write(0x4000), Ok(vec![0xC0, 0x00, 0x40, 0x00]));
    assert_eq!(write(0x1FFFFFFF), Ok(vec![0xDF, 0xFF, 0xFF, 0xFF]));
    assert_eq!(write(0x20000000), Err(()));
}

#[test]
fn align_pads_with_zeros() {
    let mut bb = ByteBufferMut::new();
    bb.write_byte(1);
    bb.align(4);
    assert_eq!(bb.len(), 4);
    bb.align(4);
    assert_eq!(bb.len(), 4);
    bb.write_u32(0xDEADBEEF);
    assert_eq!(bb.data(), [1, 0, 0, 0, 0xEF, 0xBE, 0xAD, 0xDE]);
}

#[test]
fn write_string() {
    assert_eq!(write_once(|bb| bb.write_string("")), [0]);
    assert_eq!(write_once(|bb| bb.write_string("abc")), [97, 98, 99, 0]);
    assert_eq!(write_once(|bb| bb.write_string("🍕")), [240, 159, 141, 149, 0]);
}

#[test]
fn write_var_int64() {
    assert_eq!(write_once(|bb| bb.write_var_int64(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_var_int64(-1)), [1]);
    assert_eq!(write_once(|bb| bb.write_var_int64(1)), [2]);
    assert_eq!(write_once(|bb| bb.write_var_int64(-64)), [127]);
    assert_eq!(write_once(|bb| bb.write_var_int64(64)), [128, 1]);
    assert_eq!(
        write_once(|bb| bb.write_var_int64(i64::MIN)),
        [255, 255, 255, 255, 255, 255, 255, 255, 255]
    );
}

#[test]
fn write_var_uint64() {
    assert_eq!(write_once(|bb| bb.write_var_uint64(0)), [0]);
    assert_eq!(write_once(|bb| bb.write_var_uint64(127)), [127]);
    assert_eq!(write_once(|bb| bb.write_var_uint64(128)), [128, 1]);
    assert_eq!(write_once(|bb| bb.write_var_uint64(300)), [172, 2]);
}
