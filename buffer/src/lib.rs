//! Byte buffers shared by the enumgen binary writer and reader.
//!
//! Everything here is little-endian, matching the PE/COFF and ECMA-335
//! metadata formats, plus the big-endian "compressed integer" encoding the
//! metadata blob heap uses for lengths and signatures.
//!
//! ```
//! use enumgen_buffer::*;
//!
//! let mut out = ByteBufferMut::new();
//! out.write_u32(0x424A5342);
//! out.write_compressed_uint(300).unwrap();
//! let bytes = out.data();
//!
//! let mut bb = ByteBuffer::new(&bytes);
//! assert_eq!(bb.read_u32(), Ok(0x424A5342));
//! assert_eq!(bb.read_compressed_uint(), Ok(300));
//! ```

pub mod bb;

pub use bb::*;
