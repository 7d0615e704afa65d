//! Little-endian binary stream wrappers.
//!
//! [`BinWriter`] and [`BinReader`] wrap any seekable `std::io` stream and
//! provide the primitive accessors the codec layer is built on. All integers
//! and floats are little-endian on the wire.
//!
//! The writer supports the reserve/patch pattern used at every framing
//! level: reserve space for a length, write the payload, then seek back and
//! patch the real length in.

use std::io::{Read, Seek, SeekFrom, Write};

use super::error::{DeserializeError, SerializeError};

/// Object-safe alias for seekable output streams.
pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek> WriteSeek for T {}

/// Object-safe alias for seekable input streams.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Little-endian binary writer over a seekable stream.
///
/// Every `write_*` method returns the number of bytes written so callers
/// can accumulate payload sizes for chunk framing.
pub struct BinWriter<'a> {
    inner: &'a mut dyn WriteSeek,
}

impl<'a> BinWriter<'a> {
    pub fn new(inner: &'a mut dyn WriteSeek) -> Self {
        Self { inner }
    }

    /// Current absolute stream position.
    pub fn position(&mut self) -> Result<u64, SerializeError> {
        Ok(self.inner.stream_position()?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<u64, SerializeError> {
        self.inner.write_all(bytes)?;
        Ok(bytes.len() as u64)
    }

    pub fn write_u8(&mut self, v: u8) -> Result<u64, SerializeError> {
        self.write_bytes(&[v])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<u64, SerializeError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<u64, SerializeError> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<u64, SerializeError> {
        self.write_bytes(&v.to_le_bytes())
    }

    /// Reserves a `u32` slot at the current position and returns its offset
    /// for a later [`patch_u32`](Self::patch_u32).
    pub fn reserve_u32(&mut self) -> Result<u64, SerializeError> {
        let pos = self.position()?;
        self.write_u32(0)?;
        Ok(pos)
    }

    /// Reserves a `u64` slot at the current position and returns its offset
    /// for a later [`patch_u64`](Self::patch_u64).
    pub fn reserve_u64(&mut self) -> Result<u64, SerializeError> {
        let pos = self.position()?;
        self.write_u64(0)?;
        Ok(pos)
    }

    /// Overwrites a previously reserved `u32` slot, restoring the current
    /// position afterwards.
    pub fn patch_u32(&mut self, at: u64, v: u32) -> Result<(), SerializeError> {
        let here = self.position()?;
        self.inner.seek(SeekFrom::Start(at))?;
        self.write_u32(v)?;
        self.inner.seek(SeekFrom::Start(here))?;
        Ok(())
    }

    /// Overwrites a previously reserved `u64` slot, restoring the current
    /// position afterwards.
    pub fn patch_u64(&mut self, at: u64, v: u64) -> Result<(), SerializeError> {
        let here = self.position()?;
        self.inner.seek(SeekFrom::Start(at))?;
        self.write_u64(v)?;
        self.inner.seek(SeekFrom::Start(here))?;
        Ok(())
    }
}

/// Little-endian binary reader over a seekable stream.
///
/// Truncated streams surface as [`DeserializeError::Io`] with
/// `UnexpectedEof`, which aborts the read operation.
pub struct BinReader<'a> {
    inner: &'a mut dyn ReadSeek,
}

impl<'a> BinReader<'a> {
    pub fn new(inner: &'a mut dyn ReadSeek) -> Self {
        Self { inner }
    }

    /// Current absolute stream position.
    pub fn position(&mut self) -> Result<u64, DeserializeError> {
        Ok(self.inner.stream_position()?)
    }

    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<u64, DeserializeError> {
        self.inner.read_exact(buf)?;
        Ok(buf.len() as u64)
    }

    pub fn read_u8(&mut self) -> Result<u8, DeserializeError> {
        let mut b = [0u8; 1];
        self.read_bytes(&mut b)?;
        Ok(b[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DeserializeError> {
        let mut b = [0u8; 2];
        self.read_bytes(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn read_u32(&mut self) -> Result<u32, DeserializeError> {
        let mut b = [0u8; 4];
        self.read_bytes(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    pub fn read_u64(&mut self) -> Result<u64, DeserializeError> {
        let mut b = [0u8; 8];
        self.read_bytes(&mut b)?;
        Ok(u64::from_le_bytes(b))
    }

    /// Skips forward over `bytes` without interpreting them.
    pub fn skip(&mut self, bytes: u64) -> Result<(), DeserializeError> {
        self.inner.seek(SeekFrom::Current(bytes as i64))?;
        Ok(())
    }

    /// Forces the stream to an absolute position (chunk-end recovery).
    pub fn seek_to(&mut self, pos: u64) -> Result<(), DeserializeError> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_primitives() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut w = BinWriter::new(&mut buf);
            assert_eq!(w.write_u8(0xAB).unwrap(), 1);
            assert_eq!(w.write_u16(0x1234).unwrap(), 2);
            assert_eq!(w.write_u32(0xDEAD_BEEF).unwrap(), 4);
            assert_eq!(w.write_u64(0x0102_0304_0506_0708).unwrap(), 8);
        }
        buf.set_position(0);
        let mut r = BinReader::new(&mut buf);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_u64().unwrap(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn reserve_and_patch() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut w = BinWriter::new(&mut buf);
            let slot = w.reserve_u32().unwrap();
            w.write_bytes(b"payload").unwrap();
            w.patch_u32(slot, 7).unwrap();
            // Position must be restored past the payload.
            assert_eq!(w.position().unwrap(), 4 + 7);
        }
        buf.set_position(0);
        let mut r = BinReader::new(&mut buf);
        assert_eq!(r.read_u32().unwrap(), 7);
    }

    #[test]
    fn truncated_read_is_io_error() {
        let mut buf = Cursor::new(vec![0u8; 2]);
        let mut r = BinReader::new(&mut buf);
        assert!(matches!(r.read_u32(), Err(DeserializeError::Io(_))));
    }
}
