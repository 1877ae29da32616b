use std::io::{self, Read, Seek, SeekFrom, Write};

pub trait ReadUtil: Read {
    /// Attempts to read 8 bit unsigned integers from the reader to a vector of size length.
    fn read_u8_vec(&mut self, len: u64) -> io::Result<Vec<u8>> {
        let mut buf = vec![0; len as usize];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Attempts to read a utf-8 string from the reader.
    fn read_utf8(&mut self, len: u64) -> crate::Result<String> {
        let data = self.read_u8_vec(len)?;

        Ok(String::from_utf8(data)?)
    }

    /// Attempts to read a big endian utf-16 string from the reader.
    fn read_be_utf16(&mut self, len: u64) -> crate::Result<String> {
        let mut buf = vec![0; len as usize];

        self.read_exact(&mut buf)?;

        let data: Vec<u16> =
            buf.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();

        Ok(String::from_utf16(&data)?)
    }
}

impl<T: Read> ReadUtil for T {}

pub trait SeekUtil: Seek {
    /// Attempts to read the remaining stream length and returns to the starting position.
    fn remaining_stream_len(&mut self) -> io::Result<u64> {
        let current_pos = self.stream_position()?;
        let complete_len = self.seek(SeekFrom::End(0))?;
        let len = complete_len - current_pos;

        self.seek(SeekFrom::Start(current_pos))?;

        Ok(len)
    }

    fn skip(&mut self, offset: i64) -> io::Result<()> {
        self.seek(SeekFrom::Current(offset))?;
        Ok(())
    }
}

impl<T: Seek> SeekUtil for T {}

pub trait WriteUtil: Write {
    /// Writes `len` zero bytes in chunks.
    fn write_zeros(&mut self, len: u64) -> io::Result<()> {
        const ZEROS: [u8; 4096] = [0; 4096];

        let mut remaining = len;
        while remaining > 0 {
            let chunk = remaining.min(ZEROS.len() as u64);
            self.write_all(&ZEROS[..chunk as usize])?;
            remaining -= chunk;
        }
        Ok(())
    }
}

impl<T: Write> WriteUtil for T {}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn remaining_stream_len() {
        let mut cursor = Cursor::new([0u8; 16]);
        cursor.set_position(4);
        assert_eq!(cursor.remaining_stream_len().unwrap(), 12);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn write_zeros() {
        let mut buf = Vec::new();
        buf.write_zeros(10).unwrap();
        assert_eq!(buf, [0u8; 10]);
    }
}
