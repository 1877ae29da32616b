use std::ops::Deref;

use super::*;

/// A struct storing the size of an atom and whether it is extended.
///
/// 4 bytes standard length
/// 4 bytes identifier
/// 8 bytes optional extended length
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Size {
    /// Whether the head is of standard size (8 bytes) with a 32 bit length or
    /// extended (16 bytes) with a 64 bit length.
    ext: bool,
    /// The length including this head.
    len: u64,
}

impl Size {
    pub const fn from(content_len: u64) -> Self {
        let mut len = content_len + 8;
        let ext = len > u32::MAX as u64;
        if ext {
            len += 8;
        }
        Self { ext, len }
    }

    pub const fn ext(&self) -> bool {
        self.ext
    }

    pub const fn len(&self) -> u64 {
        self.len
    }

    pub const fn head_len(&self) -> u64 {
        match self.ext {
            true => 16,
            false => 8,
        }
    }

    pub const fn content_len(&self) -> u64 {
        match self.ext {
            true => self.len - 16,
            false => self.len - 8,
        }
    }
}

/// A head specifying the size and type of an atom.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Head {
    size: Size,
    /// The identifier.
    fourcc: Fourcc,
}

impl Deref for Head {
    type Target = Size;

    fn deref(&self) -> &Self::Target {
        &self.size
    }
}

impl Head {
    pub const fn new(ext: bool, len: u64, fourcc: Fourcc) -> Self {
        Self { size: Size { ext, len }, fourcc }
    }

    pub const fn from(size: Size, fourcc: Fourcc) -> Self {
        Self { size, fourcc }
    }

    pub const fn fourcc(&self) -> Fourcc {
        self.fourcc
    }
}

/// Attempts to parse an atom's head containing a 32 bit unsigned integer
/// determining the size of the atom in bytes and the following 4 byte
/// identifier from the reader. If the 32 bit length is set to 1 an extended
/// 64 bit length is read. A length of 0 means the atom extends to the end of
/// the enclosing space, `remaining` bytes from the start of the head.
pub fn parse(reader: &mut impl Read, remaining: u64) -> crate::Result<Head> {
    let len = match reader.read_u32::<BigEndian>() {
        Ok(l) => l as u64,
        Err(e) => {
            let mut err = crate::Error::from(e);
            err.description = "Error reading atom length".to_owned();
            return Err(err);
        }
    };
    let mut fourcc = Fourcc([0u8; 4]);
    if let Err(e) = reader.read_exact(&mut *fourcc) {
        let mut err = crate::Error::from(e);
        err.description = "Error reading atom identifier".to_owned();
        return Err(err);
    }

    if len == 1 {
        let len = match reader.read_u64::<BigEndian>() {
            Ok(l) => l,
            Err(e) => {
                let mut err = crate::Error::from(e);
                err.description = "Error reading extended atom length".to_owned();
                return Err(err);
            }
        };
        if len < 16 {
            return Err(crate::Error::new(
                ErrorKind::Corrupt,
                format!("Read extended length of '{fourcc}' which is less than 16 bytes: {len}"),
            ));
        }
        Ok(Head::new(true, len, fourcc))
    } else if len == 0 {
        // the atom extends to the end of the file
        if remaining < 8 {
            return Err(crate::Error::new(
                ErrorKind::Corrupt,
                format!("Atom '{fourcc}' extends to the end but only {remaining} bytes remain"),
            ));
        }
        Ok(Head::new(false, remaining, fourcc))
    } else if len < 8 {
        Err(crate::Error::new(
            ErrorKind::Corrupt,
            format!("Read length of '{fourcc}' which is less than 8 bytes: {len}"),
        ))
    } else {
        Ok(Head::new(false, len, fourcc))
    }
}

pub fn write(writer: &mut impl Write, head: Head) -> crate::Result<()> {
    if head.ext() {
        writer.write_u32::<BigEndian>(1)?;
        writer.write_all(&*head.fourcc)?;
        writer.write_u64::<BigEndian>(head.len())?;
    } else {
        writer.write_u32::<BigEndian>(head.len() as u32)?;
        writer.write_all(&*head.fourcc)?;
    }
    Ok(())
}

/// Writes a `free` padding atom with the total length, the header followed by
/// zero bytes.
pub fn write_free(writer: &mut impl Write, len: u64) -> crate::Result<()> {
    if len < 8 {
        return Err(crate::Error::new(
            ErrorKind::BadBox,
            format!("A free atom cannot be smaller than its header: {len}"),
        ));
    }
    write(writer, Head::new(false, len, FREE))?;
    writer.write_zeros(len - 8)?;
    Ok(())
}

/// Attempts to parse a full atom head.
///
/// 1 byte version
/// 3 bytes flags
pub fn parse_full(reader: &mut impl Read) -> crate::Result<(u8, [u8; 3])> {
    let version = reader.read_u8()?;
    let mut flags = [0u8; 3];
    reader.read_exact(&mut flags)?;

    Ok((version, flags))
}

pub fn write_full(writer: &mut impl Write, version: u8, flags: [u8; 3]) -> crate::Result<()> {
    writer.write_all(&[version])?;
    writer.write_all(&flags)?;
    Ok(())
}

/// A struct storing the position and size of an atom.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AtomBounds {
    pos: u64,
    head: Head,
}

impl Deref for AtomBounds {
    type Target = Head;

    fn deref(&self) -> &Self::Target {
        &self.head
    }
}

impl AtomBounds {
    pub const fn new(pos: u64, head: Head) -> Self {
        Self { pos, head }
    }

    pub const fn pos(&self) -> u64 {
        self.pos
    }

    pub fn content_pos(&self) -> u64 {
        self.pos + self.head_len()
    }

    pub fn end(&self) -> u64 {
        self.pos + self.len()
    }
}
