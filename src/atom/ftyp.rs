use super::*;

/// Major brands accepted without consulting the compatible brand list.
#[rustfmt::skip]
const MAJOR_BRANDS: [Fourcc; 21] = [
    Fourcc(*b"isom"), Fourcc(*b"iso2"), Fourcc(*b"iso5"), Fourcc(*b"iso6"),
    Fourcc(*b"mp41"), Fourcc(*b"mp42"),
    Fourcc(*b"M4A "), Fourcc(*b"M4B "), Fourcc(*b"M4P "), Fourcc(*b"M4V "),
    Fourcc(*b"M4VH"), Fourcc(*b"avc1"), Fourcc(*b"f4v "), Fourcc(*b"qt  "),
    Fourcc(*b"MSNV"), Fourcc(*b"NDAS"), Fourcc(*b"dash"),
    Fourcc(*b"3gp4"), Fourcc(*b"3gp5"), Fourcc(*b"3gp6"), Fourcc(*b"3g2a"),
];

/// Brands that qualify a file when found in the compatible brand list of an
/// unrecognized major brand.
#[rustfmt::skip]
const COMPATIBLE_BRANDS: [Fourcc; 7] = [
    Fourcc(*b"isom"), Fourcc(*b"mp41"), Fourcc(*b"mp42"),
    Fourcc(*b"M4A "), Fourcc(*b"M4B "), Fourcc(*b"M4V "), Fourcc(*b"avc1"),
];

/// Validates that the reader starts with a filetype atom carrying a
/// recognized brand.
pub(crate) fn validate(reader: &mut (impl Read + Seek)) -> crate::Result<()> {
    reader.seek(SeekFrom::Start(0))?;
    let file_len = reader.remaining_stream_len()?;

    let head = match head::parse(reader, file_len) {
        Ok(h) => h,
        Err(_) => {
            return Err(crate::Error::new(
                ErrorKind::NotMp4,
                "No readable atom at the start of the file".to_owned(),
            ));
        }
    };
    if head.fourcc() != FILETYPE {
        return Err(crate::Error::new(
            ErrorKind::NotMp4,
            format!("Expected a filetype atom (ftyp), found '{}'", head.fourcc()),
        ));
    }
    if head.content_len() < 4 {
        return Err(crate::Error::new(
            ErrorKind::NotMp4,
            "Filetype atom (ftyp) is too small to hold a major brand".to_owned(),
        ));
    }

    let mut major = Fourcc([0u8; 4]);
    if reader.read_exact(&mut *major).is_err() {
        return Err(crate::Error::new(
            ErrorKind::NotMp4,
            "Error reading the major brand".to_owned(),
        ));
    }
    if MAJOR_BRANDS.contains(&major) {
        trace!("accepted major brand '{major}'");
        return Ok(());
    }

    // The major brand is unusual, scan the compatible brand list for a
    // recognized entry.
    if head.content_len() >= 12 {
        reader.skip(4)?; // minor version
        let mut pos = 8;
        while pos + 4 <= head.content_len() {
            let mut brand = Fourcc([0u8; 4]);
            if reader.read_exact(&mut *brand).is_err() {
                break;
            }
            if COMPATIBLE_BRANDS.contains(&brand) {
                debug!("accepted compatible brand '{brand}' for major brand '{major}'");
                return Ok(());
            }
            pos += 4;
        }
    }

    Err(crate::Error::new(
        ErrorKind::NotMp4,
        format!("Unrecognized major brand '{major}'"),
    ))
}
