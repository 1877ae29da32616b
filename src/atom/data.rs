use super::*;

/// The size of the data atom header: a type indicator and a locale.
pub const HEADER_SIZE: u64 = 8;

// [Table 3-5 Well-known data types](https://developer.apple.com/documentation/quicktime-file-format/well-known_types) codes
/// Reserved for use where no type needs to be indicated. Used for
/// track/disc number pairs and standard genre codes.
pub const IMPLICIT: u32 = 0;
/// UTF-8 without any count or NULL terminator.
pub const UTF8: u32 = 1;
/// UTF-16 also known as UTF-16BE. Read-only, the encoder never emits it.
pub const UTF16: u32 = 2;
/// JPEG in a JFIF wrapper.
pub const JPEG: u32 = 13;
/// PNG in a PNG wrapper.
pub const PNG: u32 = 14;
/// A big-endian integer in 1 to 8 bytes.
pub const INTEGER: u32 = 21;

const PNG_SIGNATURE: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
const JPEG_SIGNATURE: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// The decoded payload of a metadata item.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ItemValue {
    /// A text value, also holding the stringified form of integer atoms.
    Text(String),
    /// A binary value, e.g. image data.
    Binary(Vec<u8>),
}

/// Atoms that carry integer payloads no matter which data type indicator
/// they declare. Some encoders label them implicit (0) and others integer
/// (21).
pub fn is_integer_atom(fourcc: Fourcc) -> bool {
    matches!(fourcc, TRACK_NUMBER | DISC_NUMBER | BPM | COMPILATION | GAPLESS)
}

/// Decodes the value of a metadata item, dispatching on the atom type first
/// and the data type indicator second.
pub fn decode(
    reader: &mut (impl Read + Seek),
    fourcc: Fourcc,
    datatype: u32,
    len: u64,
) -> crate::Result<ItemValue> {
    if is_integer_atom(fourcc) && (1..=8).contains(&len) {
        let buf = reader.read_u8_vec(len)?;
        return Ok(ItemValue::Text(decode_integer(fourcc, &buf)));
    }

    Ok(match datatype {
        UTF8 | IMPLICIT => ItemValue::Text(reader.read_utf8(len)?),
        UTF16 => ItemValue::Text(reader.read_be_utf16(len)?),
        INTEGER if (1..=8).contains(&len) => {
            ItemValue::Text(format_be_int(&reader.read_u8_vec(len)?))
        }
        JPEG | PNG => ItemValue::Binary(reader.read_u8_vec(len)?),
        _ => ItemValue::Binary(reader.read_u8_vec(len)?),
    })
}

/// Stringifies the payload of a well-known integer atom.
fn decode_integer(fourcc: Fourcc, buf: &[u8]) -> String {
    match fourcc {
        // 00 00 NN NN TT TT 00 00
        TRACK_NUMBER | DISC_NUMBER if buf.len() >= 6 => {
            let num = u16::from_be_bytes([buf[2], buf[3]]);
            let total = u16::from_be_bytes([buf[4], buf[5]]);
            match total {
                0 => num.to_string(),
                _ => format!("{num}/{total}"),
            }
        }
        BPM if buf.len() == 2 => u16::from_be_bytes([buf[0], buf[1]]).to_string(),
        _ if buf.len() == 1 => buf[0].to_string(),
        _ => format_be_int(buf),
    }
}

/// Stringifies a big-endian unsigned integer of 1 to 8 bytes.
fn format_be_int(buf: &[u8]) -> String {
    let mut val: u64 = 0;
    for b in buf {
        val = (val << 8) | u64::from(*b);
    }
    val.to_string()
}

/// Encodes the payload of a simple tag for the given atom, returning the
/// data type indicator and the raw value. Returns `None` for items that
/// cannot be encoded, e.g. cover art without image data.
pub fn encode(fourcc: Fourcc, st: &SimpleTag) -> Option<(u32, Vec<u8>)> {
    let value = st.value.as_deref().unwrap_or("");

    match fourcc {
        TRACK_NUMBER | DISC_NUMBER => {
            let (num, total) = parse_pair(value);
            #[rustfmt::skip]
            let payload = vec![
                0, 0,
                (num >> 8) as u8, num as u8,
                (total >> 8) as u8, total as u8,
                0, 0,
            ];
            Some((IMPLICIT, payload))
        }
        BPM => {
            let bpm = parse_int(value) as u16;
            Some((INTEGER, bpm.to_be_bytes().to_vec()))
        }
        COMPILATION | GAPLESS => {
            let val = u8::from(parse_int(value) != 0);
            Some((INTEGER, vec![val]))
        }
        COVER_ART => {
            let image = st.binary.as_deref().filter(|b| !b.is_empty())?;
            Some((image_datatype(image), image.to_vec()))
        }
        STANDARD_GENRE => {
            let genre = parse_int(value) as u16;
            Some((IMPLICIT, genre.to_be_bytes().to_vec()))
        }
        _ => Some((UTF8, value.as_bytes().to_vec())),
    }
}

/// Detects the data type indicator for cover art. Png is identified by its
/// signature prefix, everything else is labeled jpeg since the indicator is
/// only a hint.
pub fn image_datatype(data: &[u8]) -> u32 {
    if data.starts_with(&PNG_SIGNATURE) {
        PNG
    } else if data.starts_with(&JPEG_SIGNATURE) {
        JPEG
    } else {
        debug!("unrecognized image signature, labeling cover art as jpeg");
        JPEG
    }
}

/// Parses a `"N"` or `"N/T"` pair, a missing total defaults to 0.
fn parse_pair(s: &str) -> (u16, u16) {
    match s.split_once('/') {
        Some((num, total)) => (parse_int(num) as u16, parse_int(total) as u16),
        None => (parse_int(s) as u16, 0),
    }
}

/// Parses the leading decimal digits of a string, anything else yields 0.
fn parse_int(s: &str) -> u64 {
    let s = s.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().unwrap_or(0)
}
