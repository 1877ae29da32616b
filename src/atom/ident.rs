use std::array::TryFromSliceError;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// (`ftyp`) Identifier of the atom containing information about the filetype.
pub(crate) const FILETYPE: Fourcc = Fourcc(*b"ftyp");
/// (`moov`) Identifier of the atom containing a structure of children storing metadata.
pub(crate) const MOVIE: Fourcc = Fourcc(*b"moov");
/// (`mdat`)
pub(crate) const MEDIA_DATA: Fourcc = Fourcc(*b"mdat");
/// (`udta`) Identifier of the atom containing user metadata.
pub(crate) const USER_DATA: Fourcc = Fourcc(*b"udta");
/// (`meta`) Identifier of the atom containing a metadata item list.
pub(crate) const METADATA: Fourcc = Fourcc(*b"meta");
/// (`hdlr`) Identifier of the atom specifying the handler component that
/// should interpret the metadata.
pub(crate) const HANDLER_REFERENCE: Fourcc = Fourcc(*b"hdlr");
/// (`ilst`) Identifier of the atom containing a list of metadata items.
pub(crate) const ITEM_LIST: Fourcc = Fourcc(*b"ilst");
/// (`data`) Identifier of the atom containing typed data.
pub(crate) const DATA: Fourcc = Fourcc(*b"data");
/// (`free`)
pub(crate) const FREE: Fourcc = Fourcc(*b"free");
/// (`skip`)
pub(crate) const SKIP: Fourcc = Fourcc(*b"skip");

/// (`©nam`)
pub(crate) const TITLE: Fourcc = Fourcc(*b"\xa9nam");
/// (`©ART`)
pub(crate) const ARTIST: Fourcc = Fourcc(*b"\xa9ART");
/// (`©alb`)
pub(crate) const ALBUM: Fourcc = Fourcc(*b"\xa9alb");
/// (`aART`)
pub(crate) const ALBUM_ARTIST: Fourcc = Fourcc(*b"aART");
/// (`©day`)
pub(crate) const DATE_RELEASED: Fourcc = Fourcc(*b"\xa9day");
/// (`trkn`)
pub(crate) const TRACK_NUMBER: Fourcc = Fourcc(*b"trkn");
/// (`disk`)
pub(crate) const DISC_NUMBER: Fourcc = Fourcc(*b"disk");
/// (`©gen`)
pub(crate) const GENRE: Fourcc = Fourcc(*b"\xa9gen");
/// (`gnre`) ID3v1 genre code, as opposed to the text genre in `©gen`.
pub(crate) const STANDARD_GENRE: Fourcc = Fourcc(*b"gnre");
/// (`©wrt`)
pub(crate) const COMPOSER: Fourcc = Fourcc(*b"\xa9wrt");
/// (`©cmt`)
pub(crate) const COMMENT: Fourcc = Fourcc(*b"\xa9cmt");
/// (`©too`)
pub(crate) const ENCODER: Fourcc = Fourcc(*b"\xa9too");
/// (`cprt`)
pub(crate) const COPYRIGHT: Fourcc = Fourcc(*b"cprt");
/// (`tmpo`)
pub(crate) const BPM: Fourcc = Fourcc(*b"tmpo");
/// (`©lyr`)
pub(crate) const LYRICS: Fourcc = Fourcc(*b"\xa9lyr");
/// (`©grp`)
pub(crate) const GROUPING: Fourcc = Fourcc(*b"\xa9grp");
/// (`desc`)
pub(crate) const DESCRIPTION: Fourcc = Fourcc(*b"desc");
/// (`covr`)
pub(crate) const COVER_ART: Fourcc = Fourcc(*b"covr");
/// (`cpil`)
pub(crate) const COMPILATION: Fourcc = Fourcc(*b"cpil");
/// (`pgap`)
pub(crate) const GAPLESS: Fourcc = Fourcc(*b"pgap");
/// (`sonm`)
pub(crate) const SORT_NAME: Fourcc = Fourcc(*b"sonm");
/// (`soar`)
pub(crate) const SORT_ARTIST: Fourcc = Fourcc(*b"soar");
/// (`soal`)
pub(crate) const SORT_ALBUM: Fourcc = Fourcc(*b"soal");
/// (`soaa`)
pub(crate) const SORT_ALBUM_ARTIST: Fourcc = Fourcc(*b"soaa");
/// (`soco`)
pub(crate) const SORT_COMPOSER: Fourcc = Fourcc(*b"soco");

/// The canonical tag names and the atoms they map to. Reverse lookups return
/// the first name for an identifier.
pub(crate) const TAG_NAMES: &[(&str, Fourcc)] = &[
    ("TITLE", TITLE),
    ("ARTIST", ARTIST),
    ("ALBUM", ALBUM),
    ("ALBUM_ARTIST", ALBUM_ARTIST),
    ("DATE_RELEASED", DATE_RELEASED),
    ("TRACK_NUMBER", TRACK_NUMBER),
    ("DISC_NUMBER", DISC_NUMBER),
    ("GENRE", GENRE),
    ("COMPOSER", COMPOSER),
    ("COMMENT", COMMENT),
    ("ENCODER", ENCODER),
    ("COPYRIGHT", COPYRIGHT),
    ("BPM", BPM),
    ("LYRICS", LYRICS),
    ("GROUPING", GROUPING),
    ("DESCRIPTION", DESCRIPTION),
    ("COVER_ART", COVER_ART),
    ("COMPILATION", COMPILATION),
    ("GAPLESS", GAPLESS),
    ("SORT_NAME", SORT_NAME),
    ("SORT_ARTIST", SORT_ARTIST),
    ("SORT_ALBUM", SORT_ALBUM),
    ("SORT_ALBUM_ARTIST", SORT_ALBUM_ARTIST),
    ("SORT_COMPOSER", SORT_COMPOSER),
];

/// Returns the atom identifier for a tag name, compared ASCII
/// case-insensitively. Unmapped names of exactly four characters are used as
/// a raw identifier.
pub(crate) fn fourcc_for_name(name: &str) -> Option<Fourcc> {
    for (n, fourcc) in TAG_NAMES {
        if n.eq_ignore_ascii_case(name) {
            return Some(*fourcc);
        }
    }

    raw_fourcc(name)
}

/// Returns the canonical tag name for an atom identifier.
pub(crate) fn name_for_fourcc(fourcc: Fourcc) -> Option<&'static str> {
    TAG_NAMES.iter().find(|(_, f)| *f == fourcc).map(|(n, _)| *n)
}

/// Interprets a name of exactly four characters as a raw identifier. Each
/// character has to fit into a single byte, so names produced by stringifying
/// unmapped atoms (e.g. `©mvn`) map back to their original bytes.
fn raw_fourcc(name: &str) -> Option<Fourcc> {
    if name.len() == 4 {
        return name.as_bytes().try_into().ok().map(Fourcc);
    }

    let mut bytes = [0u8; 4];
    let mut len = 0;
    for c in name.chars() {
        if len == 4 || c as u32 > 0xFF {
            return None;
        }
        bytes[len] = c as u8;
        len += 1;
    }

    match len {
        4 => Some(Fourcc(bytes)),
        _ => None,
    }
}

/// A 4 byte atom identifier (four character code).
///
/// Identifiers are typically ASCII but any byte is permitted, notably `0xA9`
/// (`©`) which prefixes many iTunes atoms.
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct Fourcc(pub [u8; 4]);

impl Fourcc {
    /// Creates an identifier from a string, right-padding short strings with
    /// NUL bytes. Only the first four characters are considered.
    pub fn from_padded(s: &str) -> Self {
        let mut bytes = [0u8; 4];
        for (i, c) in s.chars().take(4).enumerate() {
            bytes[i] = c as u8;
        }
        Fourcc(bytes)
    }
}

impl Deref for Fourcc {
    type Target = [u8; 4];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Fourcc {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromStr for Fourcc {
    type Err = TryFromSliceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Fourcc(s.as_bytes().try_into()?))
    }
}

impl fmt::Debug for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fourcc({})", self.0.iter().map(|b| char::from(*b)).collect::<String>())
    }
}

impl fmt::Display for Fourcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().map(|b| char::from(*b)).collect::<String>())
    }
}
