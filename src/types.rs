use std::fmt;

use crate::ErrorKind;

// Target type values, compatible with the matroska tagging hierarchy.
pub const SHOT: u8 = 10;
pub const SUBTRACK: u8 = 20;
pub const TRACK: u8 = 30;
pub const PART: u8 = 40;
pub const ALBUM: u8 = 50;
pub const EDITION: u8 = 60;
pub const COLLECTION: u8 = 70;

/// An enum describing the scope a [`Tag`] applies to.
///
/// Mp4 files carry a flat metadata item list, so everything is stored and
/// parsed at the [`Album`](TargetType::Album) level. The remaining values
/// exist for interoperability with container formats that support a tag
/// hierarchy.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetType {
    /// A target type stored as 10.
    Shot,
    /// A target type stored as 20.
    Subtrack,
    /// A target type stored as 30.
    Track,
    /// A target type stored as 40.
    Part,
    /// A target type stored as 50.
    Album,
    /// A target type stored as 60.
    Edition,
    /// A target type stored as 70.
    Collection,
}

impl Default for TargetType {
    fn default() -> Self {
        Self::Album
    }
}

impl TargetType {
    /// Returns the integer value corresponding to the target type.
    pub fn value(&self) -> u8 {
        match self {
            Self::Shot => SHOT,
            Self::Subtrack => SUBTRACK,
            Self::Track => TRACK,
            Self::Part => PART,
            Self::Album => ALBUM,
            Self::Edition => EDITION,
            Self::Collection => COLLECTION,
        }
    }
}

impl TryFrom<u8> for TargetType {
    type Error = crate::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            SHOT => Ok(Self::Shot),
            SUBTRACK => Ok(Self::Subtrack),
            TRACK => Ok(Self::Track),
            PART => Ok(Self::Part),
            ALBUM => Ok(Self::Album),
            EDITION => Ok(Self::Edition),
            COLLECTION => Ok(Self::Collection),
            _ => Err(crate::Error::new(
                ErrorKind::InvalidArg,
                format!("Unknown target type value {value}"),
            )),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shot => write!(f, "SHOT"),
            Self::Subtrack => write!(f, "SUBTRACK"),
            Self::Track => write!(f, "TRACK"),
            Self::Part => write!(f, "PART"),
            Self::Album => write!(f, "ALBUM"),
            Self::Edition => write!(f, "EDITION"),
            Self::Collection => write!(f, "COLLECTION"),
        }
    }
}

/// A name/value pair read from or destined for the metadata item list.
///
/// Exactly one of `value` and `binary` is meaningful per item. Integer valued
/// atoms carry their stringified form in `value` (`"3/12"`, `"128"`, `"1"`).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SimpleTag {
    /// The tag name, either a canonical name like `TITLE` or a stringified
    /// atom identifier for unmapped atoms.
    pub name: String,
    /// The UTF-8 string value.
    pub value: Option<String>,
    /// The binary value, e.g. cover art bytes.
    pub binary: Option<Vec<u8>>,
    /// The language code, `None` is treated as undetermined.
    pub language: Option<String>,
    /// Whether this is the default tag for its language.
    pub is_default: bool,
    /// Nested child tags in insertion order.
    pub nested: Vec<SimpleTag>,
}

impl SimpleTag {
    /// Creates a simple tag with the name and string value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: Some(value.into()), ..Default::default() }
    }

    /// Creates a simple tag with the name and binary value.
    pub fn with_binary(name: impl Into<String>, binary: Vec<u8>) -> Self {
        Self { name: name.into(), binary: Some(binary), ..Default::default() }
    }

    /// Appends a nested child tag and returns a mutable reference to it.
    pub fn add_nested(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut SimpleTag {
        let index = self.nested.len();
        self.nested.push(SimpleTag::new(name, value));
        &mut self.nested[index]
    }

    /// Sets the language code, `None` resets it to undetermined.
    pub fn set_language(&mut self, language: Option<&str>) {
        self.language = language.map(str::to_owned);
    }
}

impl fmt::Display for SimpleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, &self.binary) {
            (Some(value), _) => write!(f, "{}: {}", self.name, value),
            (None, Some(binary)) => write!(f, "{}: <{} bytes>", self.name, binary.len()),
            (None, None) => write!(f, "{}:", self.name),
        }
    }
}

/// A tag scoped to a [`TargetType`], holding simple tags and the uids of the
/// entities it applies to.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Tag {
    /// The scope this tag applies to. Always [`TargetType::Album`] for tags
    /// parsed from an mp4 file.
    pub target_type: TargetType,
    /// Uids of the tracks this tag applies to.
    pub track_uids: Vec<u64>,
    /// Uids of the editions this tag applies to.
    pub edition_uids: Vec<u64>,
    /// Uids of the chapters this tag applies to.
    pub chapter_uids: Vec<u64>,
    /// Uids of the attachments this tag applies to.
    pub attachment_uids: Vec<u64>,
    /// The simple tags in insertion order.
    pub simple_tags: Vec<SimpleTag>,
}

impl Tag {
    /// Creates an empty tag with the target type.
    pub fn new(target_type: TargetType) -> Self {
        Self { target_type, ..Default::default() }
    }

    /// Appends a simple tag with the name and string value and returns a
    /// mutable reference to it.
    pub fn add_simple(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut SimpleTag {
        let index = self.simple_tags.len();
        self.simple_tags.push(SimpleTag::new(name, value));
        &mut self.simple_tags[index]
    }

    /// Appends a simple tag with the name and binary value and returns a
    /// mutable reference to it.
    pub fn add_simple_binary(
        &mut self,
        name: impl Into<String>,
        binary: Vec<u8>,
    ) -> &mut SimpleTag {
        let index = self.simple_tags.len();
        self.simple_tags.push(SimpleTag::with_binary(name, binary));
        &mut self.simple_tags[index]
    }

    /// Records a track uid this tag applies to.
    pub fn add_track_uid(&mut self, uid: u64) {
        self.track_uids.push(uid);
    }

    /// Records an edition uid this tag applies to.
    pub fn add_edition_uid(&mut self, uid: u64) {
        self.edition_uids.push(uid);
    }

    /// Records a chapter uid this tag applies to.
    pub fn add_chapter_uid(&mut self, uid: u64) {
        self.chapter_uids.push(uid);
    }

    /// Records an attachment uid this tag applies to.
    pub fn add_attachment_uid(&mut self, uid: u64) {
        self.attachment_uids.push(uid);
    }
}

/// An ordered collection of [`Tag`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Collection {
    /// The tags in insertion order.
    pub tags: Vec<Tag>,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an empty tag with the target type and returns a mutable
    /// reference to it.
    pub fn add_tag(&mut self, target_type: TargetType) -> &mut Tag {
        let index = self.tags.len();
        self.tags.push(Tag::new(target_type));
        &mut self.tags[index]
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns true if the collection holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Returns an iterator over all simple tags of all tags in order.
    pub fn simple_tags(&self) -> impl Iterator<Item = &SimpleTag> {
        self.tags.iter().flat_map(|t| t.simple_tags.iter())
    }

    /// Returns the first simple tag matching the name, compared ASCII
    /// case-insensitively.
    pub fn find(&self, name: &str) -> Option<&SimpleTag> {
        self.simple_tags().find(|st| st.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in &self.tags {
            writeln!(f, "{}:", tag.target_type)?;
            for st in &tag.simple_tags {
                writeln!(f, "  {st}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn target_type_values() {
        assert_eq!(TargetType::Album.value(), 50);
        assert_eq!(TargetType::try_from(30).unwrap(), TargetType::Track);
        assert!(TargetType::try_from(55).is_err());
    }

    #[test]
    fn builder_insertion_order() {
        let mut coll = Collection::new();
        let tag = coll.add_tag(TargetType::Album);
        tag.add_simple("TITLE", "a");
        tag.add_simple("ARTIST", "b").add_nested("ROLE", "performer");
        tag.add_track_uid(7);

        let names: Vec<&str> =
            coll.simple_tags().map(|st| st.name.as_str()).collect();
        assert_eq!(names, ["TITLE", "ARTIST"]);
        assert_eq!(coll.tags[0].simple_tags[1].nested[0].name, "ROLE");
        assert_eq!(coll.tags[0].track_uids, [7]);
    }

    #[test]
    fn display() {
        let mut coll = Collection::new();
        let tag = coll.add_tag(TargetType::Album);
        tag.add_simple("TITLE", "x");
        tag.simple_tags.push(SimpleTag::with_binary("COVER_ART", vec![1, 2, 3]));

        let s = coll.to_string();
        assert!(s.contains("ALBUM:"));
        assert!(s.contains("TITLE: x"));
        assert!(s.contains("COVER_ART: <3 bytes>"));
    }

    #[test]
    fn find_is_case_insensitive() {
        let mut coll = Collection::new();
        coll.add_tag(TargetType::Album).add_simple("Title", "x");
        assert!(coll.find("TITLE").is_some());
        assert!(coll.find("title").is_some());
        assert!(coll.find("artist").is_none());
    }
}
