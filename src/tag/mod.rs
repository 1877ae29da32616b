use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::atom::info::FileInfo;
use crate::atom::{ftyp, ilst};
use crate::{Collection, ErrorKind, SimpleTag, TargetType};

/// Opens the file at the path read-only or read/write.
pub(crate) fn open_mode(path: &Path, writable: bool) -> io::Result<File> {
    match writable {
        true => OpenOptions::new().read(true).write(true).open(path),
        false => File::open(path),
    }
}

/// A context owning an open mp4 file and a lazily parsed tag collection.
///
/// The collection returned by [`read_tags`](Mp4Tag::read_tags) is owned by
/// the context and cached until the next mutating operation or
/// [`close`](Mp4Tag::close) invalidates it.
///
/// # Examples
/// ```no_run
/// let mut mp4 = mp4tag::Mp4Tag::new();
/// mp4.open_rw("music.m4a").unwrap();
///
/// println!("{}", mp4.read_tag_string("TITLE").unwrap());
///
/// mp4.set_tag_string("ARTIST", Some("artist")).unwrap();
/// mp4.close();
/// ```
#[derive(Debug, Default)]
pub struct Mp4Tag {
    pub(crate) file: Option<File>,
    pub(crate) path: Option<PathBuf>,
    pub(crate) writable: bool,
    pub(crate) info: Option<FileInfo>,
    pub(crate) cached: Option<Collection>,
}

impl Mp4Tag {
    /// Creates a context without an open file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the file at the path read-only, validates its brand and maps
    /// its box tree.
    pub fn open(&mut self, path: impl AsRef<Path>) -> crate::Result<()> {
        self.open_impl(path.as_ref(), false)
    }

    /// Opens the file at the path read/write, validates its brand and maps
    /// its box tree.
    pub fn open_rw(&mut self, path: impl AsRef<Path>) -> crate::Result<()> {
        self.open_impl(path.as_ref(), true)
    }

    fn open_impl(&mut self, path: &Path, writable: bool) -> crate::Result<()> {
        if self.file.is_some() {
            return Err(crate::Error::new(
                ErrorKind::AlreadyOpen,
                format!("A file is already open: '{}'", path.display()),
            ));
        }

        let mut file = open_mode(path, writable)
            .map_err(|e| crate::Error::new(ErrorKind::Io(e), "Error opening file"))?;

        self.path = Some(path.to_owned());
        self.writable = writable;

        match map_file(&mut file) {
            Ok(info) => {
                debug!("opened '{}' ({})", path.display(), if writable { "rw" } else { "ro" });
                self.info = Some(info);
                self.file = Some(file);
                Ok(())
            }
            Err(e) => {
                // leave no half-constructed state behind
                self.close();
                Err(e)
            }
        }
    }

    /// Closes the file and releases the cached collection. Idempotent.
    pub fn close(&mut self) {
        self.cached = None;
        self.info = None;
        self.file = None;
        self.path = None;
        self.writable = false;
    }

    /// Returns whether the context has an open file.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Returns the path of the open file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads all tags from the file. The collection is cached and remains
    /// borrowed from the context, the next mutating operation or
    /// [`close`](Mp4Tag::close) invalidates it.
    pub fn read_tags(&mut self) -> crate::Result<&Collection> {
        if self.file.is_none() {
            return Err(crate::Error::new(ErrorKind::NotOpen, "No open file".to_owned()));
        }

        if self.cached.is_none() {
            let info = match &self.info {
                Some(i) => i,
                None => {
                    return Err(crate::Error::new(
                        ErrorKind::NotOpen,
                        "No parsed file structure".to_owned(),
                    ));
                }
            };
            let ilst_bounds = match &info.ilst {
                Some(b) => b,
                None => {
                    return Err(crate::Error::new(
                        ErrorKind::NoTags,
                        "The file contains no metadata item list".to_owned(),
                    ));
                }
            };
            let file = match &mut self.file {
                Some(f) => f,
                None => unreachable!(),
            };

            self.cached = Some(ilst::parse(file, ilst_bounds)?);
        }

        match &self.cached {
            Some(c) => Ok(c),
            None => unreachable!(),
        }
    }

    /// Reads a single tag value by name, compared ASCII case-insensitively.
    pub fn read_tag_string(&mut self, name: &str) -> crate::Result<&str> {
        if name.is_empty() {
            return Err(crate::Error::new(ErrorKind::InvalidArg, "Empty tag name".to_owned()));
        }

        let collection = self.read_tags()?;
        let found = collection
            .simple_tags()
            .find(|st| st.value.is_some() && st.name.eq_ignore_ascii_case(name));

        match found.and_then(|st| st.value.as_deref()) {
            Some(value) => Ok(value),
            None => Err(crate::Error::new(
                ErrorKind::TagNotFound,
                format!("No tag named {name:?}"),
            )),
        }
    }

    /// Copies a single tag value into the buffer, NUL terminated, and
    /// returns the value's length in bytes. Fails with
    /// [`ErrorKind::TagTooLarge`] when the buffer cannot hold the value and
    /// its terminator.
    pub fn read_tag_into(&mut self, name: &str, buf: &mut [u8]) -> crate::Result<usize> {
        if buf.is_empty() {
            return Err(crate::Error::new(ErrorKind::InvalidArg, "Empty buffer".to_owned()));
        }

        let value = self.read_tag_string(name)?;
        let bytes = value.as_bytes();
        if bytes.len() + 1 > buf.len() {
            return Err(crate::Error::new(
                ErrorKind::TagTooLarge,
                format!("Tag value needs {} bytes", bytes.len() + 1),
            ));
        }

        buf[..bytes.len()].copy_from_slice(bytes);
        buf[bytes.len()] = 0;
        Ok(bytes.len())
    }

    /// Replaces all tags in the file with the collection, trying the
    /// in-place strategy first and rewriting the file when it does not fit.
    pub fn write_tags(&mut self, collection: &Collection) -> crate::Result<()> {
        self.check_writable()?;
        self.cached = None;
        self.commit(collection, false)
    }

    /// Replaces all tags in the file with the collection, unconditionally
    /// taking the rewrite-then-rename path. The in-place strategy is faster
    /// but a crash mid-write can leave the metadata region torn, a rewrite
    /// only ever replaces the file atomically.
    pub fn rewrite_tags(&mut self, collection: &Collection) -> crate::Result<()> {
        self.check_writable()?;
        self.cached = None;
        self.commit(collection, true)
    }

    /// Sets or creates a single tag at the album target level. Passing
    /// `None` removes the tag.
    pub fn set_tag_string(&mut self, name: &str, value: Option<&str>) -> crate::Result<()> {
        if name.is_empty() {
            return Err(crate::Error::new(ErrorKind::InvalidArg, "Empty tag name".to_owned()));
        }

        self.replace_tag(name, value.map(|v| SimpleTag::new(name, v)))
    }

    /// Removes a tag by name.
    pub fn remove_tag(&mut self, name: &str) -> crate::Result<()> {
        self.set_tag_string(name, None)
    }

    /// Rebuilds the collection with every tag but the named one, appends the
    /// replacement if there is one, and writes the result.
    fn replace_tag(&mut self, name: &str, replacement: Option<SimpleTag>) -> crate::Result<()> {
        self.check_writable()?;

        let mut work = Collection::new();
        {
            let tag = work.add_tag(TargetType::Album);
            match self.read_tags() {
                Ok(existing) => {
                    for st in existing.simple_tags() {
                        if st.name.eq_ignore_ascii_case(name) {
                            continue;
                        }
                        tag.simple_tags.push(st.clone());
                    }
                }
                Err(e) if matches!(e.kind, ErrorKind::NoTags) => (),
                Err(e) => return Err(e),
            }

            if let Some(st) = replacement {
                tag.simple_tags.push(st);
            }
        }

        self.write_tags(&work)
    }

    fn check_writable(&self) -> crate::Result<()> {
        if self.file.is_none() {
            return Err(crate::Error::new(ErrorKind::NotOpen, "No open file".to_owned()));
        }
        if !self.writable {
            return Err(crate::Error::new(
                ErrorKind::ReadOnly,
                "The file was opened read-only".to_owned(),
            ));
        }
        Ok(())
    }

    /// Refreshes the file map after a write.
    pub(crate) fn reparse(&mut self) -> crate::Result<()> {
        let file = match &mut self.file {
            Some(f) => f,
            None => {
                return Err(crate::Error::new(ErrorKind::NotOpen, "No open file".to_owned()));
            }
        };
        self.info = Some(FileInfo::scan(file)?);
        Ok(())
    }
}

/// Convenience accessors, thin shims over the generic tag operations.
impl Mp4Tag {
    /// Returns the title (`©nam`).
    pub fn title(&mut self) -> Option<&str> {
        self.read_tag_string("TITLE").ok()
    }

    /// Sets the title (`©nam`).
    pub fn set_title(&mut self, title: &str) -> crate::Result<()> {
        self.set_tag_string("TITLE", Some(title))
    }

    /// Returns the artist (`©ART`).
    pub fn artist(&mut self) -> Option<&str> {
        self.read_tag_string("ARTIST").ok()
    }

    /// Sets the artist (`©ART`).
    pub fn set_artist(&mut self, artist: &str) -> crate::Result<()> {
        self.set_tag_string("ARTIST", Some(artist))
    }

    /// Returns the album (`©alb`).
    pub fn album(&mut self) -> Option<&str> {
        self.read_tag_string("ALBUM").ok()
    }

    /// Sets the album (`©alb`).
    pub fn set_album(&mut self, album: &str) -> crate::Result<()> {
        self.set_tag_string("ALBUM", Some(album))
    }

    /// Returns the album artist (`aART`).
    pub fn album_artist(&mut self) -> Option<&str> {
        self.read_tag_string("ALBUM_ARTIST").ok()
    }

    /// Sets the album artist (`aART`).
    pub fn set_album_artist(&mut self, album_artist: &str) -> crate::Result<()> {
        self.set_tag_string("ALBUM_ARTIST", Some(album_artist))
    }

    /// Returns the genre (`©gen`).
    pub fn genre(&mut self) -> Option<&str> {
        self.read_tag_string("GENRE").ok()
    }

    /// Sets the genre (`©gen`).
    pub fn set_genre(&mut self, genre: &str) -> crate::Result<()> {
        self.set_tag_string("GENRE", Some(genre))
    }

    /// Returns the track number (`trkn`) in its `"N"` or `"N/T"` form.
    pub fn track_number(&mut self) -> Option<&str> {
        self.read_tag_string("TRACK_NUMBER").ok()
    }

    /// Sets the track number (`trkn`), total 0 means unset.
    pub fn set_track_number(&mut self, number: u16, total: u16) -> crate::Result<()> {
        let value = match total {
            0 => number.to_string(),
            _ => format!("{number}/{total}"),
        };
        self.set_tag_string("TRACK_NUMBER", Some(&value))
    }

    /// Returns the disc number (`disk`) in its `"N"` or `"N/T"` form.
    pub fn disc_number(&mut self) -> Option<&str> {
        self.read_tag_string("DISC_NUMBER").ok()
    }

    /// Sets the disc number (`disk`), total 0 means unset.
    pub fn set_disc_number(&mut self, number: u16, total: u16) -> crate::Result<()> {
        let value = match total {
            0 => number.to_string(),
            _ => format!("{number}/{total}"),
        };
        self.set_tag_string("DISC_NUMBER", Some(&value))
    }

    /// Returns the tempo in beats per minute (`tmpo`).
    pub fn bpm(&mut self) -> Option<u16> {
        self.read_tag_string("BPM").ok().and_then(|v| v.parse().ok())
    }

    /// Sets the tempo in beats per minute (`tmpo`).
    pub fn set_bpm(&mut self, bpm: u16) -> crate::Result<()> {
        self.set_tag_string("BPM", Some(&bpm.to_string()))
    }

    /// Returns whether the compilation flag (`cpil`) is set.
    pub fn compilation(&mut self) -> bool {
        matches!(self.read_tag_string("COMPILATION"), Ok("1"))
    }

    /// Sets the compilation flag (`cpil`).
    pub fn set_compilation(&mut self, compilation: bool) -> crate::Result<()> {
        self.set_tag_string("COMPILATION", Some(if compilation { "1" } else { "0" }))
    }

    /// Returns the raw cover art bytes (`covr`).
    pub fn cover_art(&mut self) -> Option<&[u8]> {
        let collection = self.read_tags().ok()?;
        collection
            .simple_tags()
            .find(|st| st.binary.is_some() && st.name.eq_ignore_ascii_case("COVER_ART"))
            .and_then(|st| st.binary.as_deref())
    }

    /// Sets the cover art (`covr`) from raw jpeg or png bytes.
    pub fn set_cover_art(&mut self, image: Vec<u8>) -> crate::Result<()> {
        self.replace_tag("COVER_ART", Some(SimpleTag::with_binary("COVER_ART", image)))
    }
}

fn map_file(file: &mut File) -> crate::Result<FileInfo> {
    ftyp::validate(file)?;
    FileInfo::scan(file)
}
