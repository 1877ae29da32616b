use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, warn};
use tempfile::Builder;

use crate::atom::{head, ilst, AtomBounds, Head, Size, ITEM_LIST, MOVIE, USER_DATA};
use crate::tag::{open_mode, Mp4Tag};
use crate::util::WriteUtil;
use crate::{Collection, ErrorKind};

const COPY_BUF_LEN: usize = 64 * 1024;

impl Mp4Tag {
    /// Writes the collection using the in-place strategy, escalating to a
    /// full rewrite when the existing footprint cannot hold the new item
    /// list. Callers have verified the file is open and writable, and have
    /// invalidated the cached collection.
    pub(crate) fn commit(&mut self, collection: &Collection, force_rewrite: bool) -> crate::Result<()> {
        let ilst_content = ilst::serialize(collection)?;

        if !force_rewrite {
            match self.write_in_place(&ilst_content) {
                Ok(()) => return Ok(()),
                Err(e) if matches!(e.kind, ErrorKind::NoSpace) => {
                    debug!("in-place write not possible ({e}), rewriting the file");
                }
                Err(e) => return Err(e),
            }
        }

        let udta = ilst::build_udta(collection)?;
        self.rewrite(&udta)
    }

    /// Overwrites the existing item list and its trailing padding without
    /// moving any other byte of the file. The total space consumed stays the
    /// same, so no parent atom length changes.
    fn write_in_place(&mut self, ilst_content: &[u8]) -> crate::Result<()> {
        let info = match &self.info {
            Some(i) => i,
            None => {
                return Err(crate::Error::new(
                    ErrorKind::NotOpen,
                    "No parsed file structure".to_owned(),
                ));
            }
        };
        let ilst = match &info.ilst {
            Some(b) => b,
            None => {
                return Err(crate::Error::new(
                    ErrorKind::NoSpace,
                    "No existing item list to overwrite".to_owned(),
                ));
            }
        };

        let new_ilst_len = 8 + ilst_content.len() as u64;
        let mut available = ilst.len();
        if let Some(free) = &info.free {
            available += free.len();
        }
        if new_ilst_len > available {
            return Err(crate::Error::new(
                ErrorKind::NoSpace,
                format!("New item list needs {new_ilst_len} bytes, {available} available"),
            ));
        }

        let file = match &mut self.file {
            Some(f) => f,
            None => {
                return Err(crate::Error::new(ErrorKind::NotOpen, "No open file".to_owned()));
            }
        };

        file.seek(SeekFrom::Start(ilst.pos()))?;
        head::write(file, Head::new(false, new_ilst_len, ITEM_LIST))?;
        file.write_all(ilst_content)
            .map_err(|e| crate::Error::new(ErrorKind::WriteFailed, e.to_string()))?;

        let padding = available - new_ilst_len;
        if padding >= 8 {
            head::write_free(file, padding)?;
        } else if padding > 0 {
            // too small for a free atom header
            file.write_zeros(padding)?;
        }

        file.sync_all()?;
        debug!("wrote {new_ilst_len} item list bytes in place, {padding} bytes of padding");

        self.reparse()
    }

    /// Rewrites the whole file into a scratch file next to the original,
    /// preserving every top-level atom verbatim except `moov`, whose user
    /// data is replaced by the prebuilt one. The scratch file is renamed over
    /// the original only once it is complete, a failure along the way leaves
    /// the original untouched.
    fn rewrite(&mut self, udta: &[u8]) -> crate::Result<()> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => {
                return Err(crate::Error::new(ErrorKind::NotOpen, "No open file".to_owned()));
            }
        };
        let (moov_pos, old_moov_len, mdat_pos) = match &self.info {
            Some(i) => (i.moov.pos(), i.moov.len(), i.mdat.as_ref().map(|b| b.pos())),
            None => {
                return Err(crate::Error::new(
                    ErrorKind::NotOpen,
                    "No parsed file structure".to_owned(),
                ));
            }
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let prefix = path.file_name().and_then(|n| n.to_str()).unwrap_or("rewrite");
        let mut scratch = Builder::new()
            .prefix(prefix)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| crate::Error::new(ErrorKind::Io(e), "Error creating scratch file"))?;

        {
            let file = match &self.file {
                Some(f) => f,
                None => {
                    return Err(crate::Error::new(ErrorKind::NotOpen, "No open file".to_owned()));
                }
            };
            let mut reader = BufReader::new(file);
            let src_len = reader.seek(SeekFrom::End(0))?;
            let writer = scratch.as_file_mut();

            let mut pos = 0;
            while pos + 8 <= src_len {
                reader.seek(SeekFrom::Start(pos))?;
                let head = head::parse(&mut reader, src_len - pos)?;
                let bounds = AtomBounds::new(pos, head);
                if bounds.end() > src_len {
                    return Err(crate::Error::new(
                        ErrorKind::Corrupt,
                        format!("Atom '{}' at {pos} extends past the end of the file", head.fourcc()),
                    ));
                }

                if head.fourcc() == MOVIE {
                    let new_moov_len = copy_moov(&mut reader, writer, &bounds, udta)?;
                    if new_moov_len != old_moov_len {
                        if let Some(mdat_pos) = mdat_pos {
                            if mdat_pos > moov_pos {
                                warn!(
                                    "moov size changed while mdat follows it, absolute chunk \
                                     offsets (stco/co64) may now be stale"
                                );
                            }
                        }
                    }
                } else {
                    copy_bytes(&mut reader, writer, bounds.pos(), head.len())?;
                }

                pos = bounds.end();
            }

            writer.sync_all()?;
        }

        debug!("rewrote '{}', replacing it atomically", path.display());

        // both handles have to be released before the rename takes effect
        // everywhere, the original is reopened from the path afterwards
        self.file = None;
        match scratch.persist(&path) {
            Ok(persisted) => drop(persisted),
            Err(e) => {
                let msg = e.error.to_string();
                drop(e.file);
                self.file = open_mode(&path, self.writable).ok();
                return Err(crate::Error::new(ErrorKind::RenameFailed, msg));
            }
        }

        let file = open_mode(&path, self.writable)
            .map_err(|e| crate::Error::new(ErrorKind::Io(e), "Error reopening rewritten file"))?;
        self.file = Some(file);

        self.reparse()
    }
}

/// Copies the movie atom, dropping its user data children and appending the
/// new user data instead. Returns the length of the written atom.
fn copy_moov(
    reader: &mut (impl Read + Seek),
    writer: &mut File,
    moov: &AtomBounds,
    udta: &[u8],
) -> crate::Result<u64> {
    let end = moov.end();

    // first pass measures the children that survive
    let mut kept = 0;
    let mut pos = moov.content_pos();
    while pos + 8 <= end {
        reader.seek(SeekFrom::Start(pos))?;
        let head = head::parse(reader, end - pos)?;
        let bounds = AtomBounds::new(pos, head);
        if bounds.end() > end {
            return Err(crate::Error::new(
                ErrorKind::Corrupt,
                format!("Atom '{}' overruns the movie atom", head.fourcc()),
            ));
        }

        if head.fourcc() != USER_DATA {
            kept += head.len();
        }
        pos = bounds.end();
    }

    let size = Size::from(kept + udta.len() as u64);
    head::write(writer, Head::from(size, MOVIE))?;

    // second pass copies the surviving children verbatim, in order
    pos = moov.content_pos();
    while pos + 8 <= end {
        reader.seek(SeekFrom::Start(pos))?;
        let head = head::parse(reader, end - pos)?;
        let bounds = AtomBounds::new(pos, head);

        if head.fourcc() != USER_DATA {
            copy_bytes(reader, writer, bounds.pos(), head.len())?;
        }
        pos = bounds.end();
    }

    writer
        .write_all(udta)
        .map_err(|e| crate::Error::new(ErrorKind::WriteFailed, e.to_string()))?;

    Ok(size.len())
}

/// Copies `len` bytes starting at `pos` from the reader to the writer.
fn copy_bytes(
    reader: &mut (impl Read + Seek),
    writer: &mut impl Write,
    pos: u64,
    len: u64,
) -> crate::Result<()> {
    reader.seek(SeekFrom::Start(pos))?;

    let mut buf = vec![0; COPY_BUF_LEN];
    let mut remaining = len;
    while remaining > 0 {
        let chunk = remaining.min(buf.len() as u64) as usize;
        reader.read_exact(&mut buf[..chunk])?;
        writer
            .write_all(&buf[..chunk])
            .map_err(|e| crate::Error::new(ErrorKind::WriteFailed, e.to_string()))?;
        remaining -= chunk as u64;
    }

    Ok(())
}
