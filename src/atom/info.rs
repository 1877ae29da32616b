use super::*;

/// The position of every atom relevant to metadata editing, gathered without
/// reading any payload.
///
/// Presence of a deeper atom implies its ancestors: an item list is only
/// recorded when the whole `moov > udta > meta > ilst` chain is intact.
#[derive(Clone, Debug)]
pub struct FileInfo {
    /// The total file length at scan time.
    pub file_len: u64,
    /// The filetype atom.
    pub ftyp: Option<AtomBounds>,
    /// The movie atom. Files without one are rejected.
    pub moov: AtomBounds,
    /// The media data atom.
    pub mdat: Option<AtomBounds>,
    /// The user data atom inside `moov`.
    pub udta: Option<AtomBounds>,
    /// The metadata atom inside `udta`.
    pub meta: Option<AtomBounds>,
    /// The handler reference atom inside `meta`.
    pub hdlr: Option<AtomBounds>,
    /// The metadata item list inside `meta`.
    pub ilst: Option<AtomBounds>,
    /// A free (or skip) atom immediately following the item list, bounded by
    /// the end of `meta`. Free space elsewhere is not contiguous with the
    /// item list and cannot be reused for in-place writes.
    pub free: Option<AtomBounds>,
}

impl FileInfo {
    /// Scans the box tree and records the metadata chain.
    pub fn scan(reader: &mut (impl Read + Seek)) -> crate::Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;
        if file_len < 8 {
            return Err(crate::Error::new(
                ErrorKind::Truncated,
                format!("File of {file_len} bytes cannot contain an atom"),
            ));
        }

        let mut ftyp = None;
        let mut moov = None;
        let mut mdat = None;

        let mut pos = 0;
        while pos + 8 <= file_len {
            reader.seek(SeekFrom::Start(pos))?;
            let head = match head::parse(reader, file_len - pos) {
                Ok(h) => h,
                Err(e) => {
                    debug!("stopping top-level scan at {pos}: {e}");
                    break;
                }
            };
            let bounds = AtomBounds::new(pos, head);
            if bounds.end() > file_len {
                debug!(
                    "stopping top-level scan, atom '{}' at {pos} extends past the end of the file",
                    head.fourcc()
                );
                break;
            }

            trace!("top-level atom '{}' at {pos}, {} bytes", head.fourcc(), head.len());
            match head.fourcc() {
                FILETYPE => ftyp = Some(bounds),
                MOVIE => moov = Some(bounds),
                MEDIA_DATA => mdat = Some(bounds),
                _ => (),
            }

            pos = bounds.end();
        }

        let moov = match moov {
            Some(m) => m,
            None => {
                return Err(crate::Error::new(
                    ErrorKind::NotMp4,
                    "No movie atom (moov) found".to_owned(),
                ));
            }
        };

        let mut info = Self {
            file_len,
            ftyp,
            moov,
            mdat,
            udta: None,
            meta: None,
            hdlr: None,
            ilst: None,
            free: None,
        };

        info.udta = find_child(
            reader,
            info.moov.content_pos(),
            info.moov.content_len(),
            USER_DATA,
        )?;

        if let Some(udta) = &info.udta {
            info.meta = find_child(reader, udta.content_pos(), udta.content_len(), METADATA)?;
        }

        if let Some(meta) = &info.meta {
            // meta is a full atom, version and flags precede its children
            reader.seek(SeekFrom::Start(meta.content_pos()))?;
            let (version, _) = head::parse_full(reader)?;
            trace!("metadata atom (meta) version {version}");

            let content_pos = meta.content_pos() + 4;
            let content_len = meta.content_len().saturating_sub(4);
            info.hdlr = find_child(reader, content_pos, content_len, HANDLER_REFERENCE)?;
            info.ilst = find_child(reader, content_pos, content_len, ITEM_LIST)?;
        }

        if let (Some(ilst), Some(meta)) = (&info.ilst, &info.meta) {
            info.free = find_free_after(reader, ilst.end(), meta.end())?;
        }

        debug!(
            "scanned {} bytes: ftyp {}, moov at {}, udta {}, hdlr {}, ilst {}, trailing free {}",
            info.file_len,
            info.ftyp.is_some(),
            info.moov.pos(),
            info.udta.is_some(),
            info.hdlr.is_some(),
            info.ilst.is_some(),
            info.free.is_some(),
        );

        Ok(info)
    }
}

/// Scans the children of a container for the first atom of the given type.
/// Not finding one is expected and yields `None`.
fn find_child(
    reader: &mut (impl Read + Seek),
    content_pos: u64,
    content_len: u64,
    fourcc: Fourcc,
) -> crate::Result<Option<AtomBounds>> {
    let end = content_pos + content_len;
    let mut pos = content_pos;

    while pos + 8 <= end {
        reader.seek(SeekFrom::Start(pos))?;
        let head = head::parse(reader, end - pos)?;
        let bounds = AtomBounds::new(pos, head);
        if bounds.end() > end {
            return Err(crate::Error::new(
                ErrorKind::Corrupt,
                format!("Atom '{}' at {pos} overruns its parent", head.fourcc()),
            ));
        }

        if head.fourcc() == fourcc {
            return Ok(Some(bounds));
        }

        pos = bounds.end();
    }

    Ok(None)
}

/// Checks for a free (or skip) atom starting exactly at `pos`, bounded by the
/// containing atom's end.
fn find_free_after(
    reader: &mut (impl Read + Seek),
    pos: u64,
    end: u64,
) -> crate::Result<Option<AtomBounds>> {
    if pos + 8 > end {
        return Ok(None);
    }

    reader.seek(SeekFrom::Start(pos))?;
    let head = head::parse(reader, end - pos)?;
    match head.fourcc() {
        FREE | SKIP => Ok(Some(AtomBounds::new(pos, head))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    fn boxed(fourcc: Fourcc, content: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        head::write(&mut buf, Head::new(false, 8 + content.len() as u64, fourcc)).unwrap();
        buf.extend(content);
        buf
    }

    fn sample() -> Vec<u8> {
        let ilst = boxed(ITEM_LIST, &[]);
        let free = boxed(FREE, &[0; 24]);
        let mut meta_content = vec![0u8; 4];
        meta_content.extend(boxed(HANDLER_REFERENCE, &[0; 25]));
        meta_content.extend(&ilst);
        meta_content.extend(&free);
        let meta = boxed(METADATA, &meta_content);
        let udta = boxed(USER_DATA, &meta);
        let moov = boxed(MOVIE, &udta);

        let mut file = boxed(FILETYPE, b"M4A \x00\x00\x00\x00isom");
        file.extend(&moov);
        file.extend(boxed(MEDIA_DATA, &[0xAB; 100]));
        file
    }

    #[test]
    fn scan_finds_the_chain() {
        let bytes = sample();
        let info = FileInfo::scan(&mut Cursor::new(&bytes)).unwrap();

        assert!(info.ftyp.is_some());
        assert!(info.mdat.is_some());
        let ilst = info.ilst.unwrap();
        let free = info.free.unwrap();
        assert_eq!(ilst.len(), 8);
        assert_eq!(free.pos(), ilst.end());
        assert_eq!(free.len(), 32);
        assert!(info.hdlr.is_some());
    }

    #[test]
    fn scan_without_udta() {
        let moov = boxed(MOVIE, &boxed(Fourcc(*b"mvhd"), &[0; 100]));
        let mut file = boxed(FILETYPE, b"M4A \x00\x00\x00\x00isom");
        file.extend(&moov);

        let info = FileInfo::scan(&mut Cursor::new(&file)).unwrap();
        assert!(info.udta.is_none());
        assert!(info.meta.is_none());
        assert!(info.ilst.is_none());
        assert!(info.free.is_none());
    }

    #[test]
    fn scan_requires_moov() {
        let file = boxed(FILETYPE, b"M4A \x00\x00\x00\x00isom");
        let err = FileInfo::scan(&mut Cursor::new(&file)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NotMp4));
    }

    #[test]
    fn overrunning_child_is_corrupt() {
        // udta claims more space than moov provides
        let mut udta = Vec::new();
        head::write(&mut udta, Head::new(false, 64, USER_DATA)).unwrap();
        let moov = boxed(MOVIE, &udta);
        let mut file = boxed(FILETYPE, b"M4A \x00\x00\x00\x00isom");
        file.extend(&moov);

        let err = FileInfo::scan(&mut Cursor::new(&file)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Corrupt));
    }
}
