use super::*;

/// The metadata handler (hdlr) atom payload: a `mdir` handler with Apple's
/// `appl` manufacturer and an empty name.
#[rustfmt::skip]
const HDLR_META: [u8; 25] = [
    0x00, 0x00, 0x00, 0x00, // version + flags
    0x00, 0x00, 0x00, 0x00, // pre-defined
    0x6d, 0x64, 0x69, 0x72, // handler type "mdir"
    0x61, 0x70, 0x70, 0x6c, // reserved, "appl"
    0x00, 0x00, 0x00, 0x00, // reserved
    0x00, 0x00, 0x00, 0x00, // reserved
    0x00,                   // name (empty)
];

/// Parses the items of the metadata item list into a collection holding a
/// single album level tag.
pub fn parse(reader: &mut (impl Read + Seek), ilst: &AtomBounds) -> crate::Result<Collection> {
    let mut tag = Tag::new(TargetType::Album);

    let end = ilst.end();
    let mut pos = ilst.content_pos();
    while pos + 8 <= end {
        reader.seek(SeekFrom::Start(pos))?;
        let head = head::parse(reader, end - pos)?;
        let bounds = AtomBounds::new(pos, head);
        if bounds.end() > end {
            return Err(crate::Error::new(
                ErrorKind::Corrupt,
                format!("Item '{}' overruns the item list", head.fourcc()),
            ));
        }

        match head.fourcc() {
            FREE | SKIP => (),
            _ => match parse_item(reader, &bounds) {
                Ok(Some(st)) => tag.simple_tags.push(st),
                Ok(None) => trace!("item '{}' has no data atom", head.fourcc()),
                // a malformed item stops its own descent, not the list
                Err(e) => debug!("skipping item '{}': {e}", head.fourcc()),
            },
        }

        pos = bounds.end();
    }

    Ok(Collection { tags: vec![tag] })
}

/// Parses a single item, the first data child determines its value.
fn parse_item(
    reader: &mut (impl Read + Seek),
    item: &AtomBounds,
) -> crate::Result<Option<SimpleTag>> {
    let end = item.end();
    let mut pos = item.content_pos();

    while pos + 8 <= end {
        reader.seek(SeekFrom::Start(pos))?;
        let head = head::parse(reader, end - pos)?;
        let bounds = AtomBounds::new(pos, head);
        if bounds.end() > end {
            return Err(crate::Error::new(
                ErrorKind::Corrupt,
                format!("Data atom overruns item '{}'", item.fourcc()),
            ));
        }

        if head.fourcc() == DATA && bounds.content_len() >= data::HEADER_SIZE {
            let datatype = reader.read_u32::<BigEndian>()?;
            let _locale = reader.read_u32::<BigEndian>()?;
            let len = bounds.content_len() - data::HEADER_SIZE;

            let name = match name_for_fourcc(item.fourcc()) {
                Some(n) => n.to_owned(),
                None => item.fourcc().to_string(),
            };

            let mut st = SimpleTag { name, is_default: true, ..Default::default() };
            match data::decode(reader, item.fourcc(), datatype, len)? {
                data::ItemValue::Text(s) => st.value = Some(s),
                data::ItemValue::Binary(b) => st.binary = Some(b),
            }
            return Ok(Some(st));
        }

        pos = bounds.end();
    }

    Ok(None)
}

/// Serializes all simple tags of the collection into the content bytes of an
/// item list atom, one item per simple tag.
pub fn serialize(collection: &Collection) -> crate::Result<Vec<u8>> {
    let mut buf = Vec::new();
    for st in collection.simple_tags() {
        write_item(&mut buf, st)?;
    }
    Ok(buf)
}

fn write_item(buf: &mut Vec<u8>, st: &SimpleTag) -> crate::Result<()> {
    let fourcc = match fourcc_for_name(&st.name) {
        Some(f) => f,
        None => {
            debug!("skipping tag with unmappable name {:?}", st.name);
            return Ok(());
        }
    };
    let (datatype, payload) = match data::encode(fourcc, st) {
        Some(v) => v,
        None => {
            debug!("skipping tag {:?} without encodable data", st.name);
            return Ok(());
        }
    };

    let data_size = Size::from(data::HEADER_SIZE + payload.len() as u64);
    let item_size = Size::from(data_size.len());

    head::write(buf, Head::from(item_size, fourcc))?;
    head::write(buf, Head::from(data_size, DATA))?;
    buf.write_u32::<BigEndian>(datatype)?;
    buf.write_u32::<BigEndian>(0)?; // locale
    buf.write_all(&payload)?;

    Ok(())
}

/// Builds a complete user data atom wrapping the collection:
/// `udta { meta { version + flags; hdlr; ilst { items } } }`.
pub fn build_udta(collection: &Collection) -> crate::Result<Vec<u8>> {
    let ilst_content = serialize(collection)?;

    let ilst_len = 8 + ilst_content.len() as u64;
    let hdlr_len = 8 + HDLR_META.len() as u64;
    let meta_len = 8 + 4 + hdlr_len + ilst_len;
    let udta_len = 8 + meta_len;

    let mut buf = Vec::with_capacity(udta_len as usize);
    head::write(&mut buf, Head::new(false, udta_len, USER_DATA))?;
    head::write(&mut buf, Head::new(false, meta_len, METADATA))?;
    head::write_full(&mut buf, 0, [0; 3])?;
    head::write(&mut buf, Head::new(false, hdlr_len, HANDLER_REFERENCE))?;
    buf.write_all(&HDLR_META)?;
    head::write(&mut buf, Head::new(false, ilst_len, ITEM_LIST))?;
    buf.write_all(&ilst_content)?;

    Ok(buf)
}
