use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};

use crate::util::{ReadUtil, SeekUtil, WriteUtil};
use crate::{Collection, ErrorKind, SimpleTag, Tag, TargetType};

pub(crate) use head::{AtomBounds, Head, Size};
pub(crate) use ident::*;

pub(crate) mod data;
pub(crate) mod ftyp;
pub(crate) mod head;
pub mod ident;
pub(crate) mod ilst;
pub(crate) mod info;
