//! A library for reading and writing iTunes style metadata in ISO-BMFF
//! containers (`.mp4`, `.m4a`, `.m4b`, `.m4v`, `.m4p`, `.mov`).
//!
//! Metadata lives in the `moov > udta > meta > ilst` atom hierarchy. The
//! box tree is mapped without loading the file, and writes reuse the
//! existing footprint where possible: an in-place update absorbs trailing
//! `free` padding, and only when the new item list does not fit is the file
//! rewritten box by box and atomically renamed, leaving the media data
//! (`mdat`) untouched either way.
//!
//! # Examples
//!
//! ## Reading and writing single tags
//! ```no_run
//! let mut mp4 = mp4tag::Mp4Tag::new();
//! mp4.open_rw("music.m4a").unwrap();
//!
//! println!("{}", mp4.read_tag_string("TITLE").unwrap());
//!
//! mp4.set_tag_string("ARTIST", Some("artist")).unwrap();
//! mp4.remove_tag("COMMENT").unwrap();
//! ```
//!
//! ## Replacing all tags with a built collection
//! ```no_run
//! use mp4tag::{Collection, Mp4Tag, TargetType};
//!
//! let mut collection = Collection::new();
//! let tag = collection.add_tag(TargetType::Album);
//! tag.add_simple("TITLE", "Test Title");
//! tag.add_simple("TRACK_NUMBER", "3/12");
//!
//! let mut mp4 = Mp4Tag::new();
//! mp4.open_rw("music.m4a").unwrap();
//! mp4.write_tags(&collection).unwrap();
//! ```
#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces
)]
pub use crate::atom::ident::Fourcc;
pub use crate::error::{strerror, Error, ErrorKind, Result};
pub use crate::tag::Mp4Tag;
pub use crate::types::{Collection, SimpleTag, Tag, TargetType};

mod atom;
mod error;
mod tag;
mod types;
mod util;
mod writer;

/// Returns the version of this crate.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
