//! Frame metadata module
//!
//! Tag extraction is delegated to a [`MetadataSource`]; this module turns the
//! flat tag mapping into typed [`FrameMetadata`].

mod exiftool;
pub mod frame_metadata;
mod source;

pub use exiftool::{ExiftoolSource, parse_exiftool_json};
pub use frame_metadata::{
    Attitude, FrameMetadata, GeoPosition, dms_to_decimal, parse_capture_timestamp, tags,
};
pub use source::{InMemoryTags, MetadataSource, TagMap};
