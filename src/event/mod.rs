//! Dashboard events carried on the stream.

mod decode;

pub use decode::{DecodedEvent, FILENAME_FIELD, KIND_FIELD, PAYLOAD_FIELD, decode};
