pub mod wire;
pub mod length;
pub mod encoder;
pub mod decoder;

pub use length::byte_length;
pub use encoder::{encode, encode_nested};
pub use decoder::{check_schema_id, decode, decode_nested, verify_schema_id};
