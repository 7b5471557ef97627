//! Value-store encoding of observation payloads.
//!
//! [`keys`] holds the key grammar shared by every payload shape;
//! [`value`] maps structured payloads onto flat key/value pairs and back.

pub mod keys;
pub mod value;

pub use keys::{KeyReader, ValueKey, ENTRY_REMOVED, UNAVAILABLE};
pub use value::{
    decode_condition, decode_data_set, decode_payload, decode_scalar, decode_table,
    decode_time_series, encode_condition, encode_data_set, encode_payload, encode_scalar,
    encode_table, encode_time_series, from_wire_pair, from_wire_pairs, to_wire_pairs,
};
