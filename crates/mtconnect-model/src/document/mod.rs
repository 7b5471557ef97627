//! Document carrier: a generic element tree and its XML text form.

pub mod element;
pub mod xml;

pub use element::{Element, HASH_ATTRIBUTE};
pub use xml::{parse_xml, to_xml};
