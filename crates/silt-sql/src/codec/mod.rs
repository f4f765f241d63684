//! Key and row codecs.
//!
//! Two very different encodings live here:
//!
//! - `key`: order-preserving, used for every tree key. Byte comparison of
//!   two encoded keys matches the typed comparison of their values, which
//!   is what lets SQL range predicates collapse to byte intervals.
//! - `row`: exact, used for row bodies. Optimized for lazy decoding, not
//!   for ordering.

pub mod key;
pub mod row;
