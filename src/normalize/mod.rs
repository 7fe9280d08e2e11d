//! Text-to-canonical-value normalizers.
//!
//! Everything here is pure and infallible: junk in, blank (or best-effort
//! passthrough) out. The pipeline calls these inline wherever a raw value is
//! accepted from a source.

pub mod ai_reply;
pub mod price;
pub mod rating;

pub use ai_reply::{parse_lookup_reply, LookupFields};
pub use price::{extract_price_from_text, normalize_price, PriceBand};
pub use rating::normalize_rating;
