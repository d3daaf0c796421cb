//! Response decoder module
//!
//! Three independent decode paths, chosen by collector configuration:
//!
//! - **Envelope**: the full pagination envelope, used to compute the total
//!   page count when the API reports `size` up front
//! - **Next link**: only the `next` field, turned into the next page token or
//!   the end-of-collection signal
//! - **Raw records**: only the `values` array, kept verbatim for storage
//!
//! Status classification runs before any of them and short-circuits decoding.

mod decoders;
mod types;

pub use decoders::{
    classify_status, decode_envelope, decode_next_link, decode_raw_records, decode_response,
    total_pages,
};
pub use types::{NextLink, PaginationEnvelope, StatusClass};
