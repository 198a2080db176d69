//! Pure extraction passes over the webhook envelope.

pub mod address;
pub mod memo;
pub mod payment;
pub mod value;

pub use address::{extract_addresses, is_stellar_address};
pub use memo::extract_memo;
pub use payment::extract_payment_details;
