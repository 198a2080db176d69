//! Mock collaborators and sample payload builders for tests.

mod mocks;
mod samples;

pub use mocks::{MockEmailNotifier, MockTransactionStore, MockUserStore, MockWalletStore, SentEmail};
pub use samples::{
    sample_hook, sample_stored_transaction, sample_wallet, CONTRACT, RECIPIENT, SENDER,
};
