//! Domain model: webhook envelope, persisted records, errors, and the trait
//! seams the service layer is built against.

pub mod envelope;
pub mod error;
pub mod traits;
pub mod types;

pub use envelope::{
    CanonicalTx, DiagnosticEvent, HookData, InvokeContract, Operation, ParsedHook, SorobanEvent,
    SorobanHook, Transaction, TxBody,
};
pub use error::{AppError, ConfigError, DatabaseError, ExternalServiceError, ValidationError};
pub use traits::{EmailNotifier, TransactionStore, UserStore, WalletStore};
pub use types::{
    format_display_amount, ChangeDirection, Confidence, ErrorResponse, EventRecord, HealthResponse,
    HealthStatus, NewTransaction, OperationRecord, PaymentDetails, SignatureRecord,
    StateChangeRecord, StoredTransaction, User, Wallet, WalletMapping, WebhookResponse,
    NATIVE_CURRENCY, STROOPS_PER_UNIT,
};
