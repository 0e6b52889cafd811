use wdk_schemas::FieldError;
use wdk_store::StoreError;
use wdk_wallet::WalletError;

/// Failure of an engine operation.  Nothing has been applied to the lot
/// pool or the store beyond what the variant says.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Input rejected before any mutation; one entry per offending field.
    Validation(Vec<FieldError>),
    /// A lot-pool invariant blocked the operation.
    Wallet(WalletError),
    /// A collaborator failed; the engine does not retry.
    Store(StoreError),
    /// The requested change is not expressible (e.g. editing a recorded
    /// stock split).
    UnsupportedEdit { reason: String },
}

impl EngineError {
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<WalletError> for EngineError {
    fn from(err: WalletError) -> Self {
        Self::Wallet(err)
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(errors) => {
                write!(f, "validation failed:")?;
                for e in errors {
                    write!(f, " [{e}]")?;
                }
                Ok(())
            }
            Self::Wallet(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::UnsupportedEdit { reason } => write!(f, "unsupported edit: {reason}"),
        }
    }
}

impl std::error::Error for EngineError {}
