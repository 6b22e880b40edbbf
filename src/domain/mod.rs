pub mod transaction;

pub use transaction::{
    MoneyInfo, MoneyPatch, Party, Transaction, TransactionStatus, TransitionError,
};
