// Ledger module - THE BALANCES
// Transactions and the peer -> balance mapping they mutate

mod balances;
mod transaction;

pub use balances::{Ledger, LedgerError, NewBalances, OverdraftPolicy};
pub use transaction::{Transaction, TransactionBuilder, TransactionError, TransactionKind};
