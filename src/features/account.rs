use super::transaction::{Transaction, TransactionType};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Number of records kept in an account's mini statement
pub(crate) const HISTORY_LIMIT: usize = 10;

/// Caller-assigned card number. Doubles as the store key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[serde(transparent)]
pub struct CardNumber(String);

impl CardNumber {
    pub fn new(card_no: impl Into<String>) -> Self {
        Self(card_no.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for CardNumber {
    fn from(card_no: &str) -> Self {
        Self::new(card_no)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum LedgerError {
    #[error(
        "You cannot withdraw {requested}. It is more than {available} available in your account"
    )]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Depositing {requested} would take the balance past the largest representable amount")]
    Overflow { requested: Decimal },
}

type LedgerResult<T> = anyhow::Result<T, LedgerError>;

/// Account holder's record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    name: String,

    /// Plaintext, compared by exact match
    pin: String,

    /// Always equal to the balance of the most recent transaction, or zero
    balance: Decimal,

    /// Most recent first, at most `HISTORY_LIMIT` entries
    transactions: VecDeque<Transaction>,
}

impl Account {
    pub(crate) fn new(name: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pin: pin.into(),
            balance: dec!(0),
            transactions: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    pub(crate) fn pin_matches(&self, pin: &str) -> bool {
        self.pin == pin
    }

    /// Applies a signed amount to the balance and records it at the head of the history.
    ///
    /// Nothing changes when the resulting balance would be negative or out of range.
    pub(crate) fn apply(
        &mut self,
        amount: Decimal,
        transaction_type: TransactionType,
        date: String,
    ) -> LedgerResult<&Transaction> {
        let new_balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { requested: amount })?;
        if new_balance < dec!(0) {
            return Err(LedgerError::InsufficientFunds {
                requested: amount.abs(),
                available: self.balance,
            });
        }

        self.transactions.push_front(Transaction::new(
            date,
            amount,
            transaction_type,
            new_balance,
        ));
        self.transactions.truncate(HISTORY_LIMIT);
        self.balance = new_balance;

        Ok(&self.transactions[0])
    }

    /// Get the account holder's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the account's balance.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Get the account's recent transactions, most recent first.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> + '_ {
        self.transactions.iter()
    }
}
