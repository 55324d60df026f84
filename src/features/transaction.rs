use chrono::NaiveDateTime;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// A credit to the account, recorded with a positive amount
    Deposit,

    /// A debit from the account, recorded with a negative amount.
    /// It fails when the account does not hold enough funds to cover it
    Withdrawal,
}

impl TransactionType {
    /// Signs a positive amount the way this kind of transaction is recorded.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Deposit => amount,
            TransactionType::Withdrawal => -amount,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Deposit => f.pad("DEPOSIT"),
            TransactionType::Withdrawal => f.pad("WITHDRAWAL"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum AmountError {
    #[error("Invalid input - {0:?} is not a number")]
    NotANumber(String),

    #[error("Invalid input - {0} must be greater than zero")]
    NotPositive(Decimal),
}

/// Parses a user supplied amount, accepting only positive numbers.
pub fn parse_amount(input: &str) -> Result<Decimal, AmountError> {
    let trimmed = input.trim();
    let amount = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| AmountError::NotANumber(input.to_string()))?;

    if amount <= dec!(0) {
        return Err(AmountError::NotPositive(amount));
    }

    Ok(amount)
}

/// Timestamp format used for the mini statement, e.g. `1/15/2024, 3:04:05 PM`
pub(crate) fn display_date(at: NaiveDateTime) -> String {
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// One line of an account's mini statement
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    date: String,

    /// Positive for credits, negative for debits
    amount: Decimal,

    #[serde(rename = "type")]
    transaction_type: TransactionType,

    /// Account balance right after this transaction
    balance: Decimal,
}

impl Transaction {
    pub(crate) fn new(
        date: String,
        amount: Decimal,
        transaction_type: TransactionType,
        balance: Decimal,
    ) -> Self {
        Self {
            date,
            amount,
            transaction_type,
            balance,
        }
    }

    /// Get the transaction's display date.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Get the transaction's signed amount.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    /// Get the balance the transaction left behind.
    pub fn balance(&self) -> Decimal {
        self.balance
    }
}
