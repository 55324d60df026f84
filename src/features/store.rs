use super::{
    account::{Account, CardNumber, LedgerError},
    storage::{Accounts, Persistence},
    transaction::{display_date, TransactionType},
};
use chrono::{Local, NaiveDateTime};
use rust_decimal::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Card number {0} already exists")]
    DuplicateCard(CardNumber),

    #[error("Invalid card number or PIN")]
    InvalidCredentials,

    #[error("No account for card number {0}")]
    UnknownCard(CardNumber),

    #[error("Invalid transaction - {0}")]
    Ledger(#[from] LedgerError),

    #[error("Unable to persist accounts")]
    Storage(#[from] anyhow::Error),
}

type StoreResult<T> = anyhow::Result<T, StoreError>;

/// Source of the timestamp stamped on each transaction
pub type Clock = fn() -> NaiveDateTime;

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// This keeps track of every account by card number, and writes them all
/// through `persistence` after each successful change
#[derive(Debug)]
pub struct Store<P: Persistence> {
    accounts: Accounts,
    persistence: P,
    clock: Clock,
}

impl<P: Persistence> Store<P> {
    /// Loads the persisted accounts. This is the only read the store makes.
    pub fn open(persistence: P) -> StoreResult<Self> {
        let accounts = persistence.load()?;
        debug!("Loaded {} account(s)", accounts.len());
        Ok(Self {
            accounts,
            persistence,
            clock: local_now,
        })
    }

    /// Replaces the local wall clock used to date transactions.
    pub fn with_clock(self, clock: Clock) -> Self {
        Self { clock, ..self }
    }

    pub fn account(&self, card_no: &CardNumber) -> Option<&Account> {
        self.accounts.get(card_no)
    }

    pub fn create(&mut self, name: &str, card_no: CardNumber, pin: &str) -> StoreResult<&Account> {
        if self.accounts.contains_key(&card_no) {
            warn!("Rejected signup, card number {card_no} is taken");
            return Err(StoreError::DuplicateCard(card_no));
        }

        self.accounts
            .insert(card_no.clone(), Account::new(name, pin));
        if let Err(e) = self.persistence.save(&self.accounts) {
            self.accounts.remove(&card_no);
            return Err(e.into());
        }

        info!("Opened account {card_no} for {name}");
        self.account(&card_no)
            .ok_or(StoreError::UnknownCard(card_no))
    }

    /// Unknown cards and wrong PINs are reported the same way.
    pub fn authenticate(&self, card_no: &CardNumber, pin: &str) -> StoreResult<&Account> {
        match self.accounts.get(card_no) {
            Some(account) if account.pin_matches(pin) => Ok(account),
            _ => {
                warn!("Failed login for card number {card_no}");
                Err(StoreError::InvalidCredentials)
            }
        }
    }

    /// Runs the ledger operation on one account and persists the result.
    ///
    /// Either the balance, the history and the persisted state all change,
    /// or none of them do.
    pub fn apply_transaction(
        &mut self,
        card_no: &CardNumber,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> StoreResult<&Account> {
        let account = self
            .accounts
            .get_mut(card_no)
            .ok_or_else(|| StoreError::UnknownCard(card_no.clone()))?;
        let previous = account.clone();

        if let Err(e) = account.apply(
            amount,
            transaction_type,
            display_date((self.clock)()),
        ) {
            warn!("Rejected {transaction_type} of {amount} on {card_no}: {e}");
            return Err(e.into());
        }

        if let Err(e) = self.persistence.save(&self.accounts) {
            self.accounts.insert(card_no.clone(), previous);
            return Err(e.into());
        }

        let account = self.account(card_no).ok_or_else(|| StoreError::UnknownCard(card_no.clone()))?;
        info!(
            "{transaction_type} of {amount} on {card_no}, balance now {}",
            account.balance()
        );
        Ok(account)
    }

    pub fn deposit(&mut self, card_no: &CardNumber, amount: Decimal) -> StoreResult<&Account> {
        let transaction_type = TransactionType::Deposit;
        self.apply_transaction(card_no, transaction_type.signed(amount), transaction_type)
    }

    pub fn withdraw(&mut self, card_no: &CardNumber, amount: Decimal) -> StoreResult<&Account> {
        let transaction_type = TransactionType::Withdrawal;
        self.apply_transaction(card_no, transaction_type.signed(amount), transaction_type)
    }
}
