mod account;
mod session;
mod storage;
mod store;
mod transaction;

pub use self::{
    account::CardNumber,
    session::{Session, SessionFile},
    storage::{JsonFile, Persistence},
    store::{Store, StoreError},
    transaction::{parse_amount, TransactionType},
};
