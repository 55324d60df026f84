use super::account::{Account, CardNumber};
use super::storage::{read_json, write_json};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Who is logged in, with the account as it looked after the last command.
///
/// Only used to remember the login across invocations. The store never
/// consults it when authorizing anything.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    card_no: CardNumber,
    account: Account,
}

impl Session {
    pub fn new(card_no: CardNumber, account: Account) -> Self {
        Self { card_no, account }
    }

    pub fn card_no(&self) -> &CardNumber {
        &self.card_no
    }

    pub fn account(&self) -> &Account {
        &self.account
    }
}

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<Option<Session>> {
        read_json(&self.path)
    }

    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        write_json(&self.path, session)
    }

    /// Forgets the current login. Clearing twice is not an error.
    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("Unable to remove {}", self.path.display()))
            }
            _ => Ok(()),
        }
    }
}
