use super::account::{Account, CardNumber};
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub type Accounts = BTreeMap<CardNumber, Account>;

/// Where the store keeps its accounts between runs.
///
/// The whole map is written on every successful mutation and read once when
/// the store is opened. There are no partial updates.
pub trait Persistence {
    fn load(&self) -> anyhow::Result<Accounts>;

    fn save(&mut self, accounts: &Accounts) -> anyhow::Result<()>;
}

/// Keeps the accounts as a single JSON object keyed by card number
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Persistence for JsonFile {
    fn load(&self) -> anyhow::Result<Accounts> {
        read_json(&self.path).map(Option::unwrap_or_default)
    }

    fn save(&mut self, accounts: &Accounts) -> anyhow::Result<()> {
        write_json(&self.path, accounts)?;
        debug!(
            "Saved {} account(s) to {}",
            accounts.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Reads a JSON document, treating a missing file as `None`.
pub(crate) fn read_json<T>(path: &Path) -> anyhow::Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Unable to open {}", path.display()));
        }
    };

    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Unable to parse {}", path.display()))?;
    Ok(Some(value))
}

/// Replaces the file at `path` with the JSON encoding of `value`.
///
/// The document is written to a sibling temporary file and renamed over
/// `path`, so a failed write leaves the previous contents in place.
pub(crate) fn write_json<T>(path: &Path, value: &T) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    let dir = match path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => dir,
        None => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Unable to create directory {}", dir.display()))?;

    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Unable to create a temporary file in {}", dir.display()))?;
    let mut writer = BufWriter::new(tmp);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Unable to encode {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Unable to write {}", path.display()))?;

    let tmp = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .with_context(|| format!("Unable to write {}", path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Unable to write {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Unable to replace {}", path.display()))?;
    Ok(())
}

/// In-memory persistence that records every snapshot it is handed
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Memory {
    pub(crate) initial: Accounts,
    pub(crate) snapshots: Vec<Accounts>,
    pub(crate) fail_saves: bool,
}

#[cfg(test)]
impl Persistence for Memory {
    fn load(&self) -> anyhow::Result<Accounts> {
        Ok(self.initial.clone())
    }

    fn save(&mut self, accounts: &Accounts) -> anyhow::Result<()> {
        if self.fail_saves {
            anyhow::bail!("storage quota exceeded");
        }
        self.snapshots.push(accounts.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::transaction::TransactionType;
    use rust_decimal_macros::dec;

    fn sample() -> Accounts {
        let mut alice = Account::new("Alice", "9999");
        alice
            .apply(
                dec!(500),
                TransactionType::Deposit,
                "1/1/2024, 9:00:00 AM".to_string(),
            )
            .unwrap();

        let mut accounts = Accounts::new();
        accounts.insert(CardNumber::from("1111"), alice);
        accounts.insert(CardNumber::from("2222"), Account::new("Bob", "1234"));
        accounts
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFile::new(dir.path().join("accounts.json"));

        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn saved_accounts_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("accounts.json");
        let accounts = sample();

        JsonFile::new(&path).save(&accounts).unwrap();

        assert_eq!(JsonFile::new(&path).load().unwrap(), accounts);
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonFile::new(dir.path().join("accounts.json"));

        storage.save(&sample()).unwrap();
        storage.save(&Accounts::new()).unwrap();

        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn file_layout_is_keyed_by_card_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        JsonFile::new(&path).save(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(
            raw["2222"],
            serde_json::json!({
                "name": "Bob",
                "pin": "1234",
                "balance": "0",
                "transactions": [],
            })
        );
        assert_eq!(raw["1111"]["transactions"][0]["type"], "DEPOSIT");
        assert_eq!(raw["1111"]["balance"], "500");
    }

    #[test]
    fn failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let accounts = sample();
        JsonFile::new(&path).save(&accounts).unwrap();

        // JSON object keys must be strings, so this fails halfway through encoding
        let mut unencodable = BTreeMap::new();
        unencodable.insert((1u8, 2u8), "value");
        assert!(write_json(&path, &unencodable).is_err());

        assert_eq!(JsonFile::new(&path).load().unwrap(), accounts);
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("accounts.json")]);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFile::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("Unable to parse"));
    }
}
