use crate::features::{
    parse_amount, CardNumber, JsonFile, Persistence, Session, SessionFile, Store, StoreError,
    TransactionType,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::io::Write;
use std::path::{Path, PathBuf};

const ACCOUNTS_FILE: &str = "accounts.json";
const SESSION_FILE: &str = "session.json";
const PIN_MAX_LEN: usize = 4;
const FAST_CASH: u32 = 100;

/// A command line ATM backed by local JSON files
#[derive(Parser, Debug)]
#[clap(name = "atm", version)]
pub struct Cli {
    /// Directory holding the accounts and the current login
    #[clap(long, env = "ATM_DATA_DIR", default_value = ".atm", global = true)]
    pub data_dir: PathBuf,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a new account
    Signup {
        /// Full name
        #[clap(long)]
        name: String,
        /// Card number to assign, must not be in use
        #[clap(long)]
        card: String,
        /// Secret PIN, up to 4 characters
        #[clap(long)]
        pin: String,
    },

    /// Log in with a card number and PIN
    Login {
        #[clap(long)]
        card: String,
        #[clap(long)]
        pin: String,
    },

    /// Forget the current login
    Logout,

    /// Show the balance of the logged in account
    Balance,

    /// Deposit funds into the logged in account
    Deposit { amount: String },

    /// Withdraw funds from the logged in account
    Withdraw { amount: String },

    /// Withdraw $100 in one step
    FastCash,

    /// Show the most recent transactions
    Statement {
        /// Write the statement as CSV
        #[clap(long)]
        csv: bool,
    },
}

/// The front end: turns commands into store operations and renders the outcome
pub struct Atm<P: Persistence> {
    store: Store<P>,
    session: SessionFile,
}

impl Atm<JsonFile> {
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let store = Store::open(JsonFile::new(data_dir.join(ACCOUNTS_FILE)))
            .with_context(|| format!("Unable to open accounts in {}", data_dir.display()))?;
        Ok(Self::new(store, SessionFile::new(data_dir.join(SESSION_FILE))))
    }
}

impl<P: Persistence> Atm<P> {
    pub fn new(store: Store<P>, session: SessionFile) -> Self {
        Self { store, session }
    }

    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> anyhow::Result<()> {
        match command {
            Command::Signup { name, card, pin } => self.signup(&name, &card, &pin, out),
            Command::Login { card, pin } => self.login(&card, &pin, out),
            Command::Logout => {
                self.session.clear()?;
                writeln!(out, "Logged out")?;
                Ok(())
            }
            Command::Balance => self.balance(out),
            Command::Deposit { amount } => {
                self.transact(TransactionType::Deposit, parse_amount(&amount)?, out)
            }
            Command::Withdraw { amount } => {
                self.transact(TransactionType::Withdrawal, parse_amount(&amount)?, out)
            }
            Command::FastCash => {
                let amount = Decimal::from(FAST_CASH);
                writeln!(out, "Fast Cash $ {} processing...", format_money(amount))?;
                self.transact(TransactionType::Withdrawal, amount, out)
            }
            Command::Statement { csv } => self.statement(csv, out),
        }
    }

    fn signup(&mut self, name: &str, card: &str, pin: &str, out: &mut impl Write) -> anyhow::Result<()> {
        if name.trim().is_empty() || card.trim().is_empty() || pin.is_empty() {
            bail!("Name, card number and PIN are required");
        }
        if pin.chars().count() > PIN_MAX_LEN {
            bail!("PIN must be at most {PIN_MAX_LEN} characters");
        }

        match self.store.create(name, CardNumber::new(card), pin) {
            Ok(_) => {
                writeln!(out, "Account Created Successfully!")?;
                Ok(())
            }
            Err(StoreError::DuplicateCard(_)) => bail!("Card Number already exists"),
            Err(e) => Err(e.into()),
        }
    }

    fn login(&mut self, card: &str, pin: &str, out: &mut impl Write) -> anyhow::Result<()> {
        let card_no = CardNumber::new(card);
        let account = match self.store.authenticate(&card_no, pin) {
            Ok(account) => account.clone(),
            Err(_) => bail!("Invalid Card Number or PIN"),
        };

        writeln!(out, "Welcome, {}", account.name())?;
        self.session.save(&Session::new(card_no, account))
    }

    fn logged_in(&self) -> anyhow::Result<Session> {
        let session = self
            .session
            .load()?
            .context("Not logged in. Run `atm login` first")?;
        debug!("Logged in as {}", session.account().name());
        Ok(session)
    }

    fn balance(&self, out: &mut impl Write) -> anyhow::Result<()> {
        let session = self.logged_in()?;
        let account = self
            .store
            .account(session.card_no())
            .with_context(|| format!("No account for card number {}", session.card_no()))?;

        writeln!(out, "Welcome, {}", account.name())?;
        writeln!(out, "Total Balance: $ {}", format_money(account.balance()))?;
        Ok(())
    }

    fn transact(
        &mut self,
        transaction_type: TransactionType,
        amount: Decimal,
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        let card_no = self.logged_in()?.card_no().clone();
        let result = match transaction_type {
            TransactionType::Deposit => self.store.deposit(&card_no, amount),
            TransactionType::Withdrawal => self.store.withdraw(&card_no, amount),
        };

        let account = match result {
            Ok(account) => account.clone(),
            Err(StoreError::Storage(e)) => return Err(e),
            Err(e) => {
                debug!("{e}");
                bail!("Insufficient balance or invalid operation");
            }
        };

        writeln!(out, "{transaction_type} successful!")?;
        writeln!(out, "Total Balance: $ {}", format_money(account.balance()))?;
        self.session.save(&Session::new(card_no, account))
    }

    fn statement(&self, as_csv: bool, out: &mut impl Write) -> anyhow::Result<()> {
        let session = self.logged_in()?;
        let account = self
            .store
            .account(session.card_no())
            .with_context(|| format!("No account for card number {}", session.card_no()))?;

        if as_csv {
            let mut wtr = csv::Writer::from_writer(&mut *out);
            wtr.write_record(["date", "type", "amount", "balance"])?;
            for tx in account.transactions() {
                wtr.write_record([
                    tx.date().to_string(),
                    tx.transaction_type().to_string(),
                    tx.amount().normalize().to_string(),
                    tx.balance().normalize().to_string(),
                ])?;
            }
            wtr.flush()?;
            return Ok(());
        }

        writeln!(out, "Recent Transactions")?;
        writeln!(out, "{:<24} {:<10} {:>14} {}", "Date", "Type", "Amount", "Status")?;
        let mut transactions = account.transactions().peekable();
        if transactions.peek().is_none() {
            writeln!(out, "No transactions found")?;
        }
        for tx in transactions {
            writeln!(
                out,
                "{:<24} {:<10} {:>14} Success",
                tx.date(),
                tx.transaction_type(),
                format_signed(tx.amount())
            )?;
        }
        Ok(())
    }
}

/// Renders an amount with thousands separators, e.g. `1,234.5`
fn format_money(amount: Decimal) -> String {
    let amount = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let text = amount.abs().to_string();
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut formatted = String::with_capacity(text.len() + whole.len() / 3 + 1);
    if amount.is_sign_negative() && !amount.is_zero() {
        formatted.push('-');
    }
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(digit);
    }
    if let Some(fraction) = fraction {
        formatted.push('.');
        formatted.push_str(fraction);
    }
    formatted
}

/// Statement amounts are shown as recorded. Credits get a leading `+`
fn format_signed(amount: Decimal) -> String {
    let amount = amount.normalize();
    if amount > dec!(0) {
        format!("+{amount}")
    } else {
        amount.to_string()
    }
}
