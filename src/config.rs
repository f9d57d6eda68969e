use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::index::PagePolicy;

pub const DEFAULT_BASE_URL: &str = "https://deliveryapp.neemo.com.br/api/integration/v1";

/// Stores exported on every run, with the variable holding each one's token.
/// Rows come out in this order.
const ACCOUNTS: &[(&str, &str)] = &[
    ("agua verde", "AGUA_VERDE_TOKEN"),
    ("boqueirao", "BOQUEIRAO_TOKEN"),
];

const FOLDER_VAR: &str = "FOLDER_PATH";
const BASE_URL_VAR: &str = "NEEMO_API_URL";

/// One store on the delivery platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    name: String,
    token: String,
}

impl Account {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

// Tokens end up in error reports and logs otherwise.
impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Accounts in the order they are exported.
#[derive(Debug, Clone, Default)]
pub struct Accounts(Vec<Account>);

impl Accounts {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self(accounts)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.0.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Account> {
        self.0.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("cannot load .env file: {0}")]
    EnvFile(String),
}

/// Load variables from a `.env` file, the one in the working directory (or
/// a parent) unless `path` is given. A missing file is not an error; one that
/// exists but cannot be read or parsed is.
pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    match loaded {
        Err(e) if !e.not_found() => Err(ConfigError::EnvFile(e.to_string())),
        _ => Ok(()),
    }
}

/// Everything a run needs, read once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub accounts: Accounts,
    pub output_dir: PathBuf,
    pub reference_date: NaiveDate,
    pub base_url: String,
    pub page_policy: PagePolicy,
}

impl Config {
    /// Build the configuration from a variable lookup, normally
    /// `std::env::var`. Empty values count as unset.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        reference_date: NaiveDate,
        page_policy: PagePolicy,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| var(name).ok_or(ConfigError::MissingVar(name));

        let accounts = ACCOUNTS
            .iter()
            .map(|(name, token_var)| Ok(Account::new(*name, require(*token_var)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Config {
            accounts: Accounts::new(accounts),
            output_dir: PathBuf::from(require(FOLDER_VAR)?),
            reference_date,
            base_url: var(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            page_policy,
        })
    }

    pub fn from_env(reference_date: NaiveDate, page_policy: PagePolicy) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok(), reference_date, page_policy)
    }

    /// Where the export for the reference date is written.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("lista_vendas_{}.csv", self.reference_date.format("%Y-%m-%d")))
    }
}
