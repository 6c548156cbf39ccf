use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use reelwatch_common::Account;

use crate::error::{IngestError, Result};
use crate::store::{read_json, write_json_atomic};

/// The tracked-account list, persisted as a JSON array.
///
/// Registration (handle → id resolution) happens elsewhere; the book only
/// enforces that a handle is tracked once, compared case-insensitively.
pub struct AccountBook {
    path: PathBuf,
}

impl AccountBook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the tracked accounts. Missing or unparseable data is a
    /// configuration error for whichever operation needed it.
    pub async fn load(&self) -> Result<Vec<Account>> {
        match read_json::<Vec<Account>>(&self.path).await {
            Ok(Some(accounts)) => Ok(accounts),
            Ok(None) => Err(IngestError::Configuration(format!(
                "Account list not found at {}",
                self.path.display()
            ))),
            Err(e) => Err(IngestError::Configuration(e.to_string())),
        }
    }

    /// Like `load`, but a missing file is an empty list.
    pub async fn load_or_empty(&self) -> Result<Vec<Account>> {
        match read_json::<Vec<Account>>(&self.path).await {
            Ok(accounts) => Ok(accounts.unwrap_or_default()),
            Err(e) => Err(IngestError::Configuration(e.to_string())),
        }
    }

    pub async fn save(&self, accounts: &[Account]) -> Result<()> {
        write_json_atomic(&self.path, accounts).await
    }

    /// Track a new account whose id has already been resolved.
    pub async fn register(&self, handle: &str, user_id: &str) -> Result<Account> {
        let handle = handle.trim().trim_start_matches('@');
        if handle.is_empty() {
            return Err(IngestError::Registration("Handle is required".to_string()));
        }
        if user_id.trim().is_empty() {
            return Err(IngestError::Registration(format!("No user id for {handle}")));
        }

        let mut accounts = self.load_or_empty().await?;
        if accounts.iter().any(|a| a.same_handle(handle)) {
            return Err(IngestError::Registration(format!(
                "{handle} is already tracked"
            )));
        }

        let account = Account {
            unique_id: handle.to_string(),
            user_id: Some(user_id.trim().to_string()),
            seed_ref: Some(format!("pending_{}", Utc::now().timestamp_millis())),
        };
        accounts.push(account.clone());
        self.save(&accounts).await?;

        info!(handle, total = accounts.len(), "Account registered");
        Ok(account)
    }

    /// Append accounts that are not tracked yet (by handle or user id).
    /// Returns how many were added.
    pub async fn extend(&self, candidates: Vec<Account>) -> Result<usize> {
        let mut accounts = self.load_or_empty().await?;
        let before = accounts.len();

        for candidate in candidates {
            let tracked = accounts.iter().any(|a| {
                a.same_handle(&candidate.unique_id)
                    || (a.resolved_id().is_some() && a.resolved_id() == candidate.resolved_id())
            });
            if !tracked {
                accounts.push(candidate);
            }
        }

        let added = accounts.len() - before;
        if added > 0 {
            self.save(&accounts).await?;
        }
        Ok(added)
    }
}
