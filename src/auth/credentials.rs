//! Credential storage
//!
//! Loads and holds the static username/secret list. The store is read-only
//! after load; lookups are exact-match on the username.

use log::warn;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// Static credential store: username -> secret.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credentials: HashMap<String, String>,
}

impl CredentialStore {
    /// Loads credentials from a file of `username:secret` lines.
    ///
    /// Malformed lines are skipped with a warning. Secrets may contain
    /// colons; only the first one separates the fields.
    pub fn load(path: &Path) -> io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let mut credentials = HashMap::new();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.split_once(':') {
                Some((username, secret)) if !username.is_empty() => {
                    credentials.insert(username.to_string(), secret.to_string());
                }
                _ => {
                    warn!(
                        "Skipping malformed credential line {} in {}",
                        lineno + 1,
                        path.display()
                    );
                }
            }
        }

        Ok(Self { credentials })
    }

    /// Builds a store from in-memory pairs. Used by embedders and tests.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            credentials: pairs
                .into_iter()
                .map(|(u, s)| (u.into(), s.into()))
                .collect(),
        }
    }

    /// Returns the secret for `username`, if the user exists.
    pub fn lookup(&self, username: &str) -> Option<&str> {
        self.credentials.get(username).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
