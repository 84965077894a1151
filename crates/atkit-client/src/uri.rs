//! AT-URI parsing
//!
//! Record URIs have the shape `at://<authority>/<collection>/<rkey>`. The
//! agent needs the authority and rkey to address deleteRecord calls.

use crate::error::{AgentError, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed `at://` record URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtUri {
    /// Repository DID or handle
    pub authority: String,
    /// NSID of the collection, if present
    pub collection: Option<String>,
    /// Record key, if present
    pub rkey: Option<String>,
}

impl AtUri {
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s
            .strip_prefix("at://")
            .ok_or_else(|| AgentError::InvalidUri(s.to_string()))?;

        let mut parts = rest.split('/');
        let authority = match parts.next() {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => return Err(AgentError::InvalidUri(s.to_string())),
        };
        let collection = parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        let rkey = parts.next().filter(|p| !p.is_empty()).map(str::to_string);

        if parts.next().is_some() || (rkey.is_some() && collection.is_none()) {
            return Err(AgentError::InvalidUri(s.to_string()));
        }

        Ok(Self {
            authority,
            collection,
            rkey,
        })
    }

    /// Record key, or an error when the URI addresses a repo or collection
    pub fn require_rkey(&self) -> Result<&str> {
        self.rkey
            .as_deref()
            .ok_or_else(|| AgentError::InvalidUri(self.to_string()))
    }
}

impl FromStr for AtUri {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at://{}", self.authority)?;
        if let Some(ref collection) = self.collection {
            write!(f, "/{}", collection)?;
        }
        if let Some(ref rkey) = self.rkey {
            write!(f, "/{}", rkey)?;
        }
        Ok(())
    }
}
