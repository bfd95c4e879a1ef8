//! Command implementations.

pub mod compare;
pub mod get;
pub mod harvest;
pub mod list;
pub mod search;
pub mod serve;
pub mod sets;

use oaipmh_client::Session;
use oaipmh_core::ListQuery;

use crate::config::{Config, ProviderConfig};
use crate::util::parse_date_flag;

/// Shared command context: the active session plus configuration.
pub struct Context {
    pub session: Session,
    pub config: Config,
    pub provider: ProviderConfig,
}

impl Context {
    /// Build a listing query from the common `-s`/`-A`/`-B` flags.
    ///
    /// Set selection: `-s` absent or empty uses the provider's
    /// configured default set; `-s '*'` queries all sets.
    pub fn list_query(
        &self,
        set: Option<&str>,
        after: Option<&str>,
        before: Option<&str>,
    ) -> anyhow::Result<ListQuery> {
        let set = match set {
            Some("*") => None,
            Some(s) if !s.is_empty() => Some(s.to_string()),
            _ => (!self.provider.set.is_empty()).then(|| self.provider.set.clone()),
        };

        Ok(ListQuery {
            set,
            from: parse_date_flag(after)?,
            until: parse_date_flag(before)?,
        })
    }
}
