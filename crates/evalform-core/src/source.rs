//! Remote form source with an explicit per-form cache.
//!
//! Each `(subject, form)` pair has its own addressable cache entry. Entries
//! are only replaced by an explicit [`FormSource::refetch`] or dropped by
//! [`FormSource::invalidate`]; a failed refetch leaves the previous entry in
//! place. The signed-in reviewer is cached alongside.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::id::FormKey;
use crate::model::{FormSnapshot, User};
use crate::service::FormService;

/// A fetched snapshot and when it was fetched.
#[derive(Debug, Clone)]
pub struct CachedForm {
    /// The snapshot as returned by the service.
    pub snapshot: FormSnapshot,
    /// Fetch completion time.
    pub fetched_at: DateTime<Utc>,
}

/// Fetches forms through a [`FormService`] and caches them by key.
pub struct FormSource<S: ?Sized> {
    service: Arc<S>,
    entries: HashMap<FormKey, CachedForm>,
    reviewer: Option<User>,
}

impl<S: ?Sized> std::fmt::Debug for FormSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSource")
            .field("entries", &self.entries.len())
            .field("reviewer", &self.reviewer.as_ref().map(|u| &u.id))
            .finish_non_exhaustive()
    }
}

impl<S: FormService + ?Sized> FormSource<S> {
    /// Creates an empty source backed by `service`.
    #[must_use]
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            entries: HashMap::new(),
            reviewer: None,
        }
    }

    /// The backing service.
    #[must_use]
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Returns the cached entry for `key`, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the form has to be fetched and the fetch
    /// fails.
    pub async fn load(&mut self, key: &FormKey) -> Result<&CachedForm> {
        if !self.entries.contains_key(key) {
            return self.refetch(key).await;
        }
        self.cached(key)
            .ok_or_else(|| Error::Internal {
                message: format!("cache entry for {key} vanished"),
            })
    }

    /// Fetches `key` from the service and replaces its cache entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the fetch fails; the previous entry, if
    /// any, is kept.
    pub async fn refetch(&mut self, key: &FormKey) -> Result<&CachedForm> {
        let snapshot = self
            .service
            .fetch_form(key)
            .await
            .map_err(|e| Error::fetch(key, e))?;

        tracing::debug!(
            key = %key,
            topics = snapshot.topics.len(),
            children = snapshot.child_count(),
            "form fetched"
        );

        self.entries.insert(
            key.clone(),
            CachedForm {
                snapshot,
                fetched_at: Utc::now(),
            },
        );
        Ok(&self.entries[key])
    }

    /// Returns the cached entry for `key` without fetching.
    #[must_use]
    pub fn cached(&self, key: &FormKey) -> Option<&CachedForm> {
        self.entries.get(key)
    }

    /// Drops the cache entry for `key`. Returns true if one existed.
    pub fn invalidate(&mut self, key: &FormKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Returns the signed-in reviewer, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns the service error if the current user cannot be fetched.
    pub async fn reviewer(&mut self) -> Result<&User> {
        if self.reviewer.is_none() {
            let user = self.service.current_user().await?;
            tracing::debug!(user_id = %user.id, "reviewer fetched");
            self.reviewer = Some(user);
        }
        self.reviewer.as_ref().ok_or_else(|| Error::Internal {
            message: "reviewer cache empty after fetch".to_string(),
        })
    }
}
