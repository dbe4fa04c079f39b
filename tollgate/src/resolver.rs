//! Granted-token resolvers.
//!
//! A resolver answers "which tokens does this user hold" for one facet.
//! Applications plug in their own store by implementing
//! [`GrantedTokenResolver`]; two stores are provided here.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::token::GrantedTokens;

/// Supplies the tokens a user currently holds.
///
/// Implementations are shared across concurrent requests and must be safe
/// for concurrent reads. A user without grants resolves to an empty set; a
/// store that cannot answer returns a [`ResolveError`].
///
/// # Example
///
/// ```
/// use tollgate::{GrantedTokenResolver, GrantedTokens, RequestContext, ResolveError};
///
/// struct HeaderRoles;
///
/// impl GrantedTokenResolver for HeaderRoles {
///     fn resolve(
///         &self,
///         user_id: Option<&str>,
///         _ctx: &RequestContext,
///     ) -> Result<GrantedTokens, ResolveError> {
///         Ok(match user_id {
///             Some("admin") => ["ADMIN", "USER"].into_iter().collect(),
///             Some(_) => ["USER"].into_iter().collect(),
///             None => GrantedTokens::new(),
///         })
///     }
/// }
///
/// let ctx = RequestContext::new();
/// assert!(HeaderRoles.resolve(Some("admin"), &ctx).unwrap().contains("ADMIN"));
/// assert!(HeaderRoles.resolve(None, &ctx).unwrap().is_empty());
/// ```
pub trait GrantedTokenResolver: Send + Sync {
    fn resolve(
        &self,
        user_id: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<GrantedTokens, ResolveError>;
}

impl<F> GrantedTokenResolver for F
where
    F: Fn(Option<&str>, &RequestContext) -> Result<GrantedTokens, ResolveError> + Send + Sync,
{
    fn resolve(
        &self,
        user_id: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<GrantedTokens, ResolveError> {
        self(user_id, ctx)
    }
}

fn lock_poisoned<T>(_: PoisonError<T>) -> ResolveError {
    ResolveError::Unavailable("grant store lock poisoned".into())
}

// ============================================================================
// In-Memory Grant Store
// ============================================================================

/// In-memory grants, for tests or grants computed at startup.
#[derive(Debug, Default)]
pub struct MemoryGrantStore {
    grants: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from `(user, tokens)` pairs.
    pub fn with_grants<U, I, T>(grants: impl IntoIterator<Item = (U, I)>) -> Self
    where
        U: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let grants = grants
            .into_iter()
            .map(|(user, tokens)| (user.into(), tokens.into_iter().map(Into::into).collect()))
            .collect();
        Self {
            grants: RwLock::new(grants),
        }
    }

    /// Add one token to a user's grants.
    pub fn grant(&self, user_id: impl Into<String>, token: impl Into<String>) {
        let mut grants = self.grants.write().unwrap_or_else(PoisonError::into_inner);
        grants
            .entry(user_id.into())
            .or_default()
            .insert(token.into());
    }

    /// Remove one token from a user's grants. Returns whether it was held.
    pub fn revoke(&self, user_id: &str, token: &str) -> bool {
        let mut grants = self.grants.write().unwrap_or_else(PoisonError::into_inner);
        grants
            .get_mut(user_id)
            .map(|tokens| tokens.remove(token))
            .unwrap_or(false)
    }

    /// Replace a user's grants.
    pub fn set_grants<T: Into<String>>(
        &self,
        user_id: impl Into<String>,
        tokens: impl IntoIterator<Item = T>,
    ) {
        let mut grants = self.grants.write().unwrap_or_else(PoisonError::into_inner);
        grants.insert(user_id.into(), tokens.into_iter().map(Into::into).collect());
    }

    /// Drop every grant.
    pub fn clear(&self) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl GrantedTokenResolver for MemoryGrantStore {
    fn resolve(
        &self,
        user_id: Option<&str>,
        _ctx: &RequestContext,
    ) -> Result<GrantedTokens, ResolveError> {
        let Some(user_id) = user_id else {
            return Ok(GrantedTokens::new());
        };
        let grants = self.grants.read().map_err(lock_poisoned)?;
        Ok(grants
            .get(user_id)
            .map(|tokens| GrantedTokens::from(tokens.clone()))
            .unwrap_or_default())
    }
}

// ============================================================================
// File-based Grant Store
// ============================================================================

/// On-disk layout of a grant file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GrantFileData {
    version: u32,
    #[serde(default)]
    users: HashMap<String, BTreeSet<String>>,
}

/// Grants read from a JSON file.
///
/// ```json
/// {
///   "version": 1,
///   "users": {
///     "user01": ["ADMIN", "USER"]
///   }
/// }
/// ```
///
/// The file is read at construction and on [`reload`](Self::reload). A
/// missing file means nobody holds anything.
pub struct FileGrantStore {
    path: PathBuf,
    data: RwLock<GrantFileData>,
}

impl FileGrantStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref().to_path_buf();
        let data = Self::read(&path)?;
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Get the grant file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the grant file.
    pub fn reload(&self) -> Result<(), ResolveError> {
        let fresh = Self::read(&self.path)?;
        let version = fresh.version;
        *self.data.write().map_err(lock_poisoned)? = fresh;
        tracing::debug!(path = %self.path.display(), version, "grant file reloaded");
        Ok(())
    }

    fn read(path: &Path) -> Result<GrantFileData, ResolveError> {
        if !path.exists() {
            return Ok(GrantFileData {
                version: 1,
                users: HashMap::new(),
            });
        }
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl GrantedTokenResolver for FileGrantStore {
    fn resolve(
        &self,
        user_id: Option<&str>,
        _ctx: &RequestContext,
    ) -> Result<GrantedTokens, ResolveError> {
        let Some(user_id) = user_id else {
            return Ok(GrantedTokens::new());
        };
        let data = self.data.read().map_err(lock_poisoned)?;
        Ok(data
            .users
            .get(user_id)
            .map(|tokens| GrantedTokens::from(tokens.clone()))
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for FileGrantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileGrantStore")
            .field("path", &self.path)
            .finish()
    }
}
