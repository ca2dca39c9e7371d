//! auth::provider
//!
//! GitHubAuthManager - TokenProvider implementation for GitHub App OAuth.
//!
//! # Architecture
//!
//! Per the auth manager:
//! - Loads token bundles from SecretStore
//! - Refreshes tokens when expired (with auth-scoped locking)
//! - Never participates in repository mutation plans
//! - Redacts secrets in all logs, errors, and outputs
//!
//! # Concurrency
//!
//! Token refresh uses the [`AuthLock`] to prevent race conditions when
//! multiple Ridgeline processes try to refresh simultaneously. The pattern is:
//!
//! 1. Check if refresh is needed
//! 2. If so, acquire the auth lock
//! 3. Re-check after acquiring lock (another process may have refreshed)
//! 4. Perform refresh if still needed
//! 5. Release lock
//!
//! # Example
//!
//! ```ignore
//! use ridgeline::auth::{GitHubAuthManager, TokenProvider};
//! use ridgeline::secrets;
//! use std::sync::Arc;
//!
//! let store = secrets::create_store(secrets::DEFAULT_PROVIDER)?;
//! let manager = GitHubAuthManager::new("github.com", store);
//!
//! // Get bearer token (refreshes if needed)
//! let token = manager.bearer_token().await?;
//!
//! // Check if authenticated without refreshing
//! if manager.is_authenticated() {
//! println!("Authenticated!");
//! }
//! ```

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::device_flow::DeviceFlowClient;
use super::errors::AuthError;
use super::lock::{AuthLock, DEFAULT_LOCK_TIMEOUT};
use super::token_bundle::{TokenBundle, TokenInfo, UserInfo};
use super::TokenProvider;
use crate::secrets::SecretStore;

/// GitHub authentication manager.
///
/// Implements [`TokenProvider`] to provide bearer tokens to forge adapters.
/// Handles loading tokens from SecretStore and refreshing when needed.
pub struct GitHubAuthManager {
 /// GitHub host (e.g., "github.com").
 host: String,

 /// Secret store for token persistence.
 store: Box<dyn SecretStore>,

 /// Cached token bundle (refreshed on demand).
 cache: RwLock<Option<TokenBundle>>,
}

impl GitHubAuthManager {
 /// Create a new GitHub auth manager.
 ///
 /// # Arguments
 ///
 /// * `host` - GitHub host (e.g., "github.com")
 /// * `store` - Secret store for token persistence
 pub fn new(host: &str, store: Box<dyn SecretStore>) -> Self {
 Self {
 host: host.to_string(),
 store,
 cache: RwLock::new(None),
 }
 }

 /// Get the SecretStore key for this host.
 fn secret_key(&self) -> String {
 TokenBundle::secret_key(&self.host)
 }

 /// Load the token bundle from SecretStore.
 ///
 /// Does not perform refresh.
 fn load_bundle(&self) -> Result<Option<TokenBundle>, AuthError> {
 let key = self.secret_key();
 match self.store.get(&key)? {
 Some(json) => {
 let bundle = TokenBundle::parse(&json)?;
 Ok(Some(bundle))
 }
 None => Ok(None),
 }
 }

 /// Save a token bundle to SecretStore.
 fn save_bundle(&self, bundle: &TokenBundle) -> Result<(), AuthError> {
 let key = self.secret_key();
 let json = bundle.to_json()?;
 self.store.set(&key, &json)?;
 Ok(())
 }

 /// Update the in-memory cache.
 fn update_cache(&self, bundle: TokenBundle) {
 if let Ok(mut cache) = self.cache.write() {
 *cache = Some(bundle);
 }
 }

 /// Get the cached bundle, loading from store if needed.
 fn get_or_load_bundle(&self) -> Result<Option<TokenBundle>, AuthError> {
 // Check cache first
 if let Ok(cache) = self.cache.read() {
 if let Some(ref bundle) = *cache {
 return Ok(Some(bundle.clone()));
 }
 }

 // Load from store
 let bundle = self.load_bundle()?;
 if let Some(ref b) = bundle {
 self.update_cache(b.clone());
 }
 Ok(bundle)
 }

 /// Refresh tokens with lock protection.
 ///
 /// Acquires the auth lock, re-checks if refresh is needed, and
 /// performs the refresh if still necessary.
 async fn refresh_with_lock(&self) -> Result<TokenBundle, AuthError> {
 // Acquire auth lock
 let _lock = AuthLock::acquire(&self.host, DEFAULT_LOCK_TIMEOUT)?;

 // Re-load bundle and re-check (another process may have refreshed)
 let bundle = self
.load_bundle()?
.ok_or_else(|| AuthError::NotAuthenticated(self.host.clone()))?;

 // Check if still needs refresh
 if !bundle.needs_refresh() {
 // Another process refreshed, use the updated bundle
 self.update_cache(bundle.clone());
 return Ok(bundle);
 }

 // Check if refresh token is still valid
 if bundle.is_refresh_token_expired() {
 return Err(AuthError::Expired(self.host.clone()));
 }

 // Perform refresh
 let client = DeviceFlowClient::new(&self.host);
 let token_response = client.refresh_token(&bundle.tokens.refresh_token).await?;

 // Create updated bundle with new tokens
 let new_tokens = TokenInfo::new(
 token_response.access_token,
 token_response.expires_in,
 token_response.refresh_token,
 token_response.refresh_token_expires_in,
 );
 let new_bundle = bundle.with_refreshed_tokens(new_tokens);

 // Save to store
 self.save_bundle(&new_bundle)?;

 // Update cache
 self.update_cache(new_bundle.clone());

 Ok(new_bundle)
 }

 /// Get user info from the cached bundle.
 ///
 /// Returns `None` if not authenticated.
 pub fn user_info(&self) -> Option<UserInfo> {
 self.get_or_load_bundle().ok().flatten().map(|b| b.user)
 }

 /// Get access token expiry time from the cached bundle.
 ///
 /// Returns `None` if not authenticated.
 pub fn access_token_expires_at(&self) -> Option<DateTime<Utc>> {
 self.get_or_load_bundle()
.ok()
.flatten()
.map(|b| b.tokens.access_token_expires_at)
 }

 /// Get refresh token expiry time from the cached bundle.
 ///
 /// Returns `None` if not authenticated.
 pub fn refresh_token_expires_at(&self) -> Option<DateTime<Utc>> {
 self.get_or_load_bundle()
.ok()
.flatten()
.map(|b| b.tokens.refresh_token_expires_at)
 }

 /// Store a new token bundle (after device flow login).
 ///
 /// This is called by the auth login command after successful device flow.
 pub fn store_tokens(
 &self,
 user: UserInfo,
 tokens: TokenInfo,
 ) -> Result<TokenBundle, AuthError> {
 let bundle = TokenBundle::new(&self.host, user, tokens);
 self.save_bundle(&bundle)?;
 self.update_cache(bundle.clone());
 Ok(bundle)
 }

 /// Delete stored tokens (logout).
 pub fn delete_tokens(&self) -> Result<(), AuthError> {
 let key = self.secret_key();
 self.store.delete(&key)?;

 // Clear cache
 if let Ok(mut cache) = self.cache.write() {
 *cache = None;
 }

 Ok(())
 }
}

#[async_trait::async_trait]
impl TokenProvider for GitHubAuthManager {
 async fn bearer_token(&self) -> Result<String, AuthError> {
 // Get or load bundle
 let bundle = self
.get_or_load_bundle()?
.ok_or_else(|| AuthError::NotAuthenticated(self.host.clone()))?;

 // Check if refresh token expired
 if bundle.is_refresh_token_expired() {
 return Err(AuthError::Expired(self.host.clone()));
 }

 // Check if needs refresh
 if bundle.needs_refresh() {
 let refreshed = self.refresh_with_lock().await?;
 return Ok(refreshed.tokens.access_token);
 }

 Ok(bundle.tokens.access_token)
 }

 fn is_authenticated(&self) -> bool {
 match self.get_or_load_bundle() {
 Ok(Some(bundle)) => bundle.is_valid(),
 _ => false,
 }
 }

 fn host(&self) -> &str {
 &self.host
 }
}

// Custom Debug to avoid exposing tokens
impl std::fmt::Debug for GitHubAuthManager {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 f.debug_struct("GitHubAuthManager")
.field("host", &self.host)
.field("is_authenticated", &self.is_authenticated())
.finish_non_exhaustive()
 }
}
