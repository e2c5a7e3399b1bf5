//! Firebase Authentication, Cloud Firestore and Google OAuth adapters.
//!
//! # Architecture
//!
//! - REST only: Identity Toolkit v1 for accounts, Firestore v1 for profiles
//! - Each browser session gets its own [`FirebaseAuth`] (signed-in user plus
//!   an auth-state channel) on top of one shared [`IdentityToolkitClient`]
//! - Backend error codes are mapped to [`IdentityError`] here and nowhere else
//!
//! When Firebase is not configured the `Disabled*` implementations stand in,
//! failing every call with `NotConfigured`.

mod error;
mod firestore;
mod google;
mod identity;

pub use error::{GENERIC_FAILURE, IdentityError, OAuthError, ProfileStoreError};
pub use firestore::{DisabledProfileStore, FirestoreClient, ProfileStore};
pub use google::{GoogleOAuthClient, GoogleTokens};
pub use identity::{
    AuthStateReceiver, AuthUser, DisabledIdentity, FederatedCredential, FirebaseAuth,
    IdentityBackend, IdentityToolkitClient,
};
