//! Identity/session context and role-gated navigation
//!
//! `SessionManager` follows the identity provider's session changes and
//! resolves the league role of the signed-in user from the `profiles`
//! relation. `Navigator` turns the published session state into the screen
//! tree the user may reach.

mod error;
mod navigator;
mod profiles;
mod session;
mod types;

pub use error::AuthError;
pub use navigator::{select_tree, Navigator, Screen, ScreenTree};
pub use profiles::{find_role, provision_profile, resolve_role};
pub use session::{SessionManager, SessionSnapshot};
pub use types::{Role, PROFILES};
