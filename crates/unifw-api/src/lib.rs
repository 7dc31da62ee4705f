// unifw-api: Async Rust client for UniFi controller firewall rules and groups
//
// Session login (cookie + CSRF token), an authorized request executor, and
// site-scoped CRUD for firewall rules and firewall groups.

pub mod auth;
pub mod controller;
pub mod error;
mod firewall_groups;
mod firewall_rules;
pub mod models;
pub mod session;
pub mod site;
pub mod transport;

pub use auth::{ControllerPlatform, Credentials};
pub use controller::{Controller, ControllerBuilder, DEFAULT_EXPIRY_MARGIN};
pub use error::Error;
pub use models::{
    ApiResponse, DataValidationError, FirewallAction, FirewallGroup, FirewallRule, GroupType,
    Meta, NetworkConfType, Ruleset, SettingPreference, ValidationError,
};
pub use session::SessionCookie;
pub use site::{DEFAULT_SITE, Site};
pub use transport::{TlsMode, TransportConfig};
