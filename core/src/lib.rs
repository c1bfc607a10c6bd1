//! Client side of an authorization service: resolves who is asking, checks
//! which privileged actions they may perform, and escalates through an
//! authentication agent or a local helper when they may not.

mod authority;
mod catalog;
pub mod config;
mod decision;
pub mod error;
mod escalation;
pub mod helper;
pub mod identity;
mod service;
mod session;
pub mod socket;

pub use authority::Authority;
pub use config::Config;
pub use config::ConfigError;
pub use config::HelperConfig;
pub use decision::MAX_BATCH_ACTIONS;
pub use decision::decode_bitmask;
pub use error::AuthorityError;
pub use error::Result;
pub use error::Unavailable;
pub use escalation::EscalationOutcome;
pub use helper::LocalHelper;
pub use helper::ProcessHelper;
pub use identity::ProcessSelector;
pub use service::AuthorityService;
pub use session::Attendance;
pub use socket::SocketAuthority;

pub use pkauth_protocol::ActionId;
pub use pkauth_protocol::ActionMetadata;
pub use pkauth_protocol::ProcessIdentity;
pub use pkauth_protocol::WindowToken;
pub use pkauth_protocol::wire::InteractiveReply;
