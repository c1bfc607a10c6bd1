mod action;
mod identity;
pub mod wire;

pub use action::ActionId;
pub use action::ActionMetadata;
pub use action::InvalidActionId;
pub use identity::ProcessIdentity;
pub use identity::WindowToken;
