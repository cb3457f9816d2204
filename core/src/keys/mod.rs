//! keys: key envelopes, session state and rotation on top of the injected
//! reencryption and directory capabilities.

pub mod capability;
pub mod envelope;
pub mod rotation;
pub mod session;
pub mod transform;

pub use capability::*;
pub use envelope::{KeyEnvelope, OpenedKey};
pub use rotation::{GroupKeyState, RotationOutcome, RotationProtocol};
pub use session::{AccountContext, UnlockedAccount};
pub use transform::{member_transform_keys, MemberTransformKey};
