use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// The subject of an authorization decision.
///
/// `uid` and `gid` are always the *real* ids of the process. A setuid-root
/// program acting for an unprivileged invoker is judged as the invoker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessIdentity {
    pub pid: u32,
    pub uid: u32,
    pub gid: u32,
}

impl fmt::Display for ProcessIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid={} uid={} gid={}", self.pid, self.uid, self.gid)
    }
}

/// Window the consent dialog should be transient for. `0` means no window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowToken(pub u64);

impl WindowToken {
    pub const NONE: WindowToken = WindowToken(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for WindowToken {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
