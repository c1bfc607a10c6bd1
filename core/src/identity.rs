//! Resolves the identity an authorization decision is made for.
//!
//! Only *real* ids are ever reported. Whether the caller should pass its own
//! pid or its parent's depends on its trust model: a setuid program doing
//! work for its invoker passes its own pid, a privileged helper spawned on
//! behalf of another process passes the parent's.

use pkauth_protocol::ProcessIdentity;

use crate::error::AuthorityError;
use crate::error::Result;

/// Which process an authorization check is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSelector {
    Current,
    /// The caller's parent. Fails once the parent has exited and the caller
    /// was re-parented to init, whose identity is privileged.
    Parent,
    Pid(u32),
}

impl ProcessSelector {
    pub fn resolve(self) -> Result<ProcessIdentity> {
        match self {
            ProcessSelector::Current => Ok(current_identity()),
            ProcessSelector::Parent => {
                let parent = live_parent(std::os::unix::process::parent_id())?;
                resolve(parent)
            }
            ProcessSelector::Pid(pid) => resolve(pid),
        }
    }
}

const INIT_PID: u32 = 1;

/// Rejects a parent that is init: the real parent has exited and the caller
/// was re-parented.
fn live_parent(parent: u32) -> Result<u32> {
    if parent <= INIT_PID {
        tracing::warn!("parent process is gone; refusing to resolve init's identity");
        return Err(AuthorityError::NoSuchProcess { pid: parent });
    }
    Ok(parent)
}

/// Looks up the real uid and gid of `pid`.
///
/// The process can exit between this call and the authorization round trip;
/// the service then rejects the identity and the caller sees a failure.
pub fn resolve(pid: u32) -> Result<ProcessIdentity> {
    if pid == std::process::id() {
        return Ok(current_identity());
    }
    resolve_other(pid)
}

fn current_identity() -> ProcessIdentity {
    // SAFETY: getuid(2) and getgid(2) cannot fail.
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    ProcessIdentity {
        pid: std::process::id(),
        uid,
        gid,
    }
}

#[cfg(target_os = "linux")]
fn resolve_other(pid: u32) -> Result<ProcessIdentity> {
    let path = format!("/proc/{pid}/status");
    let status = std::fs::read_to_string(&path).map_err(|err| {
        tracing::debug!("failed to read {path}: {err}");
        AuthorityError::NoSuchProcess { pid }
    })?;
    let (uid, gid) = parse_real_ids(&status).ok_or_else(|| {
        tracing::warn!("{path} has no parsable Uid/Gid lines");
        AuthorityError::NoSuchProcess { pid }
    })?;
    Ok(ProcessIdentity { pid, uid, gid })
}

// Without procfs there is no portable way to read another process's real
// ids, so only the calling process can be resolved.
#[cfg(not(target_os = "linux"))]
fn resolve_other(pid: u32) -> Result<ProcessIdentity> {
    Err(AuthorityError::NoSuchProcess { pid })
}

/// Extracts the real ids from `/proc/<pid>/status`. The `Uid:` and `Gid:`
/// lines list real, effective, saved and filesystem ids in that order.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_real_ids(status: &str) -> Option<(u32, u32)> {
    let mut uid = None;
    let mut gid = None;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("Uid:") {
            uid = first_field(rest);
        } else if let Some(rest) = line.strip_prefix("Gid:") {
            gid = first_field(rest);
        }
    }
    Some((uid?, gid?))
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn first_field(rest: &str) -> Option<u32> {
    rest.split_whitespace().next()?.parse().ok()
}
