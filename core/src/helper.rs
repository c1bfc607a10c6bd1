//! Local privileged helper used when no authentication agent is reachable.
//!
//! The helper is an external program that prompts on the controlling
//! terminal. It is invoked as `program [args...] <action-id> <pid>` and exits
//! zero iff authorization was obtained.
//!
//! Teardown rules:
//! - the helper runs in its own process group, so everything it starts is
//!   signalled along with it;
//! - when the caller owns the terminal foreground, the helper's group gets it
//!   for the duration of the prompt and it is handed back before `run`
//!   returns;
//! - on Linux the helper gets `SIGTERM` if the calling process dies
//!   (`PR_SET_PDEATHSIG`), re-checked after fork to close the race;
//! - on timeout or cancellation the group gets `SIGTERM`, then `SIGKILL` once
//!   the grace period runs out, and the helper is always reaped before `run`
//!   returns;
//! - whatever is left in the group once the helper has exited is killed.

use std::io;
use std::io::IsTerminal;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;

use pkauth_protocol::ActionId;
use tokio::process::Child;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::AuthorityError;
use crate::error::Result;

#[async_trait::async_trait]
pub trait LocalHelper: Send + Sync {
    /// Runs the helper to completion and returns its exit code.
    ///
    /// Must not return before the helper process has been reaped, including
    /// when `timeout` expires or `cancel` fires.
    async fn run(
        &self,
        action_id: &ActionId,
        pid: u32,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<i32>;
}

#[derive(Debug, Clone)]
pub struct ProcessHelper {
    program: PathBuf,
    args: Vec<String>,
    grace: Duration,
}

impl ProcessHelper {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            grace: Duration::from_secs(2),
        }
    }

    /// Arguments placed before the action id and pid.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// How long a terminated helper gets to exit before it is killed.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, action_id: &ActionId, pid: u32, take_terminal: bool) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(action_id.as_str())
            .arg(pid.to_string())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        #[cfg(target_os = "linux")]
        let parent_pid = unsafe { libc::getpid() };
        unsafe {
            command.pre_exec(move || {
                set_process_group()?;
                if take_terminal {
                    set_foreground_group(libc::getpid())?;
                }
                #[cfg(target_os = "linux")]
                set_parent_death_signal(parent_pid)?;
                Ok(())
            });
        }
        command
    }
}

enum Waited {
    Exited(io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

#[async_trait::async_trait]
impl LocalHelper for ProcessHelper {
    async fn run(
        &self,
        action_id: &ActionId,
        pid: u32,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<i32> {
        tracing::debug!(
            "spawning helper {:?} for {action_id} (pid {pid})",
            self.program
        );
        // Declared before the child so the terminal is handed back only after
        // the helper's group has been torn down.
        let foreground = ForegroundGuard::claim();
        let mut child = self
            .command(action_id, pid, foreground.is_some())
            .spawn()
            .map_err(|err| AuthorityError::HelperUnavailable {
                message: format!("{}: {err}", self.program.display()),
            })?;
        // The helper leads its own group, so its pid is the group id.
        let process_group = child.id();

        let waited = tokio::select! {
            status = child.wait() => Waited::Exited(status),
            () = tokio::time::sleep(timeout) => Waited::TimedOut,
            () = cancel.cancelled() => Waited::Cancelled,
        };

        let result = match waited {
            Waited::Exited(Ok(status)) => Ok(exit_code(status)),
            Waited::Exited(Err(err)) => {
                terminate(&mut child, process_group, self.grace).await;
                Err(AuthorityError::HelperUnavailable {
                    message: format!("failed to wait for helper: {err}"),
                })
            }
            Waited::TimedOut => {
                tracing::warn!("helper for {action_id} timed out after {timeout:?}");
                terminate(&mut child, process_group, self.grace).await;
                Err(AuthorityError::timeout(timeout))
            }
            Waited::Cancelled => {
                tracing::debug!("helper for {action_id} cancelled");
                terminate(&mut child, process_group, self.grace).await;
                Err(AuthorityError::Cancelled)
            }
        };

        if let Some(process_group) = process_group
            && let Err(err) = signal_process_group(process_group, libc::SIGKILL)
        {
            tracing::warn!("failed to kill leftovers of helper group {process_group}: {err}");
        }
        result
    }
}

/// Signals the helper's group to stop and reaps the helper. Escalates to
/// `SIGKILL` after `grace`.
async fn terminate(child: &mut Child, process_group: Option<u32>, grace: Duration) {
    let Some(process_group) = process_group else {
        return;
    };
    if let Err(err) = signal_process_group(process_group, libc::SIGTERM) {
        tracing::warn!("failed to send SIGTERM to helper group {process_group}: {err}");
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!("helper exited after SIGTERM: {status}"),
        Ok(Err(err)) => tracing::warn!("failed to reap helper: {err}"),
        Err(_) => {
            tracing::warn!("helper ignored SIGTERM for {grace:?}; killing its group");
            if let Err(err) = signal_process_group(process_group, libc::SIGKILL) {
                tracing::warn!("failed to send SIGKILL to helper group {process_group}: {err}");
            }
            if let Err(err) = child.wait().await {
                tracing::warn!("failed to reap helper: {err}");
            }
        }
    }
}

/// Sends `signal` to every process in `process_group`. A group that no
/// longer exists is not an error.
fn signal_process_group(process_group: u32, signal: libc::c_int) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(process_group).map_err(io::Error::other)?;
    if unsafe { libc::killpg(pgid, signal) } == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

/// Runs in `pre_exec`: the helper becomes the leader of a new group.
fn set_process_group() -> io::Result<()> {
    if unsafe { libc::setpgid(0, 0) } == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Makes `process_group` the foreground group of the terminal on stdin.
///
/// Called from a background group, so `SIGTTOU` is blocked around the call.
/// Only async-signal-safe calls, so it can also run in `pre_exec`.
fn set_foreground_group(process_group: libc::pid_t) -> io::Result<()> {
    unsafe {
        let mut ttou: libc::sigset_t = std::mem::zeroed();
        let mut previous: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut ttou);
        libc::sigaddset(&mut ttou, libc::SIGTTOU);
        libc::pthread_sigmask(libc::SIG_BLOCK, &ttou, &mut previous);
        let result = libc::tcsetpgrp(libc::STDIN_FILENO, process_group);
        let err = io::Error::last_os_error();
        libc::pthread_sigmask(libc::SIG_SETMASK, &previous, std::ptr::null_mut());
        if result == -1 {
            return Err(err);
        }
    }
    Ok(())
}

/// Held while the helper owns the terminal; gives it back on drop.
struct ForegroundGuard {
    previous: libc::pid_t,
}

impl ForegroundGuard {
    /// Returns a guard only if stdin is a terminal whose foreground group is
    /// the caller's.
    fn claim() -> Option<Self> {
        if !std::io::stdin().is_terminal() {
            return None;
        }
        let (foreground, own) =
            unsafe { (libc::tcgetpgrp(libc::STDIN_FILENO), libc::getpgrp()) };
        (foreground == own).then_some(Self { previous: own })
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        if let Err(err) = set_foreground_group(self.previous) {
            tracing::warn!("failed to take back the terminal: {err}");
        }
    }
}

#[cfg(target_os = "linux")]
fn set_parent_death_signal(parent_pid: libc::pid_t) -> io::Result<()> {
    if unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) } == -1 {
        return Err(io::Error::last_os_error());
    }

    // The parent may have exited between fork and prctl.
    if unsafe { libc::getppid() } != parent_pid {
        unsafe {
            libc::raise(libc::SIGTERM);
        }
    }

    Ok(())
}

/// A helper killed by signal `n` reports `128 + n`, like a shell would.
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => -1,
    }
}
