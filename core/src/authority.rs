use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::helper::LocalHelper;
use crate::helper::ProcessHelper;
use crate::service::AuthorityService;
use crate::session::Attendance;
use crate::socket::SocketAuthority;

/// Entry point for catalog queries, authorization checks and escalation.
///
/// Holds no mutable state; clones share the same collaborators and can be
/// used from any number of tasks at once.
#[derive(Clone)]
pub struct Authority {
    pub(crate) service: Arc<dyn AuthorityService>,
    pub(crate) helper: Arc<dyn LocalHelper>,
    pub(crate) timeout: Duration,
    pub(crate) interactive_timeout: Duration,
    pub(crate) attendance: Attendance,
}

impl Authority {
    pub fn new(service: Arc<dyn AuthorityService>, helper: Arc<dyn LocalHelper>) -> Self {
        let defaults = Config::default();
        Self {
            service,
            helper,
            timeout: defaults.timeout(),
            interactive_timeout: defaults.interactive_timeout(),
            attendance: defaults.attendance,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let service = Arc::new(SocketAuthority::new(config.socket_path.clone()));
        let helper = Arc::new(
            ProcessHelper::new(config.helper.program.clone())
                .with_args(config.helper.args.clone())
                .with_grace(config.helper.grace()),
        );
        Self::new(service, helper)
            .with_timeout(config.timeout())
            .with_interactive_timeout(config.interactive_timeout())
            .with_attendance(config.attendance)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interactive_timeout(mut self, timeout: Duration) -> Self {
        self.interactive_timeout = timeout;
        self
    }

    pub fn with_attendance(mut self, attendance: Attendance) -> Self {
        self.attendance = attendance;
        self
    }
}
