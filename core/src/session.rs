use std::io::IsTerminal;

use serde::Deserialize;
use serde::Serialize;

/// Whether someone is sitting at the calling process's terminal.
///
/// The local helper fallback prompts on the controlling terminal, so it is
/// only attempted for attended sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    /// Attended iff both stdin and stdout are terminals.
    #[default]
    Detect,
    Attended,
    Unattended,
}

impl Attendance {
    pub fn is_attended(self) -> bool {
        match self {
            Attendance::Detect => {
                std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
            }
            Attendance::Attended => true,
            Attendance::Unattended => false,
        }
    }
}
