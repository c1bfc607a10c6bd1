use clap::Args;
use pkauth_core::ActionId;
use pkauth_core::Authority;
use pkauth_core::EscalationOutcome;
use pkauth_core::WindowToken;
use tokio_util::sync::CancellationToken;

use crate::SubjectArgs;

#[derive(Debug, Args)]
pub struct ObtainCommand {
    #[clap(flatten)]
    pub subject: SubjectArgs,

    /// Window the consent dialog should be attached to.
    #[arg(long, value_name = "ID", default_value_t = 0)]
    pub window: u64,

    /// Action to obtain.
    #[arg(value_name = "ACTION")]
    pub action_id: ActionId,
}

impl ObtainCommand {
    pub async fn run(&self, authority: &Authority) -> anyhow::Result<i32> {
        let cancel = CancellationToken::new();
        let ctrl_c = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::debug!("interrupted; cancelling escalation");
                    cancel.cancel();
                }
            }
        });

        let outcome = authority
            .obtain(
                &self.action_id,
                WindowToken(self.window),
                self.subject.selector(),
                &cancel,
            )
            .await;
        ctrl_c.abort();

        let action_id = &self.action_id;
        Ok(match outcome {
            EscalationOutcome::Granted => {
                println!("{action_id}: granted");
                0
            }
            EscalationOutcome::Denied => {
                println!("{action_id}: denied");
                1
            }
            EscalationOutcome::Failed(err) => {
                eprintln!("{action_id}: {}: {err}", err.code());
                2
            }
        })
    }
}
