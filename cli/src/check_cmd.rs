use clap::Args;
use pkauth_core::ActionId;
use pkauth_core::Authority;

use crate::SubjectArgs;

#[derive(Debug, Args)]
pub struct CheckCommand {
    #[clap(flatten)]
    pub subject: SubjectArgs,

    /// Actions to check, in one round trip.
    #[arg(value_name = "ACTION", required = true)]
    pub actions: Vec<ActionId>,
}

impl CheckCommand {
    /// Prints each authorized action once, in request order.
    pub async fn run(&self, authority: &Authority) -> anyhow::Result<i32> {
        let granted = authority
            .check(self.subject.selector(), &self.actions)
            .await?;

        let mut printed = Vec::new();
        for action_id in &self.actions {
            if granted.contains(action_id) && !printed.contains(&action_id) {
                println!("{action_id}");
                printed.push(action_id);
            }
        }

        let all_granted = self.actions.iter().all(|action_id| granted.contains(action_id));
        Ok(if all_granted { 0 } else { 1 })
    }
}
