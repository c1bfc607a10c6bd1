use std::fmt::Write as _;

use clap::Args;
use pkauth_core::ActionId;
use pkauth_core::ActionMetadata;
use pkauth_core::Authority;

pub(crate) async fn run_list(authority: &Authority) -> anyhow::Result<i32> {
    for action_id in authority.list_actions().await? {
        println!("{action_id}");
    }
    Ok(0)
}

#[derive(Debug, Args)]
pub struct DescribeCommand {
    /// Action to describe.
    #[arg(value_name = "ACTION")]
    pub action_id: ActionId,

    /// Print the metadata as JSON.
    #[arg(long)]
    pub json: bool,
}

impl DescribeCommand {
    pub async fn run(&self, authority: &Authority) -> anyhow::Result<i32> {
        let metadata = authority.describe_action(&self.action_id).await?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        } else {
            print!("{}", format_metadata(&self.action_id, &metadata));
        }
        Ok(0)
    }
}

fn format_metadata(action_id: &ActionId, metadata: &ActionMetadata) -> String {
    let mut out = format!("action: {action_id}\n");
    for (label, value) in [
        ("description", &metadata.description),
        ("message", &metadata.message),
        ("vendor", &metadata.vendor),
        ("vendor_url", &metadata.vendor_url),
        ("icon_name", &metadata.icon_name),
    ] {
        if !value.is_empty() {
            let _ = writeln!(out, "{label}: {value}");
        }
    }

    let mut annotations: Vec<_> = metadata.annotations.iter().collect();
    annotations.sort();
    for (key, value) in annotations {
        let _ = writeln!(out, "annotation: {key} = {value}");
    }
    out
}
