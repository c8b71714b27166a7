//! `soldexer list` command.

use clap::Args;
use comfy_table::Table;
use soldexer_core::{PipeCatalog, PipelineConfig, Result, TransferClient};

use crate::output;

#[derive(Args)]
pub struct ListArgs {}

pub async fn execute(_args: ListArgs, config: PipelineConfig) -> Result<()> {
    let client = TransferClient::new(&config.server_url, config.timeouts.clone())?;
    println!("Fetching pipes from {}...", client.base_url());

    match client.list_pipes().await? {
        None => println!("No pipes found or server endpoint not available."),
        Some(catalog) if catalog.total_count == 0 || catalog.pipes.is_empty() => {
            println!("No pipes found.")
        }
        Some(catalog) => {
            println!("Found {} pipe(s):\n", catalog.total_count);
            println!("{}", catalog_table(&catalog));
        }
    }
    Ok(())
}

fn catalog_table(catalog: &PipeCatalog) -> Table {
    let mut table = output::new_table(&["NAME", "VERSIONS", "DESCRIPTION"]);
    for pipe in &catalog.pipes {
        let versions = pipe.versions_newest_first();
        let versions = if versions.is_empty() {
            "(none)".to_string()
        } else {
            versions.join(", ")
        };
        table.add_row(vec![pipe.name.as_str(), versions.as_str(), pipe.description.as_str()]);
    }
    table
}
