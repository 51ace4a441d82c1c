//! `bundlesync resolve`: print the download list.

use bundlesync::resolver::BundleInfo;
use clap::Args;
use console::style;

use super::common::{format_size, resolve_list, SourceArgs};
use crate::error::CliError;

/// Arguments for `resolve`.
#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print the list as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the resolve command.
pub fn run(args: ResolveArgs) -> Result<(), CliError> {
    let mode = args.source.play_mode()?;
    let list = resolve_list(&mode, &args.source.selection())?;

    if args.json {
        let json = serde_json::to_string_pretty(&list).map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    print_list(&list);
    Ok(())
}

fn print_list(list: &[BundleInfo]) {
    if list.is_empty() {
        println!("{}", style("Nothing to download").green());
        return;
    }

    for info in list {
        println!(
            "{:<32} {:>10}  {}",
            info.bundle.bundle_name,
            format_size(info.bundle.file_size),
            info.main_url().unwrap_or(&info.bundle.file_name)
        );
    }

    let total: u64 = list.iter().map(|info| info.bundle.file_size).sum();
    println!();
    println!(
        "{} bundles, {}",
        style(list.len()).bold(),
        style(format_size(total)).bold()
    );
}
