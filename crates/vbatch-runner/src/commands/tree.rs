use crate::{cli::TreeArgs, error::CliError};
use vbatch_core::correlation::{build_task_tree, parse_task_log};

pub fn handle_tree(args: TreeArgs) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&args.log)?;
    let entries = parse_task_log(&text)?;
    tracing::debug!("Read {} task entries from {}", entries.len(), args.log.display());

    let tree = build_task_tree(entries)?;
    let summary = if args.failures {
        tree.failure_summary(args.detail)
    } else {
        tree.summary(args.detail)
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
