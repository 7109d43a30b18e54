use crate::{
    cli::{FlagsAction, FlagsArgs},
    error::CliError,
};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets, Attribute, Cell, Table};
use vbatch_core::flags::ToolFlags;

fn render_flags(flags: &ToolFlags) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Flag").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
    for (flag, value) in flags.iter() {
        table.add_row(vec![
            Cell::new(flag),
            Cell::new(value.map(|v| v.to_string()).unwrap_or_default()),
        ]);
    }
    table
}

pub fn handle_flags(args: FlagsArgs) -> Result<(), CliError> {
    match args.action {
        FlagsAction::Encode { words } => {
            let flags = ToolFlags::decode(&words.join(";"))?;
            println!("{}", flags.encode());
        }
        FlagsAction::Decode { value, coverage } => {
            let mut flags = ToolFlags::decode(&value)?;
            if coverage {
                flags = flags.for_coverage();
            }
            if flags.is_empty() {
                println!("No flags.");
            } else {
                println!("{}", render_flags(&flags));
            }
        }
    }
    Ok(())
}
