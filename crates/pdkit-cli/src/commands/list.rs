use crate::error::Result;
use pdkit::facade::commands::{CommandTable, command_tables};
use std::io::Write;

pub fn run() -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    write_listing(&command_tables(), &mut stdout)
}

fn write_listing(tables: &[CommandTable], out: &mut impl Write) -> Result<()> {
    for table in tables {
        writeln!(out, "{}:", table.name)?;
        for command in table.commands {
            writeln!(out, "  {:<40} {}", command.usage, command.summary)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_groups_commands_by_table() {
        let mut out = Vec::new();
        write_listing(&command_tables(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("database:\n  read_lef [-tech] [-library] [-name NAME] FILE"));
        assert!(text.contains("netlist:\n"));
        assert!(text.contains("  link_design TOP"));
        assert!(text.contains("reports:\n"));
    }
}
