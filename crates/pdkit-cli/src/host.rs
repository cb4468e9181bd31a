use crate::error::{CliError, Result};
use pdkit::facade::commands::{self, CommandHost, CommandOutcome, CommandTable};
use pdkit::facade::Facade;
use std::io::Write;
use tracing::{debug, error, warn};

/// A line-oriented script interpreter for the facade's commands.
#[derive(Debug, Default)]
pub struct ScriptHost {
    tables: Vec<CommandTable>,
    keep_going: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptSummary {
    pub executed: usize,
    pub failed: usize,
}

impl CommandHost for ScriptHost {
    fn register_table(&mut self, table: CommandTable) {
        debug!(
            "Registered command table '{}' ({} commands)",
            table.name,
            table.commands.len()
        );
        self.tables.push(table);
    }
}

impl ScriptHost {
    pub fn new(keep_going: bool) -> Self {
        Self {
            tables: Vec::new(),
            keep_going,
        }
    }

    pub fn tables(&self) -> &[CommandTable] {
        &self.tables
    }

    /// Runs `lines` in order, writing command reports to `out`.
    ///
    /// Blank lines and comments are skipped. Lines that cannot be parsed always stop the script;
    /// failing commands stop it unless the host keeps going, in which case they are counted.
    pub fn run<'a>(
        &self,
        facade: &mut Facade,
        lines: impl IntoIterator<Item = &'a str>,
        out: &mut impl Write,
    ) -> Result<ScriptSummary> {
        let mut summary = ScriptSummary::default();
        for (index, line) in lines.into_iter().enumerate() {
            let number = index + 1;
            let words =
                commands::split_words(line).map_err(|source| CliError::Script { line: number, source })?;
            let Some((name, rest)) = words.split_first() else {
                continue;
            };
            let command = commands::find_command(&self.tables, name)
                .map_err(|source| CliError::Script { line: number, source })?;
            debug!("line {}: {}", number, line.trim());
            summary.executed += 1;
            let message = match command.invoke(facade, rest) {
                CommandOutcome::Done(text) => {
                    if !text.is_empty() {
                        writeln!(out, "{}", text)?;
                    }
                    continue;
                }
                CommandOutcome::Failed(message) | CommandOutcome::Usage(message) => message,
            };
            summary.failed += 1;
            if !self.keep_going {
                return Err(CliError::CommandFailed {
                    line: number,
                    command: name.clone(),
                    message,
                });
            }
            warn!("line {}: {} failed: {}", number, name, message);
        }
        if summary.failed > 0 {
            error!(
                "{} of {} command(s) failed",
                summary.failed, summary.executed
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InstallTree, CELLS_LEF};
    use pdkit::facade::commands::CommandError;
    use serial_test::serial;

    fn start(tree: &InstallTree, keep_going: bool) -> (ScriptHost, Facade) {
        let mut host = ScriptHost::new(keep_going);
        let facade = Facade::builder(tree.invocation())
            .try_init(&mut host)
            .unwrap();
        (host, facade)
    }

    #[test]
    #[serial]
    fn script_output_is_written_in_order() {
        let tree = InstallTree::new();
        let lef = tree.write("cells.lef", CELLS_LEF);
        let (host, mut facade) = start(&tree, false);
        let script = format!(
            "# load\nread_lef -name cells {}\n\nreport_resources\n",
            lef.display()
        );
        let mut out = Vec::new();

        let summary = host.run(&mut facade, script.lines(), &mut out).unwrap();

        assert_eq!(summary, ScriptSummary { executed: 2, failed: 0 });
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Loaded library 'cells'\nLookup tables in "));
        assert_eq!(host.tables().len(), 3);
    }

    #[test]
    #[serial]
    fn first_failure_stops_the_script() {
        let tree = InstallTree::new();
        let (host, mut facade) = start(&tree, false);
        let lines = ["report_design_area", "report_resources"];
        let mut out = Vec::new();

        let err = host.run(&mut facade, lines, &mut out).unwrap_err();

        assert!(matches!(err, CliError::CommandFailed { line: 1, .. }));
        assert!(out.is_empty());
    }

    #[test]
    #[serial]
    fn keep_going_counts_failures() {
        let tree = InstallTree::new();
        let (host, mut facade) = start(&tree, true);
        let lines = ["report_design_area", "read_def", "report_resources"];
        let mut out = Vec::new();

        let summary = host.run(&mut facade, lines, &mut out).unwrap();

        assert_eq!(summary, ScriptSummary { executed: 3, failed: 2 });
        assert!(!out.is_empty());
    }

    #[test]
    #[serial]
    fn unknown_commands_stop_even_when_keeping_going() {
        let tree = InstallTree::new();
        let (host, mut facade) = start(&tree, true);
        let err = host
            .run(&mut facade, ["help", "place_design"], &mut Vec::new())
            .unwrap_err();
        match err {
            CliError::Script { line, source } => {
                assert_eq!(line, 2);
                assert_eq!(source, CommandError::UnknownCommand("place_design".into()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
