//! The command table a facade publishes to scripting hosts.
//!
//! A host tokenizes a line with [`split_words`], looks the first word up in the registered
//! tables and calls [`Command::invoke`] with the remaining words. Handlers only talk to the
//! [`Facade`]; the host decides how to show their output.

use super::session::{Facade, LefMode};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unterminated quote in: {0}")]
    UnterminatedQuote(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown option '{option}' for {command}")]
    UnknownOption {
        command: &'static str,
        option: String,
    },

    #[error("Option '{option}' of {command} needs a value")]
    MissingValue {
        command: &'static str,
        option: String,
    },

    #[error("{command} takes {expected} argument(s), got {found}")]
    Arity {
        command: &'static str,
        expected: String,
        found: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command ran; the text is its report, possibly empty.
    Done(String),
    /// The facade reported a soft failure.
    Failed(String),
    /// The arguments did not fit the command.
    Usage(String),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Done(_))
    }
}

pub type Handler = fn(&mut Facade, &CommandArgs) -> CommandOutcome;

#[derive(Clone, Copy)]
pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    /// Options that stand alone, such as `-sort`.
    pub flags: &'static [&'static str],
    /// Options followed by a value, such as `-name NAME`.
    pub options: &'static [&'static str],
    pub min_args: usize,
    pub max_args: usize,
    pub handler: Handler,
}

impl Command {
    /// Parses `words` (the command name excluded) and runs the handler.
    pub fn invoke(&self, facade: &mut Facade, words: &[String]) -> CommandOutcome {
        match CommandArgs::parse(self, words) {
            Ok(args) => (self.handler)(facade, &args),
            Err(e) => CommandOutcome::Usage(format!("{}; usage: {}", e, self.usage)),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// A named group of commands, registered with a host in one call.
#[derive(Debug, Clone, Copy)]
pub struct CommandTable {
    pub name: &'static str,
    pub commands: &'static [Command],
}

impl CommandTable {
    pub fn find(&self, name: &str) -> Option<&'static Command> {
        self.commands.iter().find(|c| c.name == name)
    }
}

/// Anything that can receive the facade's command tables, typically a script interpreter.
pub trait CommandHost {
    fn register_table(&mut self, table: CommandTable);
}

/// Looks `name` up across `tables`, first table first.
pub fn find_command(tables: &[CommandTable], name: &str) -> Result<&'static Command, CommandError> {
    tables
        .iter()
        .find_map(|t| t.find(name))
        .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))
}

/// Splits a script line into words. Single or double quotes group words; an unquoted `#`
/// starting a word comments out the rest of the line.
pub fn split_words(line: &str) -> Result<Vec<String>, CommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_word = true;
                }
                '#' if !in_word => break,
                c if c.is_whitespace() => {
                    if in_word {
                        words.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    current.push(c);
                    in_word = true;
                }
            },
        }
    }
    if quote.is_some() {
        return Err(CommandError::UnterminatedQuote(line.trim().to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    flags: Vec<&'static str>,
    options: HashMap<&'static str, String>,
    positionals: Vec<String>,
}

impl CommandArgs {
    pub fn parse(command: &Command, words: &[String]) -> Result<Self, CommandError> {
        let mut args = CommandArgs::default();
        let mut iter = words.iter();
        while let Some(word) = iter.next() {
            if let Some(flag) = command.flags.iter().find(|f| **f == word.as_str()) {
                args.flags.push(*flag);
            } else if let Some(option) = command.options.iter().find(|o| **o == word.as_str()) {
                let value = iter.next().ok_or_else(|| CommandError::MissingValue {
                    command: command.name,
                    option: word.clone(),
                })?;
                args.options.insert(*option, value.clone());
            } else if word.starts_with('-') && word.len() > 1 {
                return Err(CommandError::UnknownOption {
                    command: command.name,
                    option: word.clone(),
                });
            } else {
                args.positionals.push(word.clone());
            }
        }
        let found = args.positionals.len();
        if found < command.min_args || found > command.max_args {
            let expected = if command.min_args == command.max_args {
                command.min_args.to_string()
            } else {
                format!("{} to {}", command.min_args, command.max_args)
            };
            return Err(CommandError::Arity {
                command: command.name,
                expected,
                found,
            });
        }
        Ok(args)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(&flag)
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positionals.get(index).map(String::as_str)
    }
}

/// Every table the facade publishes, in registration order.
pub fn command_tables() -> [CommandTable; 3] {
    [
        CommandTable {
            name: "database",
            commands: &DATABASE_COMMANDS,
        },
        CommandTable {
            name: "netlist",
            commands: &NETLIST_COMMANDS,
        },
        CommandTable {
            name: "reports",
            commands: &REPORT_COMMANDS,
        },
    ]
}

static DATABASE_COMMANDS: [Command; 5] = [
    Command {
        name: "read_lef",
        usage: "read_lef [-tech] [-library] [-name NAME] FILE",
        summary: "Load a technology and/or cell library",
        flags: &["-tech", "-library"],
        options: &["-name"],
        min_args: 1,
        max_args: 1,
        handler: read_lef,
    },
    Command {
        name: "read_def",
        usage: "read_def FILE",
        summary: "Load the physical design",
        flags: &[],
        options: &[],
        min_args: 1,
        max_args: 1,
        handler: read_def,
    },
    Command {
        name: "write_def",
        usage: "write_def FILE",
        summary: "Write the physical design",
        flags: &[],
        options: &[],
        min_args: 1,
        max_args: 1,
        handler: write_def,
    },
    Command {
        name: "read_db",
        usage: "read_db FILE",
        summary: "Replace the database with a snapshot",
        flags: &[],
        options: &[],
        min_args: 1,
        max_args: 1,
        handler: read_db,
    },
    Command {
        name: "write_db",
        usage: "write_db FILE",
        summary: "Save a snapshot of the database",
        flags: &[],
        options: &[],
        min_args: 1,
        max_args: 1,
        handler: write_db,
    },
];

static NETLIST_COMMANDS: [Command; 3] = [
    Command {
        name: "read_verilog",
        usage: "read_verilog FILE",
        summary: "Stage the modules of a structural Verilog netlist",
        flags: &[],
        options: &[],
        min_args: 1,
        max_args: 1,
        handler: read_verilog,
    },
    Command {
        name: "link_design",
        usage: "link_design TOP",
        summary: "Flatten a staged module into the design",
        flags: &[],
        options: &[],
        min_args: 1,
        max_args: 1,
        handler: link_design,
    },
    Command {
        name: "write_verilog",
        usage: "write_verilog [-sort] FILE",
        summary: "Write the design as structural Verilog",
        flags: &["-sort"],
        options: &[],
        min_args: 1,
        max_args: 1,
        handler: write_verilog,
    },
];

static REPORT_COMMANDS: [Command; 5] = [
    Command {
        name: "report_timing",
        usage: "report_timing [NET]",
        summary: "Report arrivals for the design or one net",
        flags: &[],
        options: &[],
        min_args: 0,
        max_args: 1,
        handler: report_timing,
    },
    Command {
        name: "report_fanout",
        usage: "report_fanout [-max N]",
        summary: "Report nets whose fanout exceeds a limit",
        flags: &[],
        options: &["-max"],
        min_args: 0,
        max_args: 0,
        handler: report_fanout,
    },
    Command {
        name: "report_design_area",
        usage: "report_design_area",
        summary: "Report cell area and utilization",
        flags: &[],
        options: &[],
        min_args: 0,
        max_args: 0,
        handler: report_design_area,
    },
    Command {
        name: "report_resources",
        usage: "report_resources",
        summary: "Report the lookup tables found at startup",
        flags: &[],
        options: &[],
        min_args: 0,
        max_args: 0,
        handler: report_resources,
    },
    Command {
        name: "help",
        usage: "help [COMMAND]",
        summary: "List commands or show the usage of one",
        flags: &[],
        options: &[],
        min_args: 0,
        max_args: 1,
        handler: help,
    },
];

fn failed(facade: &Facade) -> CommandOutcome {
    CommandOutcome::Failed(
        facade
            .last_failure()
            .map_or_else(|| "operation failed".to_string(), |f| f.to_string()),
    )
}

fn file_arg(args: &CommandArgs) -> &str {
    args.positional(0).unwrap_or_default()
}

fn read_lef(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    let file = file_arg(args);
    let name = args.option("-name").map(str::to_string).unwrap_or_else(|| {
        Path::new(file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string())
    });
    let mode = match (args.has_flag("-tech"), args.has_flag("-library")) {
        (true, false) => LefMode::TechOnly,
        (false, true) => LefMode::LibraryOnly,
        _ => LefMode::TechAndLibrary,
    };
    match facade.load_library_and_technology(file, &name, mode) {
        Some(_) => CommandOutcome::Done(format!("Loaded library '{}'", name)),
        None if mode == LefMode::TechOnly && facade.last_failure().is_none() => {
            CommandOutcome::Done(format!("Loaded technology '{}'", name))
        }
        None => failed(facade),
    }
}

fn read_def(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    if facade.load_physical_design(file_arg(args)).is_none() {
        return failed(facade);
    }
    match facade.database().block() {
        Some(block) => CommandOutcome::Done(format!(
            "Loaded design '{}' ({} instances, {} nets)",
            block.name,
            block.instance_count(),
            block.net_count()
        )),
        None => failed(facade),
    }
}

fn write_def(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    if facade.save_physical_design(file_arg(args)) {
        CommandOutcome::Done(String::new())
    } else {
        failed(facade)
    }
}

fn read_db(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    if facade.restore_snapshot(file_arg(args)) {
        CommandOutcome::Done(String::new())
    } else {
        failed(facade)
    }
}

fn write_db(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    if facade.save_snapshot(file_arg(args)) {
        CommandOutcome::Done(String::new())
    } else {
        failed(facade)
    }
}

fn read_verilog(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    if facade.load_netlist(file_arg(args)) {
        CommandOutcome::Done(format!(
            "{} module(s) staged",
            facade.staging().module_count()
        ))
    } else {
        failed(facade)
    }
}

fn link_design(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    let top = file_arg(args);
    match facade.link_netlist_into_design(top) {
        Some(_) => CommandOutcome::Done(format!("Linked design '{}'", top)),
        None => failed(facade),
    }
}

fn write_verilog(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    let sort = args.has_flag("-sort") || facade.config().deterministic_exports;
    if facade.export_netlist(file_arg(args), sort) {
        CommandOutcome::Done(String::new())
    } else {
        failed(facade)
    }
}

fn report_timing(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    let view = match facade.timing_view() {
        Ok(view) => view,
        Err(e) => return CommandOutcome::Failed(e.to_string()),
    };
    let Some(design) = view.design() else {
        return CommandOutcome::Failed("No design is loaded".into());
    };
    if let Some(net) = args.positional(0) {
        return match view.net(net) {
            Ok(t) => CommandOutcome::Done(match t.arrival {
                Some(arrival) => format!("Net {}: arrival {}, fanout {}", net, arrival, t.fanout),
                None => format!("Net {}: on a combinational loop, fanout {}", net, t.fanout),
            }),
            Err(e) => CommandOutcome::Failed(e.to_string()),
        };
    }
    let mut lines = vec![format!(
        "Design {}: {} nets, {} instances",
        design,
        view.net_count(),
        view.instance_count()
    )];
    if let Some((net, arrival)) = view.worst_arrival() {
        lines.push(format!("Worst arrival: {} at {}", net, arrival));
    }
    if !view.loop_nets().is_empty() {
        lines.push(format!(
            "Combinational loops through: {}",
            view.loop_nets().join(" ")
        ));
    }
    CommandOutcome::Done(lines.join("\n"))
}

fn report_fanout(facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    let limit = match args.option("-max").map(str::parse::<usize>) {
        None => None,
        Some(Ok(n)) => Some(n),
        Some(Err(_)) => {
            return CommandOutcome::Usage("-max expects a non-negative integer".into());
        }
    };
    match facade.fanout_violations(limit) {
        Ok(violations) if violations.is_empty() => CommandOutcome::Done(format!(
            "No net exceeds fanout {}",
            limit.unwrap_or(facade.optimizer().max_fanout())
        )),
        Ok(violations) => CommandOutcome::Done(
            violations
                .iter()
                .map(|v| format!("{} {} (limit {})", v.net, v.fanout, v.limit))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Err(e) => CommandOutcome::Failed(e.to_string()),
    }
}

fn report_design_area(facade: &mut Facade, _args: &CommandArgs) -> CommandOutcome {
    match facade.design_area() {
        Ok(report) => CommandOutcome::Done(match report.utilization {
            Some(u) => format!(
                "Design area {:.3} u^2 {:.1}% utilization.",
                report.cell_area_um2,
                u * 100.0
            ),
            None => format!("Design area {:.3} u^2", report.cell_area_um2),
        }),
        Err(e) => CommandOutcome::Failed(e.to_string()),
    }
}

fn report_resources(facade: &mut Facade, _args: &CommandArgs) -> CommandOutcome {
    let resources = facade.lookup_tables();
    let mut lines = vec![format!(
        "Lookup tables in {}",
        resources.folder().display()
    )];
    for table in resources.tables() {
        lines.push(format!(
            "  {}: {} lines, {} bytes",
            table.file_name, table.lines, table.bytes
        ));
    }
    CommandOutcome::Done(lines.join("\n"))
}

fn help(_facade: &mut Facade, args: &CommandArgs) -> CommandOutcome {
    let tables = command_tables();
    if let Some(name) = args.positional(0) {
        return match find_command(&tables, name) {
            Ok(command) => CommandOutcome::Done(format!("{}\n  {}", command.usage, command.summary)),
            Err(e) => CommandOutcome::Failed(e.to_string()),
        };
    }
    let width = tables
        .iter()
        .flat_map(|t| t.commands)
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);
    let lines: Vec<String> = tables
        .iter()
        .flat_map(|t| t.commands)
        .map(|c| format!("{:width$}  {}", c.name, c.summary, width = width))
        .collect();
    CommandOutcome::Done(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        HIERARCHICAL_VERILOG, InstallTree, RecordingHost, SMALL_DESIGN_DEF, TECH_AND_CELLS,
    };
    use serial_test::serial;

    fn words(line: &str) -> Vec<String> {
        split_words(line).unwrap()
    }

    fn run(facade: &mut Facade, tables: &[CommandTable], line: &str) -> CommandOutcome {
        let words = words(line);
        let command = find_command(tables, &words[0]).unwrap();
        command.invoke(facade, &words[1..])
    }

    #[test]
    fn split_words_honors_quotes_and_comments() {
        assert_eq!(
            words(r#"read_lef -name "my cells" 'a b.lef'  # trailing"#),
            ["read_lef", "-name", "my cells", "a b.lef"]
        );
        assert_eq!(words("  # only a comment"), Vec::<String>::new());
        assert_eq!(words(r#"echo a#b """#), ["echo", "a#b", ""]);
        assert!(matches!(
            split_words("read_def \"open"),
            Err(CommandError::UnterminatedQuote(_))
        ));
    }

    #[test]
    fn arguments_are_checked_against_the_command() {
        let tables = command_tables();
        let read_lef = find_command(&tables, "read_lef").unwrap();
        let args = CommandArgs::parse(read_lef, &words("-tech -name cells x.lef")).unwrap();
        assert!(args.has_flag("-tech"));
        assert!(!args.has_flag("-library"));
        assert_eq!(args.option("-name"), Some("cells"));
        assert_eq!(args.positionals(), ["x.lef"]);

        assert_eq!(
            CommandArgs::parse(read_lef, &words("-bogus x.lef")),
            Err(CommandError::UnknownOption {
                command: "read_lef",
                option: "-bogus".into()
            })
        );
        assert!(matches!(
            CommandArgs::parse(read_lef, &words("x.lef -name")),
            Err(CommandError::MissingValue { .. })
        ));
        assert!(matches!(
            CommandArgs::parse(read_lef, &words("a.lef b.lef")),
            Err(CommandError::Arity { found: 2, .. })
        ));
        assert_eq!(
            find_command(&tables, "place_design").unwrap_err(),
            CommandError::UnknownCommand("place_design".into())
        );
    }

    #[test]
    fn command_names_are_unique() {
        let tables = command_tables();
        let mut names: Vec<_> = tables.iter().flat_map(|t| t.commands).map(|c| c.name).collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }

    #[test]
    #[serial]
    fn script_drives_the_facade_end_to_end() {
        let tree = InstallTree::new();
        let lef = tree.write("cells.lef", TECH_AND_CELLS);
        let def = tree.write("top.def", SMALL_DESIGN_DEF);
        let out = tree.root.path().join("out.v");
        let mut host = RecordingHost::default();
        let mut facade = Facade::builder(tree.invocation()).try_init(&mut host).unwrap();
        let tables = host.tables.clone();
        assert_eq!(
            tables.iter().map(|t| t.name).collect::<Vec<_>>(),
            ["database", "netlist", "reports"]
        );

        let outcome = run(&mut facade, &tables, &format!("read_lef {}", lef.display()));
        assert_eq!(outcome, CommandOutcome::Done("Loaded library 'cells'".into()));
        let outcome = run(&mut facade, &tables, &format!("read_def {}", def.display()));
        assert_eq!(
            outcome,
            CommandOutcome::Done("Loaded design 'top' (3 instances, 6 nets)".into())
        );
        assert_eq!(
            run(&mut facade, &tables, "report_timing"),
            CommandOutcome::Done("Design top: 6 nets, 3 instances\nWorst arrival: n2 at 2".into())
        );
        assert_eq!(
            run(&mut facade, &tables, "report_timing n1"),
            CommandOutcome::Done("Net n1: arrival 1, fanout 1".into())
        );
        assert_eq!(
            run(&mut facade, &tables, "report_fanout"),
            CommandOutcome::Done("No net exceeds fanout 20".into())
        );
        assert!(matches!(
            run(&mut facade, &tables, "report_fanout -max many"),
            CommandOutcome::Usage(_)
        ));
        assert!(
            run(&mut facade, &tables, &format!("write_verilog -sort {}", out.display()))
                .is_success()
        );
        assert!(out.is_file());
        match run(&mut facade, &tables, "report_design_area") {
            CommandOutcome::Done(text) => assert!(text.starts_with("Design area 5.852 u^2")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn failures_surface_the_facade_diagnostic() {
        let tree = InstallTree::new();
        let lef = tree.write("cells.lef", TECH_AND_CELLS);
        let netlist = tree.write("top.v", HIERARCHICAL_VERILOG);
        let mut host = RecordingHost::default();
        let mut facade = Facade::builder(tree.invocation()).try_init(&mut host).unwrap();
        let tables = host.tables.clone();

        assert!(matches!(
            run(&mut facade, &tables, "report_timing"),
            CommandOutcome::Failed(_)
        ));
        assert_eq!(
            run(&mut facade, &tables, &format!("read_lef -tech -name tech {}", lef.display())),
            CommandOutcome::Done("Loaded technology 'tech'".into())
        );
        assert!(run(&mut facade, &tables, &format!("read_verilog {}", netlist.display())).is_success());
        match run(&mut facade, &tables, "link_design top") {
            CommandOutcome::Failed(message) => assert!(message.starts_with("malformed input")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(
            run(&mut facade, &tables, &format!("read_lef -library -name cells {}", lef.display()))
                .is_success()
        );
        assert_eq!(
            run(&mut facade, &tables, "link_design top"),
            CommandOutcome::Done("Linked design 'top'".into())
        );
        match run(&mut facade, &tables, "help link_design") {
            CommandOutcome::Done(text) => assert!(text.starts_with("link_design TOP")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
