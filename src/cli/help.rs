//! `help-all`: every command's long help, grouped by pipeline phase.

use anyhow::{anyhow, Result};
use clap::{Command, CommandFactory, Parser};

/// Help command options.
#[derive(Parser)]
pub struct HelpCommand {}

/// A pipeline phase and the commands that run in it, in run order.
pub struct Phase {
    /// Heading printed above the phase.
    pub title: &'static str,
    /// Subcommand names.
    pub commands: &'static [&'static str],
}

/// Phases in the order the data flows through them.
pub const PIPELINE: &[Phase] = &[
    Phase {
        title: "Attribution",
        commands: &["attribute"],
    },
    Phase {
        title: "Geocoding",
        commands: &["geocode"],
    },
    Phase {
        title: "Community corrections",
        commands: &["clean-corrections", "correct"],
    },
    Phase {
        title: "Publishing",
        commands: &["upload"],
    },
];

const RULE_WIDTH: usize = 80;

/// Renders the pipeline manual.
pub struct HelpGenerator {
    app: Command,
}

impl HelpGenerator {
    /// Builds the generator over the `station-geo` command tree.
    pub fn new() -> Self {
        Self {
            app: crate::cli::Cli::command(),
        }
    }

    /// Renders the overview followed by one section per phase.
    ///
    /// Fails when a phase names a command the tree does not define.
    pub fn generate_all_help(&self) -> Result<String> {
        let bin = self.app.get_name().to_string();
        let mut out = self.app.clone().render_long_help().to_string();

        for (index, phase) in PIPELINE.iter().enumerate() {
            out.push('\n');
            out.push_str(&"=".repeat(RULE_WIDTH));
            out.push_str(&format!("\n{}. {}\n", index + 1, phase.title));
            out.push_str(&"=".repeat(RULE_WIDTH));
            out.push('\n');

            for name in phase.commands {
                let command = self
                    .app
                    .find_subcommand(name)
                    .ok_or_else(|| anyhow!("Pipeline names unknown command: {name}"))?;
                out.push_str(&format!("\n{bin} {name}\n{}\n", "-".repeat(RULE_WIDTH)));
                let help = command
                    .clone()
                    .bin_name(format!("{bin} {name}"))
                    .render_long_help();
                out.push_str(&help.to_string());
            }
        }
        Ok(out)
    }
}

impl Default for HelpGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl HelpCommand {
    /// Prints the pipeline manual.
    pub fn execute(self) -> Result<()> {
        println!("{}", HelpGenerator::new().generate_all_help()?);
        Ok(())
    }
}
