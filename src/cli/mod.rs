use clap::Parser;

/// cmdtree: a hierarchical command dispatcher for unix command-line tools.
///
/// The outer surface stays deliberately thin: clap collects one optional
/// command path plus trailing arguments, and everything after that is the
/// dispatcher's business. clap's own help subcommand is disabled because the
/// tree provides its `help` command on every controller.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Colon-separated command path, e.g. `name:split`. Segments may be
    /// abbreviated as long as the abbreviation is unique; omitting the path
    /// runs the default command.
    pub command: Option<String>,

    /// Arguments handed to the resolved command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
