// src/bin/cmdtree.rs

use std::rc::Rc;

use anyhow::Result;
use clap::Parser;
use cmdtree::cli::Cli;
use cmdtree::core::command::CommandDef;
use cmdtree::core::controller::{Context, Controller};
use cmdtree::core::dispatcher::Dispatcher;
use cmdtree::core::name::CommandName;
use cmdtree::core::registry::Registry;
use colored::Colorize;

// --- Command Tables ---

/// Root-level commands of the demo tool.
static ROOT_COMMANDS: &[CommandDef] = &[CommandDef {
    name: "version",
    description: "Print the cmdtree version.",
    handler: cmd_version,
}];

/// Commands of the `name` controller: small utilities over command names.
static NAME_COMMANDS: &[CommandDef] = &[
    CommandDef {
        name: "split",
        description: "Print each segment of a command name on its own line.",
        handler: cmd_split,
    },
    CommandDef {
        name: "join",
        description: "Join the given segments into a command name.",
        handler: cmd_join,
    },
];

fn cmd_version(_ctx: &mut Context<'_>, _args: &[String]) -> Result<i32> {
    println!("cmdtree {}", env!("CARGO_PKG_VERSION"));
    Ok(0)
}

fn cmd_split(_ctx: &mut Context<'_>, args: &[String]) -> Result<i32> {
    for arg in args {
        for segment in CommandName::parse(arg).segments() {
            println!("{}", segment);
        }
    }
    Ok(0)
}

fn cmd_join(_ctx: &mut Context<'_>, args: &[String]) -> Result<i32> {
    let name = CommandName::from_segments(args.iter().cloned());
    println!("{}", name);
    Ok(0)
}

/// Assembles the command tree. The `name` controller is contributed through
/// the registry, the same path an embedding program would use to add its own
/// subtrees.
fn build_dispatcher() -> Result<Dispatcher> {
    let mut root = Controller::new("cmdtree");
    root.attach(ROOT_COMMANDS)?;

    let mut names = Controller::new("name");
    names.attach(NAME_COMMANDS)?;

    let mut registry = Registry::new();
    registry.add("cmdtree", Rc::new(names));

    Ok(Dispatcher::new("cmdtree", root, &registry)?)
}

fn run_cli(cli: Cli) -> Result<i32> {
    log::debug!("CLI args parsed: {:?}", cli);
    let dispatcher = build_dispatcher()?;
    let mut err = std::io::stderr();
    dispatcher.execute_command(cli.command.as_deref(), &cli.args, &mut err)
}

fn main() {
    env_logger::init();

    match run_cli(Cli::parse()) {
        Ok(status) => std::process::exit(status),
        Err(e) => {
            eprintln!("\n{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}
