use std::cell::{Cell, OnceCell};
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use anyhow::Result;
use thiserror::Error;

use crate::constants::DEFAULT_COMMAND;
use crate::core::command::{Action, Command, CommandDef};
use crate::core::name::CommandName;
use crate::core::prefix_index::{Lookup, PrefixIndex};

/// Errors raised while a controller tree is being built. These are
/// programming errors and abort construction.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Two commands were registered with the same full name on one controller.
    #[error("Command '{name}' is already registered on controller '{controller}'.")]
    DuplicateCommand { name: String, controller: String },
    /// Two children were attached with the same name on one controller.
    #[error("Controller '{controller}' already has a child named '{name}'.")]
    DuplicateChild { name: String, controller: String },
}

/// Fatal routing errors. Unknown and ambiguous user input is *not* an error
/// (it is reported to the diagnostic stream and surfaces as a non-zero
/// status); these variants indicate a broken tree.
#[derive(Error, Debug)]
pub enum RouteError {
    /// A proxy's recorded name did not route to a concrete controller.
    #[error("Proxy controller '{proxy}' could not resolve its target '{target}'.")]
    ProxyTargetUnresolved { proxy: String, target: String },
    /// A proxy was reached again while resolving its own target.
    #[error("Proxy controller '{proxy}' routes through itself.")]
    ProxyCycle { proxy: String },
    /// Writing to the diagnostic stream failed.
    #[error("Diagnostic stream error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-dispatch accumulator threaded through one routing call chain.
/// Discarded after the dispatch completes.
pub struct Context<'a> {
    /// The name the user asked for, verbatim.
    pub requested: CommandName,
    /// The fully qualified path actually walked: abbreviated segments are
    /// replaced by the full keys they resolved to, including substitutions
    /// performed by proxy indirection. Purely diagnostic.
    pub real_name: CommandName,
    /// The diagnostic stream. Help listings and routing errors land here.
    pub out: &'a mut dyn Write,
}

impl<'a> Context<'a> {
    pub fn new(requested: CommandName, out: &'a mut dyn Write) -> Self {
        Self {
            requested,
            real_name: CommandName::empty(),
            out,
        }
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("requested", &self.requested)
            .field("real_name", &self.real_name)
            .finish_non_exhaustive()
    }
}

/// Where routing a name through the tree ended up.
#[derive(Debug)]
pub enum RouteOutcome {
    /// Routing stopped at `controller`; `remainder` holds the segments it
    /// did not consume as child names (empty when the whole name routed).
    /// The remainder is resolved against the controller's local commands.
    Resolved {
        controller: Rc<Controller>,
        remainder: CommandName,
    },
    /// A segment matched two or more children, none exactly. Distinct from
    /// an unknown command: the candidates are reported, never picked from.
    Ambiguous {
        prefix: String,
        candidates: Vec<String>,
    },
}

/// How a terminal controller resolved the remaining name against its local
/// commands.
enum CommandResolution<'a> {
    Command {
        command: &'a Command,
        full_name: String,
    },
    /// No command was named and the controller's default command does not
    /// resolve to a real command.
    NoDefault,
    Unknown {
        name: CommandName,
    },
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
}

/// Lazily resolved delegation target of a proxy controller.
struct ProxyTarget {
    proxied: CommandName,
    target: OnceCell<Rc<Controller>>,
    resolving: Cell<bool>,
}

/// A node of the command tree: a prefix index of local commands and a prefix
/// index of named child controllers.
///
/// A controller is built once, before the dispatcher runs, and is read-only
/// during dispatch. Children live behind [`Rc`] so proxy controllers can
/// share their resolved targets.
pub struct Controller {
    name: String,
    commands: PrefixIndex<Command>,
    children: PrefixIndex<Rc<Controller>>,
    default_command: String,
    proxy: Option<ProxyTarget>,
}

impl Controller {
    /// Creates an empty controller. The built-in `help` command is
    /// registered immediately and doubles as the default command.
    pub fn new(name: &str) -> Self {
        let mut commands = PrefixIndex::new();
        let help = Command::help();
        commands.insert(help.name().to_string(), help);
        Self {
            name: name.to_string(),
            commands,
            children: PrefixIndex::new(),
            default_command: DEFAULT_COMMAND.to_string(),
            proxy: None,
        }
    }

    /// Creates a proxy controller: a pass-through that routes `proxied`
    /// through the dispatch root on first use, memoizes the concrete target,
    /// and thereafter forwards all routing to it. The target must not be
    /// resolved before the tree is fully built; resolution fires on the
    /// first routing call, which is after construction.
    pub fn proxy(name: &str, proxied: CommandName) -> Self {
        let mut controller = Self::new(name);
        controller.proxy = Some(ProxyTarget {
            proxied,
            target: OnceCell::new(),
            resolving: Cell::new(false),
        });
        controller
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A controller's description defers to its default command's
    /// description when that command exists.
    pub fn description(&self) -> Option<&str> {
        match self.commands.lookup(&self.default_command) {
            Lookup::Unique { value, .. } => value.description(),
            _ => None,
        }
    }

    /// Changes which command an empty remainder resolves to. The name must
    /// resolve against the local commands by dispatch time, else dispatching
    /// the empty name reports "Default command undefined.".
    pub fn set_default_command(&mut self, name: &str) {
        self.default_command = name.to_string();
    }

    /// Registers a local command. Full names must be unique per controller.
    pub fn add_command(&mut self, command: Command) -> Result<(), BuildError> {
        if self.commands.contains(command.name()) {
            return Err(BuildError::DuplicateCommand {
                name: command.name().to_string(),
                controller: self.name.clone(),
            });
        }
        self.commands.insert(command.name().to_string(), command);
        Ok(())
    }

    /// Attaches a declarative command table wholesale.
    pub fn attach(&mut self, defs: &[CommandDef]) -> Result<(), BuildError> {
        for def in defs {
            self.add_command(Command::from(def))?;
        }
        Ok(())
    }

    /// Attaches a child controller under its own name.
    pub fn add_child(&mut self, child: Self) -> Result<Rc<Self>, BuildError> {
        self.add_child_rc(Rc::new(child))
    }

    /// Attaches an already-shared child controller, as contributed through
    /// the dependency registry.
    pub fn add_child_rc(&mut self, child: Rc<Self>) -> Result<Rc<Self>, BuildError> {
        if self.children.contains(child.name()) {
            return Err(BuildError::DuplicateChild {
                name: child.name().to_string(),
                controller: self.name.clone(),
            });
        }
        self.children.insert(child.name().to_string(), child.clone());
        Ok(child)
    }

    /// Routes `name` through this controller's descendants, treating `self`
    /// as the dispatch root for proxy resolution.
    ///
    /// Routing consumes segments for as long as they resolve to children;
    /// the first segment that matches no child stops the descent and is left
    /// in the remainder for command resolution. Each consumed segment's
    /// *full* child key is appended to `ctx.real_name`.
    pub fn route(
        self: &Rc<Self>,
        ctx: &mut Context<'_>,
        name: &CommandName,
    ) -> Result<RouteOutcome, RouteError> {
        self.route_inner(self, ctx, name)
    }

    fn route_inner(
        self: &Rc<Self>,
        root: &Rc<Self>,
        ctx: &mut Context<'_>,
        name: &CommandName,
    ) -> Result<RouteOutcome, RouteError> {
        if let Some(proxy) = &self.proxy {
            let target = proxy.resolve(&self.name, root)?;
            return target.route_inner(root, ctx, name);
        }
        let Some(head) = name.first() else {
            return Ok(RouteOutcome::Resolved {
                controller: self.clone(),
                remainder: CommandName::empty(),
            });
        };
        match self.children.lookup(head) {
            Lookup::None => Ok(RouteOutcome::Resolved {
                controller: self.clone(),
                remainder: name.clone(),
            }),
            Lookup::Unique { full_key, value } => {
                ctx.real_name = ctx.real_name.join(full_key);
                let child = value.clone();
                child.route_inner(root, ctx, &name.tail())
            }
            Lookup::Ambiguous { candidates } => Ok(RouteOutcome::Ambiguous {
                prefix: head.to_string(),
                candidates: candidates.into_iter().map(str::to_string).collect(),
            }),
        }
    }

    /// Routes `ctx.requested` through the tree, resolves the remaining name
    /// against the terminal controller's commands, and runs the result.
    ///
    /// Unknown and ambiguous names are reported to `ctx.out` and return a
    /// non-zero status. Broken trees ([`RouteError`]) and handler-body
    /// failures propagate as errors.
    pub fn execute(self: &Rc<Self>, ctx: &mut Context<'_>, args: &[String]) -> Result<i32> {
        let requested = ctx.requested.clone();
        match self.route(ctx, &requested)? {
            RouteOutcome::Resolved {
                controller,
                remainder,
            } => controller.run_resolved(ctx, &remainder, args),
            RouteOutcome::Ambiguous { prefix, candidates } => {
                report_ambiguous(ctx.out, &prefix, &candidates)?;
                Ok(1)
            }
        }
    }

    fn run_resolved(
        self: &Rc<Self>,
        ctx: &mut Context<'_>,
        remainder: &CommandName,
        args: &[String],
    ) -> Result<i32> {
        match self.resolve_command(remainder) {
            CommandResolution::Command { command, full_name } => {
                ctx.real_name = ctx.real_name.join(&full_name);
                log::debug!(
                    "Routed '{}' to '{}' on controller '{}'.",
                    ctx.requested.display_name(),
                    ctx.real_name,
                    self.name
                );
                match command.action {
                    Action::Help => {
                        self.write_help(ctx.out)?;
                        Ok(0)
                    }
                    Action::Callback(ref callback) => callback(ctx, args),
                }
            }
            CommandResolution::NoDefault => {
                writeln!(ctx.out, "ERROR: Default command undefined.")?;
                Ok(1)
            }
            CommandResolution::Unknown { name } => {
                ctx.real_name = ctx.real_name.concat(&name);
                writeln!(
                    ctx.out,
                    "ERROR: Unknown command: {}",
                    ctx.real_name.display_name()
                )?;
                self.write_help(ctx.out)?;
                Ok(1)
            }
            CommandResolution::Ambiguous { name, candidates } => {
                report_ambiguous(ctx.out, &name, &candidates)?;
                Ok(1)
            }
        }
    }

    /// Resolves the routing remainder against the local commands. An empty
    /// remainder substitutes the default command; a multi-segment remainder
    /// can never name a local command and is unknown outright.
    fn resolve_command(&self, remainder: &CommandName) -> CommandResolution<'_> {
        if remainder.is_empty() {
            return match self.commands.lookup(&self.default_command) {
                Lookup::Unique { full_key, value } => CommandResolution::Command {
                    command: value,
                    full_name: full_key.to_string(),
                },
                _ => CommandResolution::NoDefault,
            };
        }
        let head = match remainder.first() {
            Some(head) if remainder.len() == 1 => head,
            _ => {
                return CommandResolution::Unknown {
                    name: remainder.clone(),
                };
            }
        };
        match self.commands.lookup(head) {
            Lookup::None => CommandResolution::Unknown {
                name: remainder.clone(),
            },
            Lookup::Unique { full_key, value } => CommandResolution::Command {
                command: value,
                full_name: full_key.to_string(),
            },
            Lookup::Ambiguous { candidates } => CommandResolution::Ambiguous {
                name: head.to_string(),
                candidates: candidates.into_iter().map(str::to_string).collect(),
            },
        }
    }

    /// Writes the listing the built-in `help` command produces: local
    /// commands and direct children, sorted by name, each with its
    /// description.
    fn write_help(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "Commands:")?;
        let mut entries: Vec<(String, Option<String>)> = self
            .commands
            .iter()
            .map(|(name, command)| (name.to_string(), command.description().map(str::to_string)))
            .collect();
        for (name, child) in self.children.iter() {
            entries.push((name.to_string(), child.description().map(str::to_string)));
        }
        entries.sort();
        for (name, description) in entries {
            writeln!(out, "   {}", name)?;
            if let Some(description) = description {
                writeln!(out, "      {}", description)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("commands", &self.commands.len())
            .field("children", &self.children.len())
            .field("proxy", &self.proxy.is_some())
            .finish()
    }
}

impl ProxyTarget {
    /// Returns the memoized target, resolving it through the dispatch root
    /// on first use. Resolution routes the proxied name with a scratch
    /// context so it does not leak into the caller's real name.
    fn resolve(&self, proxy_name: &str, root: &Rc<Controller>) -> Result<Rc<Controller>, RouteError> {
        if let Some(target) = self.target.get() {
            return Ok(target.clone());
        }
        if self.resolving.replace(true) {
            return Err(RouteError::ProxyCycle {
                proxy: proxy_name.to_string(),
            });
        }
        let result = (|| {
            let mut sink = Vec::new();
            let mut scratch = Context::new(self.proxied.clone(), &mut sink);
            match root.route_inner(root, &mut scratch, &self.proxied)? {
                RouteOutcome::Resolved {
                    controller,
                    remainder,
                } if remainder.is_empty() => Ok(controller),
                _ => Err(RouteError::ProxyTargetUnresolved {
                    proxy: proxy_name.to_string(),
                    target: self.proxied.render(),
                }),
            }
        })();
        self.resolving.set(false);
        let target = result?;
        log::debug!(
            "Proxy controller '{}' resolved target '{}'.",
            proxy_name,
            self.proxied
        );
        let _ = self.target.set(target.clone());
        Ok(target)
    }
}

fn report_ambiguous(
    out: &mut dyn Write,
    name: &str,
    candidates: &[String],
) -> std::io::Result<()> {
    writeln!(out, "ERROR: Ambiguous command: {}", name)?;
    let mut sorted = candidates.to_vec();
    sorted.sort();
    for candidate in sorted {
        writeln!(out, "   {}", candidate)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(name: &str, description: &str, status: i32) -> Command {
        Command::new(name, description, move |_ctx, _args| Ok(status))
    }

    /// Root with commands {help, version} and a child `admin` exposing
    /// `status`.
    fn demo_tree() -> Rc<Controller> {
        let mut root = Controller::new("app");
        root.add_command(command("version", "Print the version.", 0))
            .unwrap();
        let mut admin = Controller::new("admin");
        admin
            .add_command(command("status", "Report daemon status.", 7))
            .unwrap();
        root.add_child(admin).unwrap();
        Rc::new(root)
    }

    fn execute(root: &Rc<Controller>, raw: &str) -> (i32, String, String) {
        let mut out = Vec::new();
        let mut ctx = Context::new(CommandName::parse(raw), &mut out);
        let status = root.execute(&mut ctx, &[]).unwrap();
        let real_name = ctx.real_name.render();
        (status, real_name, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_route_empty_name_returns_self() {
        let root = demo_tree();
        let mut out = Vec::new();
        let mut ctx = Context::new(CommandName::empty(), &mut out);
        match root.route(&mut ctx, &CommandName::empty()).unwrap() {
            RouteOutcome::Resolved {
                controller,
                remainder,
            } => {
                assert!(Rc::ptr_eq(&controller, &root));
                assert!(remainder.is_empty());
            }
            other => panic!("expected resolved route, got {:?}", other),
        }
    }

    #[test]
    fn test_execute_nested_command() {
        let root = demo_tree();
        let (status, real_name, _) = execute(&root, "admin:status");
        assert_eq!(status, 7);
        assert_eq!(real_name, "admin:status");
    }

    #[test]
    fn test_abbreviations_resolve_to_full_real_name() {
        let root = demo_tree();
        let (status, real_name, _) = execute(&root, "adm:stat");
        assert_eq!(status, 7);
        assert_eq!(real_name, "admin:status");
    }

    #[test]
    fn test_unknown_command_reports_and_lists() {
        let root = demo_tree();
        let (status, _, output) = execute(&root, "frobnicate");
        assert_eq!(status, 1);
        assert!(output.contains("ERROR: Unknown command: frobnicate"));
        assert!(output.contains("Commands:"));
    }

    #[test]
    fn test_unknown_multi_segment_remainder() {
        let root = demo_tree();
        let (status, real_name, output) = execute(&root, "admin:frobnicate:now");
        assert_eq!(status, 1);
        assert_eq!(real_name, "admin:frobnicate:now");
        assert!(output.contains("ERROR: Unknown command: admin:frobnicate:now"));
    }

    #[test]
    fn test_empty_command_runs_default_help() {
        let root = demo_tree();
        let (status, real_name, output) = execute(&root, "");
        assert_eq!(status, 0);
        assert_eq!(real_name, "help");
        assert!(output.contains("Commands:"));
        assert!(output.contains("   version\n      Print the version.\n"));
        assert!(output.contains("   admin\n"));
    }

    #[test]
    fn test_missing_default_command_is_reported() {
        let mut root = Controller::new("app");
        root.set_default_command("missing");
        let root = Rc::new(root);
        let (status, _, output) = execute(&root, "");
        assert_eq!(status, 1);
        assert!(output.contains("ERROR: Default command undefined.\n"));
    }

    #[test]
    fn test_duplicate_command_fails_construction() {
        let mut root = Controller::new("app");
        root.add_command(command("version", "", 0)).unwrap();
        let err = root.add_command(command("version", "", 0)).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateCommand { .. }));
    }

    #[test]
    fn test_duplicate_child_fails_construction() {
        let mut root = Controller::new("app");
        root.add_child(Controller::new("admin")).unwrap();
        let err = root.add_child(Controller::new("admin")).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateChild { .. }));
    }

    #[test]
    fn test_ambiguous_child_prefix_is_reported() {
        let mut root = Controller::new("app");
        root.add_child(Controller::new("alpha")).unwrap();
        root.add_child(Controller::new("alphabet")).unwrap();
        let root = Rc::new(root);
        let (status, _, output) = execute(&root, "al");
        assert_eq!(status, 1);
        assert!(output.contains("ERROR: Ambiguous command: al"));
        assert!(output.contains("   alpha\n"));
        assert!(output.contains("   alphabet\n"));
    }

    #[test]
    fn test_exact_child_match_wins_over_ambiguity() {
        let mut root = Controller::new("app");
        root.add_child(Controller::new("alpha")).unwrap();
        root.add_child(Controller::new("alphabet")).unwrap();
        let root = Rc::new(root);
        // "alpha" routes into the exact child and runs its default help.
        let (status, real_name, _) = execute(&root, "alpha");
        assert_eq!(status, 0);
        assert_eq!(real_name, "alpha:help");
    }

    #[test]
    fn test_ambiguous_command_prefix_is_reported() {
        let mut root = Controller::new("app");
        root.add_command(command("start", "", 0)).unwrap();
        root.add_command(command("stop", "", 0)).unwrap();
        let root = Rc::new(root);
        let (status, _, output) = execute(&root, "st");
        assert_eq!(status, 1);
        assert!(output.contains("ERROR: Ambiguous command: st"));
        assert!(output.contains("   start\n"));
        assert!(output.contains("   stop\n"));
    }

    #[test]
    fn test_proxy_forwards_to_memoized_target() {
        let mut root = Controller::new("app");
        let mut admin = Controller::new("admin");
        admin
            .add_command(command("status", "Report daemon status.", 7))
            .unwrap();
        root.add_child(admin).unwrap();
        root.add_child(Controller::proxy("shortcut", CommandName::parse("admin")))
            .unwrap();
        let root = Rc::new(root);

        let (status, real_name, _) = execute(&root, "shortcut:status");
        assert_eq!(status, 7);
        assert_eq!(real_name, "shortcut:status");

        // Routing through the proxy reaches the same concrete controller
        // object as routing the proxied name directly.
        let mut out = Vec::new();
        let mut ctx = Context::new(CommandName::empty(), &mut out);
        let via_proxy = match root.route(&mut ctx, &CommandName::parse("shortcut")).unwrap() {
            RouteOutcome::Resolved { controller, .. } => controller,
            other => panic!("expected resolved route, got {:?}", other),
        };
        let direct = match root.route(&mut ctx, &CommandName::parse("admin")).unwrap() {
            RouteOutcome::Resolved { controller, .. } => controller,
            other => panic!("expected resolved route, got {:?}", other),
        };
        assert!(Rc::ptr_eq(&via_proxy, &direct));
    }

    #[test]
    fn test_proxy_cycle_is_fatal() {
        let mut root = Controller::new("app");
        root.add_child(Controller::proxy("loop", CommandName::parse("loop")))
            .unwrap();
        let root = Rc::new(root);
        let mut out = Vec::new();
        let mut ctx = Context::new(CommandName::parse("loop:x"), &mut out);
        let err = root.execute(&mut ctx, &[]).unwrap_err();
        assert!(err.to_string().contains("loop"));
    }

    #[test]
    fn test_proxy_to_unroutable_target_is_fatal() {
        let mut root = Controller::new("app");
        root.add_child(Controller::proxy("shortcut", CommandName::parse("nowhere")))
            .unwrap();
        let root = Rc::new(root);
        let mut out = Vec::new();
        let mut ctx = Context::new(CommandName::parse("shortcut"), &mut out);
        let err = root.execute(&mut ctx, &[]).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_controller_description_defers_to_default_command() {
        let controller = Controller::new("app");
        assert_eq!(
            controller.description(),
            Some("Print a listing of the available commands.")
        );
        let mut bare = Controller::new("bare");
        bare.set_default_command("missing");
        assert_eq!(bare.description(), None);
    }
}
