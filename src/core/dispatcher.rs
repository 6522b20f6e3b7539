use std::io::Write;
use std::rc::Rc;

use anyhow::Result;

use crate::core::controller::{BuildError, Context, Controller};
use crate::core::name::CommandName;
use crate::core::registry::Registry;

/// The top-level application object: owns the root controller and turns one
/// raw command line into one routed, executed command.
///
/// The tree is built once, at construction, and is read-only afterwards;
/// each dispatch only creates and discards a diagnostic [`Context`].
#[derive(Debug)]
pub struct Dispatcher {
    basename: String,
    root: Rc<Controller>,
}

impl Dispatcher {
    /// Builds the dispatcher around `root`. Every controller the registry
    /// holds under the dispatcher's basename key is attached as a root
    /// child, which is how unrelated modules contribute subtrees without a
    /// static reference to the composition root.
    pub fn new(
        basename: &str,
        mut root: Controller,
        registry: &Registry<Rc<Controller>>,
    ) -> Result<Self, BuildError> {
        for controller in registry.get_all(basename) {
            log::debug!(
                "Attaching registry controller '{}' under '{}'.",
                controller.name(),
                basename
            );
            root.add_child_rc(controller.clone())?;
        }
        Ok(Self {
            basename: basename.to_string(),
            root: Rc::new(root),
        })
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn root(&self) -> &Rc<Controller> {
        &self.root
    }

    /// Executes one raw command line and returns its exit status.
    ///
    /// `raw` may be absent or empty, which dispatches the root controller's
    /// default command. Unknown and ambiguous names are reported to `err`
    /// and surface as a non-zero status, never as an `Err`; handler-body
    /// failures and broken trees propagate.
    pub fn execute_command(
        &self,
        raw: Option<&str>,
        args: &[String],
        err: &mut dyn Write,
    ) -> Result<i32> {
        let requested = raw.map(CommandName::parse).unwrap_or_default();
        log::debug!(
            "Dispatching '{}' with {} argument(s).",
            requested.display_name(),
            args.len()
        );
        let mut ctx = Context::new(requested, err);
        let status = self.root.execute(&mut ctx, args)?;
        log::debug!(
            "Command '{}' resolved to '{}' with status {}.",
            ctx.requested.display_name(),
            ctx.real_name.display_name(),
            status
        );
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::Command;

    fn demo_dispatcher() -> Dispatcher {
        let mut root = Controller::new("app");
        root.add_command(Command::new("version", "Print the version.", |_ctx, _args| Ok(0)))
            .unwrap();

        let mut admin = Controller::new("admin");
        admin
            .add_command(Command::new("status", "Report daemon status.", |_ctx, args| {
                Ok(if args.is_empty() { 7 } else { 9 })
            }))
            .unwrap();

        let mut registry = Registry::new();
        registry.add("app", Rc::new(admin));
        Dispatcher::new("app", root, &registry).unwrap()
    }

    #[test]
    fn test_registry_controllers_become_root_children() {
        let dispatcher = demo_dispatcher();
        let mut err = Vec::new();
        let status = dispatcher
            .execute_command(Some("admin:status"), &[], &mut err)
            .unwrap();
        assert_eq!(status, 7);
    }

    #[test]
    fn test_arguments_reach_the_handler() {
        let dispatcher = demo_dispatcher();
        let mut err = Vec::new();
        let args = vec!["a".to_string(), "b".to_string()];
        let status = dispatcher
            .execute_command(Some("admin:status"), &args, &mut err)
            .unwrap();
        assert_eq!(status, 9);
    }

    #[test]
    fn test_absent_command_runs_default() {
        let dispatcher = demo_dispatcher();
        let mut err = Vec::new();
        let status = dispatcher.execute_command(None, &[], &mut err).unwrap();
        assert_eq!(status, 0);
        let output = String::from_utf8(err).unwrap();
        assert!(output.contains("Commands:"));
        assert!(output.contains("   admin\n"));
        assert!(output.contains("   version\n      Print the version.\n"));
    }

    #[test]
    fn test_unknown_command_returns_nonzero_without_err() {
        let dispatcher = demo_dispatcher();
        let mut err = Vec::new();
        let status = dispatcher
            .execute_command(Some("frobnicate"), &[], &mut err)
            .unwrap();
        assert_eq!(status, 1);
        let output = String::from_utf8(err).unwrap();
        assert!(output.contains("ERROR: Unknown command: frobnicate"));
    }

    #[test]
    fn test_duplicate_registry_child_fails_construction() {
        let root = Controller::new("app");
        let mut registry = Registry::new();
        registry.add("app", Rc::new(Controller::new("admin")));
        registry.add("app", Rc::new(Controller::new("admin")));
        let err = Dispatcher::new("app", root, &registry).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateChild { .. }));
    }
}
