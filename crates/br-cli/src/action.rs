//! A [`RecompileAction`] that runs an external command.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use br_trigger::{ActionError, RecompileAction};
use camino::Utf8PathBuf;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// How often [`CommandAction::wait_until_idle`] polls the child.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Runs a command on each trigger.
///
/// The action is busy while the last spawned child is still running, and
/// locked while the optional lock file exists.
#[derive(Debug)]
pub struct CommandAction {
    program: String,
    args: Vec<String>,
    working_dir: Utf8PathBuf,
    lock_file: Option<Utf8PathBuf>,
    child: Mutex<Option<Child>>,
}

impl CommandAction {
    /// Creates an action running `program` with `args` inside `working_dir`.
    pub fn new(program: String, args: Vec<String>, working_dir: Utf8PathBuf) -> Self {
        Self {
            program,
            args,
            working_dir,
            lock_file: None,
            child: Mutex::new(None),
        }
    }

    /// Treats the action as locked while `path` exists.
    #[must_use]
    pub fn with_lock_file(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.lock_file = path;
        self
    }

    /// Waits for an in-flight command to exit.
    ///
    /// Returns immediately when nothing is running.
    pub async fn wait_until_idle(&self) {
        if !self.is_busy() {
            return;
        }

        info!(command = %self.command_line(), "Waiting for refresh command to finish");
        while self.is_busy() {
            tokio::time::sleep(IDLE_POLL).await;
        }
    }

    /// Returns the command line as typed.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl RecompileAction for CommandAction {
    fn invoke(&self) -> Result<(), ActionError> {
        let mut slot = self.child.lock();
        if slot.is_some() {
            return Err(ActionError::failed("previous command is still running"));
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .spawn()?;

        info!(pid = child.id(), command = %self.command_line(), "Started refresh command");
        *slot = Some(child);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        let mut slot = self.child.lock();
        let Some(child) = slot.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                if status.success() {
                    info!(pid = child.id(), "Refresh command finished");
                } else {
                    warn!(pid = child.id(), status = %status, "Refresh command failed");
                }
                *slot = None;
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll refresh command");
                *slot = None;
                false
            }
        }
    }

    fn is_locked(&self) -> Result<bool, ActionError> {
        let locked = self.lock_file.as_ref().is_some_and(|path| path.exists());
        if locked {
            debug!("Lock file present");
        }
        Ok(locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("UTF-8 tempdir");
        (dir, root)
    }

    fn poll_until_idle(action: &CommandAction) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if !action.is_busy() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_command_line() {
        let action = CommandAction::new(
            "cargo".to_owned(),
            vec!["build".to_owned(), "--release".to_owned()],
            Utf8PathBuf::from("."),
        );
        assert_eq!(action.command_line(), "cargo build --release");
    }

    #[test]
    fn test_idle_before_first_invoke() {
        let (_dir, root) = temp_root();
        let action = CommandAction::new("true".to_owned(), Vec::new(), root);
        assert!(!action.is_busy());
    }

    #[cfg(unix)]
    #[test]
    fn test_busy_while_child_runs() {
        let (_dir, root) = temp_root();
        let action = CommandAction::new("sleep".to_owned(), vec!["0.2".to_owned()], root);

        action.invoke().expect("spawn sleep");
        assert!(action.is_busy());
        assert!(matches!(action.invoke(), Err(ActionError::Failed(_))));

        assert!(poll_until_idle(&action), "child never finished");
        action.invoke().expect("spawn again once idle");
        assert!(poll_until_idle(&action));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_working_dir() {
        let (dir, root) = temp_root();
        let action = CommandAction::new("touch".to_owned(), vec!["marker".to_owned()], root);

        action.invoke().expect("spawn touch");
        assert!(poll_until_idle(&action));
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let (_dir, root) = temp_root();
        let action = CommandAction::new("definitely-not-a-real-program-br".to_owned(), Vec::new(), root);

        assert!(matches!(action.invoke(), Err(ActionError::Spawn(_))));
        assert!(!action.is_busy());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wait_until_idle_waits_for_child() {
        let (_dir, root) = temp_root();
        let action = CommandAction::new("sleep".to_owned(), vec!["0.2".to_owned()], root);

        action.invoke().expect("spawn sleep");
        let started = Instant::now();
        action.wait_until_idle().await;

        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(!action.is_busy());
    }

    #[tokio::test]
    async fn test_wait_until_idle_without_child() {
        let (_dir, root) = temp_root();
        let action = CommandAction::new("true".to_owned(), Vec::new(), root);

        tokio::time::timeout(Duration::from_secs(1), action.wait_until_idle())
            .await
            .expect("returns immediately when idle");
    }

    #[test]
    fn test_lock_file() {
        let (_dir, root) = temp_root();
        let lock = root.join("build.lock");
        let action =
            CommandAction::new("true".to_owned(), Vec::new(), root).with_lock_file(Some(lock.clone()));

        assert!(!action.is_locked().expect("lock state"));
        std::fs::write(&lock, "").expect("create lock");
        assert!(action.is_locked().expect("lock state"));
    }

    #[test]
    fn test_no_lock_file_is_unlocked() {
        let (_dir, root) = temp_root();
        let action = CommandAction::new("true".to_owned(), Vec::new(), root);
        assert!(!action.is_locked().expect("lock state"));
    }
}
