use std::borrow::Cow;
use std::env;
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use revdiff_backend_api::{BackendError, BackendResult, DiffBackend};
use tempfile::{Builder, NamedTempFile};
use wait_timeout::ChildExt;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const TEMP_PREFIX: &str = "diff_";

/// Backend shelling out to an external diff tool invoked as
/// `<command> <old-file> <new-file>`.
///
/// Both texts go to temporary files that are removed when the call returns,
/// whether the tool succeeded, failed or was killed on timeout.
#[derive(Debug, Clone)]
pub struct ExternalBackend {
    command: Option<OsString>,
    timeout: Duration,
    temp_dir: Option<PathBuf>,
    path: Option<OsString>,
    home: Option<OsString>,
}

impl ExternalBackend {
    /// Backend invoking `command` with the default timeout.
    #[must_use]
    pub fn new(command: impl Into<OsString>) -> Self {
        Self {
            command: Some(command.into()),
            ..Self::disabled()
        }
    }

    /// Backend with no tool configured; it is never available.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            command: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temp_dir: None,
            path: env::var_os("PATH"),
            home: env::var_os("HOME"),
        }
    }

    /// Override the time budget of a single invocation.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Write temporary files into `dir` instead of the system temp directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn write_temp(&self, text: &str) -> BackendResult<NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix(TEMP_PREFIX);
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|err| BackendError::message(format!("failed to create diff temp file: {err}")))?;

        file.write_all(text.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|err| BackendError::message(format!("failed to write diff temp file: {err}")))?;
        Ok(file)
    }

    fn run(&self, command: &OsString, old: &Path, new: &Path) -> BackendResult<String> {
        let mut process = Command::new(command);
        process
            .arg(old)
            .arg(new)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        self.configure_environment(&mut process);

        let child = process.spawn().map_err(|err| {
            BackendError::message(format!(
                "failed to spawn external diff {}: {err}",
                command.to_string_lossy()
            ))
        })?;
        let mut child = ReapOnDrop::new(child);

        let stdout_handle = child.inner().stdout.take().map(spawn_reader);
        let stderr_handle = child.inner().stderr.take().map(spawn_reader);

        let status = match child.inner().wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                tracing::warn!(
                    command = %command.to_string_lossy(),
                    timeout_secs = self.timeout.as_secs(),
                    "external diff timed out; killing it"
                );
                child.kill_and_reap();
                return Err(BackendError::TimedOut {
                    backend: "external",
                    seconds: self.timeout.as_secs(),
                });
            }
            Err(err) => {
                child.kill_and_reap();
                return Err(BackendError::message(format!(
                    "failed waiting on external diff: {err}"
                )));
            }
        };
        child.mark_reaped();

        let stdout = join_reader(stdout_handle, "stdout")?;
        let stderr = join_reader(stderr_handle, "stderr")?;

        if !differs_or_matches(status) {
            let code = status
                .code()
                .map_or_else(|| "terminated".to_string(), |c| c.to_string());
            return Err(BackendError::message(format!(
                "external diff failed with status {}: {}",
                code,
                stderr.trim()
            )));
        }

        Ok(stdout)
    }

    fn configure_environment(&self, command: &mut Command) {
        command.env_clear();
        if let Some(path) = &self.path {
            command.env("PATH", path);
        }
        if let Some(home) = &self.home {
            command.env("HOME", home);
        }
    }
}

impl Default for ExternalBackend {
    fn default() -> Self {
        Self::disabled()
    }
}

impl DiffBackend for ExternalBackend {
    fn id(&self) -> &'static str {
        "external"
    }

    fn label(&self) -> &'static str {
        "external"
    }

    fn generator(&self) -> Cow<'_, str> {
        match &self.command {
            Some(command) => Cow::Owned(format!("external {}", command.to_string_lossy())),
            None => Cow::Borrowed(self.label()),
        }
    }

    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    fn compute(&self, old: &str, new: &str) -> BackendResult<String> {
        let command = self.command.as_ref().ok_or(BackendError::Unavailable {
            backend: "external",
        })?;
        let old_file = self.write_temp(old)?;
        let new_file = self.write_temp(new)?;
        self.run(command, old_file.path(), new_file.path())
    }
}

/// Exit status 1 is how diff tools report "inputs differ".
fn differs_or_matches(status: ExitStatus) -> bool {
    status.success() || status.code() == Some(1)
}

/// Child process handle that is killed and reaped if dropped before it exits.
struct ReapOnDrop {
    child: Child,
    reaped: bool,
}

impl ReapOnDrop {
    const fn new(child: Child) -> Self {
        Self {
            child,
            reaped: false,
        }
    }

    fn inner(&mut self) -> &mut Child {
        &mut self.child
    }

    fn mark_reaped(&mut self) {
        self.reaped = true;
    }

    fn kill_and_reap(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.reaped = true;
    }
}

impl Drop for ReapOnDrop {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill_and_reap();
        }
    }
}

fn spawn_reader<R>(mut stream: R) -> thread::JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn join_reader(
    handle: Option<thread::JoinHandle<io::Result<Vec<u8>>>>,
    stream: &str,
) -> BackendResult<String> {
    match handle {
        Some(handle) => {
            let bytes = handle
                .join()
                .map_err(|_| {
                    BackendError::message(format!("failed to join external diff {stream} reader"))
                })?
                .map_err(|err| {
                    BackendError::message(format!("failed to read external diff {stream}: {err}"))
                })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_backend_is_unavailable() {
        let backend = ExternalBackend::disabled();
        assert!(!backend.is_available());
        assert!(matches!(
            backend.compute("a", "b"),
            Err(BackendError::Unavailable { .. })
        ));
    }

    #[test]
    fn generator_names_the_command() {
        let backend = ExternalBackend::new("/usr/bin/diff");
        assert_eq!(backend.generator(), "external /usr/bin/diff");
        assert_eq!(backend.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn missing_binary_fails_and_cleans_up() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let backend = ExternalBackend::new("/nonexistent/revdiff-tool").with_temp_dir(dir.path());

        let result = backend.compute("old", "new");
        assert!(matches!(result, Err(BackendError::Failure { .. })));
        let leftovers = std::fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 0);
    }
}
