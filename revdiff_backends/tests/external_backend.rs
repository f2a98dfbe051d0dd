#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use revdiff_backend_api::{BackendError, DiffBackend};
use revdiff_backends::ExternalBackend;
use tempfile::TempDir;

#[test]
fn external_tool_receives_both_files_in_order() {
    let mock = MockTool::new(MockMode::EchoFiles);
    let backend = mock.backend();

    let body = backend.compute("old text", "new text").expect("external diff");
    assert_eq!(body, "OLD:old text\nNEW:new text\n");
    assert_eq!(mock.leftover_temp_files(), 0);
}

#[test]
fn exit_status_one_means_inputs_differ() {
    let mock = MockTool::new(MockMode::ExitOne);
    let body = mock.backend().compute("a", "b").expect("status 1 accepted");
    assert_eq!(body, "changed\n");
    assert_eq!(mock.leftover_temp_files(), 0);
}

#[test]
fn tool_failure_is_reported_and_files_removed() {
    let mock = MockTool::new(MockMode::Fails);
    let err = mock.backend().compute("a", "b").expect_err("tool fails");
    match err {
        BackendError::Failure { message } => {
            assert!(
                message.contains("status 2") && message.contains("boom"),
                "unexpected message: {message}"
            );
        }
        other => panic!("expected Failure, got {other:?}"),
    }
    assert_eq!(mock.leftover_temp_files(), 0);
}

#[test]
fn slow_tool_is_killed_on_timeout() {
    let mock = MockTool::new(MockMode::Hangs);
    let backend = mock.backend().with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = backend.compute("a", "b").expect_err("timeout");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
        err,
        BackendError::TimedOut {
            backend: "external",
            ..
        }
    ));
    assert_eq!(mock.leftover_temp_files(), 0);
}

struct MockTool {
    _root: TempDir,
    script: PathBuf,
    scratch: PathBuf,
}

enum MockMode {
    EchoFiles,
    ExitOne,
    Fails,
    Hangs,
}

impl MockTool {
    fn new(mode: MockMode) -> Self {
        let root = TempDir::new().expect("temp dir");
        let script = root.path().join("diff_mock.sh");
        let scratch = root.path().join("scratch");
        fs::create_dir(&scratch).expect("scratch dir");
        write_script(&script, &mode);
        Self {
            _root: root,
            script,
            scratch,
        }
    }

    fn backend(&self) -> ExternalBackend {
        ExternalBackend::new(&self.script).with_temp_dir(&self.scratch)
    }

    fn leftover_temp_files(&self) -> usize {
        fs::read_dir(&self.scratch).expect("read scratch").count()
    }
}

fn write_script(script_path: &Path, mode: &MockMode) {
    let body = match mode {
        MockMode::EchoFiles => r#"printf "OLD:%s\n" "$(cat "$1")"
printf "NEW:%s\n" "$(cat "$2")"
exit 0"#,
        MockMode::ExitOne => r#"echo "changed"
exit 1"#,
        MockMode::Fails => r#"echo "boom" >&2
exit 2"#,
        MockMode::Hangs => r#"exec sleep 30"#,
    };

    let content = format!("#!/bin/sh\n\nset -eu\n\n{body}\n");
    fs::write(script_path, content).expect("write mock script");
    let mut perms = fs::metadata(script_path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(script_path, perms).expect("set perms");
}
