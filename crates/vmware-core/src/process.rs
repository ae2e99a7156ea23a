//! Subprocess execution with captured output

use std::io;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Raw result of running a command to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        decode(&self.stdout)
    }

    pub fn stderr_text(&self) -> String {
        decode(&self.stderr)
    }
}

/// Decode process output as UTF-8, substituting invalid sequences, and trim it
pub fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Run `argv[0]` with the remaining arguments and wait for it to exit
///
/// Stdin is closed. No timeout is applied; the caller waits until the
/// process exits.
pub async fn run_captured(argv: &[String]) -> io::Result<CapturedOutput> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"))?;

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    debug!(program = %program, status = ?output.status.code(), "process exited");

    Ok(CapturedOutput {
        status: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_decode_trims() {
        assert_eq!(decode(b"  hello\n"), "hello");
        assert_eq!(decode(b""), "");
    }

    #[test]
    fn test_decode_replaces_invalid_utf8() {
        let text = decode(&[b'o', b'k', 0xff, 0xfe]);
        assert!(text.starts_with("ok"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_success_requires_zero() {
        let ok = CapturedOutput { status: Some(0), ..Default::default() };
        let failed = CapturedOutput { status: Some(1), ..Default::default() };
        let killed = CapturedOutput { status: None, ..Default::default() };
        assert!(ok.success());
        assert!(!failed.success());
        assert!(!killed.success());
    }

    #[tokio::test]
    async fn test_empty_argv_is_rejected() {
        let err = run_captured(&[]).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let err = run_captured(&argv(&["/definitely/not/a/real/binary"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_streams_and_status() -> io::Result<()> {
        let output = run_captured(&argv(&["sh", "-c", "printf out; printf err >&2; exit 3"])).await?;
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout_text(), "out");
        assert_eq!(output.stderr_text(), "err");
        Ok(())
    }
}
