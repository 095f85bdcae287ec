//! External byte transformers: the compile/minify step as a narrow seam.
//!
//! The cache core only needs "bytes in, bytes or a diagnostic out", so that
//! is the whole trait. [`CommandTransformer`] adapts any stdin→stdout filter
//! binary (a Java minifier, `terser`, anything with the same contract):
//! input on stdin, output on stdout, diagnostics on stderr, exit 0 means
//! success. Tests swap in a fake transformer and never spawn a process.
//!
//! The adapter owns the bounded wait: a hung child is killed, reaped, and
//! reported as [`CompilerError::TimedOut`]. No subprocess or pipe handle
//! outlives a call on any exit path.

use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum CompilerError {
    /// The process ran and reported failure. `stderr` carries its
    /// diagnostics for the log.
    #[error("process exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },

    /// The process outlived its bounded wait and was killed.
    #[error("process timed out after {0:?}")]
    TimedOut(Duration),

    #[error("failed to run process: {0}")]
    Io(#[from] io::Error),
}

/// A deterministic bytes → bytes transformation.
pub trait ByteTransformer {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, CompilerError>;
}

/// Runs an external filter process over the input bytes.
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTransformer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ByteTransformer for CommandTransformer {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, CompilerError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = take_pipe(child.stdin.take(), "stdin")?;
        let mut stdout = take_pipe(child.stdout.take(), "stdout")?;
        let mut stderr = take_pipe(child.stderr.take(), "stderr")?;

        // Drain both output pipes on their own threads so a chatty child
        // cannot deadlock against a full pipe buffer while we feed stdin.
        let out_thread: JoinHandle<io::Result<Vec<u8>>> = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf)?;
            Ok(buf)
        });
        let err_thread: JoinHandle<io::Result<Vec<u8>>> = thread::spawn(move || {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf)?;
            Ok(buf)
        });
        let payload = input.to_vec();
        // The child may legitimately exit before consuming all input; a
        // broken pipe here surfaces through the exit status instead.
        let in_thread = thread::spawn(move || {
            let _ = stdin.write_all(&payload);
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = in_thread.join();
                    let _ = out_thread.join();
                    let _ = err_thread.join();
                    return Err(CompilerError::TimedOut(self.timeout));
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let _ = in_thread.join();
        let stdout_data = join_reader(out_thread)?;
        let stderr_data = join_reader(err_thread)?;

        if status.success() {
            Ok(stdout_data)
        } else {
            Err(CompilerError::Failed {
                status: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr_data).into_owned(),
            })
        }
    }
}

fn take_pipe<T>(pipe: Option<T>, name: &str) -> Result<T, CompilerError> {
    pipe.ok_or_else(|| CompilerError::Io(io::Error::other(format!("child {name} not captured"))))
}

fn join_reader(handle: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>, CompilerError> {
    match handle.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err(CompilerError::Io(io::Error::other(
            "pipe reader thread panicked",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_filter_roundtrips() {
        let cat = CommandTransformer::new("cat");
        assert_eq!(cat.transform(b"hello world").unwrap(), b"hello world");
    }

    #[test]
    fn large_input_does_not_deadlock() {
        // Well past the default 64 KiB pipe buffer on both sides
        let payload = vec![b'x'; 512 * 1024];
        let cat = CommandTransformer::new("cat");
        assert_eq!(cat.transform(&payload).unwrap().len(), payload.len());
    }

    #[test]
    fn filter_output_is_transformed() {
        let upper = CommandTransformer::new("tr").args(["a-z", "A-Z"]);
        assert_eq!(upper.transform(b"var x = 1;").unwrap(), b"VAR X = 1;");
    }

    #[test]
    fn nonzero_exit_captures_stderr() {
        let failing = CommandTransformer::new("sh").args(["-c", "echo oops >&2; exit 2"]);
        match failing.transform(b"input").unwrap_err() {
            CompilerError::Failed { status, stderr } => {
                assert_eq!(status, 2);
                assert!(stderr.contains("oops"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn hang_is_killed_and_reported_as_timeout() {
        let hang = CommandTransformer::new("sleep")
            .arg("30")
            .with_timeout(Duration::from_millis(100));
        assert!(matches!(
            hang.transform(b"").unwrap_err(),
            CompilerError::TimedOut(_)
        ));
    }

    #[test]
    fn missing_program_is_io_error() {
        let missing = CommandTransformer::new("/nonexistent/minifier");
        assert!(matches!(
            missing.transform(b"").unwrap_err(),
            CompilerError::Io(_)
        ));
    }
}
