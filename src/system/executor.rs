// EN: src/system/executor.rs

use std::fmt;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command '{0}' could not be executed: {1}")]
    SpawnFailed(String, #[source] io::Error),
    #[error("Could not open output file '{path}': {source}")]
    OutputFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Lost track of command '{0}': {1}")]
    Wait(String, #[source] io::Error),
}

/// What to run and how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Run `program args...` as one command line through the platform shell.
    pub use_shell: bool,
}

impl Invocation {
    /// The single command line handed to the shell in shell mode.
    ///
    /// Arguments are joined verbatim (they are already shell-quoted tokens). The program
    /// is quoted only when it names an existing file, so values such as `npx claude`
    /// keep working.
    pub fn command_line(&self) -> String {
        let program = if Path::new(&self.program).is_file() {
            quote_program(&self.program)
        } else {
            self.program.clone()
        };
        std::iter::once(program)
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A human-readable rendering for logs and error messages.
    pub fn display(&self) -> String {
        if self.use_shell {
            return self.command_line();
        }
        let parts =
            std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(parts).unwrap_or_else(|_| self.command_line())
    }

    fn to_command(&self) -> Command {
        if !self.use_shell {
            let mut command = Command::new(&self.program);
            command.args(&self.args);
            return command;
        }

        if cfg!(target_os = "windows") {
            let mut command = Command::new("cmd");
            command.arg("/C").arg(self.command_line());
            command
        } else {
            let mut command = Command::new("sh");
            command.arg("-c").arg(self.command_line());
            command
        }
    }
}

fn quote_program(program: &str) -> String {
    if cfg!(target_os = "windows") {
        if program.contains(' ') {
            format!("\"{}\"", program)
        } else {
            program.to_string()
        }
    } else {
        shlex::try_quote(program).map_or_else(|_| program.to_string(), |q| q.into_owned())
    }
}

/// Where the child's stdout ends up in piped mode.
pub enum OutputSink {
    /// Any async writer, normally the parent's stdout.
    Stream(Box<dyn AsyncWrite + Send + Unpin>),
    /// An append-only file, synced to disk after every chunk.
    DurableFile { path: PathBuf, file: tokio::fs::File },
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("OutputSink::Stream"),
            Self::DurableFile { path, .. } => f
                .debug_struct("OutputSink::DurableFile")
                .field("path", path)
                .finish(),
        }
    }
}

impl OutputSink {
    /// Opens `path` for appending, creating it if needed.
    pub fn durable_file(path: &Path) -> Result<Self, ExecutionError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| ExecutionError::OutputFile {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self::DurableFile {
            path: path.to_path_buf(),
            file: tokio::fs::File::from_std(file),
        })
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        match self {
            Self::Stream(writer) => {
                writer.write_all(chunk).await?;
                writer.flush().await
            }
            Self::DurableFile { file, .. } => {
                file.write_all(chunk).await?;
                file.flush().await?;
                file.sync_all().await
            }
        }
    }
}

/// How the child's standard streams are connected.
pub enum StreamWiring {
    /// The child shares the parent's terminal.
    Inherit,
    /// stdin is fed from `input` until it ends; stdout goes to `output`; stderr is inherited.
    Piped {
        input: Box<dyn AsyncRead + Send + Unpin>,
        output: OutputSink,
    },
}

impl fmt::Debug for StreamWiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => f.write_str("StreamWiring::Inherit"),
            Self::Piped { output, .. } => f
                .debug_struct("StreamWiring::Piped")
                .field("output", output)
                .finish(),
        }
    }
}

/// The parent-side ends used in piped mode.
pub struct ParentStreams {
    pub input: Box<dyn AsyncRead + Send + Unpin>,
    pub output: Box<dyn AsyncWrite + Send + Unpin>,
}

impl fmt::Debug for ParentStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParentStreams")
    }
}

impl ParentStreams {
    /// This process's own stdin and stdout.
    pub fn stdio() -> Self {
        Self {
            input: Box::new(tokio::io::stdin()),
            output: Box::new(tokio::io::stdout()),
        }
    }
}

impl StreamWiring {
    /// Pipes `streams` to the child; stdout is appended to `output_file` instead when given.
    pub fn piped(
        streams: ParentStreams,
        output_file: Option<&Path>,
    ) -> Result<Self, ExecutionError> {
        let output = match output_file {
            Some(path) => OutputSink::durable_file(path)?,
            None => OutputSink::Stream(streams.output),
        };
        Ok(Self::Piped {
            input: streams.input,
            output,
        })
    }

    fn is_piped(&self) -> bool {
        matches!(self, Self::Piped { .. })
    }
}

/// Starts the child process. The parent's environment is inherited unchanged.
pub fn spawn(invocation: &Invocation, wiring: &StreamWiring) -> Result<Child, ExecutionError> {
    let mut command = invocation.to_command();
    if wiring.is_piped() {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
    } else {
        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
    }

    log::debug!("Spawning: {}", invocation.display());
    command
        .spawn()
        .map_err(|e| ExecutionError::SpawnFailed(invocation.display(), e))
}

/// Drives a spawned child to completion and returns its exit code
/// (`None` when it was terminated by a signal).
///
/// Ctrl+C is absorbed while the child runs: the child receives it from the terminal
/// and decides for itself whether to exit.
pub async fn supervise(
    mut child: Child,
    wiring: StreamWiring,
    label: &str,
) -> Result<Option<i32>, ExecutionError> {
    let mut input_task = None;
    let mut output_task = None;

    if let StreamWiring::Piped { input, mut output } = wiring {
        if let Some(stdin) = child.stdin.take() {
            input_task = Some(tokio::spawn(async move {
                match forward_input(input, stdin).await {
                    Ok(bytes) => log::trace!("Forwarded {} bytes of stdin.", bytes),
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                        log::debug!("Child closed its stdin early.");
                    }
                    Err(e) => log::warn!("Failed to forward stdin: {}", e),
                }
            }));
        }
        if let Some(stdout) = child.stdout.take() {
            output_task = Some(tokio::spawn(async move {
                let result = forward_output(stdout, &mut output).await;
                if let Err(e) = result {
                    log::warn!("Failed to forward output to {:?}: {}", output, e);
                }
            }));
        }
    }

    let status = wait_absorbing_interrupts(&mut child)
        .await
        .map_err(|e| ExecutionError::Wait(label.to_string(), e))?;

    // Drain whatever the child wrote before it exited.
    if let Some(task) = output_task {
        if let Err(e) = task.await {
            log::warn!("Output forwarding task failed: {}", e);
        }
    }
    // Parent stdin may never end; the child no longer needs it.
    if let Some(task) = input_task {
        task.abort();
    }

    log::debug!("'{}' exited with {}", label, status);
    Ok(status.code())
}

async fn wait_absorbing_interrupts(child: &mut Child) -> io::Result<ExitStatus> {
    let mut listen_for_interrupts = true;
    loop {
        tokio::select! {
            status = child.wait() => return status,
            signal = tokio::signal::ctrl_c(), if listen_for_interrupts => match signal {
                Ok(()) => log::debug!("Interrupt received, waiting for the child to exit."),
                Err(e) => {
                    log::warn!("Cannot listen for interrupts: {}", e);
                    listen_for_interrupts = false;
                }
            },
        }
    }
}

/// Copies `input` into the child's stdin until `input` ends, then closes it.
pub async fn forward_input<R, W>(mut input: R, mut stdin: W) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let bytes = tokio::io::copy(&mut input, &mut stdin).await?;
    stdin.shutdown().await?;
    Ok(bytes)
}

/// Copies the child's stdout into `sink` chunk by chunk until it ends.
pub async fn forward_output<R>(mut reader: R, sink: &mut OutputSink) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        let chunk = buf.get(..n).unwrap_or_default();
        sink.write_chunk(chunk).await?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn invocation(program: &str, args: &[&str], use_shell: bool) -> Invocation {
        Invocation {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            use_shell,
        }
    }

    #[test]
    fn test_command_line_joins_tokens_verbatim() {
        let inv = invocation("claude", &["--model \"x\"", "-v"], true);
        assert_eq!(inv.command_line(), "claude --model \"x\" -v");
    }

    #[test]
    fn test_display_quotes_separate_tokens() {
        let inv = invocation("claude", &["-p", "hello world"], false);
        assert_eq!(inv.display(), "claude -p 'hello world'");
    }

    #[tokio::test]
    async fn test_forward_output_to_durable_file_appends() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.log");
        fs::write(&path, "existing\n").unwrap();
        let mut sink = OutputSink::durable_file(&path).unwrap();

        // --- Execute ---
        let written = forward_output(&b"first\nsecond\n"[..], &mut sink).await.unwrap();

        // --- Assert ---
        assert_eq!(written, 13);
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nfirst\nsecond\n");
    }

    #[tokio::test]
    async fn test_forward_input_closes_writer() {
        let (mut reader, writer) = tokio::io::duplex(64);
        let copied = forward_input(&b"prompt"[..], writer).await.unwrap();
        assert_eq!(copied, 6);

        let mut received = String::new();
        reader.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "prompt");
    }

    #[test]
    fn test_output_file_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let err = OutputSink::durable_file(&dir.path().join("no/such/dir/out.log")).unwrap_err();
        assert!(matches!(err, ExecutionError::OutputFile { .. }));
    }

    #[tokio::test]
    async fn test_spawn_missing_program_fails() {
        let inv = invocation("/definitely/not/a/real/claude", &[], false);
        let err = spawn(&inv, &StreamWiring::Inherit).unwrap_err();
        assert!(matches!(err, ExecutionError::SpawnFailed(..)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervise_pipes_streams_and_reports_code() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let out_path = dir.path().join("child.out");
        let inv = invocation("sh", &["-c", "cat; exit 3"], false);
        let wiring = StreamWiring::Piped {
            input: Box::new(&b"hello from stdin"[..]),
            output: OutputSink::durable_file(&out_path).unwrap(),
        };

        // --- Execute ---
        let child = spawn(&inv, &wiring).unwrap();
        let code = supervise(child, wiring, "sh").await.unwrap();

        // --- Assert ---
        assert_eq!(code, Some(3));
        assert_eq!(fs::read_to_string(&out_path).unwrap(), "hello from stdin");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_supervise_shell_mode_inherits() {
        let inv = invocation("exit", &["0"], true);
        let child = spawn(&inv, &StreamWiring::Inherit).unwrap();
        let code = supervise(child, StreamWiring::Inherit, "exit").await.unwrap();
        assert_eq!(code, Some(0));
    }
}
