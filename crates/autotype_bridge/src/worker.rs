use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use autotype_logging::{autotype_debug, autotype_info, autotype_warn};
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

use crate::classify::{Classifier, WorkerExit};
use crate::future::{OperationFuture, OperationOutcome};
use crate::{FailureKind, Operation, OperationRequest, WorkerError};

/// How long stderr may stay open once the worker itself has been reaped.
const STDERR_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Interpreter (or worker executable) to launch.
    pub program: PathBuf,
    /// Script passed as the first parameter, if the program needs one.
    pub script: Option<PathBuf>,
    /// Bound for every operation except `auto_typer`.
    pub request_timeout: Option<Duration>,
    /// Bound for a whole typing run.
    pub typing_timeout: Option<Duration>,
    /// Longest accepted stdout record.
    pub max_line_bytes: usize,
    pub stderr_capture_bytes: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        let program = if cfg!(windows) { "python" } else { "python3" };
        Self {
            program: PathBuf::from(program),
            script: Some(PathBuf::from("python").join("api.py")),
            request_timeout: Some(Duration::from_secs(30)),
            typing_timeout: Some(Duration::from_secs(30 * 60)),
            max_line_bytes: 1024 * 1024,
            stderr_capture_bytes: 8 * 1024,
        }
    }
}

impl WorkerSettings {
    pub fn timeout_for(&self, operation: Operation) -> Option<Duration> {
        match operation {
            Operation::AutoTyper => self.typing_timeout,
            _ => self.request_timeout,
        }
    }
}

/// Starts one worker invocation per request.
pub trait WorkerLauncher: Send + Sync {
    /// Spawns the worker for `request` and returns its pending outcome.
    ///
    /// Must be called from within a Tokio runtime. An `Err` means no worker
    /// was started and no message will ever be emitted. Implementations must
    /// not call the request's sink before returning.
    fn launch(&self, request: OperationRequest) -> Result<OperationFuture, WorkerError>;

    /// Like [`WorkerLauncher::launch`], folding a launch failure into the future.
    fn invoke(&self, request: OperationRequest) -> OperationFuture {
        self.launch(request).unwrap_or_else(OperationFuture::failed)
    }
}

/// Launches the external worker as `<program> [script] <operation> --key=value ...`.
///
/// Each pair travels as one parameter, so values starting with `-` stay values.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    settings: WorkerSettings,
}

impl ProcessLauncher {
    pub fn new(settings: WorkerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    fn command(&self, request: &OperationRequest) -> Command {
        let mut command = Command::new(&self.settings.program);
        if let Some(script) = &self.settings.script {
            command.arg(script);
        }
        command.arg(request.operation().as_str());
        for (key, value) in request.args() {
            command.arg(format!("--{key}={value}"));
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self, request: OperationRequest) -> Result<OperationFuture, WorkerError> {
        let operation = request.operation();
        let timeout = request
            .timeout()
            .or_else(|| self.settings.timeout_for(operation));

        let mut child = self.command(&request).spawn().map_err(|err| {
            autotype_warn!(
                "Failed to launch {} worker {:?}: {}",
                operation,
                self.settings.program,
                err
            );
            WorkerError::new(
                operation,
                FailureKind::Launch,
                format!(
                    "could not start the {operation} worker ({}): {err}",
                    self.settings.program.display()
                ),
            )
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.start_kill();
            return Err(WorkerError::new(
                operation,
                FailureKind::Launch,
                format!("{operation} worker started without output pipes"),
            ));
        };

        autotype_info!(
            "Spawned {} worker pid={:?} args={:?} timeout={:?}",
            operation,
            child.id(),
            request.arg_keys(),
            timeout
        );

        let pipes = Pipes {
            stdout,
            stderr,
            max_line_bytes: self.settings.max_line_bytes,
            stderr_capture_bytes: self.settings.stderr_capture_bytes,
        };
        let classifier = Classifier::new(operation, request.into_sink());
        Ok(OperationFuture::spawn(
            operation,
            drive(child, pipes, classifier, timeout),
        ))
    }
}

struct Pipes {
    stdout: ChildStdout,
    stderr: ChildStderr,
    max_line_bytes: usize,
    stderr_capture_bytes: usize,
}

async fn drive(
    mut child: Child,
    pipes: Pipes,
    mut classifier: Classifier,
    timeout: Option<Duration>,
) -> OperationOutcome {
    let operation = classifier.operation();
    let Pipes {
        stdout,
        stderr,
        max_line_bytes,
        stderr_capture_bytes,
    } = pipes;
    let captured = Arc::new(Mutex::new(Vec::new()));
    let mut stderr_task = tokio::spawn(capture_stderr(
        stderr,
        stderr_capture_bytes,
        Arc::clone(&captured),
    ));

    let exchange = async {
        pump_lines(stdout, &mut classifier, max_line_bytes).await;
        child.wait().await
    };
    let pumped = match timeout {
        Some(limit) => tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| limit),
        None => Ok(exchange.await),
    };

    let status = match pumped {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            stderr_task.abort();
            return Err(WorkerError::new(
                operation,
                FailureKind::Aborted,
                format!("lost track of the {operation} worker: {err}"),
            ));
        }
        Err(limit) => {
            autotype_warn!("{} worker exceeded {:?}; killing it", operation, limit);
            let _ = child.start_kill();
            let _ = child.wait().await;
            stderr_task.abort();
            return Err(WorkerError::new(
                operation,
                FailureKind::Timeout,
                format!("{operation} worker did not finish within {limit:?}"),
            ));
        }
    };

    // A process the worker left behind may still hold stderr open.
    if tokio::time::timeout(STDERR_GRACE, &mut stderr_task)
        .await
        .is_err()
    {
        autotype_debug!("{} worker stderr still open after exit", operation);
        stderr_task.abort();
    }
    let stderr = String::from_utf8_lossy(&lock(&captured)).into_owned();
    if !stderr.trim().is_empty() {
        autotype_debug!("{} worker stderr:\n{}", operation, stderr.trim_end());
    }
    autotype_info!("{} worker exited: {}", operation, status);

    classifier.finish(WorkerExit::from_status(status, stderr))
}

/// Feeds stdout records to the classifier until EOF.
///
/// After the first unreadable record the rest of the stream is discarded, so
/// the worker cannot block on a full pipe.
async fn pump_lines<R>(stdout: R, classifier: &mut Classifier, max_line_bytes: usize)
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(stdout, LinesCodec::new_with_max_length(max_line_bytes));
    while let Some(line) = lines.next().await {
        let reason = match line {
            Ok(line) => {
                classifier.accept_line(&line);
                continue;
            }
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                format!(
                    "{} worker emitted a record longer than {max_line_bytes} bytes",
                    classifier.operation()
                )
            }
            Err(LinesCodecError::Io(err)) => {
                format!("unreadable {} worker output: {err}", classifier.operation())
            }
        };
        classifier.protocol_violation(reason);
        let mut rest = lines.into_inner();
        if let Err(err) = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await {
            autotype_debug!("Stopped draining {} worker output: {}", classifier.operation(), err);
        }
        break;
    }
}

/// Keeps the first `limit` bytes of stderr in `captured` and discards the rest.
async fn capture_stderr<R>(mut stderr: R, limit: usize, captured: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 4096];
    loop {
        let read = match stderr.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        let mut buffer = lock(&captured);
        let room = limit.saturating_sub(buffer.len());
        buffer.extend_from_slice(&chunk[..read.min(room)]);
    }
}

fn lock(captured: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    captured.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

    use super::{capture_stderr, lock, pump_lines};
    use crate::classify::{Classifier, WorkerExit};
    use crate::{FailureKind, Operation};

    /// A pipe that breaks on the first read.
    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
        }
    }

    #[tokio::test]
    async fn failed_drain_keeps_the_protocol_violation() {
        let mut head = b"{\"type\":\"result\",\"data\":1}\n".to_vec();
        head.extend(vec![b'x'; 200]);
        head.push(b'\n');
        let stdout = (&head[..]).chain(BrokenPipe);
        let mut classifier = Classifier::new(Operation::HumanizeText, None);

        pump_lines(stdout, &mut classifier, 64).await;

        let err = classifier.finish(WorkerExit::success()).unwrap_err();
        assert_eq!(err.kind, FailureKind::ProtocolViolation);
    }

    #[tokio::test]
    async fn stderr_capture_is_bounded_and_drains_the_rest() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let stderr = vec![b'x'; 10_000];

        capture_stderr(&stderr[..], 100, Arc::clone(&captured)).await;

        assert_eq!(lock(&captured).len(), 100);
    }
}
