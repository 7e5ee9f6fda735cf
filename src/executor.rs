use std::{
    fmt::Display,
    io::{self, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::debug;
use serde::{Deserialize, Serialize};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Внешняя команда: программа и её аргументы.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
        }
    }
}

impl Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.args.iter() {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Результат выполнения внешней команды.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,

    /// Код завершения. -1 если процесс был завершён сигналом.
    pub code: i32,
}

impl Output {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Исполнитель, которому передаётся документ для предпросмотра или печати.
pub trait Executor {
    /// Передаёт документ на stdin и дожидается завершения.
    fn run(&self, input: &str) -> ExecutorResult<Output>;
}

/// Исполнитель, запускающий внешнюю программу.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    spec: CommandSpec,

    /// Сколько ждать завершения. Если не задано, ждём сколько потребуется.
    timeout: Option<Duration>,
}

impl CommandExecutor {
    pub fn new(spec: CommandSpec, timeout: Option<Duration>) -> Self {
        Self { spec, timeout }
    }

    fn spawn(&self) -> ExecutorResult<Child> {
        Command::new(&self.spec.program)
            .args(&self.spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    ExecutorError::NotFound(self.spec.program.clone())
                } else {
                    ExecutorError::Spawn(self.spec.to_string(), e)
                }
            })
    }

    fn wait(&self, child: &mut Child) -> ExecutorResult<ExitStatus> {
        let limit = match self.timeout {
            Some(limit) => limit,
            None => return Ok(child.wait()?),
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }

            if started.elapsed() >= limit {
                // Процесс мог успеть завершиться между проверками.
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecutorError::Timeout {
                    command: self.spec.to_string(),
                    secs: limit.as_secs(),
                });
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Executor for CommandExecutor {
    fn run(&self, input: &str) -> ExecutorResult<Output> {
        debug!("Запускаем {}", self.spec);

        let mut child = self.spawn()?;

        let mut stdin = child.stdin.take().ok_or(ExecutorError::Pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(ExecutorError::Pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ExecutorError::Pipe("stderr"))?;

        // Пишем и читаем в отдельных потоках, иначе большой вывод заблокирует
        // процесс до того как он дочитает вход.
        let input = input.to_owned();
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));
        let stdout = read_in_background(stdout);
        let stderr = read_in_background(stderr);

        let status = self.wait(&mut child)?;

        match writer.join().map_err(|_| ExecutorError::Pipe("stdin"))? {
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
            _ => {}
        }

        let output = Output {
            stdout: collect(stdout, "stdout")?,
            stderr: collect(stderr, "stderr")?,
            code: status.code().unwrap_or(-1),
        };

        debug!("{} завершилась с кодом {}", self.spec, output.code);

        Ok(output)
    }
}

fn read_in_background<R: Read + Send + 'static>(mut r: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: JoinHandle<io::Result<Vec<u8>>>, name: &'static str) -> ExecutorResult<String> {
    let buf = handle.join().map_err(|_| ExecutorError::Pipe(name))??;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("program \"{0}\" not found")]
    NotFound(String),

    #[error("spawn \"{0}\"")]
    Spawn(String, #[source] io::Error),

    #[error("\"{command}\" did not finish in {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("{0} pipe is not available")]
    Pipe(&'static str),

    #[error("communicate with subprocess")]
    Io(#[from] io::Error),
}
