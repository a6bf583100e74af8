use anyhow::anyhow;
use std::fmt;
use std::sync::Arc;

/// Where a side-effecting collaborator writes its human-readable result.
#[derive(Debug)]
pub enum Output {
    Stdout,
    Capture(String),
}

impl Output {
    pub fn stdout() -> Self {
        Output::Stdout
    }

    pub fn capture() -> Self {
        Output::Capture(String::new())
    }

    pub fn emit(&mut self, line: impl AsRef<str>) {
        match self {
            Output::Stdout => println!("{}", line.as_ref()),
            Output::Capture(buf) => {
                buf.push_str(line.as_ref());
                buf.push('\n');
            }
        }
    }

    /// Captured text, or an empty string for the stdout channel.
    pub fn into_captured(self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Capture(buf) => buf,
        }
    }
}

impl fmt::Write for Output {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self {
            Output::Stdout => print!("{s}"),
            Output::Capture(buf) => buf.push_str(s),
        }
        Ok(())
    }
}

/// A call whose only observable result is the text it writes.
#[async_trait::async_trait]
pub trait OutputCapability: Send + Sync {
    async fn run(&self, out: &mut Output) -> anyhow::Result<()>;
}

/// Runs `capability` against a fresh capture buffer and returns what it wrote.
///
/// The buffer is owned by a dedicated task and dropped on every exit path; a
/// panic inside the capability surfaces as an error.
pub async fn capture(capability: Arc<dyn OutputCapability>) -> anyhow::Result<String> {
    let handle = tokio::spawn(async move {
        let mut out = Output::capture();
        capability.run(&mut out).await.map(|()| out.into_captured())
    });

    match handle.await {
        Ok(res) => res,
        Err(join_err) if join_err.is_panic() => Err(anyhow!("capability panicked")),
        Err(join_err) => Err(anyhow!("capability task failed: {join_err}")),
    }
}
