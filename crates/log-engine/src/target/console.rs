use tokio::io::AsyncWriteExt;

use crate::error::TargetError;
use crate::format::Format;
use crate::record::LogRec;
use crate::target::Target;

/// Which standard stream a [`ConsoleTarget`] writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleOut {
    Stdout,
    Stderr,
}

enum Stream {
    Stdout(tokio::io::Stdout),
    Stderr(tokio::io::Stderr),
}

/// Writes encoded records to stdout or stderr.
pub struct ConsoleTarget {
    stream: Stream,
    format: Format,
}

impl ConsoleTarget {
    pub fn new(out: ConsoleOut, format: Format) -> Self {
        let stream = match out {
            ConsoleOut::Stdout => Stream::Stdout(tokio::io::stdout()),
            ConsoleOut::Stderr => Stream::Stderr(tokio::io::stderr()),
        };
        Self { stream, format }
    }
}

impl Target for ConsoleTarget {
    async fn write(&mut self, rec: &LogRec) -> Result<(), TargetError> {
        let line = self.format.encode(rec)?;
        let result = match &mut self.stream {
            Stream::Stdout(s) => s.write_all(&line).await,
            Stream::Stderr(s) => s.write_all(&line).await,
        };
        result.map_err(TargetError::Write)
    }

    async fn flush(&mut self) -> Result<(), TargetError> {
        let result = match &mut self.stream {
            Stream::Stdout(s) => s.flush().await,
            Stream::Stderr(s) => s.flush().await,
        };
        result.map_err(TargetError::Flush)
    }
}
