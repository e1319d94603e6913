use std::{fmt, path::PathBuf, process::ExitStatus};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("required tools are missing:\n{0}")]
    ToolsMissing(ToolReport),
    #[error("'{}' is not a directory", .0.display())]
    InvalidDirectory(PathBuf),
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {status}:\n{output}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        output: String,
    },
}

/// Lookup result for every required tool, printed one per line.
#[derive(Debug, Default)]
pub struct ToolReport(pub Vec<(String, Option<PathBuf>)>);

impl fmt::Display for ToolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, found) in &self.0 {
            match found {
                Some(path) => writeln!(f, "  {name}: found at '{}'", path.display())?,
                None => writeln!(f, "  {name}: not found")?,
            }
        }
        Ok(())
    }
}
