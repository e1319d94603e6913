use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, ToolReport};

/// Resolved locations of the external programs the pipeline drives.
#[derive(Clone, Debug)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Tools {
    /// Looks both programs up (bare names on `PATH`, anything with a separator as a path).
    /// Every tool is looked up before failing so the report is complete.
    pub fn locate(ffmpeg: &str, ffprobe: &str) -> Result<Self, Error> {
        let report = ToolReport(
            [ffmpeg, ffprobe]
                .into_iter()
                .map(|name| {
                    let found = which::which(name).ok();
                    debug!(tool = name, ?found, "looked up tool");
                    (name.to_owned(), found)
                })
                .collect(),
        );

        match report.0.as_slice() {
            [(_, Some(ffmpeg)), (_, Some(ffprobe))] => Ok(Self {
                ffmpeg: ffmpeg.clone(),
                ffprobe: ffprobe.clone(),
            }),
            _ => Err(Error::ToolsMissing(report)),
        }
    }
}
