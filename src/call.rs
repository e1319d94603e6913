use std::process::{ExitStatus, Stdio};

use indicatif::ProgressStyle;
use tracing::{debug, info, info_span, Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::{commands::Job, error::Error};

/// What a finished subprocess left behind.
#[derive(Debug)]
pub struct JobOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl JobOutput {
    /// stdout followed by stderr.
    pub fn text(&self) -> String {
        let mut text = self.stdout.clone();
        text.push_str(&self.stderr);
        text
    }
}

/// Span carrying a progress bar of `len` steps.
pub fn progress_span(span: Span, len: usize) -> Span {
    span.pb_set_style(&ProgressStyle::default_bar());
    span.pb_set_length(len as u64);
    span
}

/// Runs `job` to completion and captures its output.
///
/// With `check`, a non-zero exit is an error; without it the caller inspects the status.
/// The child is killed if the returned future is dropped, e.g. on Ctrl-C.
pub async fn run(job: &Job, check: bool) -> Result<JobOutput, Error> {
    debug!(kind = %job.kind, "running {job}");
    let output = job
        .command()
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| Error::Spawn {
            command: job.to_string(),
            source,
        })?;

    let output = JobOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if check && !output.status.success() {
        return Err(Error::CommandFailed {
            command: job.to_string(),
            status: output.status,
            output: output.text(),
        });
    }
    Ok(output)
}

/// Runs `jobs` one after another, advancing a progress bar per job, and returns
/// their combined output in order.
///
/// In dry-run nothing is spawned: every job is logged and the result is empty.
pub async fn call(jobs: &[Job], dry_run: bool, check: bool) -> Result<Vec<String>, Error> {
    if dry_run {
        for job in jobs {
            info!(kind = %job.kind, "would run: {job}");
        }
        return Ok(Vec::new());
    }

    let span = progress_span(info_span!("call"), jobs.len());
    async {
        let mut outputs = Vec::with_capacity(jobs.len());
        for job in jobs {
            let target = job.args.last().map(|a| a.to_string_lossy());
            info!(kind = %job.kind, "writing '{}'", target.unwrap_or_default());
            let output = run(job, check).await?;
            outputs.push(output.text());
            Span::current().pb_inc(1);
        }
        Ok(outputs)
    }
    .instrument(span)
    .await
}
