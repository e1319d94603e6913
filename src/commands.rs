use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
};

use strum::{AsRefStr, Display};

use crate::{
    config::{Config, MediaKind, Preset, ProxySize},
    tools::Tools,
    work::WorkItem,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum JobKind {
    Video,
    Image,
    Check,
}

/// One subprocess invocation: the program and its literal argument vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub kind: JobKind,
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Job {
    fn new(kind: JobKind, program: &Path) -> Self {
        Self {
            kind,
            program: program.to_path_buf(),
            args: Vec::new(),
        }
    }

    fn arg(&mut self, arg: impl AsRef<OsStr>) -> &mut Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Scales both axes and rounds each up to an even number of pixels.
fn even_scale_filter(size: ProxySize) -> String {
    let s = size.scale();
    format!("scale=ceil(iw*{s}/2)*2:ceil(ih*{s}/2)*2")
}

/// One ffmpeg run writing an intra-only proxy per requested size.
pub fn video_job(
    cfg: &Config,
    tools: &Tools,
    preset: Preset,
    sizes: &[ProxySize],
    item: &WorkItem,
) -> Job {
    let mut job = Job::new(JobKind::Video, &tools.ffmpeg);
    job.args(["-y", "-hwaccel", "auto", "-i"]).arg(&item.source);
    for &size in sizes {
        // output options only bind to the next output file
        #[rustfmt::skip]
        job.args([
            "-pix_fmt", "yuv420p",
            "-g", "1",
            "-sn", "-an",
        ]);
        job.arg("-vf")
            .arg(format!("colormatrix=bt601:bt709,{}", even_scale_filter(size)))
            .args(cfg.preset_args(preset))
            .arg(item.proxy_path(size));
    }
    job
}

/// One ffmpeg run writing a scaled still per requested size.
pub fn image_job(tools: &Tools, sizes: &[ProxySize], item: &WorkItem) -> Job {
    let mut job = Job::new(JobKind::Image, &tools.ffmpeg);
    job.args(["-y", "-i"]).arg(&item.source);
    for &size in sizes {
        let s = size.scale();
        job.arg("-vf")
            .arg(format!("scale=iw*{s}:ih*{s}"))
            .arg(item.proxy_path(size));
    }
    job
}

pub fn transcode_job(
    cfg: &Config,
    tools: &Tools,
    preset: Preset,
    sizes: &[ProxySize],
    item: &WorkItem,
) -> Job {
    match item.kind {
        MediaKind::Video => video_job(cfg, tools, preset, sizes, item),
        MediaKind::Image => image_job(tools, sizes, item),
    }
}

/// ffprobe printing the frame count of the first video stream of `file`.
pub fn frame_count_job(tools: &Tools, file: &Path) -> Job {
    let mut job = Job::new(JobKind::Check, &tools.ffprobe);
    #[rustfmt::skip]
    job.args([
        "-v", "error",
        "-select_streams", "v:0",
        "-show_entries", "stream=nb_frames",
        "-of", "default=noprint_wrappers=1:nokey=1",
    ]);
    job.arg(file);
    job
}
