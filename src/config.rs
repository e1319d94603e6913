use std::path::Path;

use clap::ValueEnum;
use strum::{AsRefStr, Display};

/// Encoder presets selectable with `--preset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Preset {
    Mp4,
    Webm,
    Nvenc,
}

/// Proxy sizes Blender knows about, as a percentage of the source resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Display)]
pub enum ProxySize {
    #[value(name = "25")]
    #[strum(serialize = "25")]
    Quarter,
    #[value(name = "50")]
    #[strum(serialize = "50")]
    Half,
    #[value(name = "100")]
    #[strum(serialize = "100")]
    Full,
}

impl ProxySize {
    pub fn percent(self) -> u32 {
        match self {
            ProxySize::Quarter => 25,
            ProxySize::Half => 50,
            ProxySize::Full => 100,
        }
    }

    pub fn scale(self) -> f64 {
        f64::from(self.percent()) / 100.0
    }
}

/// Kind of media a source file holds, decided by its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

/// Prefixes for log lines describing what happens to a file.
#[derive(Clone, Copy, Debug)]
pub struct Glyphs {
    pub work: &'static str,
    pub skip: &'static str,
    pub done: &'static str,
}

/// Settings fixed for the lifetime of the process.
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory, next to the sources, that Blender looks into for proxies.
    pub proxy_dir: &'static str,
    pub video_extensions: &'static [&'static str],
    pub image_extensions: &'static [&'static str],
    pub glyphs: Glyphs,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy_dir: "BL_proxy",
            video_extensions: &["mp4", "mkv", "mov", "flv", "mts"],
            image_extensions: &["png", "jpg", "jpeg"],
            glyphs: Glyphs {
                work: "»",
                skip: "~",
                done: "•",
            },
        }
    }
}

impl Config {
    /// Encoder flags appended to every output of a video transcode.
    pub fn preset_args(&self, preset: Preset) -> &'static [&'static str] {
        #[rustfmt::skip]
        let args: &'static [&'static str] = match preset {
            Preset::Mp4 => &["-c:v", "libx264", "-crf", "25", "-preset", "faster", "-tune", "fastdecode"],
            Preset::Webm => &["-c:v", "libvpx", "-crf", "25", "-speed", "16", "-threads", "8"],
            Preset::Nvenc => &["-c:v", "h264_nvenc", "-qp", "25", "-preset", "fast"],
        };
        args
    }

    /// Union of the video and image extensions.
    pub fn extensions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.video_extensions
            .iter()
            .chain(self.image_extensions)
            .copied()
    }

    /// Classifies `path` by its extension, ignoring case.
    pub fn media_kind(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if self.video_extensions.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if self.image_extensions.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}
