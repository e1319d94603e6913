#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::{Command, Output},
};

const FAKE_FFMPEG: &str = r#"#!/bin/sh
echo "$*" >> "$BPSPROXY_TEST_LOG"
prev=
for a; do
    [ "$prev" = "-i" ] && src=$a
    case "$a" in
        */proxy_*.avi|*_proxy.jpg) : > "$a"; cp "$src.frames" "$a.frames" 2>/dev/null ;;
    esac
    prev=$a
done
"#;

const FAKE_FFPROBE: &str = r#"#!/bin/sh
for f; do :; done
[ -f "$f.frames" ] || { echo "$f: No such file or directory" >&2; exit 1; }
cat "$f.frames"
"#;

struct Fixture {
    _dir: tempfile::TempDir,
    media: PathBuf,
    bin: PathBuf,
    log: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");
        let bin = dir.path().join("bin");
        fs::create_dir_all(&media).unwrap();
        fs::create_dir_all(&bin).unwrap();
        for (name, script) in [("ffmpeg", FAKE_FFMPEG), ("ffprobe", FAKE_FFPROBE)] {
            let path = bin.join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let log = dir.path().join("ffmpeg.log");
        Self {
            _dir: dir,
            media,
            bin,
            log,
        }
    }

    /// A source video with a known frame count for the fake ffprobe.
    fn video(&self, name: &str, frames: u32) -> PathBuf {
        let path = self.media.join(name);
        fs::write(&path, b"").unwrap();
        fs::write(self.media.join(format!("{name}.frames")), format!("{frames}\n")).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_bpsproxy"))
            .arg(&self.media)
            .args(args)
            .env("BPSPROXY_FFMPEG", self.bin.join("ffmpeg"))
            .env("BPSPROXY_FFPROBE", self.bin.join("ffprobe"))
            .env("BPSPROXY_TEST_LOG", &self.log)
            .env_remove("BPSPROXY_PRESET")
            .env_remove("RUST_LOG")
            .output()
            .unwrap()
    }

    fn ffmpeg_calls(&self) -> Vec<String> {
        match fs::read_to_string(&self.log) {
            Ok(log) => log.lines().map(str::to_owned).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn proxy_dir(&self) -> PathBuf {
        self.media.join("BL_proxy")
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn fresh_video_gets_a_proxy() {
    let fx = Fixture::new();
    fx.video("clip.mp4", 240);

    let out = fx.run(&["-v"]);
    assert!(out.status.success(), "{}", stderr(&out));

    assert!(fx.proxy_dir().join("clip.mp4").is_dir());
    assert!(fx.proxy_dir().join("clip.mp4/proxy_25.avi").is_file());
    let calls = fx.ffmpeg_calls();
    assert_eq!(calls.len(), 1, "{calls:?}");
    assert!(calls[0].contains("-hwaccel auto"));
    assert!(calls[0].ends_with("BL_proxy/clip.mp4/proxy_25.avi"));
}

#[test]
fn second_run_transcodes_nothing() {
    let fx = Fixture::new();
    fx.video("a.mp4", 100);
    fx.video("b.mov", 50);

    let first = fx.run(&["-s", "25", "50"]);
    assert!(first.status.success(), "{}", stderr(&first));
    assert_eq!(fx.ffmpeg_calls().len(), 2);

    let second = fx.run(&["-v", "-s", "25", "50"]);
    assert!(second.status.success(), "{}", stderr(&second));
    assert_eq!(fx.ffmpeg_calls().len(), 2);
    assert!(stderr(&second).contains("nothing to process"));
}

#[test]
fn one_stale_size_regenerates_every_size() {
    let fx = Fixture::new();
    fx.video("clip.mkv", 240);
    assert!(fx.run(&["-s", "25", "50"]).status.success());

    fs::write(fx.proxy_dir().join("clip.mkv/proxy_50.avi.frames"), "12\n").unwrap();
    assert!(fx.run(&["-s", "25", "50"]).status.success());

    let calls = fx.ffmpeg_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].contains("proxy_25.avi") && calls[1].contains("proxy_50.avi"));
}

#[test]
fn dry_run_touches_nothing() {
    let fx = Fixture::new();
    fx.video("clip.mp4", 240);

    let out = fx.run(&["--dry-run", "-s", "25", "100"]);
    assert!(out.status.success(), "{}", stderr(&out));

    assert!(!fx.proxy_dir().exists());
    assert!(fx.ffmpeg_calls().is_empty());
    let log = stderr(&out);
    assert!(log.contains("would create directory"));
    assert!(log.contains("proxy_25.avi"));
    assert!(log.contains("proxy_100.avi"));
}

#[test]
fn empty_directory_has_nothing_to_process() {
    let fx = Fixture::new();

    let out = fx.run(&["-v"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stderr(&out).contains("nothing to process"));
    assert!(fx.ffmpeg_calls().is_empty());
    assert!(is_empty_dir(&fx.media));
}

#[test]
fn missing_tools_abort_before_touching_files() {
    let fx = Fixture::new();
    fx.video("clip.mp4", 240);
    fs::remove_file(fx.bin.join("ffmpeg")).unwrap();

    let out = fx.run(&[]);
    assert!(!out.status.success());
    let log = stderr(&out);
    assert!(log.contains("ffmpeg: not found"), "{log}");
    assert!(log.contains("ffprobe: found at"), "{log}");
    assert!(!fx.proxy_dir().exists());
}

#[test]
fn invalid_directory_is_reported() {
    let fx = Fixture::new();
    let missing = fx.media.join("nope");

    let out = Command::new(env!("CARGO_BIN_EXE_bpsproxy"))
        .arg(&missing)
        .env("BPSPROXY_FFMPEG", fx.bin.join("ffmpeg"))
        .env("BPSPROXY_FFPROBE", fx.bin.join("ffprobe"))
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(stderr(&out).contains("is not a directory"));
}
