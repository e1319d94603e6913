use std::{
    collections::BTreeSet,
    ffi::OsString,
    path::PathBuf,
};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{Config, MediaKind, ProxySize};

/// A source file together with where its proxies go.
///
/// Videos get one directory per source holding `proxy_<size>.avi` files; images share
/// `images/<size>/` directories and are written as `<name>_proxy.jpg`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub source: PathBuf,
    pub kind: MediaKind,
    proxy_root: PathBuf,
}

impl WorkItem {
    /// Returns `None` when the source's extension is neither a video nor an image one.
    pub fn new(cfg: &Config, source: PathBuf) -> Option<Self> {
        let kind = cfg.media_kind(&source)?;
        let file_name = source.file_name()?.to_os_string();
        let base = source.parent()?.join(cfg.proxy_dir);
        let proxy_root = match kind {
            MediaKind::Video => base.join(file_name),
            MediaKind::Image => base.join("images"),
        };
        Some(Self {
            source,
            kind,
            proxy_root,
        })
    }

    fn file_name(&self) -> OsString {
        self.source.file_name().unwrap_or_default().to_os_string()
    }

    /// Proxy file produced for `size`.
    pub fn proxy_path(&self, size: ProxySize) -> PathBuf {
        match self.kind {
            MediaKind::Video => self.proxy_root.join(format!("proxy_{size}.avi")),
            MediaKind::Image => {
                let mut name = self.file_name();
                name.push("_proxy.jpg");
                self.proxy_root.join(size.to_string()).join(name)
            }
        }
    }

    /// Output path with a `{size}` placeholder, for logging.
    pub fn template(&self) -> String {
        let template = match self.kind {
            MediaKind::Video => self.proxy_root.join("proxy_{size}.avi"),
            MediaKind::Image => {
                let mut name = self.file_name();
                name.push("_proxy.jpg");
                self.proxy_root.join("{size}").join(name)
            }
        };
        template.display().to_string()
    }

    /// Directories that must exist before the proxies for `sizes` can be written.
    pub fn proxy_dirs(&self, sizes: &[ProxySize]) -> Vec<PathBuf> {
        match self.kind {
            MediaKind::Video => vec![self.proxy_root.clone()],
            MediaKind::Image => sizes
                .iter()
                .map(|size| self.proxy_root.join(size.to_string()))
                .collect(),
        }
    }
}

/// Builds work items for discovered files, dropping any the config cannot classify.
pub fn work_items(cfg: &Config, files: Vec<PathBuf>) -> Vec<WorkItem> {
    files
        .into_iter()
        .filter_map(|path| {
            let item = WorkItem::new(cfg, path);
            if let Some(item) = &item {
                debug!(kind = %item.kind, "'{}' -> '{}'", item.source.display(), item.template());
            }
            item
        })
        .collect()
}

/// Creates every proxy directory the items need. Existing directories are fine.
pub async fn make_dirs(
    cfg: &Config,
    items: &[WorkItem],
    sizes: &[ProxySize],
    dry_run: bool,
) -> Result<()> {
    let dirs: BTreeSet<PathBuf> = items
        .iter()
        .flat_map(|item| item.proxy_dirs(sizes))
        .collect();

    for dir in &dirs {
        if dry_run {
            info!("{} would create directory '{}'", cfg.glyphs.work, dir.display());
            continue;
        }
        debug!("creating directory '{}'", dir.display());
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create proxy directory '{}'", dir.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn is_under_proxy_dir(path: &Path, proxy_dir: &str) -> bool {
        path.ancestors()
            .skip(1)
            .any(|dir| dir.file_name().is_some_and(|name| name == proxy_dir))
    }

    fn item(path: &str) -> WorkItem {
        WorkItem::new(&Config::default(), PathBuf::from(path)).unwrap()
    }

    #[test]
    fn video_layout() {
        let video = item("/footage/day1/clip.MP4");
        assert_eq!(video.kind, MediaKind::Video);
        assert_eq!(
            video.proxy_path(ProxySize::Quarter),
            PathBuf::from("/footage/day1/BL_proxy/clip.MP4/proxy_25.avi")
        );
        assert_eq!(video.template(), "/footage/day1/BL_proxy/clip.MP4/proxy_{size}.avi");
        assert_eq!(
            video.proxy_dirs(&[ProxySize::Quarter, ProxySize::Half]),
            vec![PathBuf::from("/footage/day1/BL_proxy/clip.MP4")]
        );
    }

    #[test]
    fn image_layout() {
        let image = item("/footage/stills/shot.png");
        assert_eq!(image.kind, MediaKind::Image);
        assert_eq!(
            image.proxy_path(ProxySize::Half),
            PathBuf::from("/footage/stills/BL_proxy/images/50/shot.png_proxy.jpg")
        );
        assert_eq!(
            image.proxy_dirs(&[ProxySize::Quarter, ProxySize::Full]),
            vec![
                PathBuf::from("/footage/stills/BL_proxy/images/25"),
                PathBuf::from("/footage/stills/BL_proxy/images/100"),
            ]
        );
    }

    #[test]
    fn proxies_always_live_under_the_proxy_dir() {
        let cfg = Config::default();
        for path in ["/a/b.mov", "/a/b/c.jpeg", "/x.flv"] {
            let item = item(path);
            for size in [ProxySize::Quarter, ProxySize::Half, ProxySize::Full] {
                assert!(is_under_proxy_dir(&item.proxy_path(size), cfg.proxy_dir));
            }
            assert!(!is_under_proxy_dir(&item.source, cfg.proxy_dir));
        }
    }

    #[test]
    fn unknown_extensions_make_no_work() {
        let cfg = Config::default();
        let items = work_items(&cfg, vec!["/a/readme.md".into(), "/a/b.mkv".into()]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, PathBuf::from("/a/b.mkv"));
    }

    #[tokio::test]
    async fn make_dirs_is_idempotent_and_skipped_in_dry_run() {
        let cfg = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let items = work_items(
            &cfg,
            vec![dir.path().join("clip.mp4"), dir.path().join("still.jpg")],
        );
        let sizes = [ProxySize::Quarter, ProxySize::Half];

        make_dirs(&cfg, &items, &sizes, true).await.unwrap();
        assert!(!dir.path().join("BL_proxy").exists());

        make_dirs(&cfg, &items, &sizes, false).await.unwrap();
        make_dirs(&cfg, &items, &sizes, false).await.unwrap();
        assert!(dir.path().join("BL_proxy/clip.mp4").is_dir());
        assert!(dir.path().join("BL_proxy/images/25").is_dir());
        assert!(dir.path().join("BL_proxy/images/50").is_dir());
    }
}
