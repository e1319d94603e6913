use std::path::Path;

use tracing::{debug, info, info_span, Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::{
    call::{self, progress_span},
    commands::frame_count_job,
    config::{Config, ProxySize},
    tools::Tools,
    work::WorkItem,
};

/// Frame count ffprobe reports for `file`, or `None` if it could not tell.
async fn frame_count(tools: &Tools, file: &Path) -> Option<String> {
    let job = frame_count_job(tools, file);
    match call::run(&job, false).await {
        Ok(output) if output.status.success() => {
            let count = output.stdout.trim();
            (!count.is_empty()).then(|| count.to_owned())
        }
        Ok(output) => {
            let stderr = output.stderr.trim();
            debug!(status = %output.status, "probe of '{}' failed: {stderr}", file.display());
            None
        }
        Err(e) => {
            debug!("probe of '{}' failed: {e}", file.display());
            None
        }
    }
}

/// Whether every proxy of `item` exists with the same frame count as its source.
///
/// Probes the source first, then each size, stopping at the first disagreement.
/// A single stale size makes the whole item stale.
pub async fn is_up_to_date(tools: &Tools, item: &WorkItem, sizes: &[ProxySize]) -> bool {
    let Some(expected) = frame_count(tools, &item.source).await else {
        return false;
    };
    for &size in sizes {
        let proxy = item.proxy_path(size);
        if !proxy.is_file() {
            debug!("missing proxy '{}'", proxy.display());
            return false;
        }
        match frame_count(tools, &proxy).await {
            Some(found) if found == expected => {}
            found => {
                debug!(%expected, ?found, "stale proxy '{}'", proxy.display());
                return false;
            }
        }
    }
    true
}

/// Keeps the items that need (re)generating.
///
/// In dry-run no probe is spawned and every item is kept.
pub async fn stale(
    cfg: &Config,
    tools: &Tools,
    items: Vec<WorkItem>,
    sizes: &[ProxySize],
    dry_run: bool,
) -> Vec<WorkItem> {
    if dry_run {
        for item in &items {
            info!("would run: {}", frame_count_job(tools, &item.source));
            for &size in sizes {
                info!("would run: {}", frame_count_job(tools, &item.proxy_path(size)));
            }
        }
        return items;
    }

    let span = progress_span(info_span!("probe"), items.len());
    async {
        let mut stale = Vec::with_capacity(items.len());
        for item in items {
            if is_up_to_date(tools, &item, sizes).await {
                info!("{} up to date: '{}'", cfg.glyphs.skip, item.source.display());
            } else {
                info!("{} queued: '{}'", cfg.glyphs.work, item.source.display());
                stale.push(item);
            }
            Span::current().pb_inc(1);
        }
        stale
    }
    .instrument(span)
    .await
}
