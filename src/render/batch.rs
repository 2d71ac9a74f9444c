//! Rendering many records against one template.
//!
//! Jobs run as tokio tasks gated by a semaphore. Each render owns its canvas;
//! build the renderer with [`Renderer::with_image_cache`] so the jobs share
//! decoded images (a listing set usually repeats logos and backgrounds).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::renderer::{RenderOutcome, RenderReport, Renderer};
use crate::record::Record;
use crate::template::Template;

/// One record to render and where to put it.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub record: Record,
    pub output: PathBuf,
}

impl BatchJob {
    /// Job writing `<out_dir>/<identifier>.png`, falling back to the
    /// record's position when it has no usable identifier.
    pub fn in_dir(record: Record, position: usize, out_dir: &Path) -> Self {
        let name = record
            .identifier()
            .map(|id| sanitize_file_stem(&id))
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| position.to_string());
        Self {
            output: out_dir.join(format!("{}.png", name)),
            record,
        }
    }
}

/// Keep file stems to a safe character set.
fn sanitize_file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// Render every job with at most `concurrency` renders in flight.
///
/// Returns one report per job, in job order.
pub async fn render_batch(
    renderer: Arc<Renderer>,
    template: Arc<Template>,
    jobs: Vec<BatchJob>,
    concurrency: usize,
) -> Vec<RenderReport> {
    let total = jobs.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for (position, job) in jobs.into_iter().enumerate() {
        let renderer = Arc::clone(&renderer);
        let template = Arc::clone(&template);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            // The semaphore is never closed, so a permit always arrives.
            let _permit = semaphore.acquire_owned().await.ok();
            let report = renderer.render(&template, &job.record, &job.output).await;
            (position, report)
        });
    }

    let mut slots: Vec<Option<RenderReport>> = vec![None; total];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((position, report)) => slots[position] = Some(report),
            Err(e) => error!("Render task aborted: {}", e),
        }
    }

    let reports: Vec<RenderReport> = slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| {
            slot.unwrap_or_else(|| RenderReport {
                output: PathBuf::new(),
                outcome: RenderOutcome::Failed {
                    error: format!("job {} did not complete", position),
                },
                diagnostics: Vec::new(),
            })
        })
        .collect();

    let written = reports.iter().filter(|r| r.success()).count();
    info!(total, written, "Batch finished");
    reports
}
