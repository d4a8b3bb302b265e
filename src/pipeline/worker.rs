use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use tracing::debug;

use super::{CancelFlag, Pipeline};
use crate::ocr::TextDetector;
use crate::translator::TranslateText;

/// A batch running on its own thread. Status lines arrive in emission order.
pub struct Worker {
    messages: Receiver<String>,
    cancel: CancelFlag,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Blocks for each status line until the batch ends.
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        self.messages.iter()
    }

    /// Stops the batch before its next image.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn join(self) -> Result<()> {
        drop(self.messages);
        self.handle
            .join()
            .map_err(|_| anyhow!("pipeline worker panicked"))
    }
}

/// Moves `pipeline` onto a worker thread and runs `paths` through it.
///
/// The channel holds a single message, so the worker never runs more than
/// one status line ahead of the reader.
pub fn spawn_worker<D, T>(
    pipeline: Pipeline<D, T>,
    source_lang: String,
    paths: Vec<PathBuf>,
) -> Result<Worker>
where
    D: TextDetector + Send + 'static,
    T: TranslateText + Send + 'static,
{
    let (sender, messages) = mpsc::sync_channel(1);
    let cancel = CancelFlag::default();
    let flag = cancel.clone();
    let handle = thread::Builder::new()
        .name("pipeline".to_string())
        .spawn(move || {
            for message in pipeline.run_batch(&source_lang, paths, flag) {
                if sender.send(message).is_err() {
                    debug!("status receiver dropped; stopping batch");
                    break;
                }
            }
        })
        .with_context(|| "failed to spawn pipeline worker")?;

    Ok(Worker {
        messages,
        cancel,
        handle,
    })
}
