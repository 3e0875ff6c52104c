use std::cell::Cell;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, VideoError};
use crate::frame::{FrameComposer, FRAME_HEIGHT, FRAME_WIDTH};
use crate::images::{locate_images, ImageSearchService};
use crate::script::Script;
use crate::video::{count_video_frames, FrameSink, XvidWriter};

pub(crate) const FRAMES_PER_SECOND: i32 = 1;

/// Image used for sentence `index` when `image_count` images are available.
pub(crate) fn image_index(index: usize, image_count: usize) -> usize {
    index % image_count
}

/// Downloaded backgrounds. Every file registered here is removed on drop,
/// whichever way the run ends.
struct ScratchImages {
    dir: PathBuf,
    paths: Vec<PathBuf>,
}

impl ScratchImages {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            paths: Vec::new(),
        }
    }

    fn next_path(&mut self, index: usize) -> PathBuf {
        let path = self.dir.join(format!("bg_{}.jpg", index));
        self.paths.push(path.clone());
        path
    }
}

impl Drop for ScratchImages {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// Renders one frame per sentence into the sink returned by `open_sink`.
///
/// The sink is only opened once images are known to be available. Returns the
/// number of frames written.
pub(crate) async fn assemble_with<S, W, F>(
    script: &Script,
    images: &S,
    composer: &FrameComposer,
    scratch_dir: &Path,
    open_sink: F,
) -> Result<usize>
where
    S: ImageSearchService,
    W: FrameSink,
    F: FnOnce() -> Result<W>,
{
    if script.is_empty() {
        return Err(VideoError::EmptyScript);
    }

    let sentences = script.sentences();
    let urls = locate_images(images, script, sentences.len()).await;
    if urls.is_empty() {
        return Err(VideoError::ImageLookup(format!(
            "no images found for '{}'",
            script.search_seed()
        )));
    }

    tokio::fs::create_dir_all(scratch_dir).await?;
    let mut scratch = ScratchImages::new(scratch_dir);
    let mut sink = open_sink()?;

    let sentence_count = sentences.len();
    for (i, sentence) in sentences.into_iter().enumerate() {
        let url = &urls[image_index(i, urls.len())];
        let scratch_path = scratch.next_path(i);
        let frame = composer.compose(images, sentence, url, &scratch_path).await?;
        sink.write_frame(&frame)?;
        info!("Rendered frame {}/{}", i + 1, sentence_count);
    }

    sink.finish()?;
    Ok(sentence_count)
}

/// Builds the video at `output_path`. A run that fails after opening the
/// container removes it; earlier failures leave any existing file alone.
pub(crate) async fn assemble<S: ImageSearchService>(
    script: &Script,
    images: &S,
    composer: &FrameComposer,
    scratch_dir: &Path,
    output_path: &Path,
) -> Result<PathBuf> {
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let opened = Cell::new(false);
    let result = assemble_with(script, images, composer, scratch_dir, || {
        opened.set(true);
        XvidWriter::create(output_path, FRAME_WIDTH, FRAME_HEIGHT, FRAMES_PER_SECOND)
    })
    .await
    .and_then(|expected| verify_frame_count(output_path, expected));

    match result {
        Ok(()) => {
            info!("Video written to: {}", output_path.display());
            Ok(output_path.to_path_buf())
        }
        Err(e) => {
            if opened.get() && tokio::fs::remove_file(output_path).await.is_ok() {
                warn!("Removed incomplete video {}", output_path.display());
            }
            Err(e)
        }
    }
}

fn verify_frame_count(path: &Path, expected: usize) -> Result<()> {
    let actual = count_video_frames(path)?;
    if actual != expected {
        return Err(VideoError::Encode(format!(
            "{} holds {} frames, expected {}",
            path.display(),
            actual,
            expected
        )));
    }
    Ok(())
}
