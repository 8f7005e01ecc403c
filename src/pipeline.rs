use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::config::PipelineConfig;
use crate::detection::{BubbleGridDecoder, CardRectifier, SheetSplitter};
use crate::error::SheetError;
use crate::models::{CardOutcome, Failure, ProcessingOutcome, RawImage, SheetResult, SheetUpload};

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// Folder for one upload: its 1-based batch position and file stem, so
    /// uploads sharing a stem never overwrite each other
    pub fn folder_name(upload_index: usize, source: &str) -> String {
        let stem = Path::new(source)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("image");
        format!("{:03}_{}", upload_index, stem)
    }

    /// Save one intermediate image as `<output_dir>/<folder>/<name>.png`
    pub fn save(&self, folder: &str, name: &str, image: &DynamicImage) -> Result<()> {
        let dir = self.output_dir.join(folder);
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.png", name));
        image
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image {}: {}", path.display(), e))?;
        debug!(path = %path.display(), "Debug image saved");
        Ok(())
    }
}

/// Image-to-answers orchestrator: split, rectify and decode every card of
/// every uploaded image. Holds no mutable state, so one instance can serve
/// any number of requests and worker threads.
#[derive(Clone, Debug, Default)]
pub struct SheetPipeline {
    splitter: SheetSplitter,
    rectifier: CardRectifier,
    decoder: BubbleGridDecoder,
    debug: Option<DebugConfig>,
}

impl SheetPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineConfig) -> Result<Self, SheetError> {
        config.validate()?;
        Ok(Self {
            splitter: SheetSplitter::new(config.split),
            rectifier: CardRectifier::new(config.rectify),
            decoder: BubbleGridDecoder::new(config.grid),
            debug: None,
        })
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    pub fn splitter(&self) -> &SheetSplitter {
        &self.splitter
    }

    pub fn rectifier(&self) -> &CardRectifier {
        &self.rectifier
    }

    pub fn decoder(&self) -> &BubbleGridDecoder {
        &self.decoder
    }

    /// Process every upload in order. A failing image never stops the batch.
    pub fn process_upload(&self, uploads: &[SheetUpload]) -> Vec<ProcessingOutcome> {
        uploads
            .iter()
            .zip(1usize..)
            .flat_map(|(upload, upload_index)| self.process_file(upload_index, upload))
            .collect()
    }

    /// Like [`process_upload`](Self::process_upload), with each image on its
    /// own blocking worker. Results keep the input order.
    pub async fn process_upload_parallel(&self, uploads: Vec<SheetUpload>) -> Vec<ProcessingOutcome> {
        let handles: Vec<_> = uploads
            .into_iter()
            .zip(1usize..)
            .map(|(upload, upload_index)| {
                let pipeline = self.clone();
                let filename = upload.filename.clone();
                let handle = tokio::task::spawn_blocking(move || pipeline.process_file(upload_index, &upload));
                (filename, handle)
            })
            .collect();

        let mut outcomes = Vec::new();
        for (filename, handle) in handles {
            match handle.await {
                Ok(batch) => outcomes.extend(batch),
                Err(e) => {
                    let err = SheetError::Unexpected(e.to_string());
                    warn!(%filename, error = %err, "Worker failed");
                    outcomes.push(image_failure(&filename, &err));
                }
            }
        }
        outcomes
    }

    /// Decode one uploaded file and process it. Decode errors and panics are
    /// reported as a single failure record for the file. `upload_index` is
    /// the file's 1-based position in its batch.
    #[instrument(skip_all, fields(filename = %upload.filename, upload_index = upload_index))]
    pub fn process_file(&self, upload_index: usize, upload: &SheetUpload) -> Vec<ProcessingOutcome> {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| -> Result<_, SheetError> {
            let img = decode_image(&upload.bytes)?;
            Ok(self.process_image(upload_index, &upload.filename, &img))
        }));

        let err = match attempt {
            Ok(Ok(outcomes)) => return outcomes,
            Ok(Err(err)) => err,
            Err(payload) => SheetError::Unexpected(panic_message(payload)),
        };

        warn!(error = %err, "Image could not be processed");
        vec![image_failure(&upload.filename, &err)]
    }

    /// Split an image into cards and decode each one. Returns one outcome
    /// per card, numbered from 1.
    pub fn process_image(&self, upload_index: usize, filename: &str, img: &RawImage) -> Vec<ProcessingOutcome> {
        let folder = DebugConfig::folder_name(upload_index, filename);
        self.dump(&folder, "input", || DynamicImage::ImageRgb8(img.clone()));

        let cards = self.splitter.split(img);
        info!(cards = cards.len(), width = img.width(), height = img.height(), "Image split");

        cards
            .iter()
            .zip(1usize..)
            .map(|(card, card_index)| {
                let outcome = match self.process_card(&folder, card_index, card) {
                    Ok(sheet) => {
                        info!(card_index, questions = sheet.answers.len(), "Card decoded");
                        CardOutcome::Decoded(sheet)
                    }
                    Err(err) => {
                        warn!(card_index, error = %err, "Card could not be decoded");
                        CardOutcome::Failed(Failure {
                            kind: err.kind(),
                            error: err.to_string(),
                        })
                    }
                };

                ProcessingOutcome {
                    filename: filename.to_string(),
                    card_index: Some(card_index),
                    outcome,
                }
            })
            .collect()
    }

    /// Rectify and decode a single card. Debug images go under `folder`.
    pub fn process_card(&self, folder: &str, card_index: usize, card: &RawImage) -> Result<SheetResult, SheetError> {
        self.dump(folder, &format!("card{}_0_split", card_index), || {
            DynamicImage::ImageRgb8(card.clone())
        });

        let rectified = self.rectifier.rectify(card)?;
        self.dump(folder, &format!("card{}_1_rectified", card_index), || {
            DynamicImage::ImageLuma8(rectified.image.clone())
        });
        self.dump(folder, &format!("card{}_2_binary", card_index), || {
            DynamicImage::ImageLuma8(self.decoder.binarize(&rectified.image))
        });

        Ok(self.decoder.decode(&rectified.image))
    }

    fn dump(&self, folder: &str, name: &str, image: impl FnOnce() -> DynamicImage) {
        if let Some(debug_config) = &self.debug {
            if let Err(e) = debug_config.save(folder, name, &image()) {
                warn!(error = %e, "Debug output skipped");
            }
        }
    }
}

/// Decode raw upload bytes into a 3-channel image
pub fn decode_image(bytes: &[u8]) -> Result<RawImage, SheetError> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

fn image_failure(filename: &str, err: &SheetError) -> ProcessingOutcome {
    ProcessingOutcome {
        filename: filename.to_string(),
        card_index: None,
        outcome: CardOutcome::Failed(Failure {
            kind: err.kind(),
            error: err.to_string(),
        }),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
