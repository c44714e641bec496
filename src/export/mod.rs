//! Export orchestration.
//!
//! # Overview
//!
//! An [`ExportSession`] runs the pipeline for one [`ExportConfig`]:
//!
//! 1. [`ExportSession::begin`] builds the node hierarchy and resolves rest
//!    poses (once per export).
//! 2. [`ExportSession::bake_all`] bakes the enabled sequences one at a time
//!    and folds each into the [`SequenceAssembler`].
//! 3. [`ExportSession::finish`] hands the result to a [`ShapeWriter`].
//!
//! Baking is atomic per sequence only. When a sequence fails, it is
//! discarded, sequences baked before it are kept, and the session stays
//! positioned on the failing sequence. The caller can fix the scene and call
//! [`bake_all`](ExportSession::bake_all) again to retry it, or
//! [`skip_current`](ExportSession::skip_current) to move on.
//!
//! ```rust,ignore
//! let mut session = ExportSession::begin(&config, &host)?;
//! session.bake_all(&mut host)?;
//! let log = session.finish(&mut writer)?;
//! ```

mod cancel;
mod writer;

pub use cancel::CancelToken;
pub use writer::{Shape, ShapeWriter, WriterError};

use crate::animation::{BakeOutcome, SequenceAssembler, SequenceBaker, SequenceSlot};
use crate::config::{ExportConfig, SequenceConfig};
use crate::diagnostics::{Diagnostic, ExportLog};
use crate::errors::{BakeError, Result};
use crate::scene::{
    NodeHierarchy, NodeHierarchyBuilder, RestPoseResolver, SceneQuery, TimeSource,
};

/// State of one export in progress.
#[derive(Debug)]
pub struct ExportSession<'c> {
    config: &'c ExportConfig,
    hierarchy: NodeHierarchy,
    assembler: SequenceAssembler,
    log: ExportLog,
    cancel: CancelToken,
    /// Index into the enabled sequences of the next one to bake.
    next: usize,
}

impl<'c> ExportSession<'c> {
    /// Flattens the scene and resolves rest poses.
    pub fn begin<S: SceneQuery>(config: &'c ExportConfig, scene: &S) -> Result<Self> {
        let mut log = ExportLog::new();

        let mut hierarchy = NodeHierarchyBuilder::new(scene)
            .with_exclusion(config.exclusion())
            .with_catch_root_name(config.catch_root_name.clone())
            .build(&mut log);
        RestPoseResolver::new(scene)
            .with_export_scale(config.export_scale)
            .resolve(&mut hierarchy, &mut log)?;

        log::info!(
            "Export prepared: {} nodes, {} armatures",
            hierarchy.len(),
            hierarchy.armatures().len()
        );

        Ok(Self {
            config,
            hierarchy,
            assembler: SequenceAssembler::new(),
            log,
            cancel: CancelToken::new(),
            next: 0,
        })
    }

    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[must_use]
    pub fn hierarchy(&self) -> &NodeHierarchy {
        &self.hierarchy
    }

    #[must_use]
    pub fn assembler(&self) -> &SequenceAssembler {
        &self.assembler
    }

    #[must_use]
    pub fn log(&self) -> &ExportLog {
        &self.log
    }

    /// The sequence [`bake_all`](Self::bake_all) will bake next.
    #[must_use]
    pub fn current(&self) -> Option<&'c SequenceConfig> {
        self.config.enabled_sequences().nth(self.next)
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.current().is_none()
    }

    /// Gives up on the current sequence.
    pub fn skip_current(&mut self) {
        if let Some(sequence) = self.current() {
            log::info!("Skipping sequence '{}'", sequence.name);
            self.next += 1;
        }
    }

    /// Bakes the remaining sequences in order.
    ///
    /// Stops at the first failing sequence, whose partial output is
    /// discarded. Empty sequences are skipped with a warning.
    pub fn bake_all<H>(&mut self, host: &mut H) -> Result<()>
    where
        H: SceneQuery + TimeSource,
    {
        let baker = SequenceBaker::new(&self.hierarchy)
            .with_export_scale(self.config.export_scale)
            .with_cancel_token(&self.cancel);

        while let Some(sequence) = self.config.enabled_sequences().nth(self.next) {
            match baker.bake(host, sequence, &mut self.log) {
                Ok(BakeOutcome::Baked(baked)) => match self.assembler.add(baked) {
                    SequenceSlot::Shared(index) => {
                        log::info!("Baked sequence '{}' (shared #{index})", sequence.name);
                    }
                    SequenceSlot::Standalone(index) => {
                        log::info!("Baked sequence '{}' (standalone #{index})", sequence.name);
                    }
                },
                Ok(BakeOutcome::Empty) => {}
                Err(error) => {
                    if !error.is_cancelled() {
                        self.log.warn(Diagnostic::SequenceFailed {
                            sequence: sequence.name.clone(),
                            reason: error.to_string(),
                        });
                    }
                    return Err(error);
                }
            }
            self.next += 1;
        }
        Ok(())
    }

    /// Writes standalone sequences, then the shape.
    ///
    /// A writer failure is fatal: the writer is asked to discard its output
    /// and the error is returned.
    pub fn finish<W: ShapeWriter>(self, writer: &mut W) -> Result<ExportLog> {
        let nodes = self.hierarchy.nodes();
        let result = self
            .assembler
            .standalone_sequences()
            .iter()
            .try_for_each(|sequence| writer.write_standalone(nodes, sequence))
            .and_then(|()| {
                writer.write_shape(&Shape {
                    nodes,
                    sequences: self.assembler.sequences(),
                    tracks: self.assembler.tracks(),
                })
            });

        match result {
            Ok(()) => {
                log::info!(
                    "Export finished: {} sequences, {} standalone, {} warnings",
                    self.assembler.sequences().len(),
                    self.assembler.standalone_sequences().len(),
                    self.log.len()
                );
                Ok(self.log)
            }
            Err(error) => {
                log::error!("Shape writer failed: {error}");
                writer.discard();
                Err(BakeError::Writer(error))
            }
        }
    }
}

/// Runs a whole export, stopping at the first error.
pub fn export<H, W>(config: &ExportConfig, host: &mut H, writer: &mut W) -> Result<ExportLog>
where
    H: SceneQuery + TimeSource,
    W: ShapeWriter,
{
    let mut session = ExportSession::begin(config, &*host)?;
    session.bake_all(host)?;
    session.finish(writer)
}
