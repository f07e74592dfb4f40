//! Merge engine abstraction.
//!
//! The runner knows nothing about XML. It hands the engine the parsed control
//! properties once ([`MergeEngine::configure`]) and then the ordered source
//! streams ([`Merger::merge`]), and copies whatever stream comes back into
//! the target. This allows for:
//! - The built-in [`overlay::OverlayEngine`]
//! - Fake engines in tests
//! - Bindings to external merge tools

pub mod overlay;
mod tree;

use crate::error::Result;
use crate::properties::Properties;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Factory for configured mergers.
pub trait MergeEngine: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Build a merger from control properties.
    ///
    /// Rejected directives must be reported as configuration errors.
    fn configure(&self, properties: &Properties) -> Result<Box<dyn Merger>>;
}

/// A configured merge, ready to combine sources.
pub trait Merger {
    /// Combine `sources` (in overlay order) into a single document stream.
    fn merge(&self, sources: &mut [SourceStream]) -> Result<Box<dyn Read>>;
}

/// An opened source file together with its path.
pub struct SourceStream {
    path: PathBuf,
    reader: Box<dyn Read + Send>,
}

impl SourceStream {
    /// Pair a reader with the path it was opened from.
    pub fn new(path: impl Into<PathBuf>, reader: impl Read + Send + 'static) -> Self {
        Self {
            path: path.into(),
            reader: Box::new(reader),
        }
    }

    /// The file this stream reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole stream into memory.
    pub fn read_to_vec(&mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for SourceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceStream")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Get the default engine.
pub fn default_engine() -> overlay::OverlayEngine {
    overlay::OverlayEngine
}
