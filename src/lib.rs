//! filesplit - Parallel file splitter with integrity verification
//!
//! Splits one large file into ordered part files using a fixed pool of
//! workers, each copying its own contiguous byte range. Parts are named by
//! their BLAKE3 digest, the split can be verified against a whole-file
//! digest, and a JSON manifest records how to put the file back together.

pub mod config;
pub mod error;
pub mod manifest;
pub mod split;

pub use config::{SplitConfig, SplitJob};
pub use error::{Error, Result, Stage};
pub use manifest::{Manifest, ManifestPart};
pub use split::{Part, SplitOutcome, Splitter};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{SplitConfig, SplitJob};
    pub use crate::error::{Error, Result};
    pub use crate::manifest::Manifest;
    pub use crate::split::{Part, Splitter};
}
