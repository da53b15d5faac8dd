pub mod config;
pub mod document;
pub mod electrode;
pub mod filename;
pub mod files;
pub mod header;
mod helper;
pub mod ntrode;
pub mod probe;
pub mod tasks;
pub mod types;
pub mod xml;

use std::path::{Path, PathBuf};

// Re-export types
pub use config::{DioGroup, SessionConfig, SubjectInfo};
pub use helper::{MetadataHelper, HEADER_EXTENSION};
pub use tasks::TaskCodes;
pub use types::*;

/// Collects the metadata of a session and writes the draft YAML into
/// `out_dir`, returning the helper (for its diagnostics) and the draft path.
///
/// # Examples
///
/// ```no_run
/// use rec_header_draft::{draft, DioGroup, SessionConfig};
///
/// let config = SessionConfig::new("/data", "Jaq", "20190826")
///     .with_dio(DioGroup::new("Din", &[(0, "poke_left"), (1, "poke_right")]));
/// match draft(config, "yaml/") {
///     Ok((helper, path)) => {
///         println!("wrote {}", path.display());
///         for d in helper.diagnostics() {
///             println!("check: {}", d);
///         }
///     }
///     Err(e) => println!("Error drafting metadata: {}", e),
/// }
/// ```
pub fn draft<P: AsRef<Path>>(config: SessionConfig, out_dir: P) -> Result<(MetadataHelper, PathBuf)> {
    let mut helper = MetadataHelper::new(config)?;
    let path = helper.write_metadata_draft(out_dir)?;
    Ok((helper, path))
}
