//! Code for writing metadata to file
use anyhow::Result;
use chrono::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
pub const METADATA_FILE_NAME: &str = "metadata.toml";

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    program: ProgramMetadata<'a>,
}

/// Information about the analysis run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the request which was analysed
    request_path: &'a Path,
    /// The date and time on which the run started
    datetime: String,
    /// Seed for the random number generator, if one was fixed
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl<'a> RunMetadata<'a> {
    fn new(request_path: &'a Path, seed: Option<u64>) -> Self {
        let dt = Local::now();
        Self {
            request_path,
            datetime: dt.to_rfc2822(),
            seed,
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            is_debug: cfg!(debug_assertions),
        }
    }
}

/// Write metadata to the specified output path in TOML format
pub fn write_metadata(output_path: &Path, request_path: &Path, seed: Option<u64>) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(request_path, seed),
        program: ProgramMetadata::default(),
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_metadata() {
        let dir = tempdir().unwrap();
        write_metadata(dir.path(), Path::new("requests/cafe"), Some(7)).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let metadata: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(metadata["run"]["seed"].as_integer(), Some(7));
        assert_eq!(metadata["program"]["name"].as_str(), Some("siteval"));
    }
}
