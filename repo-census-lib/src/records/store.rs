//! Reading and writing record files.

use super::record::RepoRecord;
use crate::Result;
use ohno::IntoAppError;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const LOG_TARGET: &str = "     store";

/// Load a record from a JSON file.
pub fn load_record(path: impl AsRef<Path>) -> Result<RepoRecord> {
    let path = path.as_ref();

    let file = File::open(path).into_app_err_with(|| format!("unable to open record '{}'", path.display()))?;
    let record = serde_json::from_reader(BufReader::new(file))
        .into_app_err_with(|| format!("unable to parse record '{}'", path.display()))?;

    Ok(record)
}

/// Save a record, replacing the file in a single rename.
///
/// The contents are written to a sibling temp file first so an interrupted
/// write never leaves a truncated record behind.
pub fn save_record(path: impl AsRef<Path>, record: &RepoRecord) -> Result<()> {
    let path = path.as_ref();

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let file = File::create(tmp_path).into_app_err_with(|| format!("unable to create '{}'", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer(&mut writer, record).into_app_err_with(|| format!("unable to write record '{}'", path.display()))?;
    writer
        .flush()
        .into_app_err_with(|| format!("unable to flush record '{}'", path.display()))?;
    drop(writer);

    fs::rename(tmp_path, path).into_app_err_with(|| format!("unable to replace record '{}'", path.display()))?;

    log::debug!(target: LOG_TARGET, "Saved record '{}'", path.display());
    Ok(())
}

/// Write raw contents to `dir/name`, creating `dir` as needed.
pub fn save_file(dir: impl AsRef<Path>, name: &str, contents: impl AsRef<[u8]>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).into_app_err_with(|| format!("unable to create directory '{}'", dir.display()))?;

    let path = dir.join(name);
    fs::write(&path, contents).into_app_err_with(|| format!("unable to write '{}'", path.display()))
}
