//! # io
//!
//! Reading and writing operations.

use anyhow::Context;
use fs2::FileExt;
use log::warn;
use ndarray::Array2;

use polars::io::ipc::{IpcReader, IpcWriter};
use polars::lazy::dsl::{col, cols, Expr};
use polars::prelude::{DataFrame, IntoLazy, LazyFrame, PolarsNumericType, SerReader, SerWriter};

use std::fs;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::errors::DataError;

/// Read a feather file and load into a `polars` dataframe.
pub fn read_feather(path: &Path, memory_mapped: bool) -> Result<DataFrame, DataError> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open feather file: {}.", path.display()))?;
    let frame = IpcReader::new(file)
        .memory_mapped(memory_mapped)
        .finish()
        .with_context(|| format!("Malformed feather file: {}.", path.display()))?;
    Ok(frame)
}

/// Write a dataframe to a feather file.
pub fn write_feather(path: &Path, frame: &mut DataFrame) -> Result<(), DataError> {
    let mut file = File::create(path)
        .with_context(|| format!("Cannot create feather file: {}.", path.display()))?;
    IpcWriter::new(&mut file).finish(frame)?;
    Ok(())
}

/// Read a feather payload from an in-memory buffer.
pub fn read_feather_bytes(bytes: Vec<u8>) -> Result<DataFrame, DataError> {
    let frame = IpcReader::new(Cursor::new(bytes))
        .memory_mapped(false)
        .finish()?;
    Ok(frame)
}

/// Serialize a dataframe into an in-memory feather payload.
pub fn write_feather_bytes(frame: &mut DataFrame) -> Result<Vec<u8>, DataError> {
    let mut cursor = Cursor::new(Vec::new());
    IpcWriter::new(&mut cursor).finish(frame)?;
    Ok(cursor.into_inner())
}

/// Read a dataframe, but filter for the specified timestamp.
pub fn read_timestamped_feather(
    path: &Path,
    columns: &Vec<&str>,
    timestamp_ns: u64,
    memory_mapped: bool,
) -> Result<LazyFrame, DataError> {
    Ok(read_feather(path, memory_mapped)?
        .lazy()
        .filter(col("timestamp_ns").eq(timestamp_ns))
        .select(&[cols(columns)]))
}

/// Convert selected dataframe columns to an `ndarray`.
pub fn ndarray_from_frame<N>(frame: &DataFrame, exprs: Expr) -> Result<Array2<N::Native>, DataError>
where
    N: PolarsNumericType,
{
    let array = frame
        .clone()
        .lazy()
        .select(&[exprs])
        .collect()?
        .to_ndarray::<N>()?
        .as_standard_layout()
        .to_owned();
    Ok(array)
}

/// Convert selected dataframe columns to an `ndarray`, filtering rows first.
pub fn ndarray_from_frame_filtered<N>(
    frame: &DataFrame,
    select_exprs: Expr,
    filter_exprs: Expr,
) -> Result<Array2<N::Native>, DataError>
where
    N: PolarsNumericType,
{
    let array = frame
        .clone()
        .lazy()
        .filter(filter_exprs)
        .select(&[select_exprs])
        .collect()?
        .to_ndarray::<N>()?
        .as_standard_layout()
        .to_owned();
    Ok(array)
}

/// Load a frame through an on-disk cache entry, populating it if needed.
///
/// Lock-then-recheck: an exclusive lock on a sibling `.lock` file guards the
/// existence check and the write, so concurrent processes populate each cache
/// entry exactly once. An unreadable cache entry is re-derived from source
/// and overwritten rather than surfaced. The lock is released when the guard
/// drops, on every exit path.
pub fn cached_frame<F>(
    cache_path: &Path,
    memory_mapped: bool,
    produce: F,
) -> Result<DataFrame, DataError>
where
    F: FnOnce() -> Result<DataFrame, DataError>,
{
    if let Some(parent) = cache_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let lock_file = File::create(lock_file_path(cache_path))?;
    lock_file.lock_exclusive()?;
    let _guard = lock_file;

    if cache_path.is_file() {
        match read_feather(cache_path, memory_mapped) {
            Ok(frame) => return Ok(frame),
            Err(error) => {
                warn!(
                    "Discarding unreadable cache entry {}: {error}",
                    cache_path.display()
                );
            }
        }
    }
    let mut frame = produce()?;
    write_feather(cache_path, &mut frame)?;
    Ok(frame)
}

/// Sibling lock-file path for a cache entry.
fn lock_file_path(cache_path: &Path) -> PathBuf {
    let mut os_string = cache_path.as_os_str().to_owned();
    os_string.push(".lock");
    PathBuf::from(os_string)
}

#[cfg(test)]
mod tests {
    use super::{cached_frame, read_feather, write_feather};
    use polars::df;
    use polars::prelude::NamedFrom;
    use std::fs;

    #[test]
    fn test_feather_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.feather");
        let mut frame = df!("x" => vec![1.0_f32, 2.0], "keep" => vec![true, false]).unwrap();
        write_feather(&path, &mut frame).unwrap();
        let round_trip = read_feather(&path, false).unwrap();
        assert!(frame.frame_equal(&round_trip));
    }

    #[test]
    fn test_cached_frame_populates_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache").join("entry.feather");
        let frame = df!("a" => vec![1_u64, 2, 3]).unwrap();

        let produced = cached_frame(&cache_path, false, || Ok(frame.clone())).unwrap();
        assert!(produced.frame_equal(&frame));
        assert!(cache_path.is_file());

        // Second call must read the cache, not the producer.
        let cached = cached_frame(&cache_path, false, || {
            panic!("producer must not run on a warm cache")
        })
        .unwrap();
        assert!(cached.frame_equal(&frame));
    }

    #[test]
    fn test_cached_frame_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("entry.feather");
        fs::write(&cache_path, b"not a feather file").unwrap();

        let frame = df!("a" => vec![7_i64]).unwrap();
        let healed = cached_frame(&cache_path, false, || Ok(frame.clone())).unwrap();
        assert!(healed.frame_equal(&frame));

        // The corrupt entry was overwritten with a readable one.
        let reread = read_feather(&cache_path, false).unwrap();
        assert!(reread.frame_equal(&frame));
    }
}
