//! Bijective directory mapping
//!
//! Every regular file under an input tree becomes exactly one file under an
//! output tree. The caller supplies the path rewrite and the byte transform;
//! the walk, directory creation and writes happen here.

use crate::error::StageError;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Path rewrite that keeps the relative path unchanged
pub fn identity_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}

/// Map every regular file under `input_dir` into `output_dir`
///
/// Files are visited in file-name order, one at a time. `path_map` receives
/// the path relative to `input_dir` and returns the path relative to
/// `output_dir`. Returns the number of files written; an empty input tree is
/// not an error.
pub async fn bijective_map<P, T, Fut>(
    input_dir: &Path,
    output_dir: &Path,
    path_map: P,
    mut transform: T,
) -> Result<usize, StageError>
where
    P: Fn(&Path) -> PathBuf,
    T: FnMut(Vec<u8>) -> Fut,
    Fut: Future<Output = Result<Vec<u8>, StageError>>,
{
    let mut mapped = 0;

    for entry in WalkDir::new(input_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let source = entry.path();
        let relative = source.strip_prefix(input_dir).unwrap_or(source);
        let target = output_dir.join(path_map(relative));

        let input = tokio::fs::read(source).await.map_err(StageError::io(source))?;
        let output = transform(input).await?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StageError::io(parent))?;
        }
        tokio::fs::write(&target, &output)
            .await
            .map_err(StageError::io(&target))?;

        debug!("Mapped {} -> {} ({} bytes)", source.display(), target.display(), output.len());
        mapped += 1;
    }

    Ok(mapped)
}
