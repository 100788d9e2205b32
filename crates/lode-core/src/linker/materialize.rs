use std::path::PathBuf;

use rayon::prelude::*;

use lode_error::{LodeError, Result};
use lode_store::link_tree;

/// One package directory to mirror into the module tree.
pub struct LinkTarget {
    pub label: String,
    pub src: PathBuf,
    pub dest: PathBuf,
}

/// Hardlink every target in parallel. Store entries are immutable, so
/// concurrent linking from one source is safe.
pub fn materialize_all(targets: &[LinkTarget]) -> Result<usize> {
    let results: Vec<Result<()>> = targets
        .par_iter()
        .map(|target| {
            link_tree(&target.src, &target.dest)
                .map_err(|err| LodeError::LinkError(target.label.clone(), err.to_string()))
        })
        .collect();

    for result in results {
        result?;
    }
    Ok(targets.len())
}
