use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use anyhow::Context;

use crate::emit;
use crate::error::GenError;
use crate::reflect::{self, ReflectedShader};

pub struct Config {
    /// shader model version like "5.0"
    pub shader_model: String,
    /// the C++ namespace wrapping the generated declarations
    pub namespace: String,
    /// the directory to read hlsl files from
    pub shaders_source_dir: PathBuf,
    /// the directory to write the generated header into
    pub out_dir: PathBuf,
}

pub const TYPES_FILE_NAME: &str = "shader-types.hpp";

const SHADER_FILE_SUFFIX: &str = ".hlsl";

/// Reflects and validates every shader in the source directory, then
/// writes the merged header. All-or-nothing: any failing shader aborts
/// the run before anything is written.
pub fn write_shader_types(config: Config) -> anyhow::Result<()> {
    let shader_paths = shader_files_in(&config.shaders_source_dir).with_context(|| {
        format!(
            "reading shader dir {}",
            config.shaders_source_dir.display()
        )
    })?;

    let reflected = reflect_all(&shader_paths, &config.shader_model)?;

    if reflected.is_empty() {
        log::warn!(
            "no reflectable shaders found in {}",
            config.shaders_source_dir.display()
        );
    }

    let blocks: Vec<String> = reflected
        .iter()
        .map(|shader| shader.declarations.clone())
        .collect();
    let types_file = emit::render_types_file(&config.namespace, &blocks)?;

    std::fs::create_dir_all(&config.out_dir)?;
    let out_path = config.out_dir.join(TYPES_FILE_NAME);
    std::fs::write(&out_path, types_file)
        .with_context(|| format!("writing {}", out_path.display()))?;

    for shader in &reflected {
        log::info!("validated {} ({})", shader.identifier, shader.profile);
    }

    Ok(())
}

fn shader_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut shader_paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry_res| entry_res.ok())
        .map(|dir_entry| dir_entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(SHADER_FILE_SUFFIX))
        })
        .collect();

    // directory order isn't stable; the merged header should be
    shader_paths.sort();

    Ok(shader_paths)
}

/// Runs every shader's unit of work on a pool bounded by the processor
/// count. Results keep the input file order; each unit owns its registry
/// and temp files, so the workers share nothing.
fn reflect_all(
    shader_paths: &[PathBuf],
    shader_model: &str,
) -> anyhow::Result<Vec<ReflectedShader>> {
    let worker_count = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(shader_paths.len().max(1));

    let next_job = AtomicUsize::new(0);
    let (sender, receiver) = mpsc::channel();

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let sender = sender.clone();
            let next_job = &next_job;
            scope.spawn(move || {
                loop {
                    let index = next_job.fetch_add(1, Ordering::Relaxed);
                    let Some(path) = shader_paths.get(index) else {
                        break;
                    };

                    let result = reflect::reflect_shader(path, shader_model);
                    if sender.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(sender);

    let mut slots: Vec<Option<Result<Option<ReflectedShader>, GenError>>> =
        (0..shader_paths.len()).map(|_| None).collect();
    for (index, result) in receiver {
        slots[index] = Some(result);
    }

    let mut reflected = Vec::with_capacity(shader_paths.len());
    for (path, slot) in shader_paths.iter().zip(slots) {
        let result = slot.expect("worker pool skipped a shader");
        match result.with_context(|| format!("shader {}", path.display()))? {
            Some(shader) => reflected.push(shader),
            None => log::warn!(
                "skipping {} (no shader stage in file name)",
                path.display()
            ),
        }
    }

    Ok(reflected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_filters_and_sorts_shader_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zz.vs.hlsl", "aa.ps.hlsl", "notes.txt", "mid.cs.hlsl"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let found = shader_files_in(dir.path()).unwrap();

        let names: Vec<&str> = found
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .collect();
        assert_eq!(names, vec!["aa.ps.hlsl", "mid.cs.hlsl", "zz.vs.hlsl"]);
    }

    #[test]
    fn empty_batch_reflects_to_nothing() {
        let reflected = reflect_all(&[], "5.0").unwrap();
        assert!(reflected.is_empty());
    }

    #[test]
    fn stageless_files_are_skipped_not_failed() {
        // never reaches the reflector: the profile gate filters it first
        let paths = vec![PathBuf::from("common.hlsl")];
        let reflected = reflect_all(&paths, "5.0").unwrap();
        assert!(reflected.is_empty());
    }
}
