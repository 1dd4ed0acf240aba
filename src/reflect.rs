use std::path::{Path, PathBuf};
use std::process::Command;

use crate::emit;
use crate::error::GenError;
use crate::harness;
use crate::type_graph::TypeRegistry;
use crate::util;

pub mod json;

use json::ReflectionNode;

pub const REFLECTOR_TOOL_NAME: &str = "hlsl-shader-reflector";

/// Overrides tool resolution with an explicit binary path.
pub const REFLECTOR_ENV_OVERRIDE: &str = "HLSL_SHADER_REFLECTOR";

/// One shader's validated generation output.
#[derive(Debug)]
pub struct ReflectedShader {
    pub input_path: PathBuf,
    pub profile: String,
    pub identifier: String,
    /// struct declarations in safe order, already layout-checked
    pub declarations: String,
}

/// Reflects, generates, and validates one shader file. Returns None for
/// files whose name doesn't carry a shader stage.
pub fn reflect_shader(
    input_path: &Path,
    shader_model: &str,
) -> Result<Option<ReflectedShader>, GenError> {
    let Some(profile) = profile_for_path(input_path, shader_model) else {
        return Ok(None);
    };

    let identifier = util::filename_to_identifier(input_path);
    let reflection = run_reflector(input_path, &profile)?;
    let registry = TypeRegistry::from_reflection(&reflection)?;

    let declarations = emit::render_declarations(&registry);
    let checks = emit::render_checks(&registry);
    harness::check_shader_layout(input_path, &declarations, &checks)?;

    Ok(Some(ReflectedShader {
        input_path: input_path.to_path_buf(),
        profile,
        identifier,
        declarations,
    }))
}

/// Derives a profile string like "vs_5_0" from the 'name.vs.hlsl' file
/// naming convention; names without a stage part yield None.
pub fn profile_for_path(path: &Path, shader_model: &str) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let parts: Vec<&str> = file_name.split('.').collect();

    if parts.len() < 3 || *parts.last()? != "hlsl" {
        return None;
    }

    let stage = parts[parts.len() - 2];
    let version = shader_model.replace('.', "_");

    Some(format!("{stage}_{version}"))
}

fn run_reflector(input_path: &Path, profile: &str) -> Result<Vec<ReflectionNode>, GenError> {
    let reflector = resolve_reflector()?;

    let work_dir = tempfile::tempdir()?;
    let json_path = work_dir.path().join("reflection.json");

    let mut cmd = Command::new(&reflector);
    cmd.arg("-i")
        .arg(input_path)
        .arg("-o")
        .arg(&json_path)
        .arg("-p")
        .arg(profile);

    let reflection_tool_error = |message: String| GenError::ReflectionTool {
        path: input_path.to_path_buf(),
        message,
    };

    util::run_captured(&mut cmd).map_err(|failure| reflection_tool_error(failure.to_string()))?;

    let raw = std::fs::read_to_string(&json_path)
        .map_err(|err| reflection_tool_error(format!("no reflection output: {err}")))?;
    serde_json::from_str(&raw)
        .map_err(|err| reflection_tool_error(format!("unparseable reflection output: {err}")))
}

/// Locates the reflector binary: explicit env override, then the Vulkan
/// SDK bin directory, then PATH.
pub fn resolve_reflector() -> Result<PathBuf, GenError> {
    if let Ok(overridden) = std::env::var(REFLECTOR_ENV_OVERRIDE) {
        if !overridden.is_empty() {
            return Ok(PathBuf::from(overridden));
        }
    }

    let bin_name = if cfg!(windows) {
        format!("{REFLECTOR_TOOL_NAME}.exe")
    } else {
        REFLECTOR_TOOL_NAME.to_string()
    };

    if let Ok(sdk) = std::env::var("VULKAN_SDK") {
        let vulkan_bin = Path::new(&sdk).join("Bin");
        if vulkan_bin.exists() {
            let candidate = vulkan_bin.join(&bin_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        } else {
            log::warn!("VULKAN_SDK environment variable is set but contains no Bin path");
        }
    }

    find_in_path(&bin_name).ok_or(GenError::ToolNotFound {
        name: REFLECTOR_TOOL_NAME.to_string(),
    })
}

fn find_in_path(bin_name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(bin_name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_from_stage_and_version() {
        let path = Path::new("shaders/some-shader.vs.hlsl");
        assert_eq!(profile_for_path(path, "5.0"), Some("vs_5_0".to_string()));

        let path = Path::new("post.ps.hlsl");
        assert_eq!(profile_for_path(path, "6.6"), Some("ps_6_6".to_string()));
    }

    #[test]
    fn files_without_a_stage_are_skipped() {
        assert_eq!(profile_for_path(Path::new("common.hlsl"), "5.0"), None);
        assert_eq!(profile_for_path(Path::new("readme.md"), "5.0"), None);
        assert_eq!(profile_for_path(Path::new("shader.vs.glsl"), "5.0"), None);
    }
}
