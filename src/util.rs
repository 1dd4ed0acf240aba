use std::path::Path;
use std::process::Command;

use heck::ToSnakeCase;
use thiserror::Error;

/// Converts a shader file name like "some-shader.vs.hlsl" into an
/// identifier like "some_shader_vs".
pub fn filename_to_identifier(path: &Path) -> String {
    let base = path
        .file_name()
        .and_then(|os_str| os_str.to_str())
        .unwrap_or_default();
    let stem = base.rsplit_once('.').map(|(stem, _ext)| stem).unwrap_or(base);
    stem.to_snake_case()
}

/// Prefixes every non-blank line with the given indent.
pub fn indent_lines(text: &str, indent: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Error)]
pub enum CommandFailure {
    #[error("missing required command: {program}")]
    NotFound { program: String },

    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("process {program} exited with code {code:?}\noutput was: {output}")]
    Status {
        program: String,
        code: Option<i32>,
        output: String,
    },
}

/// Runs a command to completion, returning its combined stdout/stderr.
/// A spawn failure and a non-zero exit are distinct failure kinds so
/// callers can map them to their own error variants.
pub fn run_captured(cmd: &mut Command) -> Result<String, CommandFailure> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    log::info!("spawning {}", display_command(cmd));

    let output = cmd.output().map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => CommandFailure::NotFound {
            program: program.clone(),
        },
        _ => CommandFailure::Spawn {
            program: program.clone(),
            message: err.to_string(),
        },
    })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        Ok(combined)
    } else {
        Err(CommandFailure::Status {
            program,
            code: output.status.code(),
            output: combined,
        })
    }
}

fn display_command(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}
