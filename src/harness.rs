use std::path::{Path, PathBuf};
use std::process::Command;

use askama::Template;

use crate::emit;
use crate::error::GenError;
use crate::util::{self, CommandFailure};

#[derive(Template)]
#[template(path = "check_program.cpp.askama", escape = "none")]
struct CheckProgram<'a> {
    structs: &'a str,
    checks: &'a str,
    file_name: &'a str,
}

/// Assembles the self-checking program for one shader: the type prelude,
/// the generated structs, and a main that evaluates every layout
/// assertion, printing actual vs expected for each failure.
pub fn check_program_source(
    declarations: &str,
    checks: &str,
    shader_path: &Path,
) -> Result<String, GenError> {
    let file_name = shader_path.to_string_lossy().replace('\\', "/");
    let structs = emit::embed_dx_types(declarations)?;

    let source = CheckProgram {
        structs: &structs,
        checks: &util::indent_lines(checks, "  "),
        file_name: &file_name,
    }
    .render()?;

    Ok(source)
}

/// Builds and runs the layout check program for one shader. The
/// program's exit status is the pass/fail oracle for the generated
/// declarations; no layout math happens on this side.
pub fn check_shader_layout(
    shader_path: &Path,
    declarations: &str,
    checks: &str,
) -> Result<(), GenError> {
    let source = check_program_source(declarations, checks, shader_path)?;
    let output = compile_and_run(&source, shader_path)?;

    log::debug!("{}", output.trim_end());

    Ok(())
}

fn compile_and_run(source: &str, shader_path: &Path) -> Result<String, GenError> {
    // everything lives in one scope-owned dir, removed on every exit path
    let work_dir = tempfile::tempdir()?;
    let cpp_path = work_dir.path().join("layout_check.cpp");
    let exe_path = work_dir
        .path()
        .join(format!("layout_check{}", std::env::consts::EXE_SUFFIX));
    std::fs::write(&cpp_path, source)?;

    let compiler = resolve_compiler();
    let mut compile = Command::new(&compiler);
    if is_msvc(&compiler) {
        let obj_path = work_dir.path().join("layout_check.obj");
        compile
            .arg("/nologo")
            .arg(format!("/Fe:{}", exe_path.display()))
            .arg(format!("/Fo:{}", obj_path.display()))
            .arg(&cpp_path);
    } else {
        compile.arg(&cpp_path).arg("-o").arg(&exe_path);
    }

    let compile_log = util::run_captured(&mut compile).map_err(|failure| GenError::BuildTool {
        message: failure.to_string(),
    })?;
    if !compile_log.trim().is_empty() {
        log::debug!("compiler output: {}", compile_log.trim_end());
    }

    match util::run_captured(&mut Command::new(&exe_path)) {
        Ok(output) => Ok(output),
        Err(failure @ (CommandFailure::NotFound { .. } | CommandFailure::Spawn { .. })) => {
            Err(GenError::BuildTool {
                message: failure.to_string(),
            })
        }
        Err(CommandFailure::Status { output, .. }) => Err(GenError::LayoutMismatch {
            path: shader_path.to_path_buf(),
            output,
        }),
    }
}

fn resolve_compiler() -> PathBuf {
    if let Ok(cxx) = std::env::var("CXX") {
        if !cxx.is_empty() {
            return PathBuf::from(cxx);
        }
    }

    if cfg!(windows) {
        PathBuf::from("cl")
    } else {
        PathBuf::from("c++")
    }
}

fn is_msvc(compiler: &Path) -> bool {
    compiler
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem.eq_ignore_ascii_case("cl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_program_contains_structs_and_checks() {
        let declarations = "struct CB0 {\n  float3 pos;\n};\n";
        let checks = "check_eq(sizeof(CB0), 12);\ncheck_eq(offsetof(CB0, pos), 0);";
        let source =
            check_program_source(declarations, checks, Path::new("shaders/tri.vs.hlsl")).unwrap();

        assert!(source.contains("#include <stddef.h>"));
        assert!(source.contains("struct CB0 {"));
        assert!(source.contains("#define check_eq(a, b)"));
        assert!(source.contains("  check_eq(sizeof(CB0), 12);"));
        assert!(source.contains("  check_eq(offsetof(CB0, pos), 0);"));
        assert!(source.contains(r#"printf("checks for shaders/tri.vs.hlsl done!\n");"#));
        assert!(source.contains("return 1;"));
    }

    #[test]
    fn diagnostics_are_tagged_with_forward_slash_paths() {
        let source =
            check_program_source("", "", Path::new(r"shaders\deep\tri.vs.hlsl")).unwrap();

        assert!(source.contains("shaders/deep/tri.vs.hlsl"));
        assert!(!source.contains(r"shaders\deep"));
    }

    #[test]
    fn msvc_is_detected_by_file_stem() {
        assert!(is_msvc(Path::new("cl")));
        assert!(is_msvc(Path::new("cl.exe")));
        assert!(!is_msvc(Path::new("c++")));
        assert!(!is_msvc(Path::new("clang++")));
    }
}
