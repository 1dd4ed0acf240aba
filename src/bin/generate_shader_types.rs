use std::path::PathBuf;

use anyhow::bail;

use hlsl_type_gen::build_tasks::{self, Config};

pub fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [shader_model, namespace, src_dir, out_dir] = args.as_slice() else {
        bail!("usage: generate_shader_types <shader-model> <namespace> <src-dir> <out-dir>");
    };

    let config = Config {
        shader_model: shader_model.clone(),
        namespace: namespace.clone(),
        shaders_source_dir: PathBuf::from(src_dir),
        out_dir: PathBuf::from(out_dir),
    };

    build_tasks::write_shader_types(config)
}
