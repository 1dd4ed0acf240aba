use askama::Template;

use crate::type_graph::{StructRecord, TypeRegistry};
use crate::util::indent_lines;

impl StructRecord {
    /// The C++ declaration for this struct, one member per line.
    pub fn declaration(&self) -> String {
        let mut lines = Vec::with_capacity(self.members.len() + 2);
        lines.push(format!("struct {} {{", self.type_name));

        for member in &self.members {
            let array_suffix = member
                .element_count
                .map(|count| format!("[{count}]"))
                .unwrap_or_default();
            lines.push(format!(
                "  {} {}{array_suffix};",
                member.type_name, member.field_name
            ));
        }

        lines.push("};".to_string());
        lines.join("\n")
    }

    /// One check_eq line per size and offset captured during reflection;
    /// unknown values emit nothing.
    pub fn layout_checks(&self) -> String {
        let mut assertions = vec![];

        if let Some(size) = self.byte_size {
            assertions.push(format!("check_eq(sizeof({}), {size});", self.type_name));
        }

        for member in &self.members {
            if let Some(size) = member.byte_size {
                assertions.push(format!(
                    "check_eq(sizeof({}::{}), {size});",
                    self.type_name, member.field_name
                ));
            }
            if let Some(offset) = member.byte_offset {
                assertions.push(format!(
                    "check_eq(offsetof({}, {}), {offset});",
                    self.type_name, member.field_name
                ));
            }
        }

        assertions.join("\n")
    }
}

/// All of one shader's declarations, dependencies first.
pub fn render_declarations(registry: &TypeRegistry) -> String {
    registry
        .ordered()
        .iter()
        .map(|record| record.declaration() + "\n")
        .collect::<Vec<_>>()
        .join("\n")
}

/// The matching layout assertions, in declaration order.
pub fn render_checks(registry: &TypeRegistry) -> String {
    registry
        .ordered()
        .iter()
        .map(|record| record.layout_checks())
        .filter(|checks| !checks.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Template)]
#[template(path = "dx_types.hpp.askama", escape = "none")]
struct DxTypesBlock<'a> {
    body: &'a str,
}

/// Wraps generated declarations with the GPU-native type prelude. The
/// include guards keep repeated embedding from redefining the prelude.
pub fn embed_dx_types(body: &str) -> Result<String, askama::Error> {
    DxTypesBlock { body }.render()
}

#[derive(Template)]
#[template(path = "shader_types.hpp.askama", escape = "none")]
struct ShaderTypesFile<'a> {
    cpp_namespace: &'a str,
    types: String,
}

/// The merged shader-types.hpp content for all validated shaders. Each
/// block was deduplicated per shader; the merge does not deduplicate
/// across shaders.
pub fn render_types_file(
    cpp_namespace: &str,
    declaration_blocks: &[String],
) -> Result<String, askama::Error> {
    let joined = declaration_blocks.join("\n");
    let types = indent_lines(&embed_dx_types(&joined)?, "  ");

    ShaderTypesFile {
        cpp_namespace,
        types,
    }
    .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::reflect::json::ReflectionNode;

    fn build(nodes: serde_json::Value) -> TypeRegistry {
        let nodes: Vec<ReflectionNode> = serde_json::from_value(nodes).unwrap();
        TypeRegistry::from_reflection(&nodes).unwrap()
    }

    fn single_buffer() -> TypeRegistry {
        build(json!([{
            "name": "CB0",
            "nodeType": "CONSTANT_BUFFER",
            "size": 12,
            "children": [{
                "name": "pos",
                "nodeType": "VARIABLE",
                "size": 12,
                "startOffset": 0,
                "typeDesc": { "name": "float3", "class": "SCALAR", "size": 12, "offset": 0 },
            }]
        }]))
    }

    #[test]
    fn declaration_text() {
        let registry = single_buffer();
        let record = registry.get("CB0").unwrap();

        insta::assert_snapshot!(record.declaration(), @r"
        struct CB0 {
          float3 pos;
        };
        ");
    }

    #[test]
    fn layout_check_text() {
        let registry = single_buffer();
        let record = registry.get("CB0").unwrap();

        insta::assert_snapshot!(record.layout_checks(), @r"
        check_eq(sizeof(CB0), 12);
        check_eq(sizeof(CB0::pos), 12);
        check_eq(offsetof(CB0, pos), 0);
        ");
    }

    #[test]
    fn array_member_declaration() {
        let registry = build(json!([{
            "name": "CB0",
            "nodeType": "CONSTANT_BUFFER",
            "size": 48,
            "children": [{
                "name": "items",
                "nodeType": "VARIABLE",
                "size": 48,
                "startOffset": 0,
                "typeDesc": { "name": "float3", "class": "SCALAR", "size": 48, "offset": 0, "elements": 4 },
            }]
        }]));
        let record = registry.get("CB0").unwrap();

        assert!(record.declaration().contains("  float3 items[4];"));
    }

    #[test]
    fn unknown_values_emit_no_checks() {
        let registry = build(json!([{
            "name": "CB0",
            "nodeType": "CONSTANT_BUFFER",
            "children": [{
                "name": "pos",
                "nodeType": "VARIABLE",
                "typeDesc": { "name": "float3", "class": "SCALAR" },
            }]
        }]));
        let record = registry.get("CB0").unwrap();

        assert_eq!(record.layout_checks(), "");
        assert_eq!(render_checks(&registry), "");
    }

    #[test]
    fn declarations_precede_their_uses() {
        let registry = build(json!([{
            "name": "CB0",
            "nodeType": "CONSTANT_BUFFER",
            "children": [{
                "name": "sun",
                "nodeType": "VARIABLE",
                "typeDesc": { "name": "Light", "class": "STRUCT" },
                "children": [{
                    "name": "intensity",
                    "nodeType": "VARIABLE",
                    "typeDesc": { "name": "float", "class": "SCALAR", "size": 4 },
                }]
            }]
        }]));

        let declarations = render_declarations(&registry);
        let light_at = declarations.find("struct Light").unwrap();
        let buffer_at = declarations.find("struct CB0").unwrap();
        assert!(light_at < buffer_at);
    }

    #[test]
    fn prelude_is_guarded() {
        let embedded = embed_dx_types("struct CB0 {\n};\n").unwrap();

        assert!(embedded.starts_with("#pragma pack(push)"));
        assert!(embedded.contains("#ifndef DIRECTX_TYPE_INTRO"));
        assert!(embedded.contains("#ifndef DIRECTX_TYPE_CHECKS"));
        assert!(embedded.contains("struct float3 { float x; float y; float z; };"));
        assert!(embedded.contains(r#"static_assert(sizeof(float3x3) == 44, "directx structure size should match");"#));
        assert!(embedded.trim_end().ends_with("#pragma pack(pop)"));
    }

    #[test]
    fn types_file_is_namespaced() {
        let blocks = vec![render_declarations(&single_buffer())];
        let types_file = render_types_file("shaders::types", &blocks).unwrap();

        assert!(types_file.starts_with("#pragma once"));
        assert!(types_file.contains(r#"#if __has_include("shader-types-pre.hpp")"#));
        assert!(types_file.contains("namespace shaders::types {"));
        assert!(types_file.contains("  struct CB0 {"));
        assert!(types_file.trim_end().ends_with("}"));

        // the prelude is embedded exactly once
        assert_eq!(types_file.matches("#define DIRECTX_TYPE_INTRO").count(), 1);
    }
}
