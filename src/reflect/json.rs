use serde::{Deserialize, Serialize};

/// One node of the reflector's output tree: a top-level constant buffer,
/// or a variable inside one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionNode {
    pub name: String,
    pub node_type: NodeType,
    /// total byte size; for an array this covers all elements
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub start_offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub type_desc: Option<TypeDesc>,
    #[serde(default)]
    pub children: Vec<ReflectionNode>,
}

impl ReflectionNode {
    /// The canonical type name: a constant buffer is its own type,
    /// a variable's type comes from its descriptor.
    pub fn type_name(&self) -> Option<&str> {
        match self.node_type {
            NodeType::ConstantBuffer => Some(&self.name),
            NodeType::Variable => self.type_desc.as_ref().map(|desc| desc.name.as_str()),
        }
    }

    pub fn is_struct(&self) -> bool {
        self.type_desc
            .as_ref()
            .is_some_and(|desc| desc.class == TypeClass::Struct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Variable,
    ConstantBuffer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDesc {
    #[serde(default)]
    pub name: String,
    pub class: TypeClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub elements: Option<u32>,
}

/// Only `Struct` affects traversal; everything else is a leaf. The
/// catch-all keeps unknown reflector classes from failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeClass {
    Scalar,
    Vector,
    MatrixRows,
    MatrixColumns,
    Struct,
    Object,
    #[serde(other)]
    Other,
}
