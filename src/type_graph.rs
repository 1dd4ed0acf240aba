use std::collections::VecDeque;

use crate::error::GenError;
use crate::reflect::json::ReflectionNode;

/// Substring the reflector uses for anonymous nested aggregates, which
/// can't be emitted as standalone declarations.
pub const UNNAMED_TYPE_MARKER: &str = "<unnamed>";

/// One field of a generated struct, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub type_name: String,
    pub field_name: String,
    /// total byte size, including all array elements
    pub byte_size: Option<u32>,
    pub byte_offset: Option<u32>,
    pub element_count: Option<u32>,
}

/// A deduplicated struct definition discovered in one shader's
/// reflection tree. `depth` is the deepest nesting level the type was
/// referenced at and only exists to order emission.
#[derive(Debug, Clone)]
pub struct StructRecord {
    pub type_name: String,
    /// byte size of a single instance, never an array's total footprint
    pub byte_size: Option<u32>,
    pub members: Vec<Member>,
    depth: u32,
}

impl StructRecord {
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// All struct definitions for one shader, keyed by type name with
/// first-discovery order retained. Built once, emitted once, discarded.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: Vec<StructRecord>,
}

impl TypeRegistry {
    /// Flattens a shader's reflection tree into a deduplicated registry.
    ///
    /// The walk is breadth-first so that a type's stored depth ends up as
    /// the deepest nesting level it is referenced at: level order
    /// guarantees shallower occurrences are seen first and later, deeper
    /// ones only widen the depth.
    pub fn from_reflection(roots: &[ReflectionNode]) -> Result<Self, GenError> {
        let mut registry = Self::default();
        let mut queue: VecDeque<(&ReflectionNode, u32)> =
            roots.iter().map(|node| (node, 0)).collect();

        while let Some((node, depth)) = queue.pop_front() {
            let current_depth = depth + 1;
            let Some(type_name) = node.type_name() else {
                return Err(GenError::UnsupportedType {
                    type_name: node.name.clone(),
                });
            };

            if let Some(existing) = registry.find_mut(type_name) {
                existing.depth = existing.depth.max(current_depth);

                // A repeated subtree keeps the members captured at first
                // sight, but a re-encounter that still carries children
                // must agree with them.
                if !node.children.is_empty() {
                    let members = build_members(node)?;
                    if !same_shape(&existing.members, &members) {
                        return Err(GenError::TypeRedefinition {
                            type_name: type_name.to_string(),
                        });
                    }
                }
                continue;
            }

            if type_name.contains(UNNAMED_TYPE_MARKER) {
                return Err(GenError::UnsupportedType {
                    type_name: type_name.to_string(),
                });
            }

            let record = StructRecord {
                type_name: type_name.to_string(),
                byte_size: instance_size(node),
                members: build_members(node)?,
                depth: current_depth,
            };

            for child in &node.children {
                if child.is_struct() {
                    queue.push_back((child, current_depth));
                }
            }

            registry.records.push(record);
        }

        registry.verify_declaration_order()?;

        Ok(registry)
    }

    pub fn get(&self, type_name: &str) -> Option<&StructRecord> {
        self.records.iter().find(|r| r.type_name == type_name)
    }

    fn find_mut(&mut self, type_name: &str) -> Option<&mut StructRecord> {
        self.records.iter_mut().find(|r| r.type_name == type_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in safe declaration order: every type comes before all
    /// types that embed it. Deepest first; ties keep discovery order
    /// (the sort is stable).
    pub fn ordered(&self) -> Vec<&StructRecord> {
        let mut ordered: Vec<&StructRecord> = self.records.iter().collect();
        ordered.sort_by(|a, b| b.depth.cmp(&a.depth));
        ordered
    }

    /// On a DAG the breadth-first walk always leaves a member's type
    /// strictly deeper than the record embedding it. A violation means a
    /// type reaches itself, which depth ordering cannot declare.
    fn verify_declaration_order(&self) -> Result<(), GenError> {
        for record in &self.records {
            for member in &record.members {
                if let Some(member_type) = self.get(&member.type_name) {
                    if member_type.depth <= record.depth {
                        return Err(GenError::RecursiveType {
                            type_name: record.type_name.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Byte size of one instance of the node's type; an array node's total
/// size is divided back down to a single element.
fn instance_size(node: &ReflectionNode) -> Option<u32> {
    let elements = node
        .type_desc
        .as_ref()
        .and_then(|desc| desc.elements)
        .filter(|&count| count > 1);

    let own_size = match (node.size, elements) {
        (Some(total), Some(count)) => Some(total / count),
        (size, _) => size,
    };

    own_size.or_else(|| node.type_desc.as_ref().and_then(|desc| desc.size))
}

fn build_members(node: &ReflectionNode) -> Result<Vec<Member>, GenError> {
    node.children
        .iter()
        .map(|child| {
            let Some(desc) = child.type_desc.as_ref() else {
                return Err(GenError::UnsupportedType {
                    type_name: child.name.clone(),
                });
            };

            Ok(Member {
                type_name: desc.name.clone(),
                field_name: child.name.clone(),
                byte_size: child.size,
                byte_offset: child.start_offset.or(desc.offset),
                element_count: desc.elements.filter(|&count| count > 1),
            })
        })
        .collect()
}

fn same_shape(a: &[Member], b: &[Member]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.type_name == y.type_name && x.field_name == y.field_name)
}
