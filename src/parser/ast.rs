//! AST node types for parsed schema declarations.

/// A schema declaration.
#[derive(Debug, Clone)]
pub struct AstSchema {
    pub name: String,
    pub members: Vec<AstMember>,
    pub line: usize,
}

/// A member of a schema: either a field or a nested declaration.
#[derive(Debug, Clone)]
pub enum AstMember {
    Field(AstField),
    NestedSchema(AstSchema),
}

/// A field definition within a schema.
#[derive(Debug, Clone)]
pub struct AstField {
    pub name: String,
    pub is_array: bool,
    pub type_name: String,
    /// For `int32(2)` or `string(8)`: the parenthesized value.
    pub param: Option<u64>,
    pub line: usize,
}
