use std::collections::HashMap;

use crate::error::{ParseError, SchemaError};
use crate::template::{Template, TypeSpec};
use crate::types::{lookup, SchemaSet};
use super::ast::*;

/// Build a `SchemaSet` from parsed declarations.
///
/// Schemas may reference each other in any order; each one is defined after
/// everything it references.
pub fn build_schema(items: Vec<AstSchema>) -> Result<SchemaSet, ParseError> {
    // Phase 1: flatten nested declarations into dotted names.
    let mut raw = RawSchemas::default();
    for item in &items {
        collect_schema("", item, &mut raw)?;
    }

    // Phase 2: resolve every field's type name.
    let mut resolved: HashMap<String, Vec<ResolvedField>> = HashMap::new();
    for name in &raw.order {
        let mut fields = Vec::new();
        for rf in &raw.fields[name] {
            fields.push(resolve_field(name, rf, &raw)?);
        }
        resolved.insert(name.clone(), fields);
    }

    // Phase 3: define depth-first so dependencies come first.
    let mut builder = Builder {
        resolved: &resolved,
        set: SchemaSet::new(),
        in_progress: Vec::new(),
    };
    for name in &raw.order {
        builder.define(name)?;
    }
    Ok(builder.set)
}

#[derive(Default)]
struct RawSchemas<'a> {
    /// Declaration order, parents before their nested schemas.
    order: Vec<String>,
    fields: HashMap<String, Vec<&'a AstField>>,
}

enum ResolvedField {
    Primitive { name: String, spec: TypeSpec },
    Nested { name: String, schema: String },
    Array { name: String, schema: String },
}

/// Recursively collect schema declarations, flattening nested ones with
/// dot-separated names.
fn collect_schema<'a>(
    parent: &str,
    ast: &'a AstSchema,
    out: &mut RawSchemas<'a>,
) -> Result<(), ParseError> {
    let full_name = if parent.is_empty() {
        ast.name.clone()
    } else {
        format!("{}.{}", parent, ast.name)
    };

    if let Ok(desc) = lookup(&ast.name) {
        return Err(ParseError::Syntax {
            line: ast.line,
            message: format!("schema '{}' collides with type {}", full_name, desc.name),
        });
    }
    if out.fields.contains_key(&full_name) {
        return Err(ParseError::DuplicateType { name: full_name });
    }
    out.fields.insert(full_name.clone(), Vec::new());
    out.order.push(full_name.clone());

    let mut fields: Vec<&AstField> = Vec::new();
    for member in &ast.members {
        match member {
            AstMember::Field(f) => {
                if fields.iter().any(|prev| prev.name == f.name) {
                    return Err(ParseError::DuplicateField {
                        type_name: full_name,
                        field_name: f.name.clone(),
                    });
                }
                fields.push(f);
            }
            AstMember::NestedSchema(nested) => {
                collect_schema(&full_name, nested, out)?;
            }
        }
    }

    out.fields.insert(full_name, fields);
    Ok(())
}

fn resolve_field(parent: &str, f: &AstField, raw: &RawSchemas) -> Result<ResolvedField, ParseError> {
    let syntax = |message: String| ParseError::Syntax {
        line: f.line,
        message,
    };

    if let Ok(desc) = lookup(&f.type_name) {
        if f.is_array {
            return Err(syntax(format!(
                "field '{}': arrays hold schemas, not {}",
                f.name, desc.name
            )));
        }
        let mut spec = TypeSpec::new(&f.type_name);
        if let Some(param) = f.param {
            let param = u32::try_from(param)
                .map_err(|_| syntax(format!("field '{}': parameter {} too large", f.name, param)))?;
            spec = if desc.ty.is_integer() {
                spec.decimal_spots(param)
            } else {
                spec.fixed_length(param)
            };
        }
        return Ok(ResolvedField::Primitive {
            name: f.name.clone(),
            spec,
        });
    }

    if f.param.is_some() {
        return Err(syntax(format!(
            "field '{}': schema reference '{}' takes no parameter",
            f.name, f.type_name
        )));
    }
    let schema = resolve_schema_name(parent, &f.type_name, raw)?;
    let name = f.name.clone();
    Ok(if f.is_array {
        ResolvedField::Array { name, schema }
    } else {
        ResolvedField::Nested { name, schema }
    })
}

/// Look up `type_name` in the innermost scope first, then each enclosing
/// scope, then at top level.
fn resolve_schema_name(parent: &str, type_name: &str, raw: &RawSchemas) -> Result<String, ParseError> {
    let mut prefix = parent;
    loop {
        let candidate = format!("{}.{}", prefix, type_name);
        if raw.fields.contains_key(&candidate) {
            return Ok(candidate);
        }
        match prefix.rfind('.') {
            Some(pos) => prefix = &prefix[..pos],
            None => break,
        }
    }
    if raw.fields.contains_key(type_name) {
        return Ok(type_name.to_string());
    }
    Err(ParseError::UndefinedType {
        type_name: type_name.to_string(),
        referenced_by: parent.to_string(),
    })
}

struct Builder<'a> {
    resolved: &'a HashMap<String, Vec<ResolvedField>>,
    set: SchemaSet,
    /// Schemas whose dependencies are still being defined.
    in_progress: Vec<String>,
}

impl Builder<'_> {
    fn define(&mut self, name: &str) -> Result<usize, ParseError> {
        if let Some(idx) = self.set.get_index(name) {
            return Ok(idx);
        }
        if let Some(pos) = self.in_progress.iter().position(|n| n == name) {
            let mut chain = self.in_progress[pos..].to_vec();
            chain.push(name.to_string());
            return Err(SchemaError::RecursiveSchema { chain }.into());
        }

        self.in_progress.push(name.to_string());
        let resolved = self.resolved;
        let mut template = Template::new();
        for field in &resolved[name] {
            template = match field {
                ResolvedField::Primitive { name, spec } => template.field(name, spec.clone()),
                ResolvedField::Nested { name, schema } => {
                    let idx = self.define(schema)?;
                    template.nested(name, idx)
                }
                ResolvedField::Array { name, schema } => {
                    let idx = self.define(schema)?;
                    template.array(name, idx)
                }
            };
        }
        self.in_progress.pop();

        Ok(self.set.define(name, template)?)
    }
}
