use serde::{Deserialize, Serialize};

use crate::error::{FlockError, Result};

/// One declared input or output field
///
/// Written as `name: type | description`, where type and description are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    /// Parse a single field declaration
    pub fn parse(decl: &str) -> Result<Self> {
        let (head, description) = match decl.split_once('|') {
            Some((head, desc)) => (head, Some(desc.trim())),
            None => (decl, None),
        };
        let (name, type_hint) = match head.split_once(':') {
            Some((name, ty)) => (name.trim(), Some(ty.trim())),
            None => (head.trim(), None),
        };

        if name.is_empty() {
            return Err(invalid(decl, "field name is empty"));
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
            return Err(invalid(decl, &format!("`{}` is not a valid field name", name)));
        }

        Ok(Self {
            name: name.to_string(),
            type_hint: type_hint.filter(|t| !t.is_empty()).map(str::to_string),
            description: description.filter(|d| !d.is_empty()).map(str::to_string),
        })
    }

    /// Parse a comma separated signature such as `"funny_title, funny_slide_headers"`
    pub fn parse_list(signature: &str) -> Result<Vec<Self>> {
        let mut fields: Vec<Self> = Vec::new();
        for decl in split_top_level(signature) {
            if decl.trim().is_empty() {
                continue;
            }
            let field = Self::parse(decl)?;
            if fields.iter().any(|f| f.name == field.name) {
                return Err(invalid(
                    signature,
                    &format!("field `{}` declared twice", field.name),
                ));
            }
            fields.push(field);
        }
        Ok(fields)
    }
}

fn invalid(signature: &str, reason: &str) -> FlockError {
    FlockError::InvalidSignature {
        signature: signature.to_string(),
        reason: reason.to_string(),
    }
}

/// Split on commas outside of brackets, so `dict[str, int]` stays whole.
/// Descriptions are free text and may contain commas too, so a comma after
/// `|` only splits when what follows looks like a new declaration.
fn split_top_level(signature: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_description = false;
    let mut start = 0;

    for (i, c) in signature.char_indices() {
        match c {
            '[' | '(' | '{' => depth += 1,
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => in_description = true,
            ',' if depth == 0 => {
                let rest = &signature[i + 1..];
                if in_description && !starts_declaration(rest) {
                    continue;
                }
                parts.push(&signature[start..i]);
                start = i + 1;
                in_description = false;
            }
            _ => {}
        }
    }
    parts.push(&signature[start..]);
    parts
}

/// `rest` begins with `name:` or `name |` or a bare `name` up to the next comma/end
fn starts_declaration(rest: &str) -> bool {
    let rest = rest.trim_start();
    let ident_len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if ident_len == 0 {
        return false;
    }
    let after = rest[ident_len..].trim_start();
    after.is_empty() || after.starts_with(':') || after.starts_with('|') || after.starts_with(',')
}
