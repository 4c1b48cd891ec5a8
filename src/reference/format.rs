use crate::address::AddressType;
use crate::error::Error;
use crate::lang::Lang;
use crate::library::Library;
use crate::reference::Ref;
use crate::schema::{Schema, SchemaNode};

/// Canonical citation in `lang`: the primary title path, the start address,
/// and for ranges only the components of the end that differ.
pub(crate) fn normal(lib: &Library, r: &Ref, lang: Lang) -> Result<String, Error> {
    let schema = &lib.index(r.book())?.schema;
    let title = schema.primary_path_title(r.node(), lang);
    if r.sections().is_empty() {
        return Ok(title);
    }
    let types = address_types(schema, r);
    let start = render(&types, 0, r.sections(), lang).join(":");
    if !r.is_range() {
        return Ok(format!("{title} {start}"));
    }
    let from = r.range_index();
    let end = render(&types, from, r.to_sections().get(from..).unwrap_or(&[]), lang).join(":");
    return Ok(format!("{title} {start}-{end}"));
}

/// URL form: `_` for spaces in the title, `.` between components.
pub(crate) fn url(lib: &Library, r: &Ref) -> Result<String, Error> {
    let schema = &lib.index(r.book())?.schema;
    let title = schema.primary_path_title(r.node(), Lang::En).replace(' ', "_");
    if r.sections().is_empty() {
        return Ok(title);
    }
    let types = address_types(schema, r);
    let start = render(&types, 0, r.sections(), Lang::En).join(".");
    if !r.is_range() {
        return Ok(format!("{title}.{start}"));
    }
    let from = r.range_index();
    let end = render(&types, from, r.to_sections().get(from..).unwrap_or(&[]), Lang::En).join(".");
    return Ok(format!("{title}.{start}-{end}"));
}

/// Address types of the ref's leaf.
fn address_types(schema: &Schema, r: &Ref) -> Vec<AddressType> {
    return schema
        .node(r.node())
        .and_then(SchemaNode::leaf)
        .map(|leaf| return leaf.address_types.clone())
        .unwrap_or_default();
}

/// Format `positions`, the first of which sits at level `from`.
fn render(types: &[AddressType], from: usize, positions: &[u32], lang: Lang) -> Vec<String> {
    return positions
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let kind = types.get(from.saturating_add(i)).copied().unwrap_or(AddressType::Integer);
            return kind.format(*position, lang);
        })
        .collect();
}
