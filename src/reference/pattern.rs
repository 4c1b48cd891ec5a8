use regex::escape;

use crate::error::Error;
use crate::lang::Lang;
use crate::library::Library;
use crate::reference::Ref;
use crate::schema::Schema;
use crate::types::NodeId;

/// Regular expression export of a ref, for querying stored citation strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefPattern {
    /// One anchored expression per alternative.
    List(Vec<String>),
    /// A single anchored expression.
    Single(String),
}

/// Build the expression: for every ref in the range, its exact form, any
/// deeper address after `:`, and anything after a space and a digit. A
/// container also matches its titled parts after each of their separators.
pub(crate) fn regex(lib: &Library, r: &Ref, as_list: bool) -> Result<RefPattern, Error> {
    let schema = &lib.index(r.book())?.schema;
    let title = schema.primary_path_title(r.node(), Lang::En);
    let normals: Vec<String> = if r.is_range() {
        r.range_list(lib)?.iter().map(|item| return item.normal(lib)).collect::<Result<Vec<_>, _>>()?
    } else {
        vec![r.normal(lib)?]
    };

    let mut alternatives = Vec::with_capacity(normals.len().saturating_mul(3));
    for normal in &normals {
        let address = escape(normal.strip_prefix(title.as_str()).unwrap_or(normal));
        alternatives.push(format!("{address}$"));
        alternatives.push(format!("{address}:"));
        alternatives.push(format!(r"{address} \d"));
    }
    if r.depth() == 0 {
        let mut separators = Vec::new();
        part_separators(schema, r.node(), &mut separators);
        alternatives.extend(separators.iter().map(|sep| return escape(sep)));
    }

    let escaped_title = escape(&title);
    if as_list {
        return Ok(RefPattern::List(
            alternatives.iter().map(|alt| return format!("^{escaped_title}{alt}")).collect(),
        ));
    }
    return Ok(RefPattern::Single(format!("^{escaped_title}(?:{})", alternatives.join("|"))));
}

/// Separators that join titled parts under `node` to its title. Untitled
/// default parts add no title, so their own parts are searched instead.
fn part_separators<'s>(schema: &'s Schema, node: NodeId, out: &mut Vec<&'s str>) {
    for &child in schema.children(node) {
        let Some(part) = schema.node(child) else {
            continue;
        };
        if part.default || part.titles.primary(Lang::En).is_none() {
            part_separators(schema, child, out);
            continue;
        }
        for separator in &part.title_separators {
            if !out.contains(&separator.as_str()) {
                out.push(separator);
            }
        }
    }
}
