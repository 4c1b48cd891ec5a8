//! Indexes: one per text, wrapping its schema with catalogue metadata.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::lang::Lang;
use crate::reference::Ref;
use crate::schema::{Schema, TitleGroup};
use crate::store::IndexRecord;

/// How a text relates to the texts it comments on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dependence {
    /// A commentary on one or more base texts.
    Commentary,
    /// A translation or paraphrase of a base text.
    Targum,
}

/// A named shared title group, e.g. the collective title "Rashi".
#[derive(Debug, Clone)]
pub struct Term {
    /// Lookup name.
    pub name: String,
    /// Titles in each language.
    pub titles: TitleGroup,
}

/// One node of an alternate structure, expressed in primary addresses.
#[derive(Debug, Clone)]
pub struct AltNode {
    /// Subdivisions (e.g. aliyot), tiling `whole_ref` in order.
    pub refs: Vec<Ref>,
    /// Titles of the node.
    pub titles: TitleGroup,
    /// Everything the node covers.
    pub whole_ref: Ref,
}

/// A named secondary grouping of a text, e.g. weekly portions.
#[derive(Debug, Clone)]
pub struct AltStructure {
    /// Structure name, e.g. "Parasha".
    pub name: String,
    /// Nodes in order.
    pub nodes: Vec<AltNode>,
}

/// One text: its schema and catalogue data.
#[derive(Debug, Clone)]
pub struct Index {
    /// Alternate structures, resolved once every title is known.
    pub alt_structs: Vec<AltStructure>,
    /// Titles of the texts this one comments on.
    pub base_text_titles: Vec<String>,
    /// Category path, outermost first.
    pub categories: Vec<String>,
    /// Name of the term shared with sibling commentaries.
    pub collective_title: Option<String>,
    /// Relation to base texts.
    pub dependence: Option<Dependence>,
    /// Explicit position within its category.
    pub order: Option<u32>,
    /// Structure and titles.
    pub schema: Schema,
    /// Canonical English title.
    pub title: String,
}

impl Index {
    /// Build an index from its record. Alternate structures are attached later.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaInvalid` when the schema is invalid or its root
    /// title disagrees with the record title.
    pub fn build(record: &IndexRecord, terms: &HashMap<String, TitleGroup>) -> Result<Self, Error> {
        let schema = Schema::build(&record.title, &record.schema, terms)?;
        let root_title = schema.node(schema.root()).and_then(|root| return root.titles.primary(Lang::En));
        if root_title != Some(record.title.as_str()) {
            return Err(Error::schema(
                &record.title,
                format!("root title `{}` does not match the index title", root_title.unwrap_or_default()),
            ));
        }
        if record.collective_title.is_some() && record.dependence.is_none() {
            return Err(Error::schema(&record.title, "a collective title needs a dependence"));
        }
        return Ok(Self {
            alt_structs: Vec::new(),
            base_text_titles: record.base_text_titles.clone(),
            categories: record.categories.clone(),
            collective_title: record.collective_title.clone(),
            dependence: record.dependence,
            order: record.order,
            schema,
            title: record.title.clone(),
        });
    }

    /// True when this text comments on `base`.
    pub fn is_commentary_on(&self, base: &str) -> bool {
        return self.dependence == Some(Dependence::Commentary) && self.base_text_titles.iter().any(|t| return t == base);
    }

    /// Canonical title in `lang`, English when the language has none.
    pub fn primary_title(&self, lang: Lang) -> &str {
        return self
            .schema
            .node(self.schema.root())
            .and_then(|root| return root.titles.primary_or_en(lang))
            .unwrap_or(self.title.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Record, parse_records};

    fn record(json: &str) -> IndexRecord {
        let Some(Record::Index(record)) = parse_records(json).unwrap().into_iter().next() else {
            panic!("expected an index record");
        };
        return record;
    }

    fn rashi(extra: &str) -> IndexRecord {
        return record(&format!(
            r#"{{"kind":"index","title":"Rashi on Genesis","categories":["Tanakh","Commentary"],{extra}
            "schema":{{"key":"Rashi on Genesis","titles":[{{"lang":"en","text":"Rashi on Genesis","primary":true}}],
            "address_types":["Integer","Integer","Integer"],"section_names":["Chapter","Verse","Comment"]}}}}"#
        ));
    }

    #[test]
    fn commentary_knows_its_base_text() {
        let index = Index::build(
            &rashi(r#""collective_title":"Rashi","dependence":"Commentary","base_text_titles":["Genesis"],"#),
            &HashMap::new(),
        )
        .unwrap();
        assert!(index.is_commentary_on("Genesis"), "declared base text");
        assert!(!index.is_commentary_on("Exodus"), "other books are not bases");
        assert_eq!(index.primary_title(Lang::He), "Rashi on Genesis", "falls back to English");
    }

    #[test]
    fn collective_title_requires_dependence() {
        let err = Index::build(&rashi(r#""collective_title":"Rashi","#), &HashMap::new()).unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid { .. }), "{err}");
    }

    #[test]
    fn root_title_must_match_index_title() {
        let mut mismatched = rashi("");
        mismatched.title = "Rashi on Exodus".to_string();
        let err = Index::build(&mismatched, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("does not match"), "{err}");
    }
}
