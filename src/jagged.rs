//! Jagged arrays: variable-depth nested content addressed by 0-based paths.
//!
//! Text versions are `JaggedArray<String>`; section shapes are
//! `JaggedArray<bool>` masks. Out-of-range reads return `None` or empty
//! results; nothing here panics on a bad path.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Content of one position: a segment or a list of deeper positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Element<T> {
    /// A segment.
    Leaf(T),
    /// Deeper positions.
    Nested(Vec<Element<T>>),
}

impl<T: Segment> Element<T> {
    /// True when every segment below is blank.
    pub fn is_blank(&self) -> bool {
        return match self {
            Self::Leaf(value) => value.is_blank(),
            Self::Nested(items) => items.iter().all(Self::is_blank),
        };
    }
}

/// Borrowed view of what sits at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Content<'a, T> {
    /// A single segment.
    Leaf(&'a T),
    /// A list of positions.
    Nested(&'a [Element<T>]),
}

/// Segment values that have a blank form.
pub trait Segment: Clone {
    /// The blank value used for padding.
    fn blank() -> Self;
    /// True when the value carries no content.
    fn is_blank(&self) -> bool;
}

impl Segment for String {
    fn blank() -> Self {
        return Self::new();
    }

    fn is_blank(&self) -> bool {
        return self.trim().is_empty();
    }
}

impl Segment for bool {
    fn blank() -> Self {
        return false;
    }

    fn is_blank(&self) -> bool {
        return !*self;
    }
}

impl Segment for u32 {
    fn blank() -> Self {
        return 0;
    }

    fn is_blank(&self) -> bool {
        return *self == 0;
    }
}

/// Nested content of one version (or one section shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JaggedArray<T> {
    /// Top-level positions.
    store: Vec<Element<T>>,
}

/// Text content of one version.
pub type JaggedTextArray = JaggedArray<String>;

impl<T> Default for JaggedArray<T> {
    fn default() -> Self {
        return Self { store: Vec::new() };
    }
}

impl<T: Segment> JaggedArray<T> {
    /// Nesting depth; an empty array has depth 1.
    pub fn depth(&self) -> usize {
        return list_depth(&self.store);
    }

    /// Number of segments, blank ones included.
    pub fn element_count(&self) -> usize {
        return self.flatten().len();
    }

    /// All segments in document order.
    pub fn flatten(&self) -> Vec<&T> {
        let mut out = Vec::new();
        collect_leaves(&self.store, &mut out);
        return out;
    }

    /// Most specific content at `path`. A path running past a segment
    /// returns that segment; an out-of-range path returns `None`.
    pub fn get_element(&self, path: &[usize]) -> Option<Content<'_, T>> {
        let mut current: &[Element<T>] = &self.store;
        for &index in path {
            match current.get(index)? {
                Element::Leaf(value) => return Some(Content::Leaf(value)),
                Element::Nested(items) => current = items,
            }
        }
        return Some(Content::Nested(current));
    }

    /// True when every segment is blank.
    pub fn is_blank(&self) -> bool {
        return self.store.iter().all(Element::is_blank);
    }

    /// Convert every segment.
    pub fn map<U, F: Fn(&T) -> U>(&self, f: &F) -> JaggedArray<U> {
        return JaggedArray {
            store: map_list(&self.store, f),
        };
    }

    /// Presence mask: `true` where a segment has content.
    pub fn mask(&self) -> JaggedArray<bool> {
        return self.map(&|value: &T| return !value.is_blank());
    }

    /// Merge arrays position by position: the first non-blank segment wins,
    /// nothing is blended inside one position. Also returns the sources that
    /// contributed at least one segment.
    pub fn merge<S: Ord + Clone>(arrays: &[&Self], sources: &[S]) -> (Self, BTreeSet<S>) {
        let lists: Vec<(usize, &[Element<T>])> = arrays
            .iter()
            .enumerate()
            .map(|(i, array)| return (i, array.store.as_slice()))
            .collect();
        let mut used = BTreeSet::new();
        let store = merge_lists(&lists, &mut used);
        let contributed = used.into_iter().filter_map(|i| return sources.get(i).cloned()).collect();
        return (Self { store }, contributed);
    }

    /// Wrap existing top-level positions.
    pub const fn new(store: Vec<Element<T>>) -> Self {
        return Self { store };
    }

    /// Paths of length `len` whose content is not blank, in document order.
    pub fn non_blank_paths(&self, len: usize) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut prefix = Vec::with_capacity(len);
        collect_paths(&self.store, len, &mut prefix, &mut out);
        return out;
    }

    /// Reduce the content between two paths (inclusive) to what they
    /// address: levels where both paths agree are unwrapped.
    pub fn project(&self, from: &[usize], to: &[usize]) -> Element<T> {
        let common = from.iter().zip(to).take_while(|(a, b)| return a == b).count();
        let mut current = Element::Nested(self.subarray(from, to).store);
        for _ in 0..common {
            current = match current {
                Element::Nested(mut items) if items.len() == 1 => match items.pop() {
                    Some(only) => only,
                    None => return Element::Nested(Vec::new()),
                },
                other => other,
            };
        }
        return current;
    }

    /// Write a segment, padding any missing positions with blanks. Returns
    /// false when the path is empty or runs through an existing segment.
    pub fn set_element(&mut self, path: &[usize], value: T) -> bool {
        let Some((&last, parents)) = path.split_last() else {
            return false;
        };
        let mut current = &mut self.store;
        for &index in parents {
            while current.len() <= index {
                current.push(Element::Nested(Vec::new()));
            }
            match current.get_mut(index) {
                Some(Element::Nested(items)) => current = items,
                Some(Element::Leaf(_)) | None => return false,
            }
        }
        while current.len() <= last {
            current.push(Element::Leaf(T::blank()));
        }
        if let Some(slot) = current.get_mut(last) {
            *slot = Element::Leaf(value);
            return true;
        }
        return false;
    }

    /// Empty skeleton of the given depth: `[]`, `[[]]`, `[[[]]]`, ...
    pub fn skeleton(depth: usize) -> Self {
        let mut store = Vec::new();
        for _ in 1..depth {
            store = vec![Element::Nested(store)];
        }
        return Self { store };
    }

    /// Number of positions directly under `path`; 0 for segments and missing paths.
    pub fn sub_array_length(&self, path: &[usize]) -> usize {
        return match self.get_element(path) {
            Some(Content::Nested(items)) => items.len(),
            Some(Content::Leaf(_)) | None => 0,
        };
    }

    /// Inclusive projection between two paths, keeping the original nesting.
    /// Missing trailing components mean "from the start" / "to the end".
    pub fn subarray(&self, from: &[usize], to: &[usize]) -> Self {
        return Self {
            store: slice_list(&self.store, from, to),
        };
    }

    /// Top-level positions.
    pub fn top_level(&self) -> &[Element<T>] {
        return &self.store;
    }

    /// Drop trailing blank segments and trailing empty lists at every level.
    /// Interior gaps are kept.
    pub fn trim_trailing_blanks(&mut self) {
        trim_list(&mut self.store);
    }
}

impl JaggedArray<String> {
    /// Change depth by `delta`. Positive wraps each segment in new levels;
    /// negative joins the deepest level's segments with a single space.
    pub fn resize(&self, delta: isize) -> Self {
        let mut store = self.store.clone();
        if delta >= 0 {
            for _ in 0..delta.unsigned_abs() {
                store = store.into_iter().map(wrap_leaves).collect();
            }
            return Self { store };
        }
        for _ in 0..delta.unsigned_abs() {
            if store.iter().all(|e| return matches!(e, Element::Leaf(_))) {
                break;
            }
            store = store.into_iter().map(join_deepest).collect();
        }
        return Self { store };
    }
}

/// Depth of a list: 1 plus the deepest nested list below it.
fn list_depth<T>(items: &[Element<T>]) -> usize {
    let deepest = items
        .iter()
        .map(|item| {
            return match item {
                Element::Leaf(_) => 0,
                Element::Nested(children) => list_depth(children),
            };
        })
        .max()
        .unwrap_or(0);
    return deepest.saturating_add(1);
}

/// Push every segment under `items` in order.
fn collect_leaves<'a, T>(items: &'a [Element<T>], out: &mut Vec<&'a T>) {
    for item in items {
        match item {
            Element::Leaf(value) => out.push(value),
            Element::Nested(children) => collect_leaves(children, out),
        }
    }
}

/// Walk to `len` levels, recording non-blank paths.
fn collect_paths<T: Segment>(items: &[Element<T>], len: usize, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (index, item) in items.iter().enumerate() {
        if item.is_blank() {
            continue;
        }
        prefix.push(index);
        if prefix.len() >= len {
            out.push(prefix.clone());
        } else if let Element::Nested(children) = item {
            collect_paths(children, len, prefix, out);
        }
        prefix.pop();
    }
}

/// Recursive body of `map`.
fn map_list<T, U, F: Fn(&T) -> U>(items: &[Element<T>], f: &F) -> Vec<Element<U>> {
    return items
        .iter()
        .map(|item| {
            return match item {
                Element::Leaf(value) => Element::Leaf(f(value)),
                Element::Nested(children) => Element::Nested(map_list(children, f)),
            };
        })
        .collect();
}

/// Recursive body of `merge`. `lists` pairs a source index with its items.
fn merge_lists<T: Segment>(lists: &[(usize, &[Element<T>])], used: &mut BTreeSet<usize>) -> Vec<Element<T>> {
    let len = lists.iter().map(|(_, items)| return items.len()).max().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for position in 0..len {
        let present: Vec<(usize, &Element<T>)> = lists
            .iter()
            .filter_map(|(source, items)| return items.get(position).map(|item| return (*source, item)))
            .collect();

        let nested: Vec<(usize, &[Element<T>])> = present
            .iter()
            .filter_map(|(source, item)| {
                return match item {
                    Element::Nested(children) => Some((*source, children.as_slice())),
                    Element::Leaf(_) => None,
                };
            })
            .collect();
        if !nested.is_empty() {
            out.push(Element::Nested(merge_lists(&nested, used)));
            continue;
        }

        let winner = present.iter().find_map(|(source, item)| {
            return match item {
                Element::Leaf(value) if !value.is_blank() => Some((*source, value)),
                Element::Leaf(_) | Element::Nested(_) => None,
            };
        });
        match winner {
            Some((source, value)) => {
                used.insert(source);
                out.push(Element::Leaf(value.clone()));
            },
            None => out.push(Element::Leaf(T::blank())),
        }
    }
    return out;
}

/// Recursive body of `subarray`.
fn slice_list<T: Clone>(items: &[Element<T>], from: &[usize], to: &[usize]) -> Vec<Element<T>> {
    let start = from.first().copied().unwrap_or(0);
    let last_index = items.len().saturating_sub(1);
    let end_requested = to.first().copied();
    let end = end_requested.map_or(last_index, |e| return e.min(last_index));
    if items.is_empty() || start > end {
        return Vec::new();
    }

    let mut out = Vec::new();
    for (index, item) in items.iter().enumerate().skip(start).take(end.saturating_sub(start).saturating_add(1)) {
        let sub_from = if index == start { from.get(1..).unwrap_or(&[]) } else { &[] };
        let sub_to = if Some(index) == end_requested { to.get(1..).unwrap_or(&[]) } else { &[] };
        out.push(match item {
            Element::Leaf(value) => Element::Leaf(value.clone()),
            Element::Nested(children) => Element::Nested(slice_list(children, sub_from, sub_to)),
        });
    }
    return out;
}

/// Recursive body of `trim_trailing_blanks`.
fn trim_list<T: Segment>(items: &mut Vec<Element<T>>) {
    for item in items.iter_mut() {
        if let Element::Nested(children) = item {
            trim_list(children);
        }
    }
    while items.last().is_some_and(|last| {
        return match last {
            Element::Leaf(value) => value.is_blank(),
            Element::Nested(children) => children.is_empty(),
        };
    }) {
        items.pop();
    }
}

/// One level of positive `resize`.
fn wrap_leaves(item: Element<String>) -> Element<String> {
    return match item {
        Element::Leaf(value) => Element::Nested(vec![Element::Leaf(value)]),
        Element::Nested(children) => Element::Nested(children.into_iter().map(wrap_leaves).collect()),
    };
}

/// One level of negative `resize`: a list of segments becomes one segment.
fn join_deepest(item: Element<String>) -> Element<String> {
    return match item {
        Element::Leaf(value) => Element::Leaf(value),
        Element::Nested(children) if children.iter().all(|c| return matches!(c, Element::Leaf(_))) => {
            let parts: Vec<String> = children
                .into_iter()
                .filter_map(|c| {
                    return match c {
                        Element::Leaf(value) if !value.is_blank() => Some(value),
                        Element::Leaf(_) | Element::Nested(_) => None,
                    };
                })
                .collect();
            Element::Leaf(parts.join(" "))
        },
        Element::Nested(children) => Element::Nested(children.into_iter().map(join_deepest).collect()),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(json: &str) -> JaggedTextArray {
        return serde_json::from_str(json).unwrap();
    }

    #[test]
    fn reads_most_specific_content() {
        let array = text(r#"[["a","b"],["c"]]"#);
        assert_eq!(array.get_element(&[1, 0]), Some(Content::Leaf(&"c".to_string())));
        assert_eq!(array.get_element(&[1, 0, 4]), Some(Content::Leaf(&"c".to_string())));
        assert_eq!(array.get_element(&[2]), None);
        assert_eq!(array.sub_array_length(&[0]), 2);
        assert_eq!(array.sub_array_length(&[]), 2);
        assert_eq!(array.sub_array_length(&[9]), 0);
    }

    #[test]
    fn set_element_pads_with_blanks() {
        let mut array = JaggedTextArray::skeleton(2);
        assert!(array.set_element(&[2, 1], "x".to_string()), "writes through missing levels");
        assert_eq!(array, text(r#"[[],[],["","x"]]"#));
        assert!(!array.set_element(&[2, 1, 0], "y".to_string()), "cannot descend through a segment");
        assert!(!array.set_element(&[], "y".to_string()), "empty path addresses nothing");
    }

    #[test]
    fn skeletons_mirror_depth() {
        assert_eq!(JaggedTextArray::skeleton(1), text("[]"));
        assert_eq!(JaggedTextArray::skeleton(3), text("[[[]]]"));
        assert_eq!(JaggedTextArray::skeleton(3).depth(), 3);
    }

    #[test]
    fn subarray_keeps_nesting_across_divergent_paths() {
        let array = text(r#"[["a","b","c"],["d","e"],["f","g"]]"#);
        assert_eq!(array.subarray(&[0, 1], &[1, 0]), text(r#"[["b","c"],["d"]]"#));
        assert_eq!(array.subarray(&[0, 0], &[2, 1]), array);
        assert_eq!(array.subarray(&[], &[]), array);
        assert_eq!(array.subarray(&[5], &[6]), JaggedTextArray::default());
    }

    #[test]
    fn project_unwraps_shared_levels() {
        let array = text(r#"[["a","b","c"],["d","e"]]"#);
        assert_eq!(array.project(&[0, 1], &[0, 1]), Element::Leaf("b".to_string()));
        assert_eq!(
            array.project(&[0, 1], &[0, 2]),
            Element::Nested(vec![Element::Leaf("b".to_string()), Element::Leaf("c".to_string())])
        );
        assert_eq!(array.project(&[1], &[1]), Element::Nested(vec![Element::Leaf("d".to_string()), Element::Leaf("e".to_string())]));
    }

    #[test]
    fn resize_wraps_and_joins() {
        let array = text(r#"[["a","b"],["c"]]"#);
        assert_eq!(array.resize(-1), text(r#"["a b","c"]"#));
        assert_eq!(array.resize(1), text(r#"[[["a"],["b"]],[["c"]]]"#));
        assert_eq!(array.resize(-5), text(r#"["a b","c"]"#));
    }

    #[test]
    fn merge_prefers_first_non_blank() {
        let first = text(r#"[["a",""],["c"]]"#);
        let second = text(r#"[["x","y"],["z","w"]]"#);
        let (merged, sources) = JaggedArray::merge(&[&first, &second], &["one", "two"]);
        assert_eq!(merged, text(r#"[["a","y"],["c","w"]]"#));
        assert_eq!(sources.into_iter().collect::<Vec<_>>(), vec!["one", "two"]);

        let (only_first, sources) = JaggedArray::merge(&[&first, &JaggedTextArray::default()], &["one", "two"]);
        assert_eq!(only_first, first);
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn trims_only_trailing_blanks() {
        let mut array = text(r#"[["a","","b",""],[],["",""]]"#);
        array.trim_trailing_blanks();
        assert_eq!(array, text(r#"[["a","","b"]]"#));
    }

    #[test]
    fn masks_and_counts() {
        let array = text(r#"[["a",""],["c"]]"#);
        assert_eq!(array.element_count(), 3);
        assert_eq!(array.flatten(), vec!["a", "", "c"]);
        let mask = array.mask();
        assert_eq!(mask.flatten(), vec![&true, &false, &true]);
        assert!(!array.is_blank(), "has content");
        assert!(text(r#"[[""," "]]"#).is_blank(), "whitespace is blank");
    }

    #[test]
    fn non_blank_paths_skip_empty_sections() {
        let array = text(r#"[["a"],[""],["c","d"]]"#);
        assert_eq!(array.non_blank_paths(1), vec![vec![0], vec![2]]);
        assert_eq!(array.non_blank_paths(2), vec![vec![0, 0], vec![2, 0], vec![2, 1]]);
    }
}
