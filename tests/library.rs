use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use textref::config::Config;
use textref::jagged::Element;
use textref::linker::{LinkItem, Linker, PartKind, Resolution};
use textref::{Error, Lang, Library, Ref, RefPattern, store};

fn fixture_library() -> Library {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/library");
    store::load_dir(&Config::with_library(dir)).unwrap()
}

fn library() -> Arc<Library> {
    static LIBRARY: OnceLock<Arc<Library>> = OnceLock::new();
    let lib = LIBRARY.get_or_init(|| Arc::new(fixture_library()));
    Arc::clone(lib)
}

fn parse(text: &str) -> Ref {
    library().parse_ref(text).unwrap()
}

fn normals(refs: &[Ref]) -> Vec<String> {
    let lib = library();
    refs.iter().map(|r| r.normal(&lib).unwrap()).collect()
}

fn resolved(resolution: &Resolution) -> String {
    match resolution {
        Resolution::Resolved(r) => r.normal(&library()).unwrap(),
        other => panic!("expected a resolved citation, got {other:?}"),
    }
}

// ── Parsing and canonical forms ───────────────────────────────────────

#[test]
fn verse_range_within_one_chapter() {
    let r = parse("Genesis 1:1-5");
    assert_eq!(r.sections(), &[1, 1]);
    assert_eq!(r.to_sections(), &[1, 5]);
    assert!(r.is_range(), "1-5 is a range");
    assert!(!r.is_spanning(), "stays inside chapter 1");
    assert!(r.is_segment_level(), "addresses verses");
    assert_eq!(r.normal(&library()).unwrap(), "Genesis 1:1-5");
}

#[test]
fn spanning_range_keeps_the_full_end() {
    let lib = library();
    let r = parse("Genesis 1:29-2:3");
    assert!(r.is_spanning(), "crosses from chapter 1 into 2");
    assert_eq!(r.normal(&lib).unwrap(), "Genesis 1:29-2:3");
    assert_eq!(r.url(&lib).unwrap(), "Genesis.1.29-2.3");
}

#[test]
fn alternate_titles_and_url_form_reach_the_same_ref() {
    let canonical = parse("Genesis 3:4");
    assert_eq!(parse("Gen. 3:4"), canonical);
    assert_eq!(parse("bereshit 3.4"), canonical);
    assert_eq!(parse("Genesis.3.4"), canonical);
    assert_eq!(parse("  Genesis   3:4 "), canonical);
}

#[test]
fn hebrew_citation_round_trips() {
    let lib = library();
    let r = lib.parse_ref_in("בראשית א:ג", Lang::He).unwrap();
    assert_eq!(r.normal(&lib).unwrap(), "Genesis 1:3");
    let he = r.he_normal(&lib).unwrap();
    assert!(he.starts_with("בראשית "), "{he}");
    assert_eq!(lib.parse_ref_in(&he, Lang::He).unwrap(), r);
}

#[test]
fn commentary_titles_are_longer_than_their_base() {
    let lib = library();
    let r = parse("Rashi on Genesis 1:1:2");
    assert_eq!(r.normal(&lib).unwrap(), "Rashi on Genesis 1:1:2");
    assert_eq!(r.url(&lib).unwrap(), "Rashi_on_Genesis.1.1.2");
    assert_eq!(parse("Rashi_on_Genesis.1.1.2"), r);
}

#[test]
fn bare_daf_spans_both_sides() {
    let lib = library();
    let r = parse("Shabbat 2");
    assert_eq!(r.sections(), &[3]);
    assert_eq!(r.to_sections(), &[4]);
    assert_eq!(r.normal(&lib).unwrap(), "Shabbat 2a-2b");
    assert_eq!(parse("Shabbat 2b:2").normal(&lib).unwrap(), "Shabbat 2b:2");
    assert_eq!(parse("Shabbos 2a:5"), parse("Shabbat 2a:5"));
}

#[test]
fn alternate_structure_subdivisions_map_to_primary_refs() {
    let lib = library();
    assert_eq!(parse("Genesis, Bereshit").normal(&lib).unwrap(), "Genesis 1:1-6:8");
    assert_eq!(parse("Genesis, Bereshit 2").normal(&lib).unwrap(), "Genesis 2:4-19");
    assert_eq!(parse("Genesis, Noach 7").normal(&lib).unwrap(), "Genesis 11:1-32");
}

#[test]
fn default_child_takes_the_books_address() {
    let lib = library();
    let r = parse("Kuzari 1:2");
    assert!(r.is_segment_level(), "the default node is the leaf");
    assert_eq!(r.normal(&lib).unwrap(), "Kuzari 1:2");
    assert_eq!(parse("Sefer HaKuzari 1:2"), r);

    let intro = parse("Kuzari, Introduction 2");
    assert_eq!(intro.normal(&lib).unwrap(), "Kuzari, Introduction 2");
    assert_ne!(intro.node(), r.node());
}

#[test]
fn container_without_default_rejects_an_address() {
    let lib = library();
    let whole = parse("Pesach Haggadah");
    assert!(whole.sections().is_empty(), "a bare container title is allowed");
    assert_eq!(whole.depth(), 0);

    let err = lib.parse_ref("Pesach Haggadah 3").unwrap_err();
    match err {
        Error::PartialRefInput { matched, .. } => assert_eq!(matched, "Pesach Haggadah"),
        other => panic!("expected a partial ref error, got {other:?}"),
    }
    assert_eq!(parse("Pesach Haggadah, Urchatz 1").normal(&lib).unwrap(), "Pesach Haggadah, Urchatz 1");
}

#[test]
fn unknown_titles_and_bad_addresses_fail_differently() {
    let lib = library();
    match lib.parse_ref("Genesys 1:1").unwrap_err() {
        Error::BookName { suggestions, .. } => {
            assert_eq!(suggestions.first().map(String::as_str), Some("Genesis"));
        },
        other => panic!("expected an unknown title, got {other:?}"),
    }
    assert!(matches!(lib.parse_ref("Genesis 51"), Err(Error::Input { .. })), "only 50 chapters");
    assert!(matches!(lib.parse_ref("Genesis 0:1"), Err(Error::Input { .. })), "addresses start at 1");
    assert!(matches!(lib.parse_ref("Genesis 2:5-1:1"), Err(Error::Input { .. })), "backwards range");
    assert!(matches!(lib.parse_ref("Genesis 1:1:1"), Err(Error::Input { .. })), "too deep");
}

#[test]
fn range_end_is_never_deeper_than_its_start() {
    let lib = library();
    assert_eq!(parse("Genesis 1-2").normal(&lib).unwrap(), "Genesis 1-2");
    assert!(matches!(lib.parse_ref("Genesis 1-2:3"), Err(Error::Input { .. })), "end deeper than start");
}

#[test]
fn refs_from_a_rebuilt_library_are_rejected() {
    let lib = library();
    let r = parse("Pesach Haggadah, Kadesh 1");
    let rebuilt = fixture_library();

    assert!(matches!(r.normal(&rebuilt), Err(Error::Input { .. })), "stale ref rendered");
    assert!(matches!(r.pattern(&rebuilt, false), Err(Error::Input { .. })), "stale ref exported");
    assert!(matches!(rebuilt.text(&r, Lang::En, None), Err(Error::Input { .. })), "stale ref read");
    assert_eq!(r.next_section_ref(&rebuilt), None);
    assert!(r.is_empty(&rebuilt), "no content is reachable through a stale ref");

    let fresh = rebuilt.parse_ref(&r.normal(&lib).unwrap()).unwrap();
    assert_eq!(fresh.normal(&rebuilt).unwrap(), "Pesach Haggadah, Kadesh 1");
}

// ── Structure operations ──────────────────────────────────────────────

#[test]
fn split_spanning_ref_yields_section_pieces() {
    let lib = library();
    let pieces = parse("Genesis 1:29-2:3").split_spanning_ref(&lib).unwrap();
    assert_eq!(normals(&pieces), vec!["Genesis 1:29-31", "Genesis 2:1-3"]);

    let wide = parse("Genesis 1:30-4:2").split_spanning_ref(&lib).unwrap();
    assert_eq!(normals(&wide), vec!["Genesis 1:30-31", "Genesis 2", "Genesis 3", "Genesis 4:1-2"]);

    let single = parse("Genesis 1:1-5").split_spanning_ref(&lib).unwrap();
    assert_eq!(normals(&single), vec!["Genesis 1:1-5"]);
}

#[test]
fn range_list_enumerates_positions_across_sections() {
    let lib = library();
    let list = parse("Genesis 1:30-2:2").range_list(&lib).unwrap();
    assert_eq!(normals(&list), vec!["Genesis 1:30", "Genesis 1:31", "Genesis 2:1", "Genesis 2:2"]);
}

#[test]
fn containment_overlap_and_order() {
    let chapter = parse("Genesis 1");
    let verse = parse("Genesis 1:5");
    let range = parse("Genesis 1:29-2:3");
    assert!(chapter.contains(&verse), "chapter holds its verse");
    assert!(!verse.contains(&chapter), "not the other way round");
    assert!(chapter.overlaps(&range), "share 1:29-31");
    assert!(!parse("Genesis 2:4").overlaps(&range), "2:4 is past the end");
    assert!(verse.precedes(&range), "1:5 ends before 1:29");
    assert!(parse("Genesis 50").precedes(&parse("Exodus 1")), "library order");
    assert!(!chapter.contains(&parse("Exodus 1:5")), "different books");
    assert!(verse < range, "sorted by start");
}

#[test]
fn section_and_context_refs() {
    let lib = library();
    let verse = parse("Genesis 2:3");
    assert_eq!(verse.section_ref().normal(&lib).unwrap(), "Genesis 2");
    assert_eq!(verse.top_section_ref().normal(&lib).unwrap(), "Genesis 2");
    assert_eq!(verse.context_ref(1).normal(&lib).unwrap(), "Genesis 2");
    assert_eq!(parse("Genesis 1:29-2:3").starting_ref().normal(&lib).unwrap(), "Genesis 1:29");
    assert_eq!(parse("Genesis 1:29-2:3").ending_ref().normal(&lib).unwrap(), "Genesis 2:3");
    assert_eq!(parse("Genesis 2").subref(&lib, 3).unwrap(), verse);
    assert!(verse.subref(&lib, 1).is_err(), "verses have no sub-positions");

    let joined = parse("Genesis 1:29").to(&lib, &parse("Genesis 2:3")).unwrap();
    assert_eq!(joined, parse("Genesis 1:29-2:3"));
}

#[test]
fn padded_ref_reaches_segment_level() {
    let lib = library();
    let padded = parse("Genesis 2-3").padded_ref(&lib).unwrap();
    assert_eq!(padded.normal(&lib).unwrap(), "Genesis 2:1-3:24");
}

#[test]
fn navigation_follows_content() {
    let lib = library();
    let last = parse("Genesis 1:31");
    assert_eq!(last.next_segment_ref(&lib).unwrap().normal(&lib).unwrap(), "Genesis 2:1");
    assert_eq!(parse("Genesis 1").next_section_ref(&lib).unwrap().normal(&lib).unwrap(), "Genesis 2");
    assert!(parse("Genesis 1").prev_section_ref(&lib).is_none(), "nothing before chapter 1");
    assert_eq!(parse("Genesis 11").prev_section_ref(&lib).unwrap().normal(&lib).unwrap(), "Genesis 10");
    assert!(parse("Genesis 11").next_section_ref(&lib).is_none(), "fixture text stops at 11");
    assert_eq!(parse("Shabbat 2a").first_available_section_ref(&lib).unwrap().normal(&lib).unwrap(), "Shabbat 2a");
    assert!(parse("Genesis 40").is_empty(&lib), "no version reaches chapter 40");
    assert!(!parse("Genesis 1").is_empty(&lib), "chapter 1 has text");
}

#[test]
fn in_terms_of_and_back() {
    let lib = library();
    let chapter = parse("Genesis 2");
    let verse = parse("Genesis 2:3");
    let relative = verse.in_terms_of(&lib, &chapter).unwrap();
    assert_eq!(relative, vec![3]);
    assert_eq!(lib.ref_from_relative(&chapter, &relative).unwrap(), verse);
    assert!(parse("Genesis 3:1").in_terms_of(&lib, &chapter).is_err(), "outside the ancestor");
}

#[test]
fn pattern_matches_more_specific_refs() {
    let lib = library();
    let textref::RefPattern::Single(expr) = parse("Genesis 1").pattern(&lib, false).unwrap() else {
        panic!("a point ref yields one expression");
    };
    let re = regex::Regex::new(&expr).unwrap();
    assert!(re.is_match("Genesis 1"), "{expr}");
    assert!(re.is_match("Genesis 1:5"), "{expr}");
    assert!(!re.is_match("Genesis 10:5"), "{expr}");
    assert!(!re.is_match("Exodus 1:5"), "{expr}");
}

#[test]
fn container_pattern_matches_titled_parts() {
    let lib = library();
    for (container, part) in [("Kuzari", "Kuzari, Introduction 2"), ("Pesach Haggadah", "Pesach Haggadah, Kadesh 1")] {
        let RefPattern::Single(expr) = parse(container).pattern(&lib, false).unwrap() else {
            panic!("a point ref yields one expression");
        };
        let re = regex::Regex::new(&expr).unwrap();
        assert!(re.is_match(container), "{expr}");
        assert!(re.is_match(part), "{expr}");
        assert!(!re.is_match(&format!("{container}s 1")), "{expr}");
    }

    let RefPattern::List(list) = parse("Kuzari").pattern(&lib, true).unwrap() else {
        panic!("list form requested");
    };
    assert!(list.iter().any(|expr| regex::Regex::new(expr).unwrap().is_match("Kuzari, Introduction 2")), "{list:?}");
    assert!(list.iter().any(|expr| regex::Regex::new(expr).unwrap().is_match("Kuzari 1:2")), "{list:?}");
}

// ── Text ──────────────────────────────────────────────────────────────

#[test]
fn merged_text_prefers_higher_priority() {
    let lib = library();
    let chunk = lib.text(&parse("Genesis 1:1"), Lang::En, None).unwrap();
    assert_eq!(
        chunk.content,
        Element::Leaf("In the beginning God created the heaven and the earth.".to_string())
    );
    assert_eq!(chunk.sources, vec!["JPS 1917".to_string()]);

    let draft = lib.text(&parse("Genesis 1:1"), Lang::En, Some("Draft Translation")).unwrap();
    assert_eq!(
        draft.content,
        Element::Leaf("In the beginning, God made the heavens and the earth.".to_string())
    );
}

#[test]
fn ranged_text_is_nested() {
    let lib = library();
    let chunk = lib.text(&parse("Genesis 2:1-3"), Lang::En, None).unwrap();
    let Element::Nested(verses) = chunk.content else {
        panic!("a range yields a list");
    };
    assert_eq!(verses.len(), 3);

    assert!(lib.text(&parse("Pesach Haggadah"), Lang::En, None).is_err(), "containers have no text");
    assert!(lib.text(&parse("Genesis 1:1"), Lang::En, Some("No Such Edition")).is_err(), "unknown version");
}

// ── Linking ───────────────────────────────────────────────────────────

#[test]
fn explicit_citation_beats_context() {
    let lib = library();
    let linker = Linker::new(Arc::clone(&lib)).unwrap();
    let context = parse("Exodus 1:1");
    let found = linker.link("as Rashi writes (see Genesis 1:1)", Some(&context)).unwrap();
    assert_eq!(found.len(), 1, "{found:?}");
    let only = found.first().unwrap();
    assert_eq!(only.raw.text, "Genesis 1:1");
    assert_eq!(only.raw.char_span, 21..32);
    assert_eq!(resolved(&only.resolution), "Genesis 1:1");
}

#[test]
fn collective_title_without_context_is_ambiguous() {
    let lib = library();
    let linker = Linker::new(Arc::clone(&lib)).unwrap();
    let found = linker.link("see Rashi 1:1", None).unwrap();
    let Some(Resolution::Ambiguous(candidates)) = found.first().map(|f| &f.resolution) else {
        panic!("expected an ambiguous citation, got {found:?}");
    };
    let mut names = normals(candidates);
    names.sort();
    assert_eq!(names, vec!["Rashi on Exodus 1:1", "Rashi on Genesis 1:1"]);
}

#[test]
fn collective_title_narrows_by_context() {
    let linker = Linker::new(library()).unwrap();
    let context = parse("Genesis 1:1");
    let found = linker.link("see Rashi 1:1", Some(&context)).unwrap();
    assert_eq!(resolved(&found.first().unwrap().resolution), "Rashi on Genesis 1:1");
}

#[test]
fn hebrew_citation_in_parentheses() {
    let linker = Linker::new(library()).unwrap();
    let found = linker.link("כמו שכתוב (בראשית א, ג)", None).unwrap();
    assert_eq!(found.len(), 1, "{found:?}");
    let only = found.first().unwrap();
    assert_eq!(only.raw.parts.first().map(|p| p.kind), Some(PartKind::Title));
    assert_eq!(resolved(&only.resolution), "Genesis 1:3");
}

#[test]
fn ibid_follows_the_previous_citation_in_a_batch() {
    let linker = Linker::new(library()).unwrap();
    let items = vec![
        LinkItem {
            context: None,
            text: "Genesis 1:1 is famous".to_string(),
        },
        LinkItem {
            context: None,
            text: "and ibid. 3 continues".to_string(),
        },
    ];
    let found = linker.link_batch(&items).unwrap();
    let second = found.get(1).and_then(|spans| spans.first()).unwrap();
    assert_eq!(second.raw.parts.first().map(|p| p.kind), Some(PartKind::Ibid));
    assert_eq!(resolved(&second.resolution), "Genesis 1:3");
}

#[test]
fn hebrew_ibid_follows_the_previous_citation() {
    let linker = Linker::new(library()).unwrap();
    let found = linker.link("(בראשית א:א) ועוד (שם ג)", None).unwrap();
    assert_eq!(found.len(), 2, "{found:?}");
    let second = found.get(1).unwrap();
    assert_eq!(second.raw.parts.first().map(|p| p.kind), Some(PartKind::Ibid));
    assert_eq!(resolved(&second.resolution), "Genesis 1:3");
}

#[test]
fn ibid_skips_an_ambiguous_citation() {
    let linker = Linker::new(library()).unwrap();
    let found = linker.link("Genesis 1:1, then Rashi 1:1, and ibid. 3", None).unwrap();
    assert_eq!(found.len(), 3, "{found:?}");
    assert!(matches!(found.get(1).map(|f| &f.resolution), Some(Resolution::Ambiguous(_))), "{found:?}");
    assert_eq!(resolved(&found.get(2).unwrap().resolution), "Genesis 1:3");
}

#[test]
fn ibid_does_not_cross_batches() {
    let linker = Linker::new(library()).unwrap();
    let first = vec![LinkItem {
        context: None,
        text: "Genesis 1:1".to_string(),
    }];
    let second = vec![LinkItem {
        context: None,
        text: "ibid. 3".to_string(),
    }];
    let results = linker.bulk_link(&[first, second]);
    let spans = results.get(1).unwrap().as_ref().unwrap();
    let only = spans.first().and_then(|s| s.first()).unwrap();
    assert!(matches!(only.resolution, Resolution::Unresolved(_)), "{only:?}");
}

#[test]
fn markup_is_skipped_and_offsets_point_into_the_input() {
    let linker = Linker::new(library()).unwrap();
    let input = "<b>see</b> <i>Genesis 2:3</i>";
    let found = linker.link(input, None).unwrap();
    let only = found.first().unwrap();
    assert_eq!(input.get(only.raw.byte_span.clone()), Some("Genesis 2:3"));
    assert_eq!(resolved(&only.resolution), "Genesis 2:3");

    let err = linker.link("<b>Genesis 1:1</i>", None).unwrap_err();
    assert!(matches!(err, Error::MalformedMarkup { .. }), "{err}");
}

#[test]
fn citation_past_the_end_is_unresolved() {
    let linker = Linker::new(library()).unwrap();
    let found = linker.link("compare Exodus 41:2", None).unwrap();
    assert!(matches!(found.first().map(|f| &f.resolution), Some(Resolution::Unresolved(_))), "{found:?}");
}
