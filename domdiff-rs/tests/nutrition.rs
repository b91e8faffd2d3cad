//! End-to-end classification tests on nutrition documents.
//!
//! Fixtures live in `tests/data/`:
//! - `nutrition.xml`: four foods, daily values, prices and stock
//! - `nutrition-mfr.xml`: the manufacturer of one food changed
//! - `nutrition-changes.xml`: one food removed, one edited, one added

use std::path::PathBuf;
use std::rc::Rc;

use xml_domdiff::{
    diff_documents, parse_file, parse_str, render_actions, ActionKind, ActionMap, CriticalFields,
    DiffConfig, Error, ForestDiff, ForestSpec, MatchStrategy, NodeRef, NullLogger, PathSelector,
    RelatedPaths, XPathSelector,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn load(name: &str) -> NodeRef {
    parse_file(fixture(name)).unwrap()
}

fn foods(doc: &NodeRef) -> Vec<NodeRef> {
    XPathSelector::new()
        .select_all("//nutrition/food", doc)
        .unwrap()
}

fn food_names(nodes: &[NodeRef]) -> Vec<String> {
    let selector = XPathSelector::new();
    nodes
        .iter()
        .map(|n| {
            selector
                .select_one("name", n)
                .unwrap()
                .map(|name| name.borrow().text_content())
                .unwrap_or_default()
        })
        .collect()
}

fn food_critical() -> CriticalFields {
    ["name", "mfr"].into_iter().collect()
}

fn engine() -> ForestDiff<xml_domdiff::DomComparer, XPathSelector, NullLogger> {
    ForestDiff::new().with_logger(NullLogger)
}

#[test]
fn test_critical_manufacturer_change_replaces_the_food() {
    let existing = foods(&load("nutrition.xml"));
    let modified = foods(&load("nutrition-mfr.xml"));

    let outcome = engine()
        .exact_match_filter(&existing, &modified, &RelatedPaths::new())
        .unwrap();
    assert_eq!(outcome.eliminated, 3);
    assert_eq!(outcome.difference_count(), 2);

    let actions = engine()
        .classify_actions(
            &outcome.unique_existing,
            &outcome.unique_modified,
            &RelatedPaths::new(),
            &food_critical(),
        )
        .unwrap();

    assert!(!actions.contains(ActionKind::Update));
    assert!(Rc::ptr_eq(&actions.get(ActionKind::Delete)[0], &existing[2]));
    assert!(Rc::ptr_eq(&actions.get(ActionKind::Create)[0], &modified[2]));
}

#[test]
fn test_non_critical_manufacturer_change_is_an_update() {
    let existing = foods(&load("nutrition.xml"));
    let modified = foods(&load("nutrition-mfr.xml"));

    let only_name: CriticalFields = ["name"].into_iter().collect();
    let actions = engine()
        .diff_forests(&existing, &modified, &RelatedPaths::new(), &only_name)
        .unwrap();

    assert_eq!(actions.node_count(), 1);
    assert!(Rc::ptr_eq(&actions.get(ActionKind::Update)[0], &modified[2]));
}

#[test]
fn test_identical_documents_need_no_action() {
    let existing = foods(&load("nutrition.xml"));
    let modified = foods(&load("nutrition.xml"));

    let actions = engine()
        .diff_forests(&existing, &modified, &RelatedPaths::new(), &food_critical())
        .unwrap();
    assert!(actions.is_empty());
}

#[test]
fn test_added_edited_and_removed_foods() {
    let existing = foods(&load("nutrition.xml"));
    let modified = foods(&load("nutrition-changes.xml"));

    let actions = engine()
        .diff_forests(&existing, &modified, &RelatedPaths::new(), &food_critical())
        .unwrap();

    assert_eq!(food_names(actions.get(ActionKind::Create)), vec!["Cole Slaw"]);
    assert_eq!(
        food_names(actions.get(ActionKind::Update)),
        vec!["Beef Frankfurter, Quarter Pound"]
    );
    assert_eq!(
        food_names(actions.get(ActionKind::Delete)),
        vec!["Bagels, New York Style"]
    );
    // The update carries the modified version of the food.
    assert!(Rc::ptr_eq(&actions.get(ActionKind::Update)[0], &modified[1]));
}

#[test]
fn test_without_critical_fields_greedy_pairing_updates_everything() {
    let existing = foods(&load("nutrition.xml"));
    let modified = foods(&load("nutrition-changes.xml"));

    let actions = engine()
        .diff_forests(&existing, &modified, &RelatedPaths::new(), &CriticalFields::new())
        .unwrap();

    assert!(!actions.contains(ActionKind::Create));
    assert!(!actions.contains(ActionKind::Delete));
    assert_eq!(
        food_names(actions.get(ActionKind::Update)),
        vec!["Cole Slaw", "Beef Frankfurter, Quarter Pound"]
    );
}

#[test]
fn test_every_node_is_accounted_for_exactly_once() {
    let existing = foods(&load("nutrition.xml"));
    let modified = foods(&load("nutrition-changes.xml"));
    let diff = engine();

    let outcome = diff
        .exact_match_filter(&existing, &modified, &RelatedPaths::new())
        .unwrap();
    let actions = diff
        .classify_actions(
            &outcome.unique_existing,
            &outcome.unique_modified,
            &RelatedPaths::new(),
            &food_critical(),
        )
        .unwrap();

    let in_actions = |node: &NodeRef, kinds: &[ActionKind]| {
        kinds
            .iter()
            .flat_map(|k| actions.get(*k))
            .filter(|n| Rc::ptr_eq(n, node))
            .count()
    };
    let eliminated = |node: &NodeRef, residual: &[NodeRef]| {
        !residual.iter().any(|n| Rc::ptr_eq(n, node))
    };

    let mut eliminated_existing = 0;
    for node in &existing {
        let found = in_actions(node, &[ActionKind::Delete]);
        if eliminated(node, &outcome.unique_existing) {
            eliminated_existing += 1;
            assert_eq!(found, 0);
        } else {
            // Residual existing nodes are either deleted or were updated.
            assert!(found <= 1);
        }
    }
    let mut eliminated_modified = 0;
    for node in &modified {
        let found = in_actions(node, &[ActionKind::Create, ActionKind::Update]);
        if eliminated(node, &outcome.unique_modified) {
            eliminated_modified += 1;
            assert_eq!(found, 0);
        } else {
            assert_eq!(found, 1);
        }
    }

    assert_eq!(eliminated_existing, outcome.eliminated);
    assert_eq!(eliminated_modified, outcome.eliminated);
    assert_eq!(
        actions.get(ActionKind::Update).len() + actions.get(ActionKind::Delete).len(),
        outcome.unique_existing.len()
    );
}

#[test]
fn test_related_nodes_change_the_aggregate_degree() {
    let text = std::fs::read_to_string(fixture("nutrition.xml")).unwrap();
    let existing_doc = parse_str(&text).unwrap();
    let modified_doc =
        parse_str(&text.replace(r#"<sodium units="mg">2400"#, r#"<sodium units="mg">2300"#))
            .unwrap();
    let existing = foods(&existing_doc);
    let modified = foods(&modified_doc);
    let diff = engine();

    let fat_then_sodium: RelatedPaths = ["../daily-values/total-fat", "../daily-values/sodium"]
        .into_iter()
        .collect();
    let report = diff
        .aggregate_difference(&existing[0], &modified[0], &fat_then_sodium, &food_critical())
        .unwrap();
    assert_eq!(report.diff_count, 1);
    assert_eq!(report.diff_degree, 0.5);
    assert!(!report.diff_is_in_critical_nodes);

    let sodium_then_fat: RelatedPaths = ["../daily-values/sodium", "../daily-values/total-fat"]
        .into_iter()
        .collect();
    let report = diff
        .aggregate_difference(&existing[0], &modified[0], &sodium_then_fat, &food_critical())
        .unwrap();
    assert_eq!(report.diff_count, 1);
    assert_eq!(report.diff_degree, 0.25);

    // Related nodes keep identical foods out of the exact-match stage.
    let actions = diff
        .diff_forests(&existing, &modified, &fat_then_sodium, &food_critical())
        .unwrap();
    assert_eq!(actions.get(ActionKind::Update).len(), 4);
    assert_eq!(actions.node_count(), 4);
}

#[test]
fn test_missing_related_nodes_count_as_identical() {
    let existing_doc = load("nutrition.xml");
    let modified_doc = load("nutrition-mfr.xml");
    let existing = foods(&existing_doc);
    let modified = foods(&modified_doc);
    let related: RelatedPaths = ["../discounts/discount"].into_iter().collect();

    let report = engine()
        .aggregate_difference(&existing[0], &modified[0], &related, &food_critical())
        .unwrap();
    assert_eq!(report.diff_count, 0);
    assert_eq!(report.diff_degree, 0.0);
}

#[test]
fn test_ambiguous_related_path_is_an_error() {
    // Parents are held weakly: the documents must outlive the forests.
    let existing_doc = load("nutrition.xml");
    let modified_doc = load("nutrition-changes.xml");
    let existing = foods(&existing_doc);
    let modified = foods(&modified_doc);
    let related: RelatedPaths = ["../prices/price"].into_iter().collect();

    match engine().diff_forests(&existing, &modified, &related, &food_critical()) {
        Err(Error::AmbiguousRelatedNode { path, count }) => {
            assert_eq!(path, "../prices/price");
            assert_eq!(count, 4);
        }
        other => panic!("expected an ambiguity error, got {:?}", other.map(|a| a.node_count())),
    }
}

#[test]
fn test_degree_is_symmetric_on_real_foods() {
    let existing = foods(&load("nutrition.xml"));
    let modified = foods(&load("nutrition-changes.xml"));
    let diff = engine();

    for e in &existing {
        for m in &modified {
            let forward = diff.difference_degree(Some(e), Some(m), &food_critical());
            let backward = diff.difference_degree(Some(m), Some(e), &food_critical());
            assert_eq!(forward.diff_count, backward.diff_count);
            assert_eq!(forward.diff_degree, backward.diff_degree);
            assert_eq!(
                forward.diff_is_in_critical_nodes,
                backward.diff_is_in_critical_nodes
            );
        }
    }
}

#[test]
fn test_document_diff_and_report() {
    let existing = load("nutrition.xml");
    let modified = load("nutrition-changes.xml");
    let forests = [ForestSpec::new("food", "//nutrition/food")
        .with_critical("name")
        .with_critical("mfr")];

    let actions = diff_documents(Some(&existing), &modified, &forests).unwrap();
    let report = render_actions(&actions).unwrap();

    assert!(report.contains("<forest name=\"food\">"));
    let create = report.find("<create>").unwrap();
    let update = report.find("<update>").unwrap();
    let delete = report.find("<delete>").unwrap();
    assert!(create < update && update < delete);
    assert!(report[create..update].contains("<name>Cole Slaw</name>"));
    assert!(report[delete..].contains("<name>Bagels, New York Style</name>"));

    // Same inputs, same report.
    let again = diff_documents(Some(&existing), &modified, &forests).unwrap();
    assert_eq!(render_actions(&again).unwrap(), report);
}

#[test]
fn test_document_without_existing_version() {
    let modified = load("nutrition.xml");
    let forests = [ForestSpec::new("food", "//nutrition/food")];

    let actions = diff_documents(None, &modified, &forests).unwrap();
    let food: &ActionMap = actions.get("food").unwrap();
    assert_eq!(
        food_names(food.get(ActionKind::Create)),
        vec![
            "Avocado Dip",
            "Bagels, New York Style",
            "Beef Frankfurter, Quarter Pound",
            "Chicken Pot Pie"
        ]
    );
    assert!(!food.contains(ActionKind::Delete));
}

#[test]
fn test_minimum_degree_strategy_through_config() {
    let existing = parse_str(
        "<nutrition>\
           <food><name>Dip</name><serving>29</serving><sodium>210</sodium></food>\
           <food><name>Dip</name><serving>90</serving><sodium>900</sodium></food>\
         </nutrition>",
    )
    .unwrap();
    let modified = parse_str(
        "<nutrition><food><name>Dip</name><serving>29</serving><sodium>200</sodium></food></nutrition>",
    )
    .unwrap();
    let existing = foods(&existing);
    let modified = foods(&modified);
    let critical: CriticalFields = ["name"].into_iter().collect();

    let first_fit = ForestDiff::with_config(DiffConfig::new())
        .with_logger(NullLogger)
        .diff_forests(&existing, &modified, &RelatedPaths::new(), &critical)
        .unwrap();
    assert!(Rc::ptr_eq(&first_fit.get(ActionKind::Delete)[0], &existing[0]));

    let closest = ForestDiff::with_config(
        DiffConfig::new().with_strategy(MatchStrategy::MinimumDegree),
    )
    .with_logger(NullLogger)
    .diff_forests(&existing, &modified, &RelatedPaths::new(), &critical)
    .unwrap();
    assert!(Rc::ptr_eq(&closest.get(ActionKind::Delete)[0], &existing[1]));
}
