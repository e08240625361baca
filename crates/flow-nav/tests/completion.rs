use serde_json::json;

use flow_nav::{
    AlertSpec, CategorySpec, ChecklistOptions, CollectionLoopSpec, CompiledFlow, Condition,
    Destination, FactContent, FactPath, FlowSpec, InMemoryFactStore, NavigationError,
    NavigationPosition, ScreenSpec, SubcategorySpec, checklist, compile,
    first_incomplete_screen, is_subcategory_complete,
};

fn path(raw: &str) -> FactPath {
    FactPath::parse(raw).expect("valid path")
}

fn cond(raw: &str) -> Condition {
    Condition::fact(path(raw))
}

fn input(route: &str, fact: &str) -> ScreenSpec {
    ScreenSpec::new(route).with_content(FactContent::new(path(fact)))
}

/// you > about, then you > filers: a name screen and a manual loop over `/filers`.
fn filers_flow() -> CompiledFlow {
    let spec = FlowSpec::new(
        "completion",
        vec![
            CategorySpec::new(
                "you",
                vec![
                    SubcategorySpec::new("about", vec![ScreenSpec::new("intro").into()])
                        .complete_if(cond("/aboutDone"))
                        .into(),
                    SubcategorySpec::new(
                        "filers",
                        vec![
                            input("household", "/householdName").into(),
                            CollectionLoopSpec::new(
                                "filers",
                                path("/filers"),
                                vec![
                                    input("first-name", "/filers/*/firstName").into(),
                                    input("nickname", "/filers/*/nickname")
                                        .with_content(
                                            FactContent::new(path("/filers/*/middle")).optional(),
                                        )
                                        .into(),
                                ],
                            )
                            .completed_when(cond("/filers/*/isDone"))
                            .into(),
                        ],
                    )
                    .complete_if(cond("/filersDone"))
                    .into(),
                ],
            )
            .into(),
        ],
    );
    compile(&spec).expect("compile")
}

#[test]
fn subcategory_waits_for_every_collection_item() {
    let flow = filers_flow();
    let mut store = InMemoryFactStore::new()
        .with("/filersDone", true)
        .with("/filers", json!(["a", "b"]))
        .with("/filers/#a/isDone", true);

    assert!(!is_subcategory_complete(&flow, &store, "/flow/you/filers").unwrap());

    store.set("/filers/#b/isDone", true);
    assert!(is_subcategory_complete(&flow, &store, "/flow/you/filers").unwrap());

    store.remove("/filersDone");
    assert!(!is_subcategory_complete(&flow, &store, "/flow/you/filers").unwrap());
}

#[test]
fn unknown_subcategory_is_an_error() {
    let flow = filers_flow();
    let store = InMemoryFactStore::new();
    assert_eq!(
        is_subcategory_complete(&flow, &store, "/flow/you/nope").unwrap_err(),
        NavigationError::UnknownSubcategory {
            route: "/flow/you/nope".into()
        }
    );
}

#[test]
fn resumes_at_first_missing_input() {
    let flow = filers_flow();
    let mut store = InMemoryFactStore::new().with("/filers", json!(["a", "b"]));

    assert_eq!(
        first_incomplete_screen(&flow, &store, "/flow/you/filers").unwrap(),
        Some(NavigationPosition::new("/flow/you/filers/household"))
    );

    store.set("/householdName", "Lovelace");
    store.set("/filers/#a/firstName", "Ada");
    assert_eq!(
        first_incomplete_screen(&flow, &store, "/flow/you/filers").unwrap(),
        Some(NavigationPosition::in_item("/flow/you/filers/nickname", "a"))
    );

    // Optional inputs never hold the user back, and finished items are skipped.
    store.set("/filers/#a/nickname", "Countess");
    store.set("/filers/#b/isDone", true);
    assert_eq!(
        first_incomplete_screen(&flow, &store, "/flow/you/filers").unwrap(),
        None
    );
}

#[test]
fn placeholders_do_not_count_as_answers() {
    let flow = filers_flow();
    let mut store = InMemoryFactStore::new();
    store.set_placeholder("/householdName", "Household");
    assert_eq!(
        first_incomplete_screen(&flow, &store, "/flow/you/filers").unwrap(),
        Some(NavigationPosition::new("/flow/you/filers/household"))
    );
}

fn checklist_flow() -> CompiledFlow {
    let spec = FlowSpec::new(
        "checklist",
        vec![
            CategorySpec::new(
                "you",
                vec![
                    SubcategorySpec::new("about", vec![input("name", "/name").into()])
                        .complete_if(cond("/aboutDone"))
                        .into(),
                    SubcategorySpec::new("income", vec![ScreenSpec::new("wages").into()])
                        .complete_if(cond("/incomeDone"))
                        .into(),
                    SubcategorySpec::new(
                        "credits",
                        vec![
                            ScreenSpec::new("eitc")
                                .with_content(
                                    AlertSpec::error("alerts.eitc.missing_income")
                                        .with_condition(cond("/noIncome")),
                                )
                                .into(),
                        ],
                    )
                    .complete_if(cond("/creditsDone"))
                    .into(),
                ],
            )
            .into(),
            CategorySpec::new(
                "knockout",
                vec![SubcategorySpec::new("ineligible", vec![ScreenSpec::new("sorry").into()]).into()],
            )
            .into(),
        ],
    );
    compile(&spec).expect("compile")
}

#[test]
fn checklist_marks_the_next_section() {
    let flow = checklist_flow();
    let store = InMemoryFactStore::new()
        .with("/aboutDone", true)
        .with("/name", "Ada");

    let categories = checklist(&flow, &store, &ChecklistOptions::default()).unwrap();
    insta::assert_json_snapshot!(categories, @r###"
    [
      {
        "route": "/flow/you",
        "subcategories": [
          {
            "route": "/flow/you/about",
            "is_complete": true,
            "is_next": false,
            "is_started_but_not_complete": false,
            "has_incomplete_collection_item": false,
            "destination": {
              "kind": "subcategory_data_view",
              "subcategory_route": "/flow/you/about"
            }
          },
          {
            "route": "/flow/you/income",
            "is_complete": false,
            "is_next": true,
            "is_started_but_not_complete": false,
            "has_incomplete_collection_item": false,
            "destination": {
              "kind": "screen",
              "route": "/flow/you/income/wages"
            }
          },
          {
            "route": "/flow/you/credits",
            "is_complete": false,
            "is_next": false,
            "is_started_but_not_complete": false,
            "has_incomplete_collection_item": false
          }
        ]
      }
    ]
    "###);
}

#[test]
fn completion_is_sequential() {
    let flow = checklist_flow();
    // Credits are answered but income is not, so credits cannot count yet.
    let store = InMemoryFactStore::new()
        .with("/aboutDone", true)
        .with("/creditsDone", true);

    let categories = checklist(&flow, &store, &ChecklistOptions::default()).unwrap();
    let credits = &categories[0].subcategories[2];
    assert_eq!(credits.route, "/flow/you/credits");
    assert!(!credits.is_complete);
    assert!(!credits.is_next);
    assert_eq!(credits.destination, None);
}

#[test]
fn checklist_reports_alerts_of_active_sections() {
    let flow = checklist_flow();
    let store = InMemoryFactStore::new()
        .with("/aboutDone", true)
        .with("/incomeDone", true)
        .with("/noIncome", true);

    let categories = checklist(&flow, &store, &ChecklistOptions::default()).unwrap();
    let credits = &categories[0].subcategories[2];
    assert!(credits.is_next);
    assert_eq!(credits.alerts.errors.len(), 1);
    assert_eq!(credits.alerts.errors[0].i18n_key, "alerts.eitc.missing_income");
    assert_eq!(
        credits.destination,
        Some(Destination::Screen(NavigationPosition::new(
            "/flow/you/credits/eitc"
        )))
    );
}

#[test]
fn knockout_category_is_opt_in() {
    let flow = checklist_flow();
    let store = InMemoryFactStore::new();

    let default = checklist(&flow, &store, &ChecklistOptions::default()).unwrap();
    assert_eq!(default.len(), 1);

    let everything = ChecklistOptions {
        excluded_categories: Vec::new(),
    };
    let all = checklist(&flow, &store, &everything).unwrap();
    let routes: Vec<_> = all.iter().map(|category| category.route.as_str()).collect();
    assert_eq!(routes, ["/flow/you", "/flow/knockout"]);
}

#[test]
fn started_collection_marks_incomplete_item() {
    let flow = filers_flow();
    let store = InMemoryFactStore::new()
        .with("/aboutDone", true)
        .with("/filers", json!(["a"]));

    let categories = checklist(&flow, &store, &ChecklistOptions::default()).unwrap();
    let filers = &categories[0].subcategories[1];
    assert_eq!(filers.route, "/flow/you/filers");
    assert!(filers.is_next);
    assert!(filers.is_started_but_not_complete);
    assert!(filers.has_incomplete_collection_item);
    assert_eq!(
        filers.destination,
        Some(Destination::SubcategoryDataView {
            subcategory_route: "/flow/you/filers".into(),
            section: None,
        })
    );
}

#[test]
fn incomplete_items_only_flag_sections_after_finished_ones() {
    let flow = filers_flow();
    let mut store = InMemoryFactStore::new().with("/filers", json!(["a"]));

    // About is still next, so filers is not reachable yet.
    let categories = checklist(&flow, &store, &ChecklistOptions::default()).unwrap();
    let filers = &categories[0].subcategories[1];
    assert!(!filers.is_next);
    assert!(!filers.has_incomplete_collection_item);

    store.set("/aboutDone", true);
    let categories = checklist(&flow, &store, &ChecklistOptions::default()).unwrap();
    assert!(categories[0].subcategories[1].has_incomplete_collection_item);

    // The first section of a category has no finished section before it.
    let about = &categories[0].subcategories[0];
    assert!(about.is_complete);
    assert!(!about.has_incomplete_collection_item);
}
