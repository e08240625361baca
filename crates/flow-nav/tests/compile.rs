use std::collections::BTreeSet;

use flow_nav::{
    AlertSpec, CategorySpec, CollectionLoopSpec, Condition, FactContent, FactPath, FlowError,
    FlowNode, FlowSpec, GateSpec, ScreenSpec, SubSubcategorySpec, SubcategorySpec, compile,
    compile_with_dictionary,
};

fn path(raw: &str) -> FactPath {
    FactPath::parse(raw).expect("valid path")
}

fn screen(route: &str) -> FlowNode {
    ScreenSpec::new(route).into()
}

fn single_subcategory(children: Vec<FlowNode>) -> FlowSpec {
    FlowSpec::new(
        "test",
        vec![
            CategorySpec::new("you", vec![SubcategorySpec::new("about", children).into()])
                .into(),
        ],
    )
}

#[test]
fn screens_are_indexed_in_document_order() {
    let spec = single_subcategory(vec![
        screen("intro"),
        GateSpec::new(
            Condition::fact(path("/wantsMore")),
            vec![
                SubSubcategorySpec::new("details", vec![screen("more"), screen("even-more")])
                    .into(),
            ],
        )
        .into(),
        CollectionLoopSpec::new("pets", path("/pets"), vec![screen("pet-name")]).into(),
        screen("outro"),
    ]);
    let flow = compile(&spec).expect("compile");

    let routes: Vec<_> = flow.screens().iter().map(|screen| screen.route.as_str()).collect();
    assert_eq!(
        routes,
        [
            "/flow/you/about/intro",
            "/flow/you/about/more",
            "/flow/you/about/even-more",
            "/flow/you/about/pet-name",
            "/flow/you/about/outro",
        ]
    );
    for (index, screen) in flow.screens().iter().enumerate() {
        assert_eq!(screen.index, index);
        assert_eq!(flow.screen(&screen.route), Some(screen));
    }

    let more = flow.screen("/flow/you/about/more").expect("screen");
    assert_eq!(more.conditions.len(), 1, "gate condition is inherited");
    assert_eq!(
        more.sub_subcategory_route.as_deref(),
        Some("/flow/you/about/details")
    );
    assert_eq!(more.category_route, "/flow/you");

    let pets = flow.collection_loop("pets").expect("loop");
    assert_eq!(pets.screens, [3]);
    assert_eq!(pets.subcategory_route, "/flow/you/about");

    let subcategory = flow.subcategory("/flow/you/about").expect("subcategory");
    assert_eq!(subcategory.screens, [0, 1, 2, 3, 4]);
    assert_eq!(subcategory.collection_loops, ["pets"]);
    assert_eq!(subcategory.sub_subcategories, ["/flow/you/about/details"]);
}

#[test]
fn nested_gates_conjoin_outer_first() {
    let outer = Condition::fact(path("/outer"));
    let inner = Condition::fact(path("/inner"));
    let own = Condition::fact(path("/own"));
    let spec = single_subcategory(vec![
        GateSpec::new(
            outer.clone(),
            vec![
                GateSpec::new(
                    inner.clone(),
                    vec![ScreenSpec::new("deep").with_condition(own.clone()).into()],
                )
                .into(),
            ],
        )
        .into(),
    ]);
    let flow = compile(&spec).expect("compile");
    let deep = flow.screen("/flow/you/about/deep").expect("screen");
    assert_eq!(deep.conditions, [outer, inner, own]);
}

#[test]
fn compiling_twice_yields_identical_flows() {
    let spec = single_subcategory(vec![screen("a"), screen("b")]);
    assert_eq!(compile(&spec).expect("first"), compile(&spec).expect("second"));
}

#[test]
fn split_sub_subcategory_is_one_section() {
    let spec = single_subcategory(vec![
        SubSubcategorySpec::new("basic", vec![screen("name")]).into(),
        SubSubcategorySpec::new("contact", vec![screen("phone")]).into(),
        SubSubcategorySpec::new("basic", vec![screen("extra")]).into(),
    ]);
    let flow = compile(&spec).expect("compile");
    let basic = flow
        .sub_subcategory("/flow/you/about/basic")
        .expect("section");
    assert_eq!(basic.screens, [0, 2]);
    assert_eq!(basic.section, "basic");
    assert_eq!(
        flow.subcategory("/flow/you/about")
            .expect("subcategory")
            .sub_subcategories,
        ["/flow/you/about/basic", "/flow/you/about/contact"]
    );
}

#[test]
fn duplicate_routes_are_rejected() {
    let err = compile(&single_subcategory(vec![screen("a"), screen("a")])).unwrap_err();
    assert_eq!(
        err,
        FlowError::DuplicateScreenRoute {
            route: "/flow/you/about/a".into()
        }
    );

    let spec = FlowSpec::new(
        "test",
        vec![
            CategorySpec::new("you", vec![]).into(),
            CategorySpec::new("you", vec![]).into(),
        ],
    );
    assert!(matches!(
        compile(&spec),
        Err(FlowError::DuplicateCategoryRoute { .. })
    ));

    let spec = single_subcategory(vec![
        CollectionLoopSpec::new("pets", path("/pets"), vec![screen("a")]).into(),
        CollectionLoopSpec::new("pets", path("/pets"), vec![screen("b")]).into(),
    ]);
    assert_eq!(
        compile(&spec).unwrap_err(),
        FlowError::DuplicateLoopName {
            loop_name: "pets".into()
        }
    );
}

#[test]
fn misplaced_nodes_are_rejected() {
    let spec = FlowSpec::new("test", vec![screen("orphan")]);
    assert!(matches!(
        compile(&spec),
        Err(FlowError::Misplaced { node: "screen", .. })
    ));

    let spec = FlowSpec::new(
        "test",
        vec![
            CategorySpec::new(
                "you",
                vec![SubcategorySpec::new("a", vec![SubcategorySpec::new("b", vec![]).into()]).into()],
            )
            .into(),
        ],
    );
    assert!(matches!(
        compile(&spec),
        Err(FlowError::Misplaced {
            node: "subcategory",
            ..
        })
    ));

    let spec = single_subcategory(vec![
        SubSubcategorySpec::new("x", vec![SubSubcategorySpec::new("y", vec![]).into()]).into(),
    ]);
    assert!(matches!(
        compile(&spec),
        Err(FlowError::Misplaced {
            node: "sub_subcategory",
            ..
        })
    ));
}

#[test]
fn loop_structure_is_validated() {
    let spec = single_subcategory(vec![
        CollectionLoopSpec::new(
            "outer",
            path("/outer"),
            vec![CollectionLoopSpec::new("inner", path("/inner"), vec![]).into()],
        )
        .into(),
    ]);
    assert_eq!(
        compile(&spec).unwrap_err(),
        FlowError::NestedCollectionLoop {
            outer: "outer".into(),
            inner: "inner".into(),
        }
    );

    let spec = single_subcategory(vec![
        CollectionLoopSpec::new("w2s", path("/w2s"), vec![screen("w2")])
            .inner()
            .into(),
    ]);
    assert!(matches!(
        compile(&spec),
        Err(FlowError::InnerLoopOutsideSubSubcategory { .. })
    ));

    let spec = single_subcategory(vec![
        SubSubcategorySpec::new(
            "jobs",
            vec![
                CollectionLoopSpec::new("w2s", path("/w2s"), vec![screen("w2")])
                    .inner()
                    .into(),
            ],
        )
        .into(),
    ]);
    let flow = compile(&spec).expect("compile");
    assert_eq!(
        flow.collection_loop("w2s")
            .expect("loop")
            .sub_subcategory_route
            .as_deref(),
        Some("/flow/you/about/jobs")
    );

    let spec = single_subcategory(vec![
        CollectionLoopSpec::new("w2s", path("/filers/*/w2s"), vec![]).into(),
    ]);
    assert!(matches!(
        compile(&spec),
        Err(FlowError::AbstractCollectionPath { .. })
    ));
}

#[test]
fn wildcard_paths_need_a_collection_context() {
    let spec = single_subcategory(vec![
        ScreenSpec::new("blind")
            .with_condition(Condition::fact(path("/filers/*/isBlind")))
            .into(),
    ]);
    assert_eq!(
        compile(&spec).unwrap_err(),
        FlowError::MissingCollectionContext {
            owner: "/flow/you/about/blind".into(),
            path: "/filers/*/isBlind".into(),
        }
    );

    let spec = FlowSpec::new(
        "test",
        vec![
            CategorySpec::new(
                "you",
                vec![
                    SubcategorySpec::new(
                        "about",
                        vec![
                            ScreenSpec::new("blind")
                                .with_content(FactContent::new(path("/filers/*/isBlind")))
                                .into(),
                        ],
                    )
                    .with_collection_context(path("/primaryFiler"))
                    .into(),
                ],
            )
            .into(),
        ],
    );
    compile(&spec).expect("context makes the wildcard resolvable");
}

#[test]
fn dictionary_rejects_unknown_paths() {
    let spec = single_subcategory(vec![
        ScreenSpec::new("name")
            .with_content(FactContent::new(path("/name")))
            .with_content(AlertSpec::warning("alerts.nickname").with_condition(Condition::fact(
                path("/nickname"),
            )))
            .into(),
    ]);
    let mut dictionary: BTreeSet<FactPath> = [path("/name")].into_iter().collect();
    assert_eq!(
        compile_with_dictionary(&spec, &dictionary).unwrap_err(),
        FlowError::UnknownFactPath {
            owner: "/flow/you/about/name".into(),
            path: "/nickname".into(),
        }
    );

    dictionary.insert(path("/nickname"));
    let flow = compile_with_dictionary(&spec, &dictionary).expect("compile");
    assert_eq!(
        flow.screens_referencing(&path("/name"))
            .map(|screen| screen.route.as_str())
            .collect::<Vec<_>>(),
        ["/flow/you/about/name"]
    );
}

#[test]
fn route_fragments_are_validated() {
    let err = compile(&single_subcategory(vec![screen("has space")])).unwrap_err();
    assert_eq!(
        err,
        FlowError::InvalidRoute {
            route: "has space".into()
        }
    );
}

#[test]
fn flow_definitions_deserialize_from_json() {
    let spec: FlowSpec = serde_json::from_value(serde_json::json!({
        "id": "returns",
        "version": "2",
        "children": [{
            "type": "category",
            "route": "you",
            "children": [{
                "type": "subcategory",
                "route": "about",
                "complete_if": [{ "operator": "is_complete", "path": "/name" }],
                "children": [
                    { "type": "screen", "route": "name",
                      "content": [{ "kind": "fact", "path": "/name" }] },
                    { "type": "gate", "condition": "/wantsPets", "children": [
                        { "type": "collection_loop", "loop_name": "pets",
                          "collection": "/pets", "auto_iterate": true,
                          "children": [{ "type": "screen", "route": "pet" }] }
                    ]}
                ]
            }]
        }]
    }))
    .expect("deserialize");

    let flow = compile(&spec).expect("compile");
    assert_eq!(flow.id(), "returns");
    assert_eq!(flow.screens().len(), 2);
    let pet = flow.screen("/flow/you/about/pet").expect("pet");
    assert_eq!(pet.collection_loop.as_deref(), Some("pets"));
    assert_eq!(pet.conditions, [Condition::fact(path("/wantsPets"))]);
    assert!(flow.collection_loop("pets").expect("loop").auto_iterate);
}
