//! Navigation engine for large declarative questionnaires.
//!
//! A [`FlowSpec`] tree of categories, subcategories, gates, screens and
//! collection loops is compiled once into a [`CompiledFlow`]. Routing,
//! completion and alert queries then read a [`FactStore`] snapshot and never
//! mutate anything, so a compiled flow can be shared freely.

pub mod alerts;
pub mod compile;
pub mod completion;
pub mod condition;
pub mod expand;
pub mod facts;
pub mod flow;
pub mod path;
pub mod router;
pub mod spec;

pub use alerts::{Alert, AlertSummary, collect_alerts};
pub use compile::{FLOW_ROUTE_PREFIX, FlowError, compile, compile_with_dictionary};
pub use completion::{
    ChecklistCategory, ChecklistOptions, ChecklistSubcategory, checklist,
    first_incomplete_screen, is_subcategory_complete,
};
pub use condition::{CombinatorKind, Condition, ConditionError, ConditionOperator};
pub use expand::{LoopExpansion, LoopItem, expand, expand_item};
pub use facts::{FactDictionary, FactError, FactResult, FactStore, InMemoryFactStore};
pub use flow::{
    CategoryConfig, CollectionLoopConfig, CompiledFlow, ScreenConfig, ScreenIndex,
    SubSubcategoryConfig, SubcategoryConfig,
};
pub use path::{AbstractPath, CollectionId, ConcretePath, FactPath, PathError};
pub use router::{
    Destination, NavigationError, NavigationOptions, NavigationPosition,
    first_screen_of_loop_item, first_screen_of_subcategory, next_after_loop, next_screen,
    previous_screen,
};
pub use spec::{
    AlertAggregatorType, AlertLevel, AlertSpec, CategorySpec, CollectionLoopSpec, ContentSpec,
    FactContent, FlowNode, FlowSpec, GateSpec, ScreenSpec, SetFactContent, SubSubcategorySpec,
    SubcategorySpec,
};

/// JSON Schema describing flow definition files.
pub fn flow_schema() -> schemars::Schema {
    schemars::schema_for!(FlowSpec)
}
