pub mod content;
pub mod node;

pub use content::{AlertLevel, AlertSpec, ContentSpec, FactContent, SetFactContent};
pub use node::{
    AlertAggregatorType, CategorySpec, CollectionLoopSpec, FlowNode, FlowSpec, GateSpec,
    ScreenSpec, SubSubcategorySpec, SubcategorySpec,
};
