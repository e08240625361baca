use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::path::FactPath;
use crate::spec::content::ContentSpec;

/// Root of an authored flow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FlowSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl FlowSpec {
    pub fn new(id: impl Into<String>, children: Vec<FlowNode>) -> Self {
        Self {
            id: id.into(),
            version: None,
            children,
        }
    }
}

/// Every node kind that may appear in the authored tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowNode {
    Category(CategorySpec),
    Subcategory(SubcategorySpec),
    SubSubcategory(SubSubcategorySpec),
    Gate(GateSpec),
    Screen(ScreenSpec),
    CollectionLoop(CollectionLoopSpec),
}

impl FlowNode {
    pub fn kind(&self) -> &'static str {
        match self {
            FlowNode::Category(_) => "category",
            FlowNode::Subcategory(_) => "subcategory",
            FlowNode::SubSubcategory(_) => "sub_subcategory",
            FlowNode::Gate(_) => "gate",
            FlowNode::Screen(_) => "screen",
            FlowNode::CollectionLoop(_) => "collection_loop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CategorySpec {
    pub route: String,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl CategorySpec {
    pub fn new(route: impl Into<String>, children: Vec<FlowNode>) -> Self {
        Self {
            route: route.into(),
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubcategorySpec {
    pub route: String,
    /// All must pass for the section to count as complete.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub complete_if: Vec<Condition>,
    /// At least one must pass for the section to be shown at all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub display_only_if: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_context: Option<FactPath>,
    #[serde(default)]
    pub skip_data_view: bool,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl SubcategorySpec {
    pub fn new(route: impl Into<String>, children: Vec<FlowNode>) -> Self {
        Self {
            route: route.into(),
            complete_if: Vec::new(),
            display_only_if: Vec::new(),
            collection_context: None,
            skip_data_view: false,
            children,
        }
    }

    pub fn complete_if(mut self, condition: Condition) -> Self {
        self.complete_if.push(condition);
        self
    }

    pub fn display_only_if(mut self, condition: Condition) -> Self {
        self.display_only_if.push(condition);
        self
    }

    pub fn with_collection_context(mut self, path: FactPath) -> Self {
        self.collection_context = Some(path);
        self
    }

    pub fn skip_data_view(mut self) -> Self {
        self.skip_data_view = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubSubcategorySpec {
    pub route: String,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl SubSubcategorySpec {
    pub fn new(route: impl Into<String>, children: Vec<FlowNode>) -> Self {
        Self {
            route: route.into(),
            children,
        }
    }
}

/// Hides its whole subtree while `condition` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GateSpec {
    pub condition: Condition,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl GateSpec {
    pub fn new(condition: Condition, children: Vec<FlowNode>) -> Self {
        Self {
            condition,
            children,
        }
    }
}

/// Which subtree an alert summary on a screen covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertAggregatorType {
    #[default]
    Screen,
    Sections,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScreenSpec {
    pub route: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Screens with this unset are only reachable by direct link.
    #[serde(default = "default_true")]
    pub route_automatically: bool,
    #[serde(default)]
    pub act_as_data_view: bool,
    #[serde(default)]
    pub is_knockout: bool,
    #[serde(default)]
    pub alert_aggregator_type: AlertAggregatorType,
}

fn default_true() -> bool {
    true
}

impl ScreenSpec {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            content: Vec::new(),
            condition: None,
            route_automatically: true,
            act_as_data_view: false,
            is_knockout: false,
            alert_aggregator_type: AlertAggregatorType::Screen,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_content(mut self, content: impl Into<ContentSpec>) -> Self {
        self.content.push(content.into());
        self
    }

    pub fn manual_only(mut self) -> Self {
        self.route_automatically = false;
        self
    }

    pub fn act_as_data_view(mut self) -> Self {
        self.act_as_data_view = true;
        self
    }

    pub fn knockout(mut self) -> Self {
        self.is_knockout = true;
        self
    }

    pub fn with_alert_aggregator(mut self, kind: AlertAggregatorType) -> Self {
        self.alert_aggregator_type = kind;
        self
    }
}

/// Template instantiated once per member of `collection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CollectionLoopSpec {
    pub loop_name: String,
    pub collection: FactPath,
    #[serde(default)]
    pub auto_iterate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_item_completed_condition: Option<Condition>,
    /// Loop lives inside a sub-subcategory hub rather than spanning the subcategory.
    #[serde(default)]
    pub is_inner: bool,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl CollectionLoopSpec {
    pub fn new(loop_name: impl Into<String>, collection: FactPath, children: Vec<FlowNode>) -> Self {
        Self {
            loop_name: loop_name.into(),
            collection,
            auto_iterate: false,
            collection_item_completed_condition: None,
            is_inner: false,
            children,
        }
    }

    pub fn auto_iterate(mut self) -> Self {
        self.auto_iterate = true;
        self
    }

    pub fn inner(mut self) -> Self {
        self.is_inner = true;
        self
    }

    pub fn completed_when(mut self, condition: Condition) -> Self {
        self.collection_item_completed_condition = Some(condition);
        self
    }
}

impl From<CategorySpec> for FlowNode {
    fn from(spec: CategorySpec) -> Self {
        FlowNode::Category(spec)
    }
}

impl From<SubcategorySpec> for FlowNode {
    fn from(spec: SubcategorySpec) -> Self {
        FlowNode::Subcategory(spec)
    }
}

impl From<SubSubcategorySpec> for FlowNode {
    fn from(spec: SubSubcategorySpec) -> Self {
        FlowNode::SubSubcategory(spec)
    }
}

impl From<GateSpec> for FlowNode {
    fn from(spec: GateSpec) -> Self {
        FlowNode::Gate(spec)
    }
}

impl From<ScreenSpec> for FlowNode {
    fn from(spec: ScreenSpec) -> Self {
        FlowNode::Screen(spec)
    }
}

impl From<CollectionLoopSpec> for FlowNode {
    fn from(spec: CollectionLoopSpec) -> Self {
        FlowNode::CollectionLoop(spec)
    }
}
