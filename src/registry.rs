//! Closed registries of built-in UI components and decorator names.
//!
//! These tables are process-wide constants built once on first use; nothing
//! exposes a way to mutate them.

use lazy_static::lazy_static;
use std::collections::HashSet;

use crate::ast::Decorator;

// ═══════════════════════════════════════════════════════════════════════════════
// RUNTIME NAMES
// ═══════════════════════════════════════════════════════════════════════════════

pub const VIEW: &str = "View";
pub const BUILDER_PARAM: &str = "BuilderParam";
pub const BUILDER_PARAM_NAME: &str = "__builder__";
pub const CREATE_STATE: &str = "createState";
pub const OBSERVED_PROPERTY_SIMPLE: &str = "ObservedPropertySimple";
pub const SYNCHED_PROPERTY_ONE_WAY: &str = "SynchedPropertySimpleOneWay";
pub const SYNCHED_PROPERTY_TWO_WAY: &str = "SynchedPropertySimpleTwoWay";
pub const ITEM_GEN_FUNCTION: &str = "__itemGenFunction__";
pub const KEY_GEN_FUNCTION: &str = "__keyGenFunction__";
pub const INITIAL_RENDER: &str = "initialRender";
pub const RENDER: &str = "render";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENTS
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    /// Components that admit a child block.
    pub static ref CONTAINER_COMPONENTS: HashSet<&'static str> = [
        "Column", "Row", "Stack", "Flex", "Grid", "GridRow", "GridCol", "GridItem",
        "List", "ListItem", "ListItemGroup", "Scroll", "Swiper", "Tabs", "TabContent",
        "Navigation", "Navigator", "NavDestination", "RelativeContainer", "WaterFlow",
        "FlowItem", "SideBarContainer", "Panel", "Refresh", "Badge", "Counter",
        "ForEach", "LazyForEach", "If",
    ]
    .into_iter()
    .collect();

    /// Leaf components.
    pub static ref ATOMIC_COMPONENTS: HashSet<&'static str> = [
        "Text", "Span", "Image", "ImageSpan", "TextInput", "TextArea", "Button",
        "Toggle", "Checkbox", "CheckboxGroup", "Radio", "Slider", "Progress",
        "LoadingProgress", "Rating", "Select", "Search", "Divider", "Blank",
        "DatePicker", "TimePicker", "TextPicker", "QRCode", "Marquee", "Web",
        "Video", "XComponent", "Canvas", "Circle", "Ellipse", "Line", "Polyline",
        "Polygon", "Path", "Rect", "Shape", "AlphabetIndexer", "PatternLock",
        "Gauge", "DataPanel", "TextClock", "TextTimer", "Stepper",
    ]
    .into_iter()
    .collect();

    /// Class-level decorators that make a declaration transformable.
    pub static ref COMPONENT_DECORATORS: HashSet<&'static str> =
        ["Component", "Entry", "Preview", "CustomDialog"].into_iter().collect();

    /// Other class-level decorators, recognized but never transformed.
    pub static ref CLASS_DECORATORS: HashSet<&'static str> =
        ["ComponentV2", "Reusable", "Sendable"].into_iter().collect();

    pub static ref STATE_DECORATORS: HashSet<&'static str> = [
        "State", "Prop", "Link", "Provide", "Consume", "ObjectLink", "StorageProp",
        "StorageLink", "LocalStorageProp", "LocalStorageLink",
    ]
    .into_iter()
    .collect();

    pub static ref V2_STATE_DECORATORS: HashSet<&'static str> =
        ["Local", "Param", "Once", "Event", "Consumer", "Provider"].into_iter().collect();

    pub static ref OBSERVER_DECORATORS: HashSet<&'static str> =
        ["Observed", "ObservedV2", "Track"].into_iter().collect();

    pub static ref METHOD_DECORATORS: HashSet<&'static str> = [
        "Builder", "LocalBuilder", "BuilderParam", "Extend", "AnimatableExtend",
        "Styles", "Watch", "Require", "Env",
    ]
    .into_iter()
    .collect();
}

pub fn is_builtin_component(name: &str) -> bool {
    CONTAINER_COMPONENTS.contains(name) || ATOMIC_COMPONENTS.contains(name)
}

pub fn is_container_component(name: &str) -> bool {
    CONTAINER_COMPONENTS.contains(name)
}

pub fn is_atomic_component(name: &str) -> bool {
    ATOMIC_COMPONENTS.contains(name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Purpose group of a known decorator name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoratorCategory {
    Component,
    Class,
    State,
    V2State,
    Observer,
    Method,
}

/// Decorators the transformers dispatch on. Anything else is carried through
/// the tree untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoratorKind {
    Component,
    Entry,
    Preview,
    CustomDialog,
    State(StateDecorator),
    Builder,
}

impl DecoratorKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "Component" => DecoratorKind::Component,
            "Entry" => DecoratorKind::Entry,
            "Preview" => DecoratorKind::Preview,
            "CustomDialog" => DecoratorKind::CustomDialog,
            "Builder" => DecoratorKind::Builder,
            other => DecoratorKind::State(StateDecorator::from_name(other)?),
        };
        Some(kind)
    }
}

pub fn decorator_category(name: &str) -> Option<DecoratorCategory> {
    if COMPONENT_DECORATORS.contains(name) {
        Some(DecoratorCategory::Component)
    } else if CLASS_DECORATORS.contains(name) {
        Some(DecoratorCategory::Class)
    } else if STATE_DECORATORS.contains(name) {
        Some(DecoratorCategory::State)
    } else if V2_STATE_DECORATORS.contains(name) {
        Some(DecoratorCategory::V2State)
    } else if OBSERVER_DECORATORS.contains(name) {
        Some(DecoratorCategory::Observer)
    } else if METHOD_DECORATORS.contains(name) {
        Some(DecoratorCategory::Method)
    } else {
        None
    }
}

/// Reactive property decorators that rewrite a property into a backing field
/// plus accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateDecorator {
    State,
    Prop,
    Link,
    Provide,
    Consume,
}

impl StateDecorator {
    /// Resolution order when a property carries more than one of these.
    pub const PRECEDENCE: [StateDecorator; 5] = [
        StateDecorator::State,
        StateDecorator::Prop,
        StateDecorator::Link,
        StateDecorator::Provide,
        StateDecorator::Consume,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "State" => Some(StateDecorator::State),
            "Prop" => Some(StateDecorator::Prop),
            "Link" => Some(StateDecorator::Link),
            "Provide" => Some(StateDecorator::Provide),
            "Consume" => Some(StateDecorator::Consume),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StateDecorator::State => "State",
            StateDecorator::Prop => "Prop",
            StateDecorator::Link => "Link",
            StateDecorator::Provide => "Provide",
            StateDecorator::Consume => "Consume",
        }
    }

    /// First decorator in `PRECEDENCE` order present in `decorators`.
    pub fn resolve(decorators: &[Decorator]) -> Option<Self> {
        Self::PRECEDENCE
            .into_iter()
            .find(|kind| decorators.iter().any(|d| d.name == kind.name()))
    }

    pub fn wrapper_type(self) -> &'static str {
        match self {
            StateDecorator::Prop => SYNCHED_PROPERTY_ONE_WAY,
            StateDecorator::Link => SYNCHED_PROPERTY_TWO_WAY,
            StateDecorator::State | StateDecorator::Provide | StateDecorator::Consume => {
                OBSERVED_PROPERTY_SIMPLE
            }
        }
    }

    /// Prop and Link values are supplied by the parent component.
    pub fn keeps_initializer(self) -> bool {
        matches!(self, StateDecorator::Provide | StateDecorator::Consume)
    }

    pub fn needs_constructor_init(self) -> bool {
        self == StateDecorator::State
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_and_atomic_are_disjoint() {
        for name in CONTAINER_COMPONENTS.iter() {
            assert!(!ATOMIC_COMPONENTS.contains(name), "{} in both", name);
        }
        assert!(is_builtin_component("Text"));
        assert!(is_container_component("Column"));
        assert!(is_atomic_component("Button"));
        assert!(!is_builtin_component("MyCard"));
    }

    #[test]
    fn decorator_kind_from_name() {
        assert_eq!(
            DecoratorKind::from_name("Link"),
            Some(DecoratorKind::State(StateDecorator::Link))
        );
        assert_eq!(DecoratorKind::from_name("Builder"), Some(DecoratorKind::Builder));
        assert_eq!(DecoratorKind::from_name("Watch"), None);
        assert_eq!(decorator_category("Watch"), Some(DecoratorCategory::Method));
        assert_eq!(decorator_category("Local"), Some(DecoratorCategory::V2State));
        assert_eq!(decorator_category("Nope"), None);
    }

    #[test]
    fn resolve_uses_precedence_not_source_order() {
        let decorators = vec![Decorator::new("Consume"), Decorator::new("Prop")];
        assert_eq!(StateDecorator::resolve(&decorators), Some(StateDecorator::Prop));
        assert_eq!(StateDecorator::resolve(&[Decorator::new("Watch")]), None);
    }
}
