//! Output-file grouping of declarations.

use sharpgen_ir::{ClassDecl, Decl, DeclarationForest, EnumDecl, FunctionDecl, RecordKind};

/// Class names treated as value types even when declared `class`.
const MATH_TYPE_NAMES: &[&str] = &[
    "Vector2", "Vector3", "Vector4", "Quaternion", "Transform", "Matrix3x3", "Matrix3x4",
    "Matrix4x4", "Color", "Aabb", "Obb", "Plane", "Sphere", "Uuid",
];

/// Base classes that mark an event bus interface.
const BUS_BASES: &[&str] = &["EBusTraits", "ComponentBus"];

const BUS_SUFFIXES: &[&str] = &["Requests", "Notifications"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    ValueTypes,
    Entities,
    Functions,
    Enums,
    EventBuses,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::ValueTypes,
        Category::Entities,
        Category::Functions,
        Category::Enums,
        Category::EventBuses,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Category::ValueTypes => "ValueTypes.cs",
            Category::Entities => "Entities.cs",
            Category::Functions => "Functions.cs",
            Category::Enums => "Enums.cs",
            Category::EventBuses => "EventBuses.cs",
        }
    }
}

pub fn classify(class: &ClassDecl) -> Category {
    let base_is_bus = class.base.as_deref().is_some_and(|base| {
        let last = base_name(base);
        BUS_BASES.contains(&last)
    });
    if base_is_bus || BUS_SUFFIXES.iter().any(|s| class.name.ends_with(s)) {
        return Category::EventBuses;
    }
    if class.kind == RecordKind::Struct || MATH_TYPE_NAMES.contains(&class.name.as_str()) {
        return Category::ValueTypes;
    }
    Category::Entities
}

/// Last `::` segment with template arguments removed.
fn base_name(spelling: &str) -> &str {
    let head = spelling.split('<').next().unwrap_or(spelling).trim();
    head.rsplit("::").next().unwrap_or(head).trim()
}

/// A module's declarations split by category, source order kept.
#[derive(Debug, Default)]
pub struct Grouped<'a> {
    pub value_types: Vec<&'a ClassDecl>,
    pub entities: Vec<&'a ClassDecl>,
    pub functions: Vec<&'a FunctionDecl>,
    pub enums: Vec<&'a EnumDecl>,
    pub event_buses: Vec<&'a ClassDecl>,
}

impl<'a> Grouped<'a> {
    pub fn new(forest: &'a DeclarationForest) -> Self {
        let mut grouped = Grouped::default();
        for decl in forest.iter() {
            match decl {
                Decl::Class(class) => match classify(class) {
                    Category::ValueTypes => grouped.value_types.push(class),
                    Category::EventBuses => grouped.event_buses.push(class),
                    _ => grouped.entities.push(class),
                },
                Decl::Function(f) => grouped.functions.push(f),
                Decl::Enum(e) => grouped.enums.push(e),
            }
        }
        grouped
    }

    pub fn is_empty(&self, category: Category) -> bool {
        match category {
            Category::ValueTypes => self.value_types.is_empty(),
            Category::Entities => self.entities.is_empty(),
            Category::Functions => self.functions.is_empty(),
            Category::Enums => self.enums.is_empty(),
            Category::EventBuses => self.event_buses.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, kind: RecordKind, base: Option<&str>) -> ClassDecl {
        let mut c = ClassDecl::new(name, kind, "X.h");
        c.base = base.map(str::to_string);
        c
    }

    #[test]
    fn buses_by_base_or_name() {
        assert_eq!(
            classify(&class("HealthInterface", RecordKind::Class, Some("AZ::EBusTraits"))),
            Category::EventBuses
        );
        assert_eq!(
            classify(&class("Bus", RecordKind::Class, Some("AZ::ComponentBus"))),
            Category::EventBuses
        );
        assert_eq!(
            classify(&class("TransformNotifications", RecordKind::Struct, None)),
            Category::EventBuses
        );
    }

    #[test]
    fn value_types_and_entities() {
        assert_eq!(classify(&class("Hit", RecordKind::Struct, None)), Category::ValueTypes);
        assert_eq!(classify(&class("Vector3", RecordKind::Class, None)), Category::ValueTypes);
        assert_eq!(
            classify(&class("Player", RecordKind::Class, Some("Base<int>"))),
            Category::Entities
        );
    }

    #[test]
    fn base_name_strips_scope_and_templates() {
        assert_eq!(base_name("AZ::EBusTraits"), "EBusTraits");
        assert_eq!(base_name("AZ::EBus<Foo, AZ::Traits>"), "EBus");
        assert_eq!(base_name("Plain"), "Plain");
    }
}
