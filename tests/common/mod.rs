// tests/common/mod.rs
#![allow(dead_code)]

use odata_uri::alias::AliasTable;
use odata_uri::binder::{BindContext, Binder};
use odata_uri::model::{
    EdmModel, EntityContainer, EntitySet, EnumType, NavigationProperty, Operation, Primitive, StructuredType, TypeRef,
};
use odata_uri::node::RangeVariable;
use odata_uri::ParserSettings;

pub fn int16() -> TypeRef {
    TypeRef::primitive(Primitive::Int16, true)
}

pub fn int32() -> TypeRef {
    TypeRef::primitive(Primitive::Int32, false)
}

pub fn person() -> TypeRef {
    TypeRef::entity("NS.Person", false)
}

pub fn people() -> TypeRef {
    TypeRef::collection(person())
}

/// People, their dogs and a boss; enough schema to exercise every binder
/// and path rule.
pub fn model() -> EdmModel {
    let mut model = EdmModel::new();
    model
        .add_enum_type(
            EnumType::new("NS.Color")
                .flags()
                .with_member("Red", 1)
                .with_member("Green", 2)
                .with_member("Blue", 4),
        )
        .add_structured_type(
            StructuredType::complex("NS.Address")
                .with_property("Street", TypeRef::string(true))
                .with_property("City", TypeRef::string(true)),
        )
        .add_structured_type(
            StructuredType::entity("NS.Person")
                .with_key("ID", int32())
                .with_property("Name", TypeRef::string(true))
                .with_property("Age", int16())
                .with_property("Price", TypeRef::primitive(Primitive::Decimal, true))
                .with_property("Score", TypeRef::primitive(Primitive::Double, true))
                .with_property("Birthday", TypeRef::primitive(Primitive::DateTimeOffset, true))
                .with_property("Born", TypeRef::primitive(Primitive::Date, true))
                .with_property("Color", TypeRef::enumeration("NS.Color", true))
                .with_property("Active", TypeRef::boolean(true))
                .with_property("Address", TypeRef::complex("NS.Address", true))
                .with_property("Emails", TypeRef::collection(TypeRef::string(true)))
                .with_navigation(NavigationProperty::single("MyDog", "NS.Dog"))
                .with_navigation(NavigationProperty::many("Friends", "NS.Person")),
        )
        .add_structured_type(
            StructuredType::entity("NS.Employee")
                .with_base("NS.Person")
                .with_property("Budget", TypeRef::primitive(Primitive::Decimal, true)),
        )
        .add_structured_type(
            StructuredType::entity("NS.Dog")
                .with_key("ID", int32())
                .with_property("Name", TypeRef::string(true))
                .with_navigation(NavigationProperty::single("Owner", "NS.Person")),
        )
        .add_structured_type(
            StructuredType::entity("NS.Thing")
                .open()
                .with_key("Code", TypeRef::string(false)),
        )
        .add_operation(
            Operation::function("NS.HasDog")
                .bound_to(person())
                .with_parameter("inOffice", TypeRef::boolean(true))
                .returns(TypeRef::boolean(false)),
        )
        .add_operation(
            Operation::function("NS.ByAge")
                .bound_to(people())
                .with_parameter("age", int16())
                .returns(people())
                .composable(),
        )
        .add_operation(Operation::action("NS.Raise").bound_to(person()))
        .add_operation(
            Operation::function("NS.TopPeople")
                .with_parameter("count", int32())
                .returns(people())
                .composable(),
        )
        .add_container(
            EntityContainer::new("Default")
                .with_entity_set(
                    EntitySet::new("People", "NS.Person")
                        .with_binding("MyDog", "Dogs")
                        .with_binding("Friends", "People"),
                )
                .with_entity_set(EntitySet::new("Dogs", "NS.Dog").with_binding("Owner", "People"))
                .with_entity_set(EntitySet::new("Things", "NS.Thing"))
                .with_singleton(EntitySet::new("Boss", "NS.Person"))
                .with_operation_import("TopPeople", "NS.TopPeople"),
        );
    model
}

pub fn it() -> RangeVariable {
    RangeVariable::it(person(), Some("People".to_string()))
}

pub fn context() -> BindContext {
    BindContext::new(it())
}

/// Runs `f` with a binder over the fixture model and the given aliases.
pub fn with_binder<T>(aliases: &[(&str, &str)], f: impl FnOnce(&Binder<'_>) -> T) -> T {
    let model = model();
    let settings = ParserSettings::default();
    let table = AliasTable::from_pairs(aliases.iter().map(|(n, v)| (*n, Some(*v))), settings.max_alias_depth);
    let binder = Binder::new(&model, &settings, &table);
    f(&binder)
}
