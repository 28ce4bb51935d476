//! # Type-System Model
//!
//! The parser never owns schema knowledge; it asks a [`Model`] for structured
//! types, enumerations, operations and container members. The trait carries a
//! handful of required lookups and derives everything else (inherited
//! properties, open-type checks, key properties, type-name resolution,
//! container `extends` chains) from them.
//!
//! [`EdmModel`] is a plain in-memory implementation used by embedders that
//! build their schema programmatically, and by the test-suite.
//!
//! ## Type references
//!
//! Every typed node carries a [`TypeRef`]: a [`TypeKind`] plus a nullable
//! flag. Structured and enumeration types are referenced by their qualified
//! name, so type references are cheap to clone and compare.

use std::collections::HashMap;
use std::fmt;

/// Maximum base-type chain walked before a schema is considered cyclic.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// Built-in primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Binary,
    Boolean,
    Byte,
    Date,
    DateTimeOffset,
    Decimal,
    Double,
    Duration,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    Stream,
    String,
    TimeOfDay,
    Geography,
    GeographyPoint,
    GeographyLineString,
    GeographyPolygon,
    GeographyMultiPoint,
    GeographyMultiLineString,
    GeographyMultiPolygon,
    GeographyCollection,
    Geometry,
    GeometryPoint,
    GeometryLineString,
    GeometryPolygon,
    GeometryMultiPoint,
    GeometryMultiLineString,
    GeometryMultiPolygon,
    GeometryCollection,
}

impl Primitive {
    pub const ALL: [Primitive; 33] = [
        Primitive::Binary,
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Date,
        Primitive::DateTimeOffset,
        Primitive::Decimal,
        Primitive::Double,
        Primitive::Duration,
        Primitive::Guid,
        Primitive::Int16,
        Primitive::Int32,
        Primitive::Int64,
        Primitive::SByte,
        Primitive::Single,
        Primitive::Stream,
        Primitive::String,
        Primitive::TimeOfDay,
        Primitive::Geography,
        Primitive::GeographyPoint,
        Primitive::GeographyLineString,
        Primitive::GeographyPolygon,
        Primitive::GeographyMultiPoint,
        Primitive::GeographyMultiLineString,
        Primitive::GeographyMultiPolygon,
        Primitive::GeographyCollection,
        Primitive::Geometry,
        Primitive::GeometryPoint,
        Primitive::GeometryLineString,
        Primitive::GeometryPolygon,
        Primitive::GeometryMultiPoint,
        Primitive::GeometryMultiLineString,
        Primitive::GeometryMultiPolygon,
        Primitive::GeometryCollection,
    ];

    /// Qualified name, e.g. `Edm.Int32`.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Binary => "Edm.Binary",
            Primitive::Boolean => "Edm.Boolean",
            Primitive::Byte => "Edm.Byte",
            Primitive::Date => "Edm.Date",
            Primitive::DateTimeOffset => "Edm.DateTimeOffset",
            Primitive::Decimal => "Edm.Decimal",
            Primitive::Double => "Edm.Double",
            Primitive::Duration => "Edm.Duration",
            Primitive::Guid => "Edm.Guid",
            Primitive::Int16 => "Edm.Int16",
            Primitive::Int32 => "Edm.Int32",
            Primitive::Int64 => "Edm.Int64",
            Primitive::SByte => "Edm.SByte",
            Primitive::Single => "Edm.Single",
            Primitive::Stream => "Edm.Stream",
            Primitive::String => "Edm.String",
            Primitive::TimeOfDay => "Edm.TimeOfDay",
            Primitive::Geography => "Edm.Geography",
            Primitive::GeographyPoint => "Edm.GeographyPoint",
            Primitive::GeographyLineString => "Edm.GeographyLineString",
            Primitive::GeographyPolygon => "Edm.GeographyPolygon",
            Primitive::GeographyMultiPoint => "Edm.GeographyMultiPoint",
            Primitive::GeographyMultiLineString => "Edm.GeographyMultiLineString",
            Primitive::GeographyMultiPolygon => "Edm.GeographyMultiPolygon",
            Primitive::GeographyCollection => "Edm.GeographyCollection",
            Primitive::Geometry => "Edm.Geometry",
            Primitive::GeometryPoint => "Edm.GeometryPoint",
            Primitive::GeometryLineString => "Edm.GeometryLineString",
            Primitive::GeometryPolygon => "Edm.GeometryPolygon",
            Primitive::GeometryMultiPoint => "Edm.GeometryMultiPoint",
            Primitive::GeometryMultiLineString => "Edm.GeometryMultiLineString",
            Primitive::GeometryMultiPolygon => "Edm.GeometryMultiPolygon",
            Primitive::GeometryCollection => "Edm.GeometryCollection",
        }
    }

    pub fn from_name(name: &str) -> Option<Primitive> {
        Primitive::ALL.iter().copied().find(|p| p.name() == name)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral()
            || matches!(self, Primitive::Single | Primitive::Double | Primitive::Decimal)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Primitive::Byte
                | Primitive::SByte
                | Primitive::Int16
                | Primitive::Int32
                | Primitive::Int64
        )
    }

    pub fn is_spatial(self) -> bool {
        self.is_geography() || self.is_geometry()
    }

    pub fn is_geography(self) -> bool {
        matches!(
            self,
            Primitive::Geography
                | Primitive::GeographyPoint
                | Primitive::GeographyLineString
                | Primitive::GeographyPolygon
                | Primitive::GeographyMultiPoint
                | Primitive::GeographyMultiLineString
                | Primitive::GeographyMultiPolygon
                | Primitive::GeographyCollection
        )
    }

    pub fn is_geometry(self) -> bool {
        matches!(
            self,
            Primitive::Geometry
                | Primitive::GeometryPoint
                | Primitive::GeometryLineString
                | Primitive::GeometryPolygon
                | Primitive::GeometryMultiPoint
                | Primitive::GeometryMultiLineString
                | Primitive::GeometryMultiPolygon
                | Primitive::GeometryCollection
        )
    }

    /// Whether a value of this type may be used where `target` is expected
    /// without an explicit cast.
    ///
    /// Integral types widen to every larger integral and floating type,
    /// `Single` widens to `Double`, and every concrete spatial type widens to
    /// its abstract root (`Edm.GeographyPoint` -> `Edm.Geography`).
    pub fn can_promote_to(self, target: Primitive) -> bool {
        use Primitive::*;
        if self == target {
            return true;
        }
        match self {
            Byte => matches!(target, Int16 | Int32 | Int64 | Single | Double | Decimal),
            SByte => matches!(target, Int16 | Int32 | Int64 | Single | Double | Decimal),
            Int16 => matches!(target, Int32 | Int64 | Single | Double | Decimal),
            Int32 => matches!(target, Int64 | Single | Double | Decimal),
            Int64 => matches!(target, Single | Double | Decimal),
            Single => matches!(target, Double),
            p if p.is_geography() => target == Geography,
            p if p.is_geometry() => target == Geometry,
            _ => false,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The definition half of a [`TypeRef`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(Primitive),
    /// Enumeration, by qualified name
    Enum(String),
    /// Complex type, by qualified name
    Complex(String),
    /// Entity type, by qualified name
    Entity(String),
    Collection(Box<TypeRef>),
    /// `Edm.Untyped`
    Untyped,
}

/// A reference to a type together with its nullability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub kind: TypeKind,
    pub nullable: bool,
}

impl TypeRef {
    pub fn primitive(primitive: Primitive, nullable: bool) -> Self {
        TypeRef {
            kind: TypeKind::Primitive(primitive),
            nullable,
        }
    }

    pub fn boolean(nullable: bool) -> Self {
        TypeRef::primitive(Primitive::Boolean, nullable)
    }

    pub fn string(nullable: bool) -> Self {
        TypeRef::primitive(Primitive::String, nullable)
    }

    pub fn enumeration(name: impl Into<String>, nullable: bool) -> Self {
        TypeRef {
            kind: TypeKind::Enum(name.into()),
            nullable,
        }
    }

    pub fn complex(name: impl Into<String>, nullable: bool) -> Self {
        TypeRef {
            kind: TypeKind::Complex(name.into()),
            nullable,
        }
    }

    pub fn entity(name: impl Into<String>, nullable: bool) -> Self {
        TypeRef {
            kind: TypeKind::Entity(name.into()),
            nullable,
        }
    }

    pub fn collection(element: TypeRef) -> Self {
        TypeRef {
            kind: TypeKind::Collection(Box::new(element)),
            nullable: false,
        }
    }

    pub fn untyped() -> Self {
        TypeRef {
            kind: TypeKind::Untyped,
            nullable: true,
        }
    }

    /// Qualified name as it appears in error messages, e.g.
    /// `Collection(Edm.String)`.
    pub fn full_name(&self) -> String {
        match &self.kind {
            TypeKind::Primitive(p) => p.name().to_string(),
            TypeKind::Enum(name) | TypeKind::Complex(name) | TypeKind::Entity(name) => {
                name.clone()
            }
            TypeKind::Collection(element) => format!("Collection({})", element.full_name()),
            TypeKind::Untyped => "Edm.Untyped".to_string(),
        }
    }

    pub fn with_nullable(&self, nullable: bool) -> TypeRef {
        TypeRef {
            kind: self.kind.clone(),
            nullable,
        }
    }

    /// Same definition, nullability ignored.
    pub fn same_definition(&self, other: &TypeRef) -> bool {
        match (&self.kind, &other.kind) {
            (TypeKind::Collection(a), TypeKind::Collection(b)) => a.same_definition(b),
            (a, b) => a == b,
        }
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self.kind {
            TypeKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_primitive(&self, primitive: Primitive) -> bool {
        self.as_primitive() == Some(primitive)
    }

    pub fn is_numeric(&self) -> bool {
        self.as_primitive().is_some_and(Primitive::is_numeric)
    }

    pub fn is_boolean(&self) -> bool {
        self.is_primitive(Primitive::Boolean)
    }

    pub fn is_string(&self) -> bool {
        self.is_primitive(Primitive::String)
    }

    pub fn enum_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Enum(name) => Some(name),
            _ => None,
        }
    }

    /// Qualified name of an entity or complex type.
    pub fn structured_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Entity(name) | TypeKind::Complex(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.kind, TypeKind::Entity(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, TypeKind::Collection(_))
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self.kind, TypeKind::Untyped)
    }

    pub fn element_type(&self) -> Option<&TypeRef> {
        match &self.kind {
            TypeKind::Collection(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredKind {
    Entity,
    Complex,
}

/// Structural (non-navigation) property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub type_ref: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationProperty {
    pub name: String,
    /// Qualified name of the target entity type
    pub target: String,
    pub collection: bool,
    pub nullable: bool,
    pub contains_target: bool,
}

impl NavigationProperty {
    pub fn single(name: impl Into<String>, target: impl Into<String>) -> Self {
        NavigationProperty {
            name: name.into(),
            target: target.into(),
            collection: false,
            nullable: true,
            contains_target: false,
        }
    }

    pub fn many(name: impl Into<String>, target: impl Into<String>) -> Self {
        NavigationProperty {
            collection: true,
            nullable: false,
            ..NavigationProperty::single(name, target)
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        let target = TypeRef::entity(self.target.clone(), self.nullable);
        if self.collection {
            TypeRef::collection(target.with_nullable(false))
        } else {
            target
        }
    }
}

/// Entity or complex type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredType {
    /// Qualified name (`Namespace.Name`)
    pub name: String,
    pub kind: StructuredKind,
    pub base: Option<String>,
    pub is_open: bool,
    pub is_abstract: bool,
    pub keys: Vec<String>,
    pub properties: Vec<Property>,
    pub navigation_properties: Vec<NavigationProperty>,
}

impl StructuredType {
    pub fn entity(name: impl Into<String>) -> Self {
        StructuredType {
            name: name.into(),
            kind: StructuredKind::Entity,
            base: None,
            is_open: false,
            is_abstract: false,
            keys: Vec::new(),
            properties: Vec::new(),
            navigation_properties: Vec::new(),
        }
    }

    pub fn complex(name: impl Into<String>) -> Self {
        StructuredType {
            kind: StructuredKind::Complex,
            ..StructuredType::entity(name)
        }
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn open(mut self) -> Self {
        self.is_open = true;
        self
    }

    pub fn with_key(mut self, property: &str, type_ref: TypeRef) -> Self {
        self.keys.push(property.to_string());
        self.with_property(property, type_ref)
    }

    pub fn with_property(mut self, name: &str, type_ref: TypeRef) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            type_ref,
        });
        self
    }

    pub fn with_navigation(mut self, navigation: NavigationProperty) -> Self {
        self.navigation_properties.push(navigation);
        self
    }

    pub fn type_ref(&self, nullable: bool) -> TypeRef {
        match self.kind {
            StructuredKind::Entity => TypeRef::entity(self.name.clone(), nullable),
            StructuredKind::Complex => TypeRef::complex(self.name.clone(), nullable),
        }
    }

    fn declared_property(&self, name: &str, case_insensitive: bool) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| names_match(&p.name, name, case_insensitive))
    }

    fn declared_navigation(&self, name: &str, case_insensitive: bool) -> Option<&NavigationProperty> {
        self.navigation_properties
            .iter()
            .find(|p| names_match(&p.name, name, case_insensitive))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub underlying: Primitive,
    pub is_flags: bool,
    pub members: Vec<EnumMember>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        EnumType {
            name: name.into(),
            underlying: Primitive::Int32,
            is_flags: false,
            members: Vec::new(),
        }
    }

    pub fn flags(mut self) -> Self {
        self.is_flags = true;
        self
    }

    pub fn with_underlying(mut self, underlying: Primitive) -> Self {
        self.underlying = underlying;
        self
    }

    pub fn with_member(mut self, name: &str, value: i64) -> Self {
        self.members.push(EnumMember {
            name: name.to_string(),
            value,
        });
        self
    }

    pub fn member(&self, name: &str, case_insensitive: bool) -> Option<&EnumMember> {
        self.members
            .iter()
            .find(|m| names_match(&m.name, name, case_insensitive))
    }

    pub fn type_ref(&self, nullable: bool) -> TypeRef {
        TypeRef::enumeration(self.name.clone(), nullable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Function,
    Action,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_ref: TypeRef,
}

/// A function or action. The binding parameter, if any, is described by
/// `binding` and is not part of `parameters`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    pub binding: Option<TypeRef>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeRef>,
    pub composable: bool,
}

impl Operation {
    pub fn function(name: impl Into<String>) -> Self {
        Operation {
            name: name.into(),
            kind: OperationKind::Function,
            binding: None,
            parameters: Vec::new(),
            return_type: None,
            composable: false,
        }
    }

    pub fn action(name: impl Into<String>) -> Self {
        Operation {
            kind: OperationKind::Action,
            ..Operation::function(name)
        }
    }

    pub fn bound_to(mut self, binding: TypeRef) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn with_parameter(mut self, name: &str, type_ref: TypeRef) -> Self {
        self.parameters.push(Parameter {
            name: name.to_string(),
            type_ref,
        });
        self
    }

    pub fn returns(mut self, type_ref: TypeRef) -> Self {
        self.return_type = Some(type_ref);
        self
    }

    pub fn composable(mut self) -> Self {
        self.composable = true;
        self
    }

    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn is_function(&self) -> bool {
        self.kind == OperationKind::Function
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySet {
    pub name: String,
    pub entity_type: String,
    /// Navigation property path -> target entity set or singleton
    pub navigation_bindings: Vec<(String, String)>,
}

impl EntitySet {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        EntitySet {
            name: name.into(),
            entity_type: entity_type.into(),
            navigation_bindings: Vec::new(),
        }
    }

    pub fn with_binding(mut self, path: &str, target: &str) -> Self {
        self.navigation_bindings
            .push((path.to_string(), target.to_string()));
        self
    }

    pub fn binding_target(&self, path: &str) -> Option<&str> {
        self.navigation_bindings
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, t)| t.as_str())
    }
}

pub type Singleton = EntitySet;

#[derive(Debug, Clone, PartialEq)]
pub struct OperationImport {
    pub name: String,
    /// Qualified name of the imported operation
    pub operation: String,
    pub entity_set: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityContainer {
    pub name: String,
    pub extends: Option<String>,
    pub entity_sets: Vec<EntitySet>,
    pub singletons: Vec<Singleton>,
    pub operation_imports: Vec<OperationImport>,
}

impl EntityContainer {
    pub fn new(name: impl Into<String>) -> Self {
        EntityContainer {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn extending(mut self, container: impl Into<String>) -> Self {
        self.extends = Some(container.into());
        self
    }

    pub fn with_entity_set(mut self, set: EntitySet) -> Self {
        self.entity_sets.push(set);
        self
    }

    pub fn with_singleton(mut self, singleton: Singleton) -> Self {
        self.singletons.push(singleton);
        self
    }

    pub fn with_operation_import(mut self, name: &str, operation: &str) -> Self {
        self.operation_imports.push(OperationImport {
            name: name.to_string(),
            operation: operation.to_string(),
            entity_set: None,
        });
        self
    }

    /// Import whose results belong to `entity_set`.
    pub fn with_operation_import_in(mut self, name: &str, operation: &str, entity_set: &str) -> Self {
        self.operation_imports.push(OperationImport {
            name: name.to_string(),
            operation: operation.to_string(),
            entity_set: Some(entity_set.to_string()),
        });
        self
    }
}

/// What a container name resolves to.
#[derive(Debug, Clone, Copy)]
pub enum ContainerElement<'a> {
    EntitySet(&'a EntitySet),
    Singleton(&'a Singleton),
    OperationImport(&'a OperationImport),
}

/// Query surface of the type-system model.
pub trait Model {
    fn structured_type(&self, qualified_name: &str) -> Option<&StructuredType>;

    fn enum_type(&self, qualified_name: &str) -> Option<&EnumType>;

    fn operations(&self) -> &[Operation];

    fn entity_container(&self) -> Option<&EntityContainer>;

    fn container(&self, name: &str) -> Option<&EntityContainer>;

    /// Base-type chain starting at `type_name` itself.
    fn type_chain(&self, type_name: &str) -> Vec<&StructuredType> {
        let mut chain = Vec::new();
        let mut current = self.structured_type(type_name);
        while let Some(ty) = current {
            if chain.len() >= MAX_INHERITANCE_DEPTH {
                break;
            }
            chain.push(ty);
            current = ty.base.as_deref().and_then(|b| self.structured_type(b));
        }
        chain
    }

    fn find_property(&self, type_name: &str, name: &str, case_insensitive: bool) -> Option<&Property> {
        self.type_chain(type_name)
            .into_iter()
            .find_map(|ty| ty.declared_property(name, case_insensitive))
    }

    fn find_navigation(
        &self,
        type_name: &str,
        name: &str,
        case_insensitive: bool,
    ) -> Option<&NavigationProperty> {
        self.type_chain(type_name)
            .into_iter()
            .find_map(|ty| ty.declared_navigation(name, case_insensitive))
    }

    fn is_open(&self, type_name: &str) -> bool {
        self.type_chain(type_name).iter().any(|ty| ty.is_open)
    }

    /// True when `derived` is `base` or inherits from it.
    fn derives_from(&self, derived: &str, base: &str) -> bool {
        self.type_chain(derived).iter().any(|ty| ty.name == base)
    }

    fn key_properties(&self, type_name: &str) -> Vec<&Property> {
        let chain = self.type_chain(type_name);
        let Some(keyed) = chain.iter().find(|ty| !ty.keys.is_empty()) else {
            return Vec::new();
        };
        keyed
            .keys
            .iter()
            .filter_map(|key| self.find_property(type_name, key, false))
            .collect()
    }

    /// Resolves `Edm.*`, enumeration, structured and `Collection(...)` names.
    fn resolve_type(&self, name: &str) -> Option<TypeRef> {
        if let Some(inner) = name
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return self.resolve_type(inner).map(TypeRef::collection);
        }
        if name == "Edm.Untyped" {
            return Some(TypeRef::untyped());
        }
        if let Some(primitive) = Primitive::from_name(name) {
            return Some(TypeRef::primitive(primitive, true));
        }
        if let Some(enum_type) = self.enum_type(name) {
            return Some(enum_type.type_ref(true));
        }
        self.structured_type(name).map(|ty| ty.type_ref(true))
    }

    /// Operations by qualified name, or by short name when `name` has no
    /// namespace.
    fn find_operations(&self, name: &str, case_insensitive: bool) -> Vec<&Operation> {
        let qualified = name.contains('.');
        self.operations()
            .iter()
            .filter(|op| {
                let candidate = if qualified { op.name.as_str() } else { op.short_name() };
                names_match(candidate, name, case_insensitive)
            })
            .collect()
    }

    fn find_container_element(&self, name: &str, case_insensitive: bool) -> Option<ContainerElement<'_>> {
        let mut container = self.entity_container();
        let mut visited = 0;
        while let Some(c) = container {
            if let Some(set) = c
                .entity_sets
                .iter()
                .find(|s| names_match(&s.name, name, case_insensitive))
            {
                return Some(ContainerElement::EntitySet(set));
            }
            if let Some(singleton) = c
                .singletons
                .iter()
                .find(|s| names_match(&s.name, name, case_insensitive))
            {
                return Some(ContainerElement::Singleton(singleton));
            }
            if let Some(import) = c
                .operation_imports
                .iter()
                .find(|i| names_match(&i.name, name, case_insensitive))
            {
                return Some(ContainerElement::OperationImport(import));
            }
            visited += 1;
            if visited >= MAX_INHERITANCE_DEPTH {
                break;
            }
            container = c.extends.as_deref().and_then(|e| self.container(e));
        }
        None
    }

    /// Entity set or singleton by name, through the `extends` chain.
    fn find_navigation_source(&self, name: &str) -> Option<&EntitySet> {
        match self.find_container_element(name, false)? {
            ContainerElement::EntitySet(set) | ContainerElement::Singleton(set) => Some(set),
            ContainerElement::OperationImport(_) => None,
        }
    }
}

pub(crate) fn names_match(declared: &str, requested: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        declared.eq_ignore_ascii_case(requested)
    } else {
        declared == requested
    }
}

/// In-memory [`Model`] built through `add_*` calls.
///
/// # Examples
///
/// ```
/// use odata_uri::model::{EdmModel, EntityContainer, EntitySet, Model, Primitive, StructuredType, TypeRef};
///
/// let mut model = EdmModel::new();
/// model
///     .add_structured_type(
///         StructuredType::entity("NS.Person")
///             .with_key("ID", TypeRef::primitive(Primitive::Int32, false))
///             .with_property("Name", TypeRef::string(true)),
///     )
///     .add_container(
///         EntityContainer::new("Default").with_entity_set(EntitySet::new("People", "NS.Person")),
///     );
///
/// assert!(model.find_property("NS.Person", "Name", false).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EdmModel {
    types: HashMap<String, StructuredType>,
    enums: HashMap<String, EnumType>,
    operations: Vec<Operation>,
    containers: Vec<EntityContainer>,
    default_container: Option<String>,
}

impl EdmModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_structured_type(&mut self, ty: StructuredType) -> &mut Self {
        self.types.insert(ty.name.clone(), ty);
        self
    }

    pub fn add_enum_type(&mut self, ty: EnumType) -> &mut Self {
        self.enums.insert(ty.name.clone(), ty);
        self
    }

    pub fn add_operation(&mut self, operation: Operation) -> &mut Self {
        self.operations.push(operation);
        self
    }

    /// The first container added becomes the default one.
    pub fn add_container(&mut self, container: EntityContainer) -> &mut Self {
        if self.default_container.is_none() {
            self.default_container = Some(container.name.clone());
        }
        self.containers.push(container);
        self
    }

    pub fn set_default_container(&mut self, name: &str) -> &mut Self {
        self.default_container = Some(name.to_string());
        self
    }
}

impl Model for EdmModel {
    fn structured_type(&self, qualified_name: &str) -> Option<&StructuredType> {
        self.types.get(qualified_name)
    }

    fn enum_type(&self, qualified_name: &str) -> Option<&EnumType> {
        self.enums.get(qualified_name)
    }

    fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn entity_container(&self) -> Option<&EntityContainer> {
        self.default_container
            .as_deref()
            .and_then(|name| self.container(name))
    }

    fn container(&self, name: &str) -> Option<&EntityContainer> {
        self.containers.iter().find(|c| c.name == name)
    }
}
