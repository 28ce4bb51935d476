//! # Resource Paths
//!
//! Resolves the resource path of a request (`People(1)/Friends/$count`)
//! into a sequence of [`PathSegment`]s, left to right.
//!
//! The resolver is a small state machine. Its state is the type and the
//! navigation source the path has reached so far, whether that is a single
//! value or a collection, and whether the previous segment has to end the
//! path:
//!
//! ```text
//! People                 Collection(NS.Person)   source People
//! People(1)              NS.Person               source People
//! People(1)/MyDog        NS.Dog                  source Dogs (binding)
//! People(1)/MyDog/$ref   leaf
//! ```
//!
//! Embedded expressions (key values, operation parameters, `$filter(...)`
//! segments) go through the expression [parser](crate::parser) and
//! [binder](crate::binder) and may use parameter aliases.

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    alias::AliasTable,
    ast::{Expr, FunctionArg, LiteralKind},
    binder::{BindContext, BindError, Binder},
    model::{names_match, ContainerElement, Model, Operation, TypeRef},
    node::{QueryNode, RangeVariable},
    parser::{self, ParseError, Parser},
    settings::ParserSettings,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("The path contains an empty segment.")]
    EmptySegment,

    #[error("The segment '{segment}' is malformed.")]
    InvalidSegment { segment: String },

    #[error("Resource not found for the segment '{segment}'.")]
    UnknownRoot { segment: String },

    #[error("The segment '{segment}' must be the first and only segment of the path.")]
    MustBeOnly { segment: String },

    #[error("The segment '{segment}' must be the leaf segment; found '{next}' after it.")]
    MustBeLeaf { segment: String, next: String },

    #[error("Could not find a property, navigation property or operation named '{segment}' on type '{type_name}'.")]
    SegmentNotFound { segment: String, type_name: String },

    #[error("The segment '{segment}' cannot follow a value of type '{type_name}'.")]
    SegmentNotAllowed { segment: String, type_name: String },

    #[error("The type '{target}' is not related to the type '{type_name}' of the segment before it.")]
    UnrelatedTypeCast { target: String, type_name: String },

    #[error("A key lookup cannot be applied to '{segment}' because it is not a collection of entities.")]
    KeyNotAllowed { segment: String },

    #[error("The number of keys specified in '{segment}' does not match the {expected} key properties of type '{type_name}'.")]
    KeyCount {
        segment: String,
        type_name: String,
        expected: usize,
    },

    #[error("The value of the key '{key}' in '{segment}' must be a literal or a parameter alias.")]
    KeyNotLiteral { segment: String, key: String },

    #[error("'{name}' is not a key property of type '{type_name}'.")]
    UnknownKey { name: String, type_name: String },

    #[error("The '$ref' segment cannot follow '{segment}'; it requires an entity or a collection of entities.")]
    RefNotAllowed { segment: String },

    #[error("The '$ref' segment does not take a key; found '{segment}'.")]
    RefWithKey { segment: String },

    #[error("The '$value' segment cannot follow '{segment}'.")]
    ValueNotAllowed { segment: String },

    #[error("The '$count' segment cannot follow '{segment}' because it is not a collection.")]
    CountNotAllowed { segment: String },

    #[error("The '$each' segment cannot be applied to the singleton '{segment}'.")]
    EachOnSingleton { segment: String },

    #[error("The '$each' segment cannot be applied to '{segment}' because it identifies a single entity.")]
    EachOnSingleEntity { segment: String },

    #[error("The '$each' segment requires a collection of entities; found '{segment}'.")]
    EachOnNonEntities { segment: String },

    #[error("Only one operation may follow '$each'; found '{segment}'.")]
    AfterEach { segment: String },

    #[error("The '$filter' segment cannot be applied to '{segment}' because it is not a collection.")]
    FilterOnSingle { segment: String },

    #[error("The '$filter' segment requires a parenthesized expression.")]
    FilterWithoutExpression,

    #[error("The operation '{operation}' is not composable; no segment may follow it.")]
    NotComposable { operation: String },
}

/// One resolved path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    EntitySet {
        name: String,
        type_ref: TypeRef,
    },
    Singleton {
        name: String,
        type_ref: TypeRef,
    },
    /// `(1)`, `(ID=1,Name='x')` or `/1`; key values in key-property order
    Key {
        keys: Vec<(String, QueryNode)>,
        type_ref: TypeRef,
        navigation_source: Option<String>,
    },
    Navigation {
        property: String,
        type_ref: TypeRef,
        navigation_source: Option<String>,
    },
    /// `Nav/$ref`: the link between the entity and its related entities
    NavigationLink {
        property: String,
        type_ref: TypeRef,
        navigation_source: Option<String>,
    },
    /// `$ref` after an entity or collection of entities
    Reference,
    Property {
        name: String,
        type_ref: TypeRef,
    },
    /// Undeclared property of an open type
    DynamicProperty {
        name: String,
    },
    TypeCast {
        type_ref: TypeRef,
    },
    /// Bound function or action
    Operation {
        name: String,
        parameters: Vec<(String, QueryNode)>,
        type_ref: Option<TypeRef>,
        navigation_source: Option<String>,
    },
    OperationImport {
        name: String,
        operation: String,
        parameters: Vec<(String, QueryNode)>,
        type_ref: Option<TypeRef>,
        navigation_source: Option<String>,
    },
    Value,
    Count,
    /// `$each`: the members of the collection, one by one
    Each {
        type_ref: TypeRef,
        navigation_source: Option<String>,
    },
    /// `$filter(expr)` narrowing the collection before it
    Filter {
        expression: QueryNode,
        type_ref: TypeRef,
        single: bool,
    },
    Metadata,
    Batch,
}

/// A resolved path with the type and navigation source it ends at.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ODataPath {
    pub segments: Vec<PathSegment>,
    /// `None` for an empty path, dynamic properties and void operations
    pub type_ref: Option<TypeRef>,
    pub navigation_source: Option<String>,
}

impl ODataPath {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Element type of the last segment: the entity type of a collection,
    /// the type itself for single values.
    pub fn element_type(&self) -> Option<&TypeRef> {
        let t = self.type_ref.as_ref()?;
        Some(t.element_type().unwrap_or(t))
    }
}

/// Running state of the resolver.
#[derive(Debug, Default)]
struct State {
    type_ref: Option<TypeRef>,
    navigation_source: Option<String>,
    /// Text of a segment nothing may follow
    leaf: Option<String>,
    /// Set right after `$each`; reset once its operation is resolved
    each: bool,
    /// Text of the previous segment
    previous: String,
    /// The previous segment was a singleton root
    singleton: bool,
    /// Operation after which only `$each` semantics remain
    not_composable: Option<String>,
}

impl State {
    fn element(&self) -> Option<&TypeRef> {
        let t = self.type_ref.as_ref()?;
        Some(t.element_type().unwrap_or(t))
    }

    fn is_collection(&self) -> bool {
        self.type_ref.as_ref().is_some_and(TypeRef::is_collection)
    }

    fn is_entity_collection(&self) -> bool {
        self.is_collection() && self.element().is_some_and(TypeRef::is_entity)
    }

    fn type_name(&self) -> String {
        self.type_ref
            .as_ref()
            .map_or_else(|| "Edm.Untyped".to_string(), TypeRef::full_name)
    }

    fn range_variable(&self) -> RangeVariable {
        RangeVariable::it(
            self.element().cloned().unwrap_or_else(TypeRef::untyped),
            self.navigation_source.clone(),
        )
    }
}

/// Splits `Name(args)` into the name and the text between the parentheses.
fn split_segment(text: &str) -> Result<(&str, Option<&str>), PathError> {
    let Some(open) = text.find('(') else {
        return Ok((text, None));
    };
    let inner = text[open + 1..]
        .strip_suffix(')')
        .ok_or_else(|| PathError::InvalidSegment {
            segment: text.to_string(),
        })?;
    Ok((&text[..open], Some(inner)))
}

pub struct PathResolver<'a> {
    binder: Binder<'a>,
}

impl<'a> PathResolver<'a> {
    pub fn new(model: &'a dyn Model, settings: &'a ParserSettings, aliases: &'a AliasTable) -> Self {
        PathResolver {
            binder: Binder::new(model, settings, aliases),
        }
    }

    fn model(&self) -> &'a dyn Model {
        self.binder.model()
    }

    fn settings(&self) -> &'a ParserSettings {
        self.binder.settings()
    }

    /// Resolves a `/`-separated, already percent-decoded path.
    pub fn resolve(&self, path: &str) -> Result<ODataPath, PathError> {
        debug!(path, "resolving resource path");
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(ODataPath::default());
        }

        let mut segments = Vec::new();
        let mut state = State::default();
        for (index, (_, text)) in parser::split_top_level(trimmed, '/').into_iter().enumerate() {
            if text.is_empty() {
                return Err(PathError::EmptySegment);
            }
            if let Some(leaf) = &state.leaf {
                return Err(PathError::MustBeLeaf {
                    segment: leaf.clone(),
                    next: text.to_string(),
                });
            }
            if let Some(operation) = &state.not_composable {
                return Err(PathError::NotComposable {
                    operation: operation.clone(),
                });
            }
            if index == 0 {
                self.resolve_root(text, &mut segments, &mut state)?;
            } else {
                self.resolve_next(text, &mut segments, &mut state)?;
            }
            trace!(segment = text, type_name = %state.type_name(), "path segment resolved");
            state.previous = text.to_string();
        }

        Ok(ODataPath {
            segments,
            type_ref: state.type_ref,
            navigation_source: state.navigation_source,
        })
    }

    fn resolve_root(&self, text: &str, segments: &mut Vec<PathSegment>, state: &mut State) -> Result<(), PathError> {
        match text {
            "$metadata" | "$batch" => {
                segments.push(if text == "$metadata" {
                    PathSegment::Metadata
                } else {
                    PathSegment::Batch
                });
                state.leaf = Some(text.to_string());
                return Ok(());
            }
            _ => {}
        }

        let (name, args) = split_segment(text)?;
        let element = self
            .model()
            .find_container_element(name, self.settings().case_insensitive)
            .ok_or_else(|| PathError::UnknownRoot {
                segment: name.to_string(),
            })?;
        match element {
            ContainerElement::EntitySet(set) => {
                let type_ref = TypeRef::collection(TypeRef::entity(set.entity_type.clone(), false));
                segments.push(PathSegment::EntitySet {
                    name: set.name.clone(),
                    type_ref: type_ref.clone(),
                });
                state.type_ref = Some(type_ref);
                state.navigation_source = Some(set.name.clone());
                if let Some(args) = args {
                    self.push_key(text, args, segments, state)?;
                }
            }
            ContainerElement::Singleton(singleton) => {
                if args.is_some() {
                    return Err(PathError::KeyNotAllowed {
                        segment: text.to_string(),
                    });
                }
                let type_ref = TypeRef::entity(singleton.entity_type.clone(), false);
                segments.push(PathSegment::Singleton {
                    name: singleton.name.clone(),
                    type_ref: type_ref.clone(),
                });
                state.type_ref = Some(type_ref);
                state.navigation_source = Some(singleton.name.clone());
                state.singleton = true;
            }
            ContainerElement::OperationImport(import) => {
                let args = self.parse_args(args)?;
                let operation = self
                    .select_operation(&import.operation, None, &args)?
                    .ok_or_else(|| PathError::UnknownRoot {
                        segment: name.to_string(),
                    })?;
                let parameters = self.bind_parameters(operation, &args, state)?;
                let navigation_source = import.entity_set.clone();
                segments.push(PathSegment::OperationImport {
                    name: import.name.clone(),
                    operation: operation.name.clone(),
                    parameters,
                    type_ref: operation.return_type.clone(),
                    navigation_source: navigation_source.clone(),
                });
                self.after_operation(operation, navigation_source, state);
            }
        }
        Ok(())
    }

    fn resolve_next(&self, text: &str, segments: &mut Vec<PathSegment>, state: &mut State) -> Result<(), PathError> {
        let (name, args) = split_segment(text)?;

        if state.each {
            return self.resolve_after_each(text, name, args, segments, state);
        }

        match name {
            "$metadata" | "$batch" => {
                return Err(PathError::MustBeOnly {
                    segment: name.to_string(),
                });
            }
            "$ref" => return self.push_ref(text, args, segments, state),
            "$value" => {
                let allowed = !state.is_collection()
                    && state
                        .element()
                        .is_none_or(|t| t.structured_name().is_none() || t.is_entity());
                if !allowed || args.is_some() {
                    return Err(PathError::ValueNotAllowed {
                        segment: state.previous.clone(),
                    });
                }
                segments.push(PathSegment::Value);
                state.leaf = Some(name.to_string());
                return Ok(());
            }
            "$count" => {
                if !state.is_collection() || args.is_some() {
                    return Err(PathError::CountNotAllowed {
                        segment: state.previous.clone(),
                    });
                }
                segments.push(PathSegment::Count);
                state.leaf = Some(name.to_string());
                return Ok(());
            }
            "$each" => return self.push_each(segments, state),
            "$filter" => return self.push_filter(args, segments, state),
            _ => {}
        }

        // Open properties continue dynamically.
        let Some(current) = state.element().cloned().filter(|t| !t.is_untyped()) else {
            segments.push(PathSegment::DynamicProperty { name: name.to_string() });
            state.type_ref = None;
            state.navigation_source = None;
            return Ok(());
        };

        if name.contains('.') {
            if let Some(target) = self.model().structured_type(name) {
                return self.push_type_cast(&current, &target.name, args, segments, state);
            }
        }

        let Some(type_name) = current.structured_name().map(str::to_string) else {
            return Err(PathError::SegmentNotAllowed {
                segment: text.to_string(),
                type_name: current.full_name(),
            });
        };
        let ci = self.settings().case_insensitive;

        if !state.is_collection() {
            if let Some(property) = self.model().find_property(&type_name, name, ci) {
                if args.is_some() {
                    return Err(PathError::KeyNotAllowed {
                        segment: text.to_string(),
                    });
                }
                segments.push(PathSegment::Property {
                    name: property.name.clone(),
                    type_ref: property.type_ref.clone(),
                });
                state.type_ref = Some(property.type_ref.clone());
                state.navigation_source = None;
                return Ok(());
            }
            if let Some(navigation) = self.model().find_navigation(&type_name, name, ci) {
                let navigation_source = state
                    .navigation_source
                    .as_deref()
                    .and_then(|s| self.model().find_navigation_source(s))
                    .and_then(|set| set.binding_target(&navigation.name))
                    .map(str::to_string);
                let type_ref = navigation.type_ref();
                segments.push(PathSegment::Navigation {
                    property: navigation.name.clone(),
                    type_ref: type_ref.clone(),
                    navigation_source: navigation_source.clone(),
                });
                state.type_ref = Some(type_ref);
                state.navigation_source = navigation_source;
                state.singleton = false;
                if let Some(args) = args {
                    self.push_key(text, args, segments, state)?;
                }
                return Ok(());
            }
        }

        if name.contains('.') || self.settings().unqualified_operations {
            let parsed = self.parse_args(args)?;
            let binding = state.type_ref.clone().unwrap_or_else(TypeRef::untyped);
            if let Some(operation) = self.select_operation(name, Some(&binding), &parsed)? {
                return self.push_operation(operation, &parsed, segments, state);
            }
        }

        if !state.is_collection() && self.model().is_open(&type_name) {
            segments.push(PathSegment::DynamicProperty { name: name.to_string() });
            state.type_ref = None;
            state.navigation_source = None;
            return Ok(());
        }

        if state.is_entity_collection() && self.settings().key_as_segment && args.is_none() {
            return self.push_key_segment(text, segments, state);
        }

        Err(PathError::SegmentNotFound {
            segment: name.to_string(),
            type_name,
        })
    }

    fn resolve_after_each(
        &self,
        text: &str,
        name: &str,
        args: Option<&str>,
        segments: &mut Vec<PathSegment>,
        state: &mut State,
    ) -> Result<(), PathError> {
        if name.starts_with('$') {
            return Err(PathError::AfterEach {
                segment: text.to_string(),
            });
        }
        let parsed = self.parse_args(args)?;
        let binding = state.element().cloned().unwrap_or_else(TypeRef::untyped);
        let operation = self
            .select_operation(name, Some(&binding), &parsed)?
            .ok_or_else(|| PathError::AfterEach {
                segment: text.to_string(),
            })?;
        state.each = false;
        self.push_operation(operation, &parsed, segments, state)?;
        state.leaf = Some(text.to_string());
        Ok(())
    }

    fn push_type_cast(
        &self,
        current: &TypeRef,
        target: &str,
        args: Option<&str>,
        segments: &mut Vec<PathSegment>,
        state: &mut State,
    ) -> Result<(), PathError> {
        let model = self.model();
        let related = current
            .structured_name()
            .is_some_and(|c| model.derives_from(target, c) || model.derives_from(c, target));
        if !related {
            return Err(PathError::UnrelatedTypeCast {
                target: target.to_string(),
                type_name: current.full_name(),
            });
        }
        let single = if current.is_entity() {
            TypeRef::entity(target, false)
        } else {
            TypeRef::complex(target, current.nullable)
        };
        let type_ref = if state.is_collection() {
            TypeRef::collection(single)
        } else {
            single
        };
        segments.push(PathSegment::TypeCast {
            type_ref: type_ref.clone(),
        });
        state.type_ref = Some(type_ref);
        if let Some(args) = args {
            self.push_key(target, args, segments, state)?;
        }
        Ok(())
    }

    fn push_ref(
        &self,
        text: &str,
        args: Option<&str>,
        segments: &mut Vec<PathSegment>,
        state: &mut State,
    ) -> Result<(), PathError> {
        if args.is_some() {
            return Err(PathError::RefWithKey {
                segment: text.to_string(),
            });
        }
        if !state.element().is_some_and(TypeRef::is_entity) {
            return Err(PathError::RefNotAllowed {
                segment: state.previous.clone(),
            });
        }
        match segments.pop() {
            Some(PathSegment::Navigation {
                property,
                type_ref,
                navigation_source,
            }) => segments.push(PathSegment::NavigationLink {
                property,
                type_ref,
                navigation_source,
            }),
            Some(other) => {
                segments.push(other);
                segments.push(PathSegment::Reference);
            }
            None => segments.push(PathSegment::Reference),
        }
        state.leaf = Some("$ref".to_string());
        Ok(())
    }

    fn push_each(&self, segments: &mut Vec<PathSegment>, state: &mut State) -> Result<(), PathError> {
        if !state.is_entity_collection() {
            let segment = state.previous.clone();
            return Err(if state.singleton {
                PathError::EachOnSingleton { segment }
            } else if state.element().is_some_and(TypeRef::is_entity) {
                PathError::EachOnSingleEntity { segment }
            } else {
                PathError::EachOnNonEntities { segment }
            });
        }
        let type_ref = state.type_ref.clone().unwrap_or_else(TypeRef::untyped);
        segments.push(PathSegment::Each {
            type_ref,
            navigation_source: state.navigation_source.clone(),
        });
        state.each = true;
        Ok(())
    }

    fn push_filter(
        &self,
        args: Option<&str>,
        segments: &mut Vec<PathSegment>,
        state: &mut State,
    ) -> Result<(), PathError> {
        if !state.is_collection() {
            return Err(PathError::FilterOnSingle {
                segment: state.previous.clone(),
            });
        }
        let text = args
            .filter(|a| !a.trim().is_empty())
            .ok_or(PathError::FilterWithoutExpression)?;
        let ctx = BindContext::new(state.range_variable());
        let expr = Parser::new(text, self.settings())?.parse()?;
        let expression = self.binder.bind_boolean(&expr, &ctx)?;
        segments.push(PathSegment::Filter {
            expression,
            type_ref: state.type_ref.clone().unwrap_or_else(TypeRef::untyped),
            single: false,
        });
        Ok(())
    }

    fn parse_args(&self, args: Option<&str>) -> Result<Vec<FunctionArg>, PathError> {
        match args {
            Some(text) if !text.trim().is_empty() => Ok(Parser::new(text, self.settings())?.parse_argument_list()?),
            _ => Ok(Vec::new()),
        }
    }

    /// Operation named `name` bound to `binding` (unbound when `None`) whose
    /// parameters match the argument names. Actions take their parameters
    /// from the request body, so any bound action matches.
    fn select_operation(
        &self,
        name: &str,
        binding: Option<&TypeRef>,
        args: &[FunctionArg],
    ) -> Result<Option<&'a Operation>, PathError> {
        let candidates: Vec<&'a Operation> = self
            .model()
            .find_operations(name, self.settings().case_insensitive)
            .into_iter()
            .filter(|op| match (&op.binding, binding) {
                (Some(declared), Some(actual)) => self.binder.accepts_binding(declared, actual),
                (None, None) => true,
                _ => false,
            })
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let names: Vec<&str> = args.iter().filter_map(|a| a.name.as_deref()).collect();
        if names.len() != args.len() {
            return Err(BindError::NoMatchingOperation {
                name: name.to_string(),
                parameters: String::new(),
            }
            .into());
        }
        let ci = self.settings().case_insensitive;
        let found = candidates.iter().copied().find(|op| {
            !op.is_function()
                || (op.parameters.len() == names.len()
                    && op
                        .parameters
                        .iter()
                        .all(|p| names.iter().any(|n| names_match(&p.name, n, ci))))
        });
        match found {
            Some(op) => {
                trace!(operation = %op.name, "operation selected");
                Ok(Some(op))
            }
            None => Err(BindError::NoMatchingOperation {
                name: name.to_string(),
                parameters: names.join(","),
            }
            .into()),
        }
    }

    fn bind_parameters(
        &self,
        operation: &Operation,
        args: &[FunctionArg],
        state: &State,
    ) -> Result<Vec<(String, QueryNode)>, PathError> {
        let ctx = BindContext::new(state.range_variable());
        let ci = self.settings().case_insensitive;
        let mut parameters = Vec::with_capacity(args.len());
        for parameter in &operation.parameters {
            let Some(arg) = args
                .iter()
                .find(|a| a.name.as_deref().is_some_and(|n| names_match(&parameter.name, n, ci)))
            else {
                continue;
            };
            let node = self.binder.bind_parameter_value(
                &arg.value,
                &operation.name,
                &parameter.name,
                &parameter.type_ref,
                &ctx,
            )?;
            parameters.push((parameter.name.clone(), node));
        }
        Ok(parameters)
    }

    fn push_operation(
        &self,
        operation: &'a Operation,
        args: &[FunctionArg],
        segments: &mut Vec<PathSegment>,
        state: &mut State,
    ) -> Result<(), PathError> {
        let parameters = self.bind_parameters(operation, args, state)?;
        let keeps_source = match (&operation.return_type, state.element()) {
            (Some(returned), Some(current)) => {
                let returned = returned.element_type().unwrap_or(returned);
                returned.is_entity() && returned.same_definition(current)
            }
            _ => false,
        };
        let navigation_source = if keeps_source {
            state.navigation_source.clone()
        } else {
            None
        };
        segments.push(PathSegment::Operation {
            name: operation.name.clone(),
            parameters,
            type_ref: operation.return_type.clone(),
            navigation_source: navigation_source.clone(),
        });
        self.after_operation(operation, navigation_source, state);
        Ok(())
    }

    fn after_operation(&self, operation: &Operation, navigation_source: Option<String>, state: &mut State) {
        state.type_ref = operation.return_type.clone();
        state.navigation_source = navigation_source;
        state.singleton = false;
        if !operation.is_function() || !operation.composable || operation.return_type.is_none() {
            state.not_composable = Some(operation.name.clone());
        }
    }

    /// Key predicate `(...)` applied to the collection reached so far.
    fn push_key(
        &self,
        segment: &str,
        args: &str,
        segments: &mut Vec<PathSegment>,
        state: &mut State,
    ) -> Result<(), PathError> {
        if !state.is_entity_collection() {
            return Err(PathError::KeyNotAllowed {
                segment: segment.to_string(),
            });
        }
        let args = Parser::new(args, self.settings())?.parse_argument_list()?;
        self.bind_key(segment, &args, segments, state)
    }

    /// `People/1`: the whole segment is the single key value.
    fn push_key_segment(&self, text: &str, segments: &mut Vec<PathSegment>, state: &mut State) -> Result<(), PathError> {
        let type_name = state
            .element()
            .and_then(TypeRef::structured_name)
            .unwrap_or_default()
            .to_string();
        let keys = self.model().key_properties(&type_name);
        let [key] = keys.as_slice() else {
            return Err(PathError::KeyCount {
                segment: text.to_string(),
                type_name,
                expected: keys.len(),
            });
        };
        let value = if key.type_ref.is_string() && !text.starts_with('\'') {
            Expr::literal(LiteralKind::String, format!("'{}'", text.replace('\'', "''")))
        } else {
            Parser::new(text, self.settings())?.parse()?
        };
        let args = [FunctionArg { name: None, value }];
        self.bind_key(text, &args, segments, state)
    }

    fn bind_key(
        &self,
        segment: &str,
        args: &[FunctionArg],
        segments: &mut Vec<PathSegment>,
        state: &mut State,
    ) -> Result<(), PathError> {
        let type_name = state
            .element()
            .and_then(TypeRef::structured_name)
            .unwrap_or_default()
            .to_string();
        let key_properties = self.model().key_properties(&type_name);
        if key_properties.len() != args.len() {
            return Err(PathError::KeyCount {
                segment: segment.to_string(),
                type_name,
                expected: key_properties.len(),
            });
        }

        let ctx = BindContext::new(state.range_variable());
        let ci = self.settings().case_insensitive;
        let mut keys = Vec::with_capacity(args.len());
        for (position, property) in key_properties.iter().enumerate() {
            let arg = match args.iter().find(|a| a.name.is_some()) {
                None => &args[position],
                Some(_) => args
                    .iter()
                    .find(|a| {
                        a.name
                            .as_deref()
                            .is_some_and(|n| names_match(&property.name, n, ci))
                    })
                    .ok_or_else(|| {
                        let unknown = args
                            .iter()
                            .filter_map(|a| a.name.as_deref())
                            .find(|n| !key_properties.iter().any(|p| names_match(&p.name, n, ci)))
                            .unwrap_or(&property.name);
                        PathError::UnknownKey {
                            name: unknown.to_string(),
                            type_name: type_name.clone(),
                        }
                    })?,
            };
            if !matches!(arg.value.unparenthesized(), Expr::Literal(_) | Expr::Alias(_)) {
                return Err(PathError::KeyNotLiteral {
                    segment: segment.to_string(),
                    key: property.name.clone(),
                });
            }
            let value = self
                .binder
                .bind_parameter_value(&arg.value, &type_name, &property.name, &property.type_ref, &ctx)?;
            keys.push((property.name.clone(), value));
        }

        let type_ref = TypeRef::entity(type_name, false);
        segments.push(PathSegment::Key {
            keys,
            type_ref: type_ref.clone(),
            navigation_source: state.navigation_source.clone(),
        });
        state.type_ref = Some(type_ref);
        Ok(())
    }
}

/// Resolves `path` against `model`.
///
/// # Examples
///
/// ```
/// use odata_uri::alias::AliasTable;
/// use odata_uri::model::{EdmModel, EntityContainer, EntitySet, Primitive, StructuredType, TypeRef};
/// use odata_uri::path::{resolve_path, PathSegment};
/// use odata_uri::ParserSettings;
///
/// let mut model = EdmModel::new();
/// model
///     .add_structured_type(
///         StructuredType::entity("NS.Person").with_key("ID", TypeRef::primitive(Primitive::Int32, false)),
///     )
///     .add_container(EntityContainer::new("Default").with_entity_set(EntitySet::new("People", "NS.Person")));
///
/// let settings = ParserSettings::default();
/// let aliases = AliasTable::default();
/// let path = resolve_path("People(1)", &model, &settings, &aliases).unwrap();
/// assert!(matches!(path.segments[1], PathSegment::Key { .. }));
/// ```
pub fn resolve_path(
    path: &str,
    model: &dyn Model,
    settings: &ParserSettings,
    aliases: &AliasTable,
) -> Result<ODataPath, PathError> {
    PathResolver::new(model, settings, aliases).resolve(path)
}
