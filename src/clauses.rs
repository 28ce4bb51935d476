//! Binding of the structured query options: `$orderby`, `$compute`,
//! `$apply`, `$search` and `$select`/`$expand` with their nested options.

use tracing::{debug, trace};

use crate::{
    ast::{AggregateItem, AggregateMethod, ComputeItem, ExpandItem, OrderByItem, SelectItem, Transformation},
    binder::{BindContext, BindError, Binder},
    model::{NavigationProperty, Primitive, TypeKind, TypeRef},
    node::{
        AggregateNode, ApplyClause, ComputeClause, ComputedNode, ExpandedItem, OrderByClause, OrderingNode,
        RangeVariable, SearchClause, SelectExpandClause, SelectedItem, TransformationNode,
    },
    options, parser, search,
};

impl<'a> Binder<'a> {
    pub fn bind_order_by(&self, items: &[OrderByItem], it: RangeVariable) -> Result<OrderByClause, BindError> {
        let ctx = BindContext::new(it.clone());
        let items = items
            .iter()
            .map(|item| -> Result<OrderingNode, BindError> {
                let expression = self.bind(&item.expression, &ctx)?;
                if let Some(t) = expression.type_ref() {
                    if matches!(
                        t.kind,
                        TypeKind::Collection(_) | TypeKind::Entity(_) | TypeKind::Complex(_)
                    ) {
                        return Err(BindError::NotSortable { found: t.full_name() });
                    }
                }
                Ok(OrderingNode {
                    expression,
                    direction: item.direction,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OrderByClause {
            items,
            range_variable: it,
        })
    }

    pub fn bind_compute(&self, items: &[ComputeItem], it: RangeVariable) -> Result<ComputeClause, BindError> {
        let ctx = BindContext::new(it);
        let mut nodes: Vec<ComputedNode> = Vec::with_capacity(items.len());
        for item in items {
            if nodes.iter().any(|n| n.alias == item.alias) {
                return Err(BindError::DuplicateAlias {
                    name: item.alias.clone(),
                });
            }
            let expression = self.bind(&item.expression, &ctx)?;
            nodes.push(ComputedNode {
                type_ref: expression.type_ref(),
                alias: item.alias.clone(),
                expression,
            });
        }
        Ok(ComputeClause { items: nodes })
    }

    /// Binds `$apply`. Aliases introduced by `compute`, `aggregate` and
    /// `groupby` are visible to the transformations after them.
    pub fn bind_apply(&self, transformations: &[Transformation], it: RangeVariable) -> Result<ApplyClause, BindError> {
        let ctx = BindContext::new(it.clone());
        let mut scope = self.scope([]);
        let mut nodes = Vec::with_capacity(transformations.len());
        for transformation in transformations {
            let node = match transformation {
                Transformation::Filter(expr) => TransformationNode::Filter(scope.bind_boolean(expr, &ctx)?),
                Transformation::Compute(items) => {
                    TransformationNode::Compute(scope.bind_compute(items, it.clone())?.items)
                }
                Transformation::Aggregate(items) => TransformationNode::Aggregate(scope.bind_aggregate(items, &ctx)?),
                Transformation::GroupBy { properties, aggregate } => {
                    let properties = properties
                        .iter()
                        .map(|p| scope.bind(p, &ctx))
                        .collect::<Result<Vec<_>, _>>()?;
                    let aggregate = aggregate
                        .as_deref()
                        .map(|items| scope.bind_aggregate(items, &ctx))
                        .transpose()?;
                    TransformationNode::GroupBy { properties, aggregate }
                }
            };
            scope = scope.scope(introduced_aliases(&node));
            nodes.push(node);
        }
        Ok(ApplyClause { transformations: nodes })
    }

    fn bind_aggregate(&self, items: &[AggregateItem], ctx: &BindContext) -> Result<Vec<AggregateNode>, BindError> {
        let mut nodes: Vec<AggregateNode> = Vec::with_capacity(items.len());
        for item in items {
            let alias = match item {
                AggregateItem::Expression { alias, .. } | AggregateItem::Count { alias } => alias,
            };
            if nodes.iter().any(|n| n.alias() == alias) {
                return Err(BindError::DuplicateAlias { name: alias.clone() });
            }
            let node = match item {
                AggregateItem::Count { alias } => AggregateNode::Count { alias: alias.clone() },
                AggregateItem::Expression {
                    expression,
                    method,
                    alias,
                } => {
                    let expression = self.bind(expression, ctx)?;
                    let type_ref = aggregate_type(method, expression.type_ref().as_ref())?;
                    AggregateNode::Expression {
                        expression,
                        method: method.clone(),
                        alias: alias.clone(),
                        type_ref,
                    }
                }
            };
            nodes.push(node);
        }
        Ok(nodes)
    }

    pub fn bind_search_text(&self, text: &str) -> Result<SearchClause, BindError> {
        let expr = search::parse_search(text, self.settings())?;
        Ok(SearchClause {
            expression: self.bind_search(&expr),
        })
    }

    /// Binds `$select` and `$expand` against the entity or complex type
    /// `type_name`, reached through `navigation_source` when known.
    pub fn bind_select_expand(
        &self,
        select: Option<&str>,
        expand: Option<&str>,
        type_name: &str,
        navigation_source: Option<&str>,
    ) -> Result<SelectExpandClause, BindError> {
        let mut expanded_count = 0;
        self.select_expand_at(select, expand, type_name, navigation_source, 0, &mut expanded_count)
    }

    fn select_expand_at(
        &self,
        select: Option<&str>,
        expand: Option<&str>,
        type_name: &str,
        navigation_source: Option<&str>,
        depth: usize,
        expanded_count: &mut usize,
    ) -> Result<SelectExpandClause, BindError> {
        let settings = self.settings();

        let mut clause = SelectExpandClause {
            all_selected: true,
            ..Default::default()
        };
        if let Some(text) = select {
            let items = parser::parse_select(text, settings)?;
            clause.all_selected = items.contains(&SelectItem::Wildcard);
            clause.selected = items
                .iter()
                .map(|item| self.bind_select_item(item, type_name))
                .collect::<Result<_, _>>()?;
        }

        if let Some(text) = expand {
            if depth >= settings.max_expand_depth {
                return Err(BindError::ExpandTooDeep {
                    max: settings.max_expand_depth,
                });
            }
            for item in parser::parse_expand(text, settings)? {
                let targets = self.expand_targets(&item, type_name)?;
                for (path, navigation) in targets {
                    *expanded_count += 1;
                    if *expanded_count > settings.max_expand_count {
                        return Err(BindError::ExpandTooMany {
                            max: settings.max_expand_count,
                        });
                    }
                    let expanded =
                        self.bind_expand_item(&item, path, navigation, navigation_source, depth, expanded_count)?;
                    clause.expanded.push(expanded);
                }
            }
        }
        debug!(
            type_name,
            selected = clause.selected.len(),
            expanded = clause.expanded.len(),
            "bound select and expand"
        );
        Ok(clause)
    }

    fn bind_select_item(&self, item: &SelectItem, type_name: &str) -> Result<SelectedItem, BindError> {
        let segments = match item {
            SelectItem::Wildcard => return Ok(SelectedItem::Wildcard),
            SelectItem::NamespaceWildcard(namespace) => return Ok(SelectedItem::NamespaceWildcard(namespace.clone())),
            SelectItem::Path(segments) => segments,
        };
        let model = self.model();
        let ci = self.settings().case_insensitive;
        let joined = segments.join("/");
        let invalid = |reason: &str| BindError::SelectPath {
            path: joined.clone(),
            reason: reason.to_string(),
        };

        if let [single] = segments.as_slice() {
            if let Some((_, type_ref)) = self.computed_alias(single) {
                return Ok(SelectedItem::Property {
                    path: segments.clone(),
                    type_ref,
                });
            }
        }

        let mut current = type_name.to_string();
        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            if segment.contains('.') {
                if model.structured_type(segment).is_some() {
                    if !model.derives_from(segment, &current) {
                        return Err(invalid("type cast to an unrelated type"));
                    }
                    current = segment.clone();
                    continue;
                }
                let binding = TypeRef::entity(current.clone(), false);
                let bound = model
                    .find_operations(segment, ci)
                    .into_iter()
                    .any(|op| op.binding.as_ref().is_some_and(|b| self.accepts_binding(b, &binding)));
                if bound && last {
                    return Ok(SelectedItem::Operation(segment.clone()));
                }
                return Err(invalid("unknown type or operation"));
            }
            if let Some(property) = model.find_property(&current, segment, ci) {
                if last {
                    return Ok(SelectedItem::Property {
                        path: segments.clone(),
                        type_ref: Some(property.type_ref.clone()),
                    });
                }
                let element = property.type_ref.element_type().unwrap_or(&property.type_ref);
                match &element.kind {
                    TypeKind::Complex(name) => current = name.clone(),
                    _ => return Err(invalid("only complex properties can be followed by another segment")),
                }
                continue;
            }
            if model.find_navigation(&current, segment, ci).is_some() {
                if last {
                    return Ok(SelectedItem::Navigation { path: segments.clone() });
                }
                return Err(invalid("a navigation property must end the path"));
            }
            if model.is_open(&current) && last {
                return Ok(SelectedItem::Property {
                    path: segments.clone(),
                    type_ref: None,
                });
            }
            return Err(BindError::PropertyNotDeclared {
                type_name: current,
                property: segment.clone(),
            });
        }
        Err(invalid("the path ends with a type cast"))
    }

    fn computed_alias(&self, name: &str) -> Option<(String, Option<TypeRef>)> {
        self.computed_aliases().iter().find(|(a, _)| a == name).cloned()
    }

    /// Navigation properties an expand item names, each with the path
    /// leading to it. `*` expands every navigation property.
    fn expand_targets(
        &self,
        item: &ExpandItem,
        type_name: &str,
    ) -> Result<Vec<(Vec<String>, &'a NavigationProperty)>, BindError> {
        let model = self.model();
        let ci = self.settings().case_insensitive;
        let joined = item.path.join("/");
        let invalid = |reason: &str| BindError::ExpandPath {
            path: joined.clone(),
            reason: reason.to_string(),
        };

        let mut current = type_name.to_string();
        let Some((last, prefix)) = item.path.split_last() else {
            return Err(invalid("empty path"));
        };
        for segment in prefix {
            if model.structured_type(segment).is_some() {
                if !model.derives_from(segment, &current) {
                    return Err(invalid("type cast to an unrelated type"));
                }
                current = segment.clone();
                continue;
            }
            let property = model
                .find_property(&current, segment, ci)
                .ok_or_else(|| invalid("unknown segment"))?;
            match &property.type_ref.kind {
                TypeKind::Complex(name) => current = name.clone(),
                _ => return Err(invalid("only complex properties can lead to a navigation property")),
            }
        }

        if last == "*" {
            return Ok(model
                .type_chain(&current)
                .into_iter()
                .rev()
                .flat_map(|ty| ty.navigation_properties.iter())
                .map(|nav| {
                    let mut path = prefix.to_vec();
                    path.push(nav.name.clone());
                    (path, nav)
                })
                .collect());
        }
        let navigation = model
            .find_navigation(&current, last, ci)
            .ok_or_else(|| invalid("the last segment must be a navigation property"))?;
        let mut path = prefix.to_vec();
        path.push(navigation.name.clone());
        Ok(vec![(path, navigation)])
    }

    fn bind_expand_item(
        &self,
        item: &ExpandItem,
        path: Vec<String>,
        navigation: &NavigationProperty,
        parent_source: Option<&str>,
        depth: usize,
        expanded_count: &mut usize,
    ) -> Result<ExpandedItem, BindError> {
        let nested = &item.options;
        if item.reference {
            for (name, value) in [
                ("$select", &nested.select),
                ("$expand", &nested.expand),
                ("$levels", &nested.levels),
                ("$compute", &nested.compute),
            ] {
                if value.is_some() {
                    return Err(BindError::InvalidExpandOption {
                        option: name.to_string(),
                    });
                }
            }
        }

        let navigation_source = parent_source
            .and_then(|s| self.model().find_navigation_source(s))
            .and_then(|set| {
                set.binding_target(&path.join("/"))
                    .or_else(|| set.binding_target(&navigation.name))
            })
            .map(str::to_string);
        let it = RangeVariable::it(
            TypeRef::entity(navigation.target.clone(), false),
            navigation_source.clone(),
        );
        trace!(navigation = %navigation.name, target = %navigation.target, "binding expand item");

        let compute = nested
            .compute
            .as_deref()
            .map(|text| -> Result<ComputeClause, BindError> {
                let items = parser::parse_compute(text, self.settings())?;
                self.bind_compute(&items, it.clone())
            })
            .transpose()?;
        let inner = self.scope(
            compute
                .iter()
                .flat_map(|c| c.items.iter().map(|n| (n.alias.clone(), n.type_ref.clone()))),
        );

        let filter = nested
            .filter
            .as_deref()
            .map(|text| inner.bind_filter(text, it.clone()))
            .transpose()?;
        let order_by = nested
            .order_by
            .as_deref()
            .map(|text| -> Result<OrderByClause, BindError> {
                let items = parser::parse_order_by(text, self.settings())?;
                inner.bind_order_by(&items, it.clone())
            })
            .transpose()?;
        let select_expand = if nested.select.is_some() || nested.expand.is_some() {
            let clause = inner.select_expand_at(
                nested.select.as_deref(),
                nested.expand.as_deref(),
                &navigation.target,
                navigation_source.as_deref(),
                depth + 1,
                expanded_count,
            )?;
            Some(Box::new(clause))
        } else {
            None
        };
        let search = nested
            .search
            .as_deref()
            .map(|text| inner.bind_search_text(text))
            .transpose()?;

        Ok(ExpandedItem {
            path,
            navigation_property: navigation.name.clone(),
            target_type: navigation.target.clone(),
            navigation_source,
            reference: item.reference,
            filter,
            order_by,
            select_expand,
            top: nested.top.as_deref().map(options::parse_top).transpose()?,
            skip: nested.skip.as_deref().map(options::parse_skip).transpose()?,
            count: nested.count.as_deref().map(options::parse_count).transpose()?,
            search,
            levels: nested.levels.as_deref().map(options::parse_levels).transpose()?,
            compute,
        })
    }
}

fn introduced_aliases(node: &TransformationNode) -> Vec<(String, Option<TypeRef>)> {
    let aggregates = |items: &[AggregateNode]| -> Vec<(String, Option<TypeRef>)> {
        items
            .iter()
            .map(|item| match item {
                AggregateNode::Expression { alias, type_ref, .. } => (alias.clone(), type_ref.clone()),
                AggregateNode::Count { alias } => (alias.clone(), Some(TypeRef::primitive(Primitive::Int64, false))),
            })
            .collect()
    };
    match node {
        TransformationNode::Filter(_) => Vec::new(),
        TransformationNode::Compute(items) => items
            .iter()
            .map(|n| (n.alias.clone(), n.type_ref.clone()))
            .collect(),
        TransformationNode::Aggregate(items) => aggregates(items),
        TransformationNode::GroupBy { aggregate, .. } => aggregate.as_deref().map(aggregates).unwrap_or_default(),
    }
}

/// Result type of an aggregation method over values of type `input`.
fn aggregate_type(method: &AggregateMethod, input: Option<&TypeRef>) -> Result<Option<TypeRef>, BindError> {
    let primitive = input.and_then(TypeRef::as_primitive);
    let not_applicable = |name: &str| BindError::AggregateType {
        method: name.to_string(),
        found: input.map_or_else(|| "<null>".to_string(), TypeRef::full_name),
    };
    let result = |p: Primitive| Some(TypeRef::primitive(p, true));
    Ok(match method {
        AggregateMethod::Sum => match primitive {
            Some(p) if p.is_integral() => result(Primitive::Int64),
            Some(Primitive::Single | Primitive::Double) => result(Primitive::Double),
            Some(Primitive::Decimal) => result(Primitive::Decimal),
            None if input.is_none_or(TypeRef::is_untyped) => None,
            _ => return Err(not_applicable("sum")),
        },
        AggregateMethod::Average => match primitive {
            Some(Primitive::Decimal) => result(Primitive::Decimal),
            Some(p) if p.is_numeric() => result(Primitive::Double),
            None if input.is_none_or(TypeRef::is_untyped) => None,
            _ => return Err(not_applicable("average")),
        },
        AggregateMethod::Min | AggregateMethod::Max => match input {
            Some(t) if t.is_collection() || t.structured_name().is_some() => {
                let name = if *method == AggregateMethod::Min { "min" } else { "max" };
                return Err(not_applicable(name));
            }
            other => other.map(|t| t.with_nullable(true)),
        },
        AggregateMethod::CountDistinct => Some(TypeRef::primitive(Primitive::Int64, false)),
        AggregateMethod::Custom(_) => None,
    })
}
