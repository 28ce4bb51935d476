//! # Query Options
//!
//! Scalar option parsers (`$top`, `$skip`, `$count`, `$index`, `$levels`)
//! and [`UriParser`], the façade that takes a whole request apart and runs
//! each option through the right parser and binder.
//!
//! All options of one request share a single [`AliasTable`], so `@a` means
//! the same bound value in the path, in `$filter` and in `$orderby`.

use std::rc::Rc;

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
    alias::AliasTable,
    binder::Binder,
    error::Result,
    model::{Model, TypeRef},
    node::{
        ApplyClause, ComputeClause, FilterClause, Levels, OrderByClause, QueryNode, RangeVariable, SearchClause,
        SelectExpandClause,
    },
    parser,
    path::{ODataPath, PathResolver},
    settings::ParserSettings,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryOptionError {
    #[error("Invalid value '{value}' for $top query option found. The $top query option requires a non-negative integer value.")]
    InvalidTop { value: String },

    #[error("Invalid value '{value}' for $skip query option found. The $skip query option requires a non-negative integer value.")]
    InvalidSkip { value: String },

    #[error("'{value}' is not a valid count option.")]
    InvalidCount { value: String },

    #[error("Invalid value '{value}' for $index query option found. The $index query option requires an integer value.")]
    InvalidIndex { value: String },

    #[error("Invalid value '{value}' for $levels; expected 'max' or a non-negative integer.")]
    InvalidLevels { value: String },

    #[error("'{value}' is not a valid entity id.")]
    InvalidEntityId { value: String },

    #[error("Query option '{name}' was specified more than once, but it must be specified at most once.")]
    Duplicate { name: String },

    #[error("The query parameter '{name}' is not supported.")]
    Unsupported { name: String },

    #[error("The request URI '{uri}' is not valid. Its path must start with the service root '{root}'.")]
    NotUnderServiceRoot { uri: String, root: String },

    #[error("The option '{option}' cannot be applied to a resource of type '{type_name}'.")]
    NotApplicable { option: String, type_name: String },
}

fn non_negative(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// `$top`: a non-negative base-10 integer.
///
/// # Examples
///
/// ```
/// use odata_uri::options::parse_top;
///
/// assert_eq!(parse_top(" 10 ").unwrap(), 10);
/// assert!(parse_top("-1").is_err());
/// assert!(parse_top("1.0").is_err());
/// ```
pub fn parse_top(value: &str) -> std::result::Result<i64, QueryOptionError> {
    non_negative(value).ok_or_else(|| QueryOptionError::InvalidTop {
        value: value.to_string(),
    })
}

pub fn parse_skip(value: &str) -> std::result::Result<i64, QueryOptionError> {
    non_negative(value).ok_or_else(|| QueryOptionError::InvalidSkip {
        value: value.to_string(),
    })
}

/// `$count`: exactly `true` or `false` once surrounding whitespace is gone.
pub fn parse_count(value: &str) -> std::result::Result<bool, QueryOptionError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(QueryOptionError::InvalidCount {
            value: value.to_string(),
        }),
    }
}

/// `$index`: any integer, negative values included.
pub fn parse_index(value: &str) -> std::result::Result<i64, QueryOptionError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QueryOptionError::InvalidIndex {
            value: value.to_string(),
        });
    }
    trimmed.parse().map_err(|_| QueryOptionError::InvalidIndex {
        value: value.to_string(),
    })
}

pub fn parse_levels(value: &str) -> std::result::Result<Levels, QueryOptionError> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("max") {
        return Ok(Levels::Max);
    }
    non_negative(trimmed)
        .map(Levels::Count)
        .ok_or_else(|| QueryOptionError::InvalidLevels {
            value: value.to_string(),
        })
}

const SYSTEM_OPTIONS: &[&str] = &[
    "$filter",
    "$orderby",
    "$select",
    "$expand",
    "$search",
    "$compute",
    "$apply",
    "$top",
    "$skip",
    "$count",
    "$index",
    "$skiptoken",
    "$deltatoken",
    "$id",
    "$format",
    "$levels",
    "$schemaversion",
];

/// Everything [`UriParser::parse_uri`] extracts from one request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ODataUri {
    pub path: ODataPath,
    pub filter: Option<FilterClause>,
    pub order_by: Option<OrderByClause>,
    pub select_expand: Option<SelectExpandClause>,
    pub search: Option<SearchClause>,
    pub compute: Option<ComputeClause>,
    pub apply: Option<ApplyClause>,
    pub top: Option<i64>,
    pub skip: Option<i64>,
    pub count: Option<bool>,
    pub index: Option<i64>,
    pub skip_token: Option<String>,
    pub delta_token: Option<String>,
    pub entity_id: Option<Url>,
    /// Aliases bound while parsing, in declaration order
    pub parameter_aliases: IndexMap<String, QueryNode>,
    /// Query parameters that are neither system options nor aliases
    pub custom_options: IndexMap<String, String>,
}

/// Parses the resource path and query options of one request.
///
/// # Examples
///
/// ```
/// use odata_uri::model::{EdmModel, EntityContainer, EntitySet, Primitive, StructuredType, TypeRef};
/// use odata_uri::{ParserSettings, UriParser};
///
/// let mut model = EdmModel::new();
/// model
///     .add_structured_type(
///         StructuredType::entity("NS.Person")
///             .with_key("ID", TypeRef::primitive(Primitive::Int32, false))
///             .with_property("Age", TypeRef::primitive(Primitive::Int32, true)),
///     )
///     .add_container(EntityContainer::new("Default").with_entity_set(EntitySet::new("People", "NS.Person")));
///
/// let parser = UriParser::from_parts(
///     &model,
///     ParserSettings::default(),
///     "People",
///     [("$filter", "Age gt @a"), ("@a", "18"), ("$top", "5")],
/// )
/// .unwrap();
/// let uri = parser.parse_uri().unwrap();
/// assert!(uri.filter.is_some());
/// assert_eq!(uri.top, Some(5));
/// assert!(uri.parameter_aliases.contains_key("a"));
/// ```
pub struct UriParser<'a> {
    model: &'a dyn Model,
    settings: ParserSettings,
    aliases: Rc<AliasTable>,
    service_root: Option<Url>,
    path: String,
    options: IndexMap<String, String>,
    custom: IndexMap<String, String>,
}

fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

impl<'a> UriParser<'a> {
    /// Takes `request` apart relative to `service_root`.
    pub fn new(model: &'a dyn Model, settings: ParserSettings, service_root: &Url, request: &Url) -> Result<Self> {
        let mut root = service_root.clone();
        root.set_query(None);
        root.set_fragment(None);
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }

        let mut location = request.clone();
        location.set_query(None);
        location.set_fragment(None);
        let location_text = location.as_str();
        let relative = match location_text.strip_prefix(root.as_str()) {
            Some(rest) => rest.to_string(),
            None if format!("{location_text}/") == root.as_str() => String::new(),
            None => {
                return Err(QueryOptionError::NotUnderServiceRoot {
                    uri: request.to_string(),
                    root: service_root.to_string(),
                }
                .into());
            }
        };

        let pairs: Vec<(String, String)> = request
            .query()
            .map(|query| {
                query
                    .split('&')
                    .filter(|pair| !pair.is_empty())
                    .map(|pair| match pair.split_once('=') {
                        Some((name, value)) => (decode(name), decode(value)),
                        None => (decode(pair), String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut parser = UriParser::from_parts(
            model,
            settings,
            &decode(&relative),
            pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())),
        )?;
        parser.service_root = Some(root);
        Ok(parser)
    }

    /// Builds a parser from an already decoded path and query pairs.
    pub fn from_parts<'p, I>(model: &'a dyn Model, settings: ParserSettings, path: &str, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'p str, &'p str)>,
    {
        let mut aliases = AliasTable::new(settings.max_alias_depth);
        let mut options = IndexMap::new();
        let mut custom = IndexMap::new();
        for (name, value) in pairs {
            let name = name.trim();
            if let Some(alias) = name.strip_prefix('@') {
                aliases.declare(alias, Some(value));
            } else if name.starts_with('$') {
                let key = if settings.case_insensitive {
                    name.to_ascii_lowercase()
                } else {
                    name.to_string()
                };
                if options.contains_key(&key) {
                    return Err(QueryOptionError::Duplicate { name: key }.into());
                }
                options.insert(key, value.to_string());
            } else {
                custom.insert(name.to_string(), value.to_string());
            }
        }

        Ok(UriParser {
            model,
            settings,
            aliases: Rc::new(aliases),
            service_root: None,
            path: path.trim_matches('/').to_string(),
            options,
            custom,
        })
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// The alias table shared by every option of this request.
    pub fn aliases(&self) -> Rc<AliasTable> {
        Rc::clone(&self.aliases)
    }

    /// Raw (decoded) value of a system query option.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    fn binder(&self) -> Binder<'_> {
        Binder::new(self.model, &self.settings, &self.aliases)
    }

    /// Raw text of a scalar option, following an `@alias` value.
    fn scalar(&self, name: &str) -> Result<Option<String>> {
        let Some(value) = self.option(name) else {
            return Ok(None);
        };
        match value.trim().strip_prefix('@') {
            Some(alias) => Ok(self.aliases.resolve_text(alias)?.map(str::to_string)),
            None => Ok(Some(value.to_string())),
        }
    }

    pub fn parse_path(&self) -> Result<ODataPath> {
        let resolver = PathResolver::new(self.model, &self.settings, &self.aliases);
        Ok(resolver.resolve(&self.path)?)
    }

    fn range_variable(path: &ODataPath) -> RangeVariable {
        RangeVariable::it(
            path.element_type().cloned().unwrap_or_else(TypeRef::untyped),
            path.navigation_source.clone(),
        )
    }

    /// Binder that sees the `$compute` aliases of this request.
    fn scoped_binder(&self, compute: Option<&ComputeClause>) -> Binder<'_> {
        let binder = self.binder();
        match compute {
            Some(clause) => binder.with_computed(
                clause
                    .items
                    .iter()
                    .map(|item| (item.alias.clone(), item.type_ref.clone())),
            ),
            None => binder,
        }
    }

    pub fn parse_filter(&self) -> Result<Option<FilterClause>> {
        let path = self.parse_path()?;
        let compute = self.parse_compute()?;
        self.filter_at(&path, compute.as_ref())
    }

    fn filter_at(&self, path: &ODataPath, compute: Option<&ComputeClause>) -> Result<Option<FilterClause>> {
        let Some(text) = self.option("$filter") else {
            return Ok(None);
        };
        debug!(option = "$filter", text, "parsing query option");
        let clause = self
            .scoped_binder(compute)
            .bind_filter(text, Self::range_variable(path))?;
        Ok(Some(clause))
    }

    pub fn parse_order_by(&self) -> Result<Option<OrderByClause>> {
        let path = self.parse_path()?;
        let compute = self.parse_compute()?;
        self.order_by_at(&path, compute.as_ref())
    }

    fn order_by_at(&self, path: &ODataPath, compute: Option<&ComputeClause>) -> Result<Option<OrderByClause>> {
        let Some(text) = self.option("$orderby") else {
            return Ok(None);
        };
        debug!(option = "$orderby", text, "parsing query option");
        let items = parser::parse_order_by(text, &self.settings)?;
        let clause = self
            .scoped_binder(compute)
            .bind_order_by(&items, Self::range_variable(path))?;
        Ok(Some(clause))
    }

    pub fn parse_select_and_expand(&self) -> Result<Option<SelectExpandClause>> {
        let path = self.parse_path()?;
        let compute = self.parse_compute()?;
        self.select_expand_at(&path, compute.as_ref())
    }

    fn select_expand_at(
        &self,
        path: &ODataPath,
        compute: Option<&ComputeClause>,
    ) -> Result<Option<SelectExpandClause>> {
        let select = self.option("$select");
        let expand = self.option("$expand");
        if select.is_none() && expand.is_none() {
            return Ok(None);
        }
        debug!(select, expand, "parsing $select and $expand");
        let element = path.element_type();
        let Some(type_name) = element.and_then(TypeRef::structured_name) else {
            return Err(QueryOptionError::NotApplicable {
                option: if select.is_some() { "$select" } else { "$expand" }.to_string(),
                type_name: element.map_or_else(|| "Edm.Untyped".to_string(), TypeRef::full_name),
            }
            .into());
        };
        let clause = self.scoped_binder(compute).bind_select_expand(
            select,
            expand,
            type_name,
            path.navigation_source.as_deref(),
        )?;
        Ok(Some(clause))
    }

    pub fn parse_search(&self) -> Result<Option<SearchClause>> {
        let Some(text) = self.option("$search") else {
            return Ok(None);
        };
        debug!(option = "$search", text, "parsing query option");
        Ok(Some(self.binder().bind_search_text(text)?))
    }

    pub fn parse_compute(&self) -> Result<Option<ComputeClause>> {
        let Some(text) = self.option("$compute") else {
            return Ok(None);
        };
        debug!(option = "$compute", text, "parsing query option");
        let path = self.parse_path()?;
        let items = parser::parse_compute(text, &self.settings)?;
        let clause = self.binder().bind_compute(&items, Self::range_variable(&path))?;
        Ok(Some(clause))
    }

    pub fn parse_apply(&self) -> Result<Option<ApplyClause>> {
        let Some(text) = self.option("$apply") else {
            return Ok(None);
        };
        debug!(option = "$apply", text, "parsing query option");
        let path = self.parse_path()?;
        let transformations = parser::parse_apply(text, &self.settings)?;
        let clause = self
            .binder()
            .bind_apply(&transformations, Self::range_variable(&path))?;
        Ok(Some(clause))
    }

    pub fn parse_top(&self) -> Result<Option<i64>> {
        Ok(self.scalar("$top")?.as_deref().map(parse_top).transpose()?)
    }

    pub fn parse_skip(&self) -> Result<Option<i64>> {
        Ok(self.scalar("$skip")?.as_deref().map(parse_skip).transpose()?)
    }

    pub fn parse_count(&self) -> Result<Option<bool>> {
        Ok(self.scalar("$count")?.as_deref().map(parse_count).transpose()?)
    }

    pub fn parse_index(&self) -> Result<Option<i64>> {
        Ok(self.scalar("$index")?.as_deref().map(parse_index).transpose()?)
    }

    pub fn parse_skip_token(&self) -> Option<&str> {
        self.option("$skiptoken")
    }

    pub fn parse_delta_token(&self) -> Option<&str> {
        self.option("$deltatoken")
    }

    /// `$id`, resolved against the service root when relative.
    pub fn parse_entity_id(&self) -> Result<Option<Url>> {
        let Some(text) = self.option("$id") else {
            return Ok(None);
        };
        let invalid = || QueryOptionError::InvalidEntityId {
            value: text.to_string(),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(invalid().into());
        }
        let url = match (Url::parse(trimmed), &self.service_root) {
            (Ok(url), _) => url,
            (Err(url::ParseError::RelativeUrlWithoutBase), Some(root)) => {
                root.join(trimmed).map_err(|_| invalid())?
            }
            _ => return Err(invalid().into()),
        };
        Ok(Some(url))
    }

    /// Parses the path and every option of the request.
    ///
    /// `$compute` is bound first so its aliases resolve in `$filter`,
    /// `$orderby` and `$select`.
    pub fn parse_uri(&self) -> Result<ODataUri> {
        debug!(path = %self.path, options = self.options.len(), "parsing request");
        let unsupported = self
            .options
            .keys()
            .find(|name| !SYSTEM_OPTIONS.contains(&name.as_str()));
        if let Some(name) = unsupported {
            return Err(QueryOptionError::Unsupported { name: name.clone() }.into());
        }

        let path = self.parse_path()?;
        let compute = self.parse_compute()?;
        let filter = self.filter_at(&path, compute.as_ref())?;
        let order_by = self.order_by_at(&path, compute.as_ref())?;
        let select_expand = self.select_expand_at(&path, compute.as_ref())?;
        let search = self.parse_search()?;
        let apply = self.parse_apply()?;

        // Only aliases some option referenced are bound by now.
        let parameter_aliases = self
            .aliases
            .names()
            .filter_map(|name| self.aliases.cached(name).map(|node| (name.to_string(), node)))
            .collect();

        Ok(ODataUri {
            filter,
            order_by,
            select_expand,
            search,
            apply,
            top: self.parse_top()?,
            skip: self.parse_skip()?,
            count: self.parse_count()?,
            index: self.parse_index()?,
            skip_token: self.parse_skip_token().map(str::to_string),
            delta_token: self.parse_delta_token().map(str::to_string),
            entity_id: self.parse_entity_id()?,
            compute,
            path,
            parameter_aliases,
            custom_options: self.custom.clone(),
        })
    }
}
