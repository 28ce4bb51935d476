//! Parser and semantic binder for OData resource paths and query options.
//!
//! Raw text goes through the [lexer], the expression [parser] (or the
//! [search] grammar), and the [binder], which resolves names against a
//! [`Model`](model::Model) and produces typed [`QueryNode`](node::QueryNode)
//! trees. Resource paths are resolved by [`path`]; [`UriParser`] drives a
//! whole request.
//!
//! ```
//! use odata_uri::model::{EdmModel, EntityContainer, EntitySet, Primitive, StructuredType, TypeRef};
//! use odata_uri::{ParserSettings, UriParser};
//!
//! let mut model = EdmModel::new();
//! model
//!     .add_structured_type(
//!         StructuredType::entity("NS.Person")
//!             .with_key("ID", TypeRef::primitive(Primitive::Int32, false))
//!             .with_property("Name", TypeRef::string(true)),
//!     )
//!     .add_container(EntityContainer::new("Default").with_entity_set(EntitySet::new("People", "NS.Person")));
//!
//! let parser = UriParser::from_parts(&model, ParserSettings::default(), "People(1)", [("$select", "Name")]).unwrap();
//! let uri = parser.parse_uri().unwrap();
//! assert_eq!(uri.path.segments.len(), 2);
//! ```
pub mod alias;
pub mod ast;
pub mod binder;
pub mod clauses;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod literal;
pub mod model;
pub mod node;
pub mod options;
pub mod output;
pub mod parser;
pub mod path;
pub mod search;
pub mod settings;
pub mod value;

pub use alias::{AliasError, AliasTable};
pub use ast::{BinOp, Expr, Token};
pub use binder::{BindContext, BindError, Binder};
pub use error::{Error, ErrorKind, Result};
pub use lexer::{LexError, Lexer};
pub use literal::LiteralError;
pub use model::{EdmModel, Model, TypeRef};
pub use node::QueryNode;
pub use options::{ODataUri, QueryOptionError, UriParser};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser};
pub use path::{ODataPath, PathError, PathSegment};
pub use settings::ParserSettings;
pub use value::Value;
