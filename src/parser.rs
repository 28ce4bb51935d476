use std::mem;

use thiserror::Error;

use crate::{
    ast::{
        AggregateItem, AggregateMethod, BinOp, ComputeItem, Direction, ExpandItem, ExpandOptions,
        Expr, FunctionArg, LambdaKind, LiteralKind, OrderByItem, SelectItem, Token, TokenKind,
        Transformation, UnaryOp,
    },
    lexer::{LexError, Lexer},
    literal,
    settings::ParserSettings,
};

/// Syntax errors. Positions are 0-based character offsets into `text`;
/// `found` is the offending part of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("Expression expected at position {position} in '{text}'; found '{found}'.")]
    ExpressionExpected {
        position: usize,
        found: String,
        text: String,
    },

    #[error("')' or operator expected at position {position} in '{text}'; found '{found}'.")]
    CloseParenOrOperatorExpected {
        position: usize,
        found: String,
        text: String,
    },

    #[error("')' or ',' expected at position {position} in '{text}'; found '{found}'.")]
    CloseParenOrCommaExpected {
        position: usize,
        found: String,
        text: String,
    },

    #[error("Syntax error: {detail} at position {position} ('{found}') in '{text}'.")]
    Syntax {
        detail: String,
        position: usize,
        found: String,
        text: String,
    },

    #[error("The range variable '{name}' is already in scope at position {position} in '{text}'.")]
    RangeVariableInScope {
        name: String,
        position: usize,
        text: String,
    },

    #[error("The recursion depth of the parse tree exceeded the maximum.")]
    TooDeep,
}

impl ParseError {
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::Lex(e) => Some(e.position()),
            ParseError::ExpressionExpected { position, .. }
            | ParseError::CloseParenOrOperatorExpected { position, .. }
            | ParseError::CloseParenOrCommaExpected { position, .. }
            | ParseError::Syntax { position, .. }
            | ParseError::RangeVariableInScope { position, .. } => Some(*position),
            ParseError::TooDeep => None,
        }
    }
}

/// Recursive-descent parser for filter, orderby, compute and apply
/// expressions, and for the path-like syntax of `$select` and `$expand`.
///
/// Each precedence level has its own method, lowest first:
///
/// ```text
/// parse_or -> parse_and -> parse_not -> parse_equality -> parse_relational
///   -> parse_additive -> parse_multiplicative -> parse_unary -> parse_primary
/// ```
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    max_depth: usize,
    depth: usize,
    range_variables: Vec<String>,
}

impl Parser {
    pub fn new(text: &str, settings: &ParserSettings) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(text);
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            max_depth: settings.max_depth,
            depth: 0,
            range_variables: Vec::new(),
        })
    }

    /// Makes `names` resolvable as range variables, for expressions nested
    /// inside a lambda body that are parsed separately.
    pub fn with_range_variables(mut self, names: Vec<String>) -> Self {
        self.range_variables = names;
        self
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    /// Consumes the current token and returns it.
    fn take(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(mem::replace(&mut self.current_token, next))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_token.kind == kind
    }

    fn text(&self) -> String {
        self.lexer.text()
    }

    fn text_between(&self, start: usize, end: usize) -> String {
        self.lexer.text().chars().skip(start).take(end.saturating_sub(start)).collect()
    }

    /// Text of the current token, for error messages.
    fn found(&self) -> String {
        self.current_token.text.clone()
    }

    fn syntax(&self, detail: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            detail: detail.into(),
            position: self.current_token.position,
            found: self.found(),
            text: self.text(),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ParseError> {
        if !self.check(kind) {
            return Err(self.syntax(format!("'{what}' expected")));
        }
        self.advance()
    }

    fn expect_close_paren(&mut self) -> Result<(), ParseError> {
        if !self.check(TokenKind::CloseParen) {
            return Err(ParseError::CloseParenOrOperatorExpected {
                position: self.current_token.position,
                found: self.found(),
                text: self.text(),
            });
        }
        self.advance()
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        if !self.check(TokenKind::End) {
            return Err(ParseError::CloseParenOrOperatorExpected {
                position: self.current_token.position,
                found: self.found(),
                text: self.text(),
            });
        }
        Ok(())
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if !self.current_token.is_identifier(keyword) {
            return Err(self.syntax(format!("'{keyword}' expected")));
        }
        self.advance()
    }

    fn expect_name(&mut self, what: &str) -> Result<String, ParseError> {
        if !self.current_token.is_name() {
            return Err(self.syntax(format!("{what} expected")));
        }
        Ok(self.take()?.text)
    }

    /// Every grammar level, chained operator and path segment counts once,
    /// so `max_depth` also bounds the depth of the resulting tree.
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::TooDeep);
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    /// Current token if it is the operator keyword of one of `ops`.
    fn binary_operator(&self, ops: &[BinOp]) -> Option<BinOp> {
        if self.current_token.kind != TokenKind::Operator {
            return None;
        }
        BinOp::from_keyword(&self.current_token.text).filter(|op| ops.contains(op))
    }

    fn binary_level(
        &mut self,
        ops: &[BinOp],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        self.enter()?;
        let mut left = next(self)?;
        let mut levels = 1;
        while let Some(op) = self.binary_operator(ops) {
            self.advance()?;
            self.enter()?;
            levels += 1;
            let right = next(self)?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.leave(levels);
        Ok(left)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.parse_or()?;
        self.leave(1);
        Ok(expr)
    }

    /// A complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        self.expect_end()?;
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[BinOp::Or], Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[BinOp::And], Self::parse_not)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if !self.current_token.is_operator("not") {
            return self.parse_equality();
        }
        self.advance()?;
        self.enter()?;
        let operand = self.parse_not()?;
        self.leave(1);
        Ok(Expr::UnaryOp {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        })
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[BinOp::Equal, BinOp::NotEqual], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[
                BinOp::GreaterThan,
                BinOp::GreaterEqual,
                BinOp::LessThan,
                BinOp::LessEqual,
                BinOp::Has,
                BinOp::In,
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(&[BinOp::Add, BinOp::Subtract], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            &[BinOp::Multiply, BinOp::Divide, BinOp::Modulo],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if !self.check(TokenKind::Minus) {
            return self.parse_primary();
        }
        self.advance()?;
        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave(1);
        Ok(Expr::UnaryOp {
            op: UnaryOp::Negate,
            operand: Box::new(operand),
        })
    }

    /// Literals, aliases, paths, calls, lambdas, parenthesized expressions and
    /// collections.
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current_token.kind {
            TokenKind::Literal(kind) => {
                let token = self.take()?;
                Ok(Expr::literal(kind, token.text))
            }
            TokenKind::ParameterAlias => {
                let token = self.take()?;
                Ok(Expr::Alias(token.text.trim_start_matches('@').to_string()))
            }
            TokenKind::Bracketed => {
                let token = self.take()?;
                self.parse_json(&token)
            }
            TokenKind::OpenParen => {
                self.advance()?;
                self.parse_parenthesized()
            }
            TokenKind::Identifier => self.parse_path(),
            _ => Err(ParseError::ExpressionExpected {
                position: self.current_token.position,
                found: self.found(),
                text: self.text(),
            }),
        }
    }

    /// After `(`: either `( expr )` or a collection `(a, b, ...)`.
    fn parse_parenthesized(&mut self) -> Result<Expr, ParseError> {
        if self.check(TokenKind::CloseParen) {
            self.advance()?;
            return Ok(Expr::Collection(Vec::new()));
        }
        let first = self.parse_expression()?;
        if !self.check(TokenKind::Comma) {
            self.expect_close_paren()?;
            return Ok(Expr::Parenthesized(Box::new(first)));
        }

        let mut items = vec![first];
        while self.check(TokenKind::Comma) {
            self.advance()?;
            items.push(self.parse_expression()?);
        }
        if !self.check(TokenKind::CloseParen) {
            return Err(ParseError::CloseParenOrCommaExpected {
                position: self.current_token.position,
                found: self.found(),
                text: self.text(),
            });
        }
        self.advance()?;
        Ok(Expr::Collection(items))
    }

    /// JSON arrays of scalars become collections of literals; anything else
    /// stays JSON.
    fn parse_json(&self, token: &Token) -> Result<Expr, ParseError> {
        let value: serde_json::Value =
            serde_json::from_str(&token.text).map_err(|e| ParseError::Syntax {
                detail: format!("invalid JSON ({e})"),
                position: token.position,
                found: token.text.clone(),
                text: self.text(),
            })?;
        let serde_json::Value::Array(items) = &value else {
            return Ok(Expr::Json(value));
        };
        let literals: Option<Vec<Expr>> = items.iter().map(json_scalar).collect();
        Ok(literals.map_or(Expr::Json(value), Expr::Collection))
    }

    /// Identifier-led expressions: member paths, `$it`, range variables,
    /// calls, type segments, lambdas and `$count`.
    fn parse_path(&mut self) -> Result<Expr, ParseError> {
        let name = self.take()?.text;
        let mut expr = if name == "$it" || name == "$this" || self.range_variables.contains(&name) {
            Expr::RangeVariable(name)
        } else if self.check(TokenKind::OpenParen) {
            self.parse_call(None, name)?
        } else if name.contains('.') {
            Expr::TypeSegment { parent: None, name }
        } else {
            Expr::Path { parent: None, name }
        };

        let mut levels = 0;
        while self.check(TokenKind::Slash) {
            self.advance()?;
            if !self.current_token.is_name() {
                return Err(self.syntax("identifier expected after '/'"));
            }
            self.enter()?;
            levels += 1;
            let segment = self.take()?.text;
            let source = Box::new(expr);
            expr = match segment.as_str() {
                "any" | "all" if self.check(TokenKind::OpenParen) => {
                    let kind = if segment == "any" {
                        LambdaKind::Any
                    } else {
                        LambdaKind::All
                    };
                    self.parse_lambda(kind, source)?
                }
                "$count" => Expr::Count(source),
                _ if self.check(TokenKind::OpenParen) => self.parse_call(Some(source), segment)?,
                s if s.contains('.') => Expr::TypeSegment {
                    parent: Some(source),
                    name: segment,
                },
                _ => Expr::Path {
                    parent: Some(source),
                    name: segment,
                },
            };
        }
        self.leave(levels);
        Ok(expr)
    }

    fn parse_call(&mut self, parent: Option<Box<Expr>>, name: String) -> Result<Expr, ParseError> {
        self.expect(TokenKind::OpenParen, "(")?;
        let mut args = Vec::new();
        if self.check(TokenKind::CloseParen) {
            self.advance()?;
        } else {
            args = self.parse_arguments()?;
            if !self.check(TokenKind::CloseParen) {
                return Err(ParseError::CloseParenOrCommaExpected {
                    position: self.current_token.position,
                    found: self.found(),
                    text: self.text(),
                });
            }
            self.advance()?;
        }
        Ok(Expr::FunctionCall { parent, name, args })
    }

    /// Comma-separated arguments, each either positional or `name=value`.
    /// Named and positional arguments are not mixed.
    pub fn parse_arguments(&mut self) -> Result<Vec<FunctionArg>, ParseError> {
        let start = self.current_token.position;
        let mut args = vec![self.parse_argument()?];
        while self.check(TokenKind::Comma) {
            self.advance()?;
            args.push(self.parse_argument()?);
        }
        let named = args.iter().filter(|a| a.name.is_some()).count();
        if named != 0 && named != args.len() {
            return Err(ParseError::Syntax {
                detail: "named and positional arguments cannot be mixed".to_string(),
                position: start,
                found: self.text_between(start, self.current_token.position),
                text: self.text(),
            });
        }
        Ok(args)
    }

    /// An argument list that spans the whole input, as in key predicates.
    pub fn parse_argument_list(&mut self) -> Result<Vec<FunctionArg>, ParseError> {
        if self.check(TokenKind::End) {
            return Ok(Vec::new());
        }
        let args = self.parse_arguments()?;
        if !self.check(TokenKind::End) {
            return Err(ParseError::CloseParenOrCommaExpected {
                position: self.current_token.position,
                found: self.found(),
                text: self.text(),
            });
        }
        Ok(args)
    }

    fn parse_argument(&mut self) -> Result<FunctionArg, ParseError> {
        if self.current_token.is_name() && self.lexer.peek_token()?.kind == TokenKind::Equal {
            let name = self.take()?.text;
            self.advance()?;
            let value = self.parse_expression()?;
            return Ok(FunctionArg {
                name: Some(name),
                value,
            });
        }
        Ok(FunctionArg {
            name: None,
            value: self.parse_expression()?,
        })
    }

    fn parse_lambda(&mut self, kind: LambdaKind, source: Box<Expr>) -> Result<Expr, ParseError> {
        self.expect(TokenKind::OpenParen, "(")?;
        if self.check(TokenKind::CloseParen) {
            self.advance()?;
            return Ok(Expr::Lambda {
                kind,
                source,
                variable: None,
                body: None,
            });
        }

        let position = self.current_token.position;
        let variable = self.expect_name("range variable")?;
        if variable.starts_with('$') || self.range_variables.contains(&variable) {
            return Err(ParseError::RangeVariableInScope {
                name: variable,
                position,
                text: self.text(),
            });
        }
        self.expect(TokenKind::Colon, ":")?;

        self.range_variables.push(variable.clone());
        let body = self.parse_expression();
        self.range_variables.pop();
        let body = body?;
        self.expect_close_paren()?;

        Ok(Expr::Lambda {
            kind,
            source,
            variable: Some(variable),
            body: Some(Box::new(body)),
        })
    }
}

fn json_scalar(value: &serde_json::Value) -> Option<Expr> {
    Some(match value {
        serde_json::Value::Null => Expr::literal(LiteralKind::Null, "null"),
        serde_json::Value::Bool(b) => Expr::literal(LiteralKind::Boolean, b.to_string()),
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            let kind = if n.is_f64() {
                literal::infer_fractional_kind(&text)
            } else {
                literal::infer_integral_kind(&text)
            };
            Expr::literal(kind, text)
        }
        serde_json::Value::String(s) => {
            Expr::literal(LiteralKind::String, format!("'{}'", s.replace('\'', "''")))
        }
        _ => return None,
    })
}

// Structured options

impl Parser {
    /// `expr [asc|desc], ...`
    pub fn parse_order_by(&mut self) -> Result<Vec<OrderByItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            let expression = self.parse_expression()?;
            let direction = if self.current_token.is_identifier("asc") {
                self.advance()?;
                Direction::Ascending
            } else if self.current_token.is_identifier("desc") {
                self.advance()?;
                Direction::Descending
            } else {
                Direction::Ascending
            };
            items.push(OrderByItem {
                expression,
                direction,
            });
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance()?;
        }
        self.expect_end()?;
        Ok(items)
    }

    /// `expr as alias, ...`
    pub fn parse_compute(&mut self) -> Result<Vec<ComputeItem>, ParseError> {
        let items = self.parse_compute_items()?;
        self.expect_end()?;
        Ok(items)
    }

    fn parse_compute_items(&mut self) -> Result<Vec<ComputeItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            let expression = self.parse_expression()?;
            self.expect_keyword("as")?;
            let alias = self.expect_name("alias")?;
            items.push(ComputeItem { expression, alias });
            if !self.check(TokenKind::Comma) {
                return Ok(items);
            }
            self.advance()?;
        }
    }

    /// `transformation/transformation/...`
    pub fn parse_apply(&mut self) -> Result<Vec<Transformation>, ParseError> {
        let mut transformations = Vec::new();
        loop {
            transformations.push(self.parse_transformation()?);
            if !self.check(TokenKind::Slash) {
                break;
            }
            self.advance()?;
        }
        self.expect_end()?;
        Ok(transformations)
    }

    fn parse_transformation(&mut self) -> Result<Transformation, ParseError> {
        let name = self.expect_name("transformation")?;
        self.expect(TokenKind::OpenParen, "(")?;
        let transformation = match name.as_str() {
            "filter" => Transformation::Filter(self.parse_expression()?),
            "compute" => Transformation::Compute(self.parse_compute_items()?),
            "aggregate" => Transformation::Aggregate(self.parse_aggregate_items()?),
            "groupby" => {
                self.expect(TokenKind::OpenParen, "(")?;
                let mut properties = vec![self.parse_expression()?];
                while self.check(TokenKind::Comma) {
                    self.advance()?;
                    properties.push(self.parse_expression()?);
                }
                self.expect_close_paren()?;
                let aggregate = if self.check(TokenKind::Comma) {
                    self.advance()?;
                    self.expect_keyword("aggregate")?;
                    self.expect(TokenKind::OpenParen, "(")?;
                    let items = self.parse_aggregate_items()?;
                    self.expect_close_paren()?;
                    Some(items)
                } else {
                    None
                };
                Transformation::GroupBy {
                    properties,
                    aggregate,
                }
            }
            other => return Err(self.syntax(format!("unknown transformation '{other}'"))),
        };
        self.expect_close_paren()?;
        Ok(transformation)
    }

    fn parse_aggregate_items(&mut self) -> Result<Vec<AggregateItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.current_token.is_identifier("$count") {
                self.advance()?;
                self.expect_keyword("as")?;
                let alias = self.expect_name("alias")?;
                items.push(AggregateItem::Count { alias });
            } else {
                let expression = self.parse_expression()?;
                self.expect_keyword("with")?;
                let method = match self.expect_name("aggregation method")?.as_str() {
                    "sum" => AggregateMethod::Sum,
                    "min" => AggregateMethod::Min,
                    "max" => AggregateMethod::Max,
                    "average" => AggregateMethod::Average,
                    "countdistinct" => AggregateMethod::CountDistinct,
                    custom if custom.contains('.') => AggregateMethod::Custom(custom.to_string()),
                    other => return Err(self.syntax(format!("unknown aggregation method '{other}'"))),
                };
                self.expect_keyword("as")?;
                let alias = self.expect_name("alias")?;
                items.push(AggregateItem::Expression {
                    expression,
                    method,
                    alias,
                });
            }
            if !self.check(TokenKind::Comma) {
                return Ok(items);
            }
            self.advance()?;
        }
    }

    /// `*`, `NS.*` or `/`-separated paths, comma-separated.
    pub fn parse_select(&mut self) -> Result<Vec<SelectItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.check(TokenKind::Star) {
                self.advance()?;
                items.push(SelectItem::Wildcard);
            } else {
                let first = self.expect_name("property")?;
                if let Some(namespace) = first.strip_suffix(".*") {
                    items.push(SelectItem::NamespaceWildcard(namespace.to_string()));
                } else {
                    let mut path = vec![first];
                    while self.check(TokenKind::Slash) {
                        self.advance()?;
                        path.push(self.expect_name("property")?);
                    }
                    items.push(SelectItem::Path(path));
                }
            }
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance()?;
        }
        self.expect_end()?;
        Ok(items)
    }

    /// Expand items with optional `/$ref` and parenthesized nested options.
    pub fn parse_expand(&mut self) -> Result<Vec<ExpandItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            items.push(self.parse_expand_item()?);
            if !self.check(TokenKind::Comma) {
                break;
            }
            self.advance()?;
        }
        self.expect_end()?;
        Ok(items)
    }

    fn parse_expand_item(&mut self) -> Result<ExpandItem, ParseError> {
        let mut path = Vec::new();
        let mut reference = false;
        loop {
            if self.check(TokenKind::Star) {
                self.advance()?;
                path.push("*".to_string());
            } else if self.current_token.is_identifier("$ref") && !path.is_empty() {
                self.advance()?;
                reference = true;
                break;
            } else {
                path.push(self.expect_name("navigation property")?);
            }
            if !self.check(TokenKind::Slash) {
                break;
            }
            self.advance()?;
        }

        let options = if self.check(TokenKind::OpenParen) {
            self.parse_expand_options()?
        } else {
            ExpandOptions::default()
        };
        Ok(ExpandItem {
            path,
            reference,
            options,
        })
    }

    /// Raw nested options between the current `(` and its matching `)`.
    fn parse_expand_options(&mut self) -> Result<ExpandOptions, ParseError> {
        let text = self.text();
        let chars: Vec<char> = text.chars().collect();
        let open = self.current_token.position;
        let close = matching_paren(&chars, open).ok_or_else(|| ParseError::CloseParenOrCommaExpected {
            position: chars.len(),
            found: chars[open..].iter().collect(),
            text: text.clone(),
        })?;
        let inner: String = chars[open + 1..close].iter().collect();
        self.lexer.seek(close + 1);
        self.advance()?;

        let mut options = ExpandOptions::default();
        for (offset, part) in split_top_level(&inner, ';') {
            let position = open + 1 + offset;
            let Some((name, value)) = part.split_once('=') else {
                return Err(ParseError::Syntax {
                    detail: format!("'{}' is not a query option", part.trim()),
                    position,
                    found: part.to_string(),
                    text,
                });
            };
            let slot = match name.trim() {
                "$filter" => &mut options.filter,
                "$orderby" => &mut options.order_by,
                "$select" => &mut options.select,
                "$expand" => &mut options.expand,
                "$top" => &mut options.top,
                "$skip" => &mut options.skip,
                "$count" => &mut options.count,
                "$search" => &mut options.search,
                "$levels" => &mut options.levels,
                "$compute" => &mut options.compute,
                other => {
                    return Err(ParseError::Syntax {
                        detail: format!("'{other}' is not supported in $expand"),
                        position,
                        found: part.to_string(),
                        text,
                    });
                }
            };
            if slot.is_some() {
                return Err(ParseError::Syntax {
                    detail: format!("duplicate option '{}'", name.trim()),
                    position,
                    found: part.to_string(),
                    text,
                });
            }
            *slot = Some(value.to_string());
        }
        Ok(options)
    }
}

/// Index of the `)` matching the `(` at `open`, skipping quoted text.
fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = open;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) if c == q => {
                if q == '\'' && chars.get(i + 1) == Some(&'\'') {
                    i += 1;
                } else {
                    quote = None;
                }
            }
            Some('"') if c == '\\' => i += 1,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Splits on `separator` outside quotes, parentheses and brackets. Returns
/// each part with its character offset.
pub fn split_top_level(text: &str, separator: char) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start_byte = 0;
    let mut start_char = 0;
    let mut escaped = false;
    for (char_index, (byte_index, c)) in text.char_indices().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if q == '"' && c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push((start_char, &text[start_byte..byte_index]));
                start_byte = byte_index + c.len_utf8();
                start_char = char_index + 1;
            }
            _ => {}
        }
    }
    parts.push((start_char, &text[start_byte..]));
    parts
}

/// Parses a complete filter-style expression.
///
/// # Examples
///
/// ```
/// use odata_uri::ast::{BinOp, Expr};
/// use odata_uri::parser::parse_expression;
/// use odata_uri::ParserSettings;
///
/// let expr = parse_expression("Price gt 5 and Name eq 'x'", &ParserSettings::default()).unwrap();
/// assert!(matches!(expr, Expr::BinaryOp { op: BinOp::And, .. }));
/// ```
pub fn parse_expression(text: &str, settings: &ParserSettings) -> Result<Expr, ParseError> {
    Parser::new(text, settings)?.parse()
}

pub fn parse_order_by(text: &str, settings: &ParserSettings) -> Result<Vec<OrderByItem>, ParseError> {
    Parser::new(text, settings)?.parse_order_by()
}

pub fn parse_compute(text: &str, settings: &ParserSettings) -> Result<Vec<ComputeItem>, ParseError> {
    Parser::new(text, settings)?.parse_compute()
}

pub fn parse_apply(text: &str, settings: &ParserSettings) -> Result<Vec<Transformation>, ParseError> {
    Parser::new(text, settings)?.parse_apply()
}

pub fn parse_select(text: &str, settings: &ParserSettings) -> Result<Vec<SelectItem>, ParseError> {
    Parser::new(text, settings)?.parse_select()
}

pub fn parse_expand(text: &str, settings: &ParserSettings) -> Result<Vec<ExpandItem>, ParseError> {
    Parser::new(text, settings)?.parse_expand()
}
