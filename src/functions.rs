//! # Built-in Function Signatures
//!
//! A process-wide table from function name to its ordered overloads. The
//! table is built on first use and never changes afterwards.
//!
//! Temporal accessors have one overload per applicable type, each in a
//! nullable and a non-nullable flavour:
//!
//! ```text
//! year, month, day               DateTimeOffset, Date                   4
//! hour, minute, second           DateTimeOffset, TimeOfDay, Duration    6
//! fractionalseconds              DateTimeOffset, TimeOfDay              4
//! substring                      (String, Int32[, Int32])               6
//! ```
//!
//! `cast` and `isof` take a type name and are bound specially, so they are
//! not part of the table.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;

use crate::model::{Primitive, TypeRef};

/// One overload of a built-in function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: &'static str,
    pub parameters: Vec<TypeRef>,
    pub return_type: TypeRef,
}

impl fmt::Display for FunctionSignature {
    /// `year(Edm.DateTimeOffset Nullable=true)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                if p.nullable {
                    format!("{} Nullable=true", p.full_name())
                } else {
                    p.full_name()
                }
            })
            .collect();
        write!(f, "{}({})", self.name, params.join(", "))
    }
}

#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<&'static str, Vec<FunctionSignature>>,
}

impl FunctionRegistry {
    /// Overloads of `name` in declaration order, or `None` for an unknown
    /// name. Names are case-sensitive.
    pub fn lookup(&self, name: &str) -> Option<&[FunctionSignature]> {
        self.functions.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.keys().copied()
    }

    fn add(&mut self, name: &'static str, parameters: Vec<TypeRef>, return_type: TypeRef) {
        self.functions.entry(name).or_default().push(FunctionSignature {
            name,
            parameters,
            return_type,
        });
    }

    /// Adds a non-nullable and a nullable overload per parameter type.
    fn add_unary(&mut self, name: &'static str, parameters: &[Primitive], returns: Primitive) {
        for &p in parameters {
            for nullable in [false, true] {
                self.add(name, vec![prim(p, nullable)], prim(returns, nullable));
            }
        }
    }

    fn builtin() -> Self {
        use Primitive::*;
        let mut registry = FunctionRegistry::default();
        let string = || prim(String, true);

        // String
        for name in ["contains", "endswith", "startswith", "matchesPattern"] {
            registry.add(name, vec![string(), string()], prim(Boolean, false));
        }
        registry.add("length", vec![string()], prim(Int32, true));
        registry.add("indexof", vec![string(), string()], prim(Int32, true));
        registry.add("replace", vec![string(), string(), string()], string());
        for (start, length) in [(false, None), (true, None)]
            .into_iter()
            .chain([(false, Some(false)), (true, Some(false)), (false, Some(true)), (true, Some(true))])
        {
            let mut params = vec![string(), prim(Int32, start)];
            params.extend(length.map(|nullable| prim(Int32, nullable)));
            registry.add("substring", params, string());
        }
        for name in ["tolower", "toupper", "trim"] {
            registry.add(name, vec![string()], string());
        }
        registry.add("concat", vec![string(), string()], string());

        // Date and time
        for name in ["year", "month", "day"] {
            registry.add_unary(name, &[DateTimeOffset, Date], Int32);
        }
        for name in ["hour", "minute", "second"] {
            registry.add_unary(name, &[DateTimeOffset, TimeOfDay, Duration], Int32);
        }
        registry.add_unary("fractionalseconds", &[DateTimeOffset, TimeOfDay], Decimal);
        registry.add_unary("date", &[DateTimeOffset], Date);
        registry.add_unary("time", &[DateTimeOffset], TimeOfDay);
        registry.add_unary("totaloffsetminutes", &[DateTimeOffset], Int32);
        registry.add_unary("totalseconds", &[Duration], Decimal);
        for name in ["now", "maxdatetime", "mindatetime"] {
            registry.add(name, Vec::new(), prim(DateTimeOffset, false));
        }

        // Arithmetic
        for name in ["round", "floor", "ceiling"] {
            for p in [Double, Decimal] {
                for nullable in [false, true] {
                    registry.add(name, vec![prim(p, nullable)], prim(p, nullable));
                }
            }
        }

        // Geo
        for (point, line, polygon) in [
            (GeographyPoint, GeographyLineString, GeographyPolygon),
            (GeometryPoint, GeometryLineString, GeometryPolygon),
        ] {
            registry.add(
                "geo.distance",
                vec![prim(point, true), prim(point, true)],
                prim(Double, true),
            );
            registry.add("geo.length", vec![prim(line, true)], prim(Double, true));
            registry.add(
                "geo.intersects",
                vec![prim(point, true), prim(polygon, true)],
                prim(Boolean, true),
            );
            registry.add(
                "geo.intersects",
                vec![prim(polygon, true), prim(point, true)],
                prim(Boolean, true),
            );
        }

        registry
    }
}

fn prim(primitive: Primitive, nullable: bool) -> TypeRef {
    TypeRef::primitive(primitive, nullable)
}

static REGISTRY: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::builtin);

pub fn registry() -> &'static FunctionRegistry {
    &REGISTRY
}

/// Overloads of a built-in function.
///
/// # Examples
///
/// ```
/// use odata_uri::functions::lookup;
///
/// assert_eq!(lookup("substring").map(<[_]>::len), Some(6));
/// assert_eq!(lookup("hour").map(<[_]>::len), Some(6));
/// assert!(lookup("nosuchfunction").is_none());
/// ```
pub fn lookup(name: &str) -> Option<&'static [FunctionSignature]> {
    REGISTRY.lookup(name)
}

const WIDENING: [Primitive; 7] = [
    Primitive::SByte,
    Primitive::Int16,
    Primitive::Int32,
    Primitive::Int64,
    Primitive::Single,
    Primitive::Double,
    Primitive::Decimal,
];

/// How far `from` has to widen to reach `to`; `None` when it cannot.
pub fn promotion_distance(from: Primitive, to: Primitive) -> Option<u32> {
    if from == to {
        return Some(0);
    }
    if !from.can_promote_to(to) && !(from == Primitive::Byte && to == Primitive::Int16) {
        return None;
    }
    let rank = |p: Primitive| {
        if p == Primitive::Byte {
            Some(0)
        } else {
            WIDENING.iter().position(|w| *w == p)
        }
    };
    match (rank(from), rank(to)) {
        (Some(a), Some(b)) if b > a => u32::try_from(b - a).ok(),
        _ => Some(1),
    }
}

/// Cost of passing an argument of type `argument` (`None` for `null` and
/// untyped values) to a parameter of type `parameter`. Lower is better;
/// `None` means the argument does not fit.
pub fn conversion_cost(argument: Option<&TypeRef>, parameter: &TypeRef) -> Option<u32> {
    let Some(argument) = argument.filter(|a| !a.is_untyped()) else {
        return Some(1);
    };
    let nullability = u32::from(argument.nullable != parameter.nullable);
    if argument.same_definition(parameter) {
        return Some(nullability);
    }
    match (argument.as_primitive(), parameter.as_primitive()) {
        (Some(from), Some(to)) => promotion_distance(from, to).map(|d| 2 + d + nullability),
        _ => None,
    }
}

/// Outcome of picking an overload for a list of argument types.
#[derive(Debug, Clone, PartialEq)]
pub enum OverloadMatch<'a, T> {
    Found(&'a T),
    NoMatch,
    Ambiguous,
}

/// Picks the cheapest overload. When several tie, the first one declared
/// wins if any argument is untyped; otherwise the call is ambiguous.
pub fn select_overload<'a, T>(
    candidates: &'a [T],
    parameters: impl Fn(&T) -> &[TypeRef],
    arguments: &[Option<TypeRef>],
) -> OverloadMatch<'a, T> {
    let mut best: Option<(u32, &T)> = None;
    let mut tied = false;
    for candidate in candidates {
        let params = parameters(candidate);
        if params.len() != arguments.len() {
            continue;
        }
        let cost: Option<u32> = arguments
            .iter()
            .zip(params)
            .map(|(arg, param)| conversion_cost(arg.as_ref(), param))
            .sum();
        let Some(cost) = cost else { continue };
        match best {
            Some((best_cost, _)) if cost > best_cost => {}
            Some((best_cost, _)) if cost == best_cost => tied = true,
            _ => {
                best = Some((cost, candidate));
                tied = false;
            }
        }
    }

    let has_untyped = arguments
        .iter()
        .any(|a| a.as_ref().is_none_or(TypeRef::is_untyped));
    match best {
        None => OverloadMatch::NoMatch,
        Some(_) if tied && !has_untyped => OverloadMatch::Ambiguous,
        Some((_, found)) => OverloadMatch::Found(found),
    }
}

/// `name(a); name(b); ...` for error messages.
pub fn describe(signatures: &[FunctionSignature]) -> String {
    signatures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn int(p: Primitive) -> TypeRef {
        TypeRef::primitive(p, false)
    }

    #[test]
    fn test_promotion_distance() {
        assert_eq!(promotion_distance(Primitive::Int32, Primitive::Int32), Some(0));
        assert_eq!(promotion_distance(Primitive::Int16, Primitive::Int64), Some(2));
        assert_eq!(promotion_distance(Primitive::Byte, Primitive::Int16), Some(1));
        assert_eq!(promotion_distance(Primitive::Double, Primitive::Single), None);
        assert_eq!(promotion_distance(Primitive::Decimal, Primitive::Double), None);
    }

    #[test]
    fn test_conversion_cost_prefers_exact_nullability() {
        let param = TypeRef::primitive(Primitive::Int32, true);
        assert_eq!(conversion_cost(Some(&param), &param), Some(0));
        assert_eq!(conversion_cost(Some(&int(Primitive::Int32)), &param), Some(1));
        assert_eq!(conversion_cost(None, &param), Some(1));
        assert_eq!(conversion_cost(Some(&TypeRef::string(false)), &param), None);
    }

    #[test]
    fn test_cheapest_overload_wins() {
        let candidates = vec![vec![int(Primitive::Int64)], vec![int(Primitive::Int32)]];
        let found = select_overload(&candidates, |c| c.as_slice(), &[Some(int(Primitive::Int16))]);
        assert_eq!(found, OverloadMatch::Found(&candidates[1]));
    }

    #[test]
    fn test_tie_is_ambiguous_for_typed_arguments() {
        let candidates = vec![vec![int(Primitive::Int64)], vec![int(Primitive::Int64)]];
        assert_eq!(
            select_overload(&candidates, |c| c.as_slice(), &[Some(int(Primitive::Int32))]),
            OverloadMatch::Ambiguous
        );
        // An untyped argument takes the first declared overload.
        let found = select_overload(&candidates, |c| c.as_slice(), &[None]);
        assert!(matches!(found, OverloadMatch::Found(c) if std::ptr::eq(c, &candidates[0])));
    }

    #[test]
    fn test_arity_mismatch() {
        let candidates = vec![vec![int(Primitive::Int32)]];
        assert_eq!(
            select_overload(&candidates, |c| c.as_slice(), &[]),
            OverloadMatch::NoMatch
        );
    }

    #[rstest]
    #[case("substring", Some(6))]
    #[case("year", Some(4))]
    #[case("month", Some(4))]
    #[case("day", Some(4))]
    #[case("hour", Some(6))]
    #[case("minute", Some(6))]
    #[case("second", Some(6))]
    #[case("fractionalseconds", Some(4))]
    #[case("now", Some(1))]
    #[case("nosuchfunction", None)]
    fn test_overload_count(#[case] name: &str, #[case] expected: Option<usize>) {
        assert_eq!(lookup(name).map(<[_]>::len), expected);
    }

    #[test]
    fn test_signature_display() {
        let substring = lookup("substring").unwrap();
        assert_eq!(
            substring[0].to_string(),
            "substring(Edm.String Nullable=true, Edm.Int32)"
        );
        assert!(registry().names().any(|n| n == "geo.distance"));
    }
}
