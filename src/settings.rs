/// Knobs shared by every parser and binder of one request.
///
/// # Examples
///
/// ```
/// use odata_uri::ParserSettings;
///
/// let settings = ParserSettings::default()
///     .with_case_insensitive(true)
///     .with_max_depth(100);
/// assert!(settings.case_insensitive);
/// assert_eq!(settings.max_alias_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserSettings {
    /// Case-insensitive lookup of container members, properties,
    /// operations and enumeration members
    pub case_insensitive: bool,
    /// Recursion bound of the expression and search parsers and of the
    /// binder. One parenthesized level costs seven.
    pub max_depth: usize,
    /// Longest alias-to-alias chain
    pub max_alias_depth: usize,
    /// Accept `People/1` as a key lookup
    pub key_as_segment: bool,
    /// Resolve bound operations by their unqualified name
    pub unqualified_operations: bool,
    /// Nesting bound of `$expand` options
    pub max_expand_depth: usize,
    pub max_expand_count: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        ParserSettings {
            case_insensitive: false,
            max_depth: 256,
            max_alias_depth: 32,
            key_as_segment: true,
            unqualified_operations: true,
            max_expand_depth: 32,
            max_expand_count: usize::MAX,
        }
    }
}

impl ParserSettings {
    pub fn with_case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_alias_depth(mut self, depth: usize) -> Self {
        self.max_alias_depth = depth;
        self
    }

    pub fn with_key_as_segment(mut self, enabled: bool) -> Self {
        self.key_as_segment = enabled;
        self
    }

    pub fn with_unqualified_operations(mut self, enabled: bool) -> Self {
        self.unqualified_operations = enabled;
        self
    }

    pub fn with_max_expand_depth(mut self, depth: usize) -> Self {
        self.max_expand_depth = depth;
        self
    }

    pub fn with_max_expand_count(mut self, count: usize) -> Self {
        self.max_expand_count = count;
        self
    }
}
