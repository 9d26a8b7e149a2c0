//! Path template compilation.
//!
//! A declared path such as `/api/{id}/items/{name}` is turned into a
//! [`CompiledTemplate`]: the template string used as the route-table key,
//! the ordered variable names, and an anchored [`Regex`] built once at
//! registration time.

use crate::error::RegisterError;
use regex::Regex;
use std::borrow::Cow;
use std::sync::Arc;

/// Token substituted for every `{name}` segment.
///
/// Matches one non-empty path segment of ASCII alphanumerics with optional
/// internal hyphens.
pub const VARIABLE_TOKEN: &str = "([A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)";

/// Append a trailing `/` unless the path already ends with one.
#[must_use]
pub fn ensure_trailing_slash(path: &str) -> Cow<'_, str> {
    if path.ends_with('/') {
        Cow::Borrowed(path)
    } else {
        let mut owned = String::with_capacity(path.len() + 1);
        owned.push_str(path);
        owned.push('/');
        Cow::Owned(owned)
    }
}

/// Name inside a `{name}` segment, if the whole segment is a placeholder.
fn placeholder_name(segment: &str) -> Option<&str> {
    let name = segment.strip_prefix('{')?.strip_suffix('}')?;
    if name.is_empty() || name.contains(['{', '}']) {
        return None;
    }
    Some(name)
}

/// Matchable form of a declared path.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    template: String,
    variables: Vec<Arc<str>>,
    matcher: Option<Regex>,
    literal_prefix_len: usize,
    literal_len: usize,
}

impl CompiledTemplate {
    fn literal(template: String) -> Self {
        let literal_len = template.len();
        Self {
            template,
            variables: Vec::new(),
            matcher: None,
            literal_prefix_len: literal_len,
            literal_len,
        }
    }

    /// Key under which the route is stored.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Variable names in the order their segments appear in the path.
    #[must_use]
    pub fn variables(&self) -> &[Arc<str>] {
        &self.variables
    }

    /// `true` when the template holds no variable token.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.matcher.is_none()
    }

    /// Number of literal characters before the first variable token.
    #[must_use]
    pub fn literal_prefix_len(&self) -> usize {
        self.literal_prefix_len
    }

    /// Number of literal characters in the whole template.
    #[must_use]
    pub fn literal_len(&self) -> usize {
        self.literal_len
    }

    /// Test a request path against this template.
    ///
    /// Variable-bearing templates expect the path already normalized with a
    /// trailing `/`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Some(re) => re.is_match(path),
            None => self.template == path,
        }
    }
}

/// Compile a declared path into a [`CompiledTemplate`].
///
/// Paths without `{` are literal and kept verbatim. Otherwise the path gets
/// a trailing `/`, and every segment that is exactly `{name}` becomes
/// [`VARIABLE_TOKEN`]. Segments that only partly look like a placeholder
/// (`{id}.json`) stay literal text; if no segment qualifies the result is a
/// literal route on the slash-normalized path.
///
/// # Errors
///
/// Returns [`RegisterError::InvalidPattern`] if the generated regex fails to
/// compile.
pub fn compile_template(path: &str) -> Result<CompiledTemplate, RegisterError> {
    if !path.contains('{') {
        return Ok(CompiledTemplate::literal(path.to_string()));
    }

    let normalized = ensure_trailing_slash(path);
    let segment_count = normalized.matches('/').count();

    let mut template = String::with_capacity(normalized.len() + 32);
    let mut pattern = String::with_capacity(normalized.len() + 48);
    pattern.push('^');
    let mut variables = Vec::with_capacity(normalized.matches('{').count());
    let mut literal_len = 0;
    let mut literal_prefix_len = None;

    for (idx, segment) in normalized.split('/').enumerate() {
        if let Some(name) = placeholder_name(segment) {
            literal_prefix_len.get_or_insert(literal_len);
            template.push_str(VARIABLE_TOKEN);
            pattern.push_str(VARIABLE_TOKEN);
            variables.push(Arc::from(name));
        } else {
            template.push_str(segment);
            pattern.push_str(&regex::escape(segment));
            literal_len += segment.len();
        }
        // The split yields one more piece than there are separators; the
        // last piece is the empty tail after the trailing '/'.
        if idx < segment_count {
            template.push('/');
            pattern.push('/');
            literal_len += 1;
        }
    }
    pattern.push('$');

    if variables.is_empty() {
        return Ok(CompiledTemplate::literal(normalized.into_owned()));
    }

    let matcher = Regex::new(&pattern).map_err(|e| RegisterError::InvalidPattern {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    Ok(CompiledTemplate {
        template,
        variables,
        matcher: Some(matcher),
        literal_prefix_len: literal_prefix_len.unwrap_or(literal_len),
        literal_len,
    })
}
