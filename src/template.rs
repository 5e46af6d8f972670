//! Text template rendering for configuration files.
//!
//! Templates use the Handlebars dialect in strict mode: referencing a field
//! or map key that the data does not provide is an error, never an empty
//! string. Output is not HTML-escaped.
//!
//! Files that must themselves contain `{{ }}` (Consul templates, Nomad job
//! specs, shell snippets) can be written with another delimiter pair; see
//! [`Delimiters`].

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderErrorReason, no_escape,
};
use serde::Serialize;

use crate::error::FloristError;

/// Helper that prints the literal text segments of a translated template.
const LITERAL_HELPER: &str = "__florist_literal";

/// Delimiter pair marking template actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    left: String,
    right: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            left: "{{".to_string(),
            right: "}}".to_string(),
        }
    }
}

impl Delimiters {
    /// Creates a custom delimiter pair. Fails if either side is empty.
    ///
    /// With a custom pair, everything outside `left ... right` is copied
    /// verbatim, including `{{`, `}}` and backslashes.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Result<Self, FloristError> {
        let (left, right) = (left.into(), right.into());
        if left.is_empty() || right.is_empty() {
            return Err(FloristError::Validation(
                "template delimiters must not be empty".to_string(),
            ));
        }
        Ok(Self { left, right })
    }

    fn is_default(&self) -> bool {
        self.left == "{{" && self.right == "}}"
    }

    /// Splits `source` on the custom pair into a template made only of
    /// engine actions.
    ///
    /// Each literal segment becomes a call to the literal helper with the
    /// segment's index, so the engine never parses literal text.
    fn translate(&self, source: &str) -> Result<(String, Vec<String>), String> {
        let mut template = String::new();
        let mut literals = Vec::new();
        let mut rest = source;
        loop {
            let (literal, action) = match rest.find(&self.left) {
                Some(start) => (&rest[..start], Some(&rest[start + self.left.len()..])),
                None => (rest, None),
            };
            if !literal.is_empty() {
                template.push_str(&format!("{{{{{} {}}}}}", LITERAL_HELPER, literals.len()));
                literals.push(literal.to_string());
            }
            let Some(action) = action else {
                break;
            };
            let end = action
                .find(&self.right)
                .ok_or_else(|| format!("unclosed action: missing '{}'", self.right))?;
            template.push_str("{{");
            template.push_str(&action[..end]);
            template.push_str("}}");
            rest = &action[end + self.right.len()..];
        }
        Ok((template, literals))
    }
}

struct Literals(Vec<String>);

impl HelperDef for Literals {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let text = h
            .param(0)
            .and_then(|p| p.value().as_u64())
            .and_then(|index| self.0.get(index as usize))
            .ok_or(RenderErrorReason::ParamNotFoundForIndex(LITERAL_HELPER, 0))?;
        out.write(text)
            .map_err(|e| RenderErrorReason::Other(e.to_string()))?;
        Ok(())
    }
}

/// Renders `source` with `data`.
///
/// `name` identifies the template in error messages (usually its asset path).
pub fn render<T: Serialize>(
    name: &str,
    source: &str,
    data: &T,
    delims: &Delimiters,
) -> Result<String, FloristError> {
    let template_error = |message: String| FloristError::Template {
        path: name.to_string(),
        message,
    };

    let mut engine = Handlebars::new();
    engine.set_strict_mode(true);
    engine.register_escape_fn(no_escape);

    if delims.is_default() {
        return engine
            .render_template(source, data)
            .map_err(|e| template_error(e.to_string()));
    }

    let (translated, literals) = delims.translate(source).map_err(template_error)?;
    engine.register_helper(LITERAL_HELPER, Box::new(Literals(literals)));
    engine
        .render_template(&translated, data)
        .map_err(|e| template_error(e.to_string()))
}
