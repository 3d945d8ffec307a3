//! Merge-field substitution
//!
//! Templates address recipient fields as `${identifier}` tokens. Rendering
//! is a single pass over the template: substituted values are never
//! re-scanned, so field values containing token syntax come through
//! literally and substitution can never recurse.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static MERGE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\w+)\}").expect("merge token pattern is valid"));

/// Substitute `${identifier}` tokens from a recipient's field map
///
/// Tokens whose identifier is present in `fields` are replaced by the
/// field's value, even when that value is empty. Tokens whose identifier
/// is absent are left verbatim, token syntax intact, so gaps in a
/// recipient table are visible in the delivered mail instead of silently
/// vanishing.
///
/// Pure: same template and fields, same output.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use mailfan::compose::render;
///
/// let fields = HashMap::from([("first_name".to_string(), "Ana".to_string())]);
/// assert_eq!(render("Hi ${first_name}!", &fields), "Hi Ana!");
/// assert_eq!(render("Hi ${nickname}!", &fields), "Hi ${nickname}!");
/// ```
#[must_use]
pub fn render(template: &str, fields: &HashMap<String, String>) -> String {
    MERGE_TOKEN
        .replace_all(template, |caps: &Captures<'_>| {
            fields
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_known_fields() {
        let fields = fields(&[("first_name", "Ana"), ("company", "Initech")]);
        assert_eq!(
            render("Hi ${first_name}, welcome to ${company}!", &fields),
            "Hi Ana, welcome to Initech!"
        );
    }

    #[test]
    fn test_render_leaves_unknown_tokens_verbatim() {
        let fields = fields(&[("first_name", "Ana")]);
        assert_eq!(
            render("Hi ${first_name} of ${company}", &fields),
            "Hi Ana of ${company}"
        );
    }

    #[test]
    fn test_render_empty_value_substitutes_empty() {
        let fields = fields(&[("middle_name", "")]);
        assert_eq!(render("[${middle_name}]", &fields), "[]");
    }

    #[test]
    fn test_render_repeated_token() {
        let fields = fields(&[("name", "Ana")]);
        assert_eq!(render("${name} ${name}", &fields), "Ana Ana");
    }

    #[test]
    fn test_render_is_single_pass() {
        // A value containing token syntax must not be expanded again.
        let fields = fields(&[("a", "${b}"), ("b", "X")]);
        assert_eq!(render("${a}", &fields), "${b}");
    }

    #[test]
    fn test_render_token_requires_identifier() {
        let fields = fields(&[("x", "value")]);
        assert_eq!(render("${} and $ {x}", &fields), "${} and $ {x}");
    }

    #[test]
    fn test_render_identifier_characters() {
        let fields = fields(&[("field_2", "ok")]);
        assert_eq!(render("${field_2}", &fields), "ok");
        // Hyphens are not word characters, so this is not a token.
        assert_eq!(render("${field-2}", &fields), "${field-2}");
    }

    #[test]
    fn test_render_no_tokens_passthrough() {
        let fields = fields(&[("unused", "value")]);
        assert_eq!(render("plain text", &fields), "plain text");
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::render;
        use super::fields;

        proptest! {
            #[test]
            fn token_free_templates_are_fixed_points(template in "[a-zA-Z0-9 .,!?<>/=\"-]*") {
                let fields = fields(&[("name", "Ana")]);
                prop_assert_eq!(render(&template, &fields), template);
            }

            #[test]
            fn rendering_is_idempotent_for_plain_values(value in "[a-zA-Z0-9 ]*") {
                let fields = fields(&[("name", value.as_str())]);
                let once = render("Hi ${name}!", &fields);
                let twice = render(&once, &fields);
                prop_assert_eq!(once, twice);
            }
        }
    }
}
