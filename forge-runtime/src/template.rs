//! Minimal `{{placeholder}}` substitution for LANGUAGE_MODEL prompt templates.

/// Render `template`, replacing `{{prompt}}` with `prompt` and `{{key}}` with
/// `kwargs.key` for every string-valued key in `kwargs`. Placeholders with no
/// match are left verbatim.
pub fn render(template: &str, prompt: &str, kwargs: &serde_json::Value) -> String {
    let mut rendered = template.replace("{{prompt}}", prompt);
    if let Some(map) = kwargs.as_object() {
        for (key, value) in map {
            let needle = format!("{{{{{key}}}}}");
            let replacement = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&needle, &replacement);
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_prompt_and_kwargs() {
        let rendered = render(
            "Review: {{prompt}}\nStyle: {{style}}",
            "fn foo() {}",
            &json!({"style": "terse"}),
        );
        assert_eq!(rendered, "Review: fn foo() {}\nStyle: terse");
    }

    #[test]
    fn leaves_unmatched_placeholders_verbatim() {
        let rendered = render("{{prompt}} {{missing}}", "hi", &json!({}));
        assert_eq!(rendered, "hi {{missing}}");
    }
}
