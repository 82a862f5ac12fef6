//! Message template interpolation.
//!
//! Templates are plain strings with `{label}`, `{value}` and positional
//! `{arg0}`..`{argN}` placeholders. Per-node overrides come from the
//! `validation_messages` prop and replace the rule's default template
//! wholesale; interpolation is the same for both.

/// Render a failure message from a template.
pub fn render_message(template: &str, label: &str, args: &[String], value_text: &str) -> String {
    let mut rendered = template.replace("{label}", label).replace("{value}", value_text);
    for (index, arg) in args.iter().enumerate() {
        rendered = rendered.replace(&format!("{{arg{index}}}"), arg);
    }
    rendered
}
