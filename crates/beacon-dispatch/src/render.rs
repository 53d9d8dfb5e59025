// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-variable template rendering.

use serde::{Deserialize, Serialize};

use beacon_core::phone::recipient_digits;
use beacon_core::{Template, TemplateMessage, TemplateStatus};

use crate::audience::Recipient;

/// Template content frozen when a dispatch starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenTemplate {
    pub id: String,
    pub name: String,
    pub language: String,
    pub components: serde_json::Value,
    /// Provider approval status when the dispatch started.
    pub status: TemplateStatus,
}

impl From<Template> for FrozenTemplate {
    fn from(template: Template) -> Self {
        Self {
            id: template.id,
            name: template.name,
            language: template.language,
            components: template.components,
            status: template.status,
        }
    }
}

impl FrozenTemplate {
    pub fn is_dispatchable(&self) -> bool {
        self.status == TemplateStatus::Approved
    }

    /// Whether the template body takes the display-name variable.
    ///
    /// Only a BODY component whose text has no `{{n}}` placeholder opts out;
    /// templates without a readable BODY get the variable.
    pub fn takes_body_variable(&self) -> bool {
        match body_text(&self.components) {
            Some(text) => count_placeholders(text) > 0,
            None => true,
        }
    }
}

fn body_text(components: &serde_json::Value) -> Option<&str> {
    components.as_array()?.iter().find_map(|component| {
        let kind = component.get("type")?.as_str()?;
        if kind.eq_ignore_ascii_case("body") {
            component.get("text")?.as_str()
        } else {
            None
        }
    })
}

/// Counts `{{digits}}` placeholders in template text.
pub fn count_placeholders(text: &str) -> usize {
    let mut count = 0;
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let inner = after[..end].trim();
                if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                    count += 1;
                }
                rest = &after[end + 2..];
            }
            None => break,
        }
    }
    count
}

/// Renders the message for one recipient.
pub fn render_message(
    template: &FrozenTemplate,
    recipient: &Recipient,
    default_display_name: &str,
) -> TemplateMessage {
    let body_parameters = if template.takes_body_variable() {
        let name = recipient
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(default_display_name);
        vec![name.to_string()]
    } else {
        Vec::new()
    };

    TemplateMessage {
        to: recipient_digits(&recipient.phone).to_string(),
        template_name: template.name.clone(),
        language_code: template.language.clone(),
        body_parameters,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn template(components: serde_json::Value) -> FrozenTemplate {
        FrozenTemplate {
            id: "t1".into(),
            name: "diwali_offer".into(),
            language: "en_US".into(),
            components,
            status: TemplateStatus::Approved,
        }
    }

    fn recipient(name: Option<&str>) -> Recipient {
        Recipient {
            contact_id: "c1".into(),
            phone: "+919876543210".into(),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn placeholders_are_counted() {
        assert_eq!(count_placeholders("Hi {{1}}, code {{2}}"), 2);
        assert_eq!(count_placeholders("No variables here"), 0);
        assert_eq!(count_placeholders("{{name}} and {{ 1 }}"), 1);
        assert_eq!(count_placeholders("unterminated {{1"), 0);
    }

    #[test]
    fn display_name_fills_the_body_variable() {
        let tpl = template(json!([{"type": "BODY", "text": "Hello {{1}}"}]));
        let msg = render_message(&tpl, &recipient(Some("Asha")), "Customer");
        assert_eq!(msg.to, "919876543210");
        assert_eq!(msg.template_name, "diwali_offer");
        assert_eq!(msg.language_code, "en_US");
        assert_eq!(msg.body_parameters, vec!["Asha".to_string()]);
    }

    #[test]
    fn missing_or_blank_name_uses_placeholder() {
        let tpl = template(json!([{"type": "BODY", "text": "Hello {{1}}"}]));
        let unnamed = render_message(&tpl, &recipient(None), "Customer");
        let blank = render_message(&tpl, &recipient(Some("  ")), "Customer");
        assert_eq!(unnamed.body_parameters, vec!["Customer".to_string()]);
        assert_eq!(blank.body_parameters, vec!["Customer".to_string()]);
    }

    #[test]
    fn body_without_placeholder_sends_no_parameters() {
        let tpl = template(json!([
            {"type": "HEADER", "format": "TEXT", "text": "Sale {{1}}"},
            {"type": "BODY", "text": "Our sale starts today."}
        ]));
        let msg = render_message(&tpl, &recipient(Some("Asha")), "Customer");
        assert!(msg.body_parameters.is_empty());
    }

    #[test]
    fn unreadable_components_still_take_the_variable() {
        let tpl = template(json!({}));
        let msg = render_message(&tpl, &recipient(Some("Asha")), "Customer");
        assert_eq!(msg.body_parameters.len(), 1);
    }
}
