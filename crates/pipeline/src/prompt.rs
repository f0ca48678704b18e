//! Provider input text for a job.

use portal_core::supplier::{SupplierForm, SUPPLIER_TYPE_KEY};

/// Extra instruction sent with a compact-mode resubmission.
pub const COMPACT_INSTRUCTION: &str =
    "Keep the deck short: at most 6 cards with condensed bullet points.";

/// Join the job prompt with its structured input.
///
/// Tagged supplier forms get a headline naming the company; any other
/// non-empty object is appended as pretty-printed JSON.
pub fn compose_input_text(prompt: &str, input: &serde_json::Value, compact: bool) -> String {
    let mut text = prompt.trim().to_string();

    if input.get(SUPPLIER_TYPE_KEY).is_some() {
        if let Ok(form) = serde_json::from_value::<SupplierForm>(input.clone()) {
            text.push_str(&format!(
                "\n\nCompany: {} ({})",
                form.company().company_name,
                form.supplier_type().name()
            ));
        }
    }

    let has_fields = input.as_object().is_some_and(|o| !o.is_empty());
    if has_fields {
        let data = serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
        text.push_str("\n\nSupplier data:\n");
        text.push_str(&data);
    }

    if compact {
        text.push_str("\n\n");
        text.push_str(COMPACT_INSTRUCTION);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_prompt_is_trimmed() {
        assert_eq!(compose_input_text("  Make a deck ", &json!({}), false), "Make a deck");
    }

    #[test]
    fn input_is_appended() {
        let text = compose_input_text("Deck", &json!({ "companyName": "Acme" }), false);
        assert!(text.starts_with("Deck\n\nSupplier data:\n"));
        assert!(text.contains("\"companyName\": \"Acme\""));
    }

    #[test]
    fn compact_adds_instruction() {
        let text = compose_input_text("Deck", &json!({}), true);
        assert!(text.ends_with(COMPACT_INSTRUCTION));
    }

    #[test]
    fn supplier_form_gets_headline() {
        let text = compose_input_text(
            "Deck",
            &json!({ "supplierType": "basic", "companyName": "Acme", "contactEmail": "a@acme.test" }),
            false,
        );
        assert!(text.contains("Company: Acme (basic)"));
    }
}
