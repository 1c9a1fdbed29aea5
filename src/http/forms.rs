use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};

/// Validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const INVALID_VALUE: &str = "Enter a valid value.";

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct ShareForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 25))]
    pub name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(email)]
    pub to: String,
    #[serde(default)]
    pub comments: String,
}

impl ShareForm {
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            to: self.to.trim().to_string(),
            comments: self.comments.trim().to_string(),
        }
    }

    pub fn errors(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => field_errors(
                &errors,
                &[("name", &self.name), ("email", &self.email), ("to", &self.to)],
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[serde(default)]
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub body: String,
}

impl CommentForm {
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            body: self.body.trim().to_string(),
        }
    }

    pub fn errors(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => field_errors(
                &errors,
                &[("name", &self.name), ("email", &self.email), ("body", &self.body)],
            ),
        }
    }
}

/// Turns validator output into one message list per field. `values` holds
/// the submitted value of every validated field; an empty value always
/// reports as required.
fn field_errors(errors: &ValidationErrors, values: &[(&str, &str)]) -> FieldErrors {
    let mut out = FieldErrors::new();
    for (field, field_errors) in errors.field_errors() {
        let value = values
            .iter()
            .find(|(name, _)| *name == &*field)
            .map(|(_, value)| *value)
            .unwrap_or_default();
        let messages: &mut Vec<String> = out.entry(field.to_string()).or_default();
        for error in field_errors.iter() {
            let message = message_for(error, value);
            if !messages.contains(&message) {
                messages.push(message);
            }
        }
    }
    out
}

fn message_for(error: &ValidationError, value: &str) -> String {
    if value.is_empty() {
        return REQUIRED.to_string();
    }
    match &*error.code {
        "email" => INVALID_EMAIL.to_string(),
        "length" => match error.params.get("max").and_then(|max| max.as_u64()) {
            Some(max) => format!(
                "Ensure this value has at most {} characters (it has {}).",
                max,
                value.chars().count()
            ),
            None => INVALID_VALUE.to_string(),
        },
        _ => INVALID_VALUE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidateEmail;

    #[test]
    fn email_validation() {
        assert!("reader@example.com".validate_email());
        assert!("first.last+tag@mail.example.org".validate_email());
        assert!("user@localhost".validate_email());
        assert!(!"reader".validate_email());
        assert!(!"a<b>@example.com".validate_email());
        assert!(!"a\"b(c)@example.com".validate_email());
        assert!(!"reader@exa mple.com".validate_email());
    }

    #[test]
    fn share_form_reports_every_bad_field() {
        let form = ShareForm {
            name: "x".repeat(26),
            email: "nope".into(),
            to: String::new(),
            comments: String::new(),
        };
        let errors = form.errors();
        assert_eq!(
            errors["name"],
            vec!["Ensure this value has at most 25 characters (it has 26).".to_string()]
        );
        assert_eq!(errors["email"], vec![INVALID_EMAIL.to_string()]);
        assert_eq!(errors["to"], vec![REQUIRED.to_string()]);
        assert!(!errors.contains_key("comments"));
    }

    #[test]
    fn share_form_rejects_markup_in_addresses() {
        let form = ShareForm {
            name: "Ann".into(),
            email: "a<b>@example.com".into(),
            to: "bob@example.com".into(),
            comments: String::new(),
        };
        assert_eq!(form.errors()["email"], vec![INVALID_EMAIL.to_string()]);
    }

    #[test]
    fn share_form_comments_are_optional() {
        let form = ShareForm {
            name: "Ann".into(),
            email: "ann@example.com".into(),
            to: "bob@example.com".into(),
            comments: String::new(),
        };
        assert!(form.errors().is_empty());
    }

    #[test]
    fn comment_form_trims_before_validation() {
        let form = CommentForm {
            name: "  ".into(),
            email: " ann@example.com ".into(),
            body: "\n".into(),
        }
        .trimmed();
        let errors = form.errors();
        assert_eq!(errors["name"], vec![REQUIRED.to_string()]);
        assert_eq!(errors["body"], vec![REQUIRED.to_string()]);
        assert!(!errors.contains_key("email"));
    }

    #[test]
    fn comment_name_limit_is_eighty_characters() {
        let form = CommentForm {
            name: "n".repeat(81),
            email: "ann@example.com".into(),
            body: "Hi".into(),
        };
        assert_eq!(
            form.errors()["name"],
            vec!["Ensure this value has at most 80 characters (it has 81).".to_string()]
        );
    }
}
