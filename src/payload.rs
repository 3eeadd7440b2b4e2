//! Read-only access to XML payloads embedded in the debug trace and to
//! account records returned by the remote library system.

use roxmltree::{Document, Node};

use crate::constants::markers::{CATEGORY_ELEMENT, PRIMARY_ID_ELEMENT};
use crate::identifier::normalize_account_id;
use crate::types::{AccountId, CategoryLabel};

/// Fields read from one response payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseFields {
    /// Canonical identifier from `primary_id`, when present and valid.
    pub account: Option<AccountId>,
    /// Category from `user_group`, when present and non-empty.
    pub category: Option<CategoryLabel>,
}

/// Parse an XML block, returning `None` when it is not well-formed.
pub fn parse_document(text: &str) -> Option<Document<'_>> {
    Document::parse(text.trim()).ok()
}

/// First descendant element with `name`.
pub fn find_element<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|candidate| candidate.is_element() && candidate.has_tag_name(name))
}

/// Trimmed, non-empty text content of an element.
pub fn element_text(node: Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Read the account category (`user_group`) from a response payload.
///
/// Returns `None` when the payload is malformed, has no category element, or
/// the element is empty.
pub fn extract_category(payload: &str) -> Option<CategoryLabel> {
    read_response(payload).category
}

/// Read the owning account and category from a response payload.
///
/// A malformed payload yields empty fields.
pub fn read_response(payload: &str) -> ResponseFields {
    let Some(document) = parse_document(payload) else {
        return ResponseFields::default();
    };
    let root = document.root();
    ResponseFields {
        account: find_element(root, PRIMARY_ID_ELEMENT)
            .and_then(element_text)
            .and_then(|raw| normalize_account_id(&raw)),
        category: find_element(root, CATEGORY_ELEMENT).and_then(element_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_category_from_multiline_payload() {
        let payload = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<user>
  <primary_id>12345678</primary_id>
  <user_group desc="Undergraduate">Student</user_group>
</user>
"#;
        assert_eq!(extract_category(payload).as_deref(), Some("Student"));
    }

    #[test]
    fn missing_or_empty_category_is_none() {
        assert_eq!(
            extract_category(r#"<?xml version="1.0"?><user><primary_id>1</primary_id></user>"#),
            None
        );
        assert_eq!(
            extract_category(r#"<?xml version="1.0"?><user><user_group>  </user_group></user>"#),
            None
        );
    }

    #[test]
    fn response_fields_carry_normalized_owner() {
        let fields = read_response(
            r#"<?xml version="1.0"?><user><primary_id>0012345678</primary_id><user_group>Staff</user_group></user>"#,
        );
        assert_eq!(fields.account.as_deref(), Some("12345678"));
        assert_eq!(fields.category.as_deref(), Some("Staff"));

        let anonymous = read_response(r#"<?xml version="1.0"?><user><user_group>Staff</user_group></user>"#);
        assert_eq!(anonymous.account, None);
        assert_eq!(read_response("<user>"), ResponseFields::default());
    }

    #[test]
    fn malformed_payload_is_none() {
        assert_eq!(extract_category(r#"<?xml version="1.0"?><user><user_group>Student</user>"#), None);
        assert_eq!(extract_category(""), None);
        assert_eq!(
            extract_category(r#"<?xml version="1.0"?><user/> trailing junk"#),
            None
        );
    }
}
