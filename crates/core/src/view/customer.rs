//! Customer view model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::CustomerId;

/// Customer attribute holding the preferred display name.
pub const SCREEN_NAME_ATTRIBUTE: &str = "screenName";

/// A single customer attribute value, already formatted for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValue {
    pub label: Option<String>,
    pub value: Option<String>,
}

impl AttributeValue {
    /// An attribute with only a value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            label: None,
            value: Some(value.into()),
        }
    }
}

/// One entry of a customer's connection history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionLogView {
    pub date: String,
    pub host: Option<String>,
    pub public_address: Option<String>,
    pub private_address: Option<String>,
}

/// Customer data prepared for account and back-office pages.
///
/// Groups, roles and permissions are keyed by code with the display label as
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub id: Option<CustomerId>,
    pub version: i32,
    pub code: Option<String>,
    pub login: Option<String>,
    pub title: Option<String>,
    pub firstname: String,
    pub lastname: String,
    pub email: Option<String>,
    /// Only ever populated for form round-trips; never serialized.
    #[serde(skip)]
    pub password: Option<String>,
    pub default_locale: Option<String>,
    pub active: bool,
    pub avatar_img: Option<String>,
    pub customer_attributes: BTreeMap<String, AttributeValue>,
    pub groups: BTreeMap<String, String>,
    pub roles: BTreeMap<String, String>,
    pub permissions: BTreeMap<String, String>,
    pub last_connection_date: Option<String>,
    pub user_connection_logs: Vec<ConnectionLogView>,
    pub details_url: Option<String>,
    pub edit_url: Option<String>,
}

impl CustomerView {
    /// Name to display for the customer.
    ///
    /// Uses the `screenName` attribute when it has a value, otherwise
    /// `"{lastname} {firstname}"`.
    #[must_use]
    pub fn screen_name(&self) -> String {
        self.customer_attributes
            .get(SCREEN_NAME_ATTRIBUTE)
            .and_then(|attribute| attribute.value.clone())
            .unwrap_or_else(|| format!("{} {}", self.lastname, self.firstname))
    }

    /// Whether the customer belongs to the group with the given code.
    #[must_use]
    pub fn has_group(&self, group_code: &str) -> bool {
        self.groups.contains_key(group_code)
    }

    /// Whether the customer holds the role with the given code.
    #[must_use]
    pub fn has_role(&self, role_code: &str) -> bool {
        self.roles.contains_key(role_code)
    }

    /// Whether the customer has the permission with the given code.
    #[must_use]
    pub fn has_permission(&self, permission_code: &str) -> bool {
        self.permissions.contains_key(permission_code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jane() -> CustomerView {
        CustomerView {
            id: Some(CustomerId::new(7)),
            firstname: "Jane".to_string(),
            lastname: "Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            password: Some("hunter2".to_string()),
            active: true,
            ..CustomerView::default()
        }
    }

    #[test]
    fn test_screen_name_falls_back_to_names() {
        assert_eq!(jane().screen_name(), "Doe Jane");
    }

    #[test]
    fn test_screen_name_uses_attribute() {
        let mut customer = jane();
        customer.customer_attributes.insert(
            SCREEN_NAME_ATTRIBUTE.to_string(),
            AttributeValue::new("janed"),
        );
        assert_eq!(customer.screen_name(), "janed");
    }

    #[test]
    fn test_screen_name_ignores_valueless_attribute() {
        let mut customer = jane();
        customer
            .customer_attributes
            .insert(SCREEN_NAME_ATTRIBUTE.to_string(), AttributeValue::default());
        assert_eq!(customer.screen_name(), "Doe Jane");
    }

    #[test]
    fn test_membership_checks_on_empty_maps() {
        let customer = jane();
        assert!(!customer.has_group("VIP"));
        assert!(!customer.has_role("ROLE_ADMIN"));
        assert!(!customer.has_permission("ORDER_EDIT"));
    }

    #[test]
    fn test_membership_checks() {
        let mut customer = jane();
        customer
            .groups
            .insert("VIP".to_string(), "Very important".to_string());
        customer
            .roles
            .insert("ROLE_ADMIN".to_string(), "Administrator".to_string());
        customer
            .permissions
            .insert("ORDER_EDIT".to_string(), "Edit orders".to_string());

        assert!(customer.has_group("VIP"));
        assert!(customer.has_role("ROLE_ADMIN"));
        assert!(customer.has_permission("ORDER_EDIT"));
        assert!(!customer.has_group("vip"));
    }

    #[test]
    fn test_serializes_camel_case_without_password() {
        let json = serde_json::to_value(jane()).unwrap();
        assert_eq!(json["firstname"], "Jane");
        assert_eq!(json["defaultLocale"], serde_json::Value::Null);
        assert_eq!(json["userConnectionLogs"], serde_json::json!([]));
        assert!(json.get("password").is_none());
    }
}
