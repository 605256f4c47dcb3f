use anyhow::{anyhow, Result};
use serde_json::Value;

/// Service for input validation and sanitization
pub struct ValidationService;

impl ValidationService {
    /// Validate a graph object type name
    pub fn validate_object_type(object_type: &str) -> Result<String> {
        let trimmed = object_type.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Object type cannot be empty"));
        }

        if trimmed.len() > 100 {
            return Err(anyhow!("Object type is too long (max 100 characters)"));
        }

        Ok(trimmed.to_string())
    }

    /// Validate a graph object key
    pub fn validate_object_key(object_key: &str) -> Result<String> {
        let trimmed = object_key.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Object key cannot be empty"));
        }

        if trimmed.len() > 255 {
            return Err(anyhow!("Object key is too long (max 255 characters)"));
        }

        Ok(trimmed.to_string())
    }

    /// Validate a branch name
    pub fn validate_branch_name(name: &str) -> Result<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Branch name cannot be empty"));
        }

        if trimmed.len() > 100 {
            return Err(anyhow!("Branch name is too long (max 100 characters)"));
        }

        Ok(trimmed.to_string())
    }

    /// Validate a product version name
    pub fn validate_product_version_name(name: &str) -> Result<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(anyhow!("Product version name cannot be empty"));
        }

        if trimmed.len() > 200 {
            return Err(anyhow!(
                "Product version name is too long (max 200 characters)"
            ));
        }

        Ok(trimmed.to_string())
    }

    /// Validate an object properties payload (must be a JSON object)
    pub fn validate_properties(properties: &Value) -> Result<()> {
        if !properties.is_object() {
            return Err(anyhow!("Properties must be a JSON object"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_type_trims_whitespace() {
        assert_eq!(
            ValidationService::validate_object_type("  Requirement ").unwrap(),
            "Requirement"
        );
    }

    #[test]
    fn test_blank_object_key_rejected() {
        assert!(ValidationService::validate_object_key("   ").is_err());
    }

    #[test]
    fn test_blank_product_version_name_rejected() {
        assert!(ValidationService::validate_product_version_name("").is_err());
    }

    #[test]
    fn test_properties_must_be_object() {
        assert!(ValidationService::validate_properties(&json!({"a": 1})).is_ok());
        assert!(ValidationService::validate_properties(&json!([1, 2])).is_err());
    }
}
