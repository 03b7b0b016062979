use crate::content::is_valid_slug;
use crate::server::response::ApiError;

const MAX_EMAIL_LEN: usize = 254;
const MAX_TITLE_LEN: usize = 200;
const MAX_SLUG_LEN: usize = 100;
const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::bad_request("Email cannot be empty"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::bad_request("Email is too long"));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::bad_request("Email must contain '@'"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ApiError::bad_request("Email is not valid"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request(format!(
            "Title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), ApiError> {
    if slug.len() > MAX_SLUG_LEN {
        return Err(ApiError::bad_request(format!(
            "Slug cannot exceed {MAX_SLUG_LEN} characters"
        )));
    }
    if !is_valid_slug(slug) {
        return Err(ApiError::bad_request(
            "Slug must contain only lowercase letters, digits, and single hyphens",
        ));
    }
    Ok(())
}

/// Content must be a JSON object so the root can carry page-level props.
pub fn validate_content(content: &serde_json::Value) -> Result<(), ApiError> {
    if !content.is_object() {
        return Err(ApiError::bad_request("Content must be a JSON object"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@missing.local").is_err());
        assert!(validate_email("x@nodot").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_slug_validation() {
        assert!(validate_slug("about-us").is_ok());
        assert!(validate_slug("About-Us").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_content_must_be_object() {
        assert!(validate_content(&serde_json::json!({"blocks": []})).is_ok());
        assert!(validate_content(&serde_json::json!([1, 2])).is_err());
        assert!(validate_content(&serde_json::Value::Null).is_err());
    }
}
