//! Input normalization and validation helpers.

use crate::constants::bounds;

/// Trim and lowercase an email address. `None` if nothing is left.
///
/// # Examples
///
/// ```
/// use guestgate_access::utils::normalize_email;
///
/// assert_eq!(normalize_email("  Door@Example.COM "), Some("door@example.com".to_string()));
/// assert_eq!(normalize_email("   "), None);
/// ```
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim();
    if email.is_empty() {
        return None;
    }
    Some(email.to_lowercase())
}

/// Trim a guest display name and check its length (2-80 characters).
///
/// # Examples
///
/// ```
/// use guestgate_access::utils::normalize_guest_name;
///
/// assert_eq!(normalize_guest_name("  Ada  "), Some("Ada".to_string()));
/// assert_eq!(normalize_guest_name("A"), None);
/// ```
#[must_use]
pub fn normalize_guest_name(name: &str) -> Option<String> {
    let name = name.trim();
    bounds::GUEST_NAME
        .contains(&name.chars().count())
        .then(|| name.to_string())
}

/// Whether `code` looks like a recovery code (4-5 ASCII digits).
///
/// # Examples
///
/// ```
/// use guestgate_access::utils::is_recovery_code;
///
/// assert!(is_recovery_code("04721"));
/// assert!(is_recovery_code("4721"));
/// assert!(!is_recovery_code("472"));
/// assert!(!is_recovery_code("47a21"));
/// ```
#[must_use]
pub fn is_recovery_code(code: &str) -> bool {
    bounds::RECOVERY_CODE_INPUT.contains(&code.len()) && code.bytes().all(|b| b.is_ascii_digit())
}

/// Generate a five-digit recovery code (no leading zero).
#[must_use]
pub fn generate_recovery_code() -> String {
    use rand::Rng;

    rand::thread_rng().gen_range(10_000..100_000u32).to_string()
}
