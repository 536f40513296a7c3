/// Signup keeps the historical lenient email check: non-empty after
/// trimming and containing an '@'. Anything stricter rejects addresses the
/// waitlist has always accepted.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.contains('@')
}
