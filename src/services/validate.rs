use crate::error::ServiceError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn registration(
    email: &str,
    phone: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ServiceError> {
    email_address(email)?;
    if phone.trim().is_empty() {
        return Err(ServiceError::Validation("Phone is required".to_owned()));
    }
    new_password(password, confirm_password)
}

pub fn new_password(password: &str, confirm_password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password != confirm_password {
        return Err(ServiceError::Validation("Passwords do not match".to_owned()));
    }

    Ok(())
}

pub fn email_address(email: &str) -> Result<(), ServiceError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ServiceError::Validation(format!("'{email}' is not a valid email"))),
    }
}

pub fn rating(rating: i16) -> Result<(), ServiceError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "Rating must be between 1 and 5, got {rating}"
        )))
    }
}

pub fn price(price_cents: i64) -> Result<(), ServiceError> {
    if price_cents < 0 {
        Err(ServiceError::Validation("Price cannot be negative".to_owned()))
    } else {
        Ok(())
    }
}
