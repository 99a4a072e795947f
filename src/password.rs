//! `sa` password generation and validation.
//!
//! The generator is a convenience for the creation form, not a security
//! boundary: the password ends up in clear text in the container environment.

use rand::Rng;

/// Minimum length of a generated password.
pub const GENERATED_PASSWORD_LENGTH: usize = 16;

/// Minimum length SQL Server accepts for the `sa` password.
pub const MIN_SA_PASSWORD_LENGTH: usize = 8;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a password using the thread-local RNG.
pub fn generate_password() -> String {
    generate_password_with(&mut rand::rng())
}

/// Generate a password from letters and digits only.
///
/// Characters are drawn uniformly from `[a-zA-Z0-9]` until at least
/// [`GENERATED_PASSWORD_LENGTH`] have been produced and each of lowercase,
/// uppercase and digit has appeared at least once.
pub fn generate_password_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut password = String::with_capacity(GENERATED_PASSWORD_LENGTH + 4);
    let (mut lower, mut upper, mut digit) = (false, false, false);

    while password.len() < GENERATED_PASSWORD_LENGTH || !(lower && upper && digit) {
        let index = rng.random_range(0..CHARSET.len());
        match index {
            0..26 => lower = true,
            26..52 => upper = true,
            _ => digit = true,
        }
        password.push(CHARSET[index] as char);
    }

    password
}

/// Reasons an operator-supplied `sa` password would be refused by SQL Server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must be at least {MIN_SA_PASSWORD_LENGTH} characters long")]
    TooShort,

    #[error(
        "Password must contain characters from three of: uppercase, lowercase, digits, symbols"
    )]
    TooFewCharacterClasses,
}

/// Check the SQL Server password policy: length and 3 of 4 character classes.
pub fn validate_sa_password(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_SA_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }

    let classes = [
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];

    if classes.iter().filter(|present| **present).count() < 3 {
        return Err(PasswordError::TooFewCharacterClasses);
    }

    Ok(())
}
