//! Field and relation validation for registration and edits.
//!
//! Every check runs and all violations are reported together. Lookups that
//! need the store (uniqueness, existence of related people) are gathered by
//! the backend into a [`Probe`] first, so the rules here stay pure.

use chrono::{NaiveDate, Utc};

use kin_core::{KinError, NewPerson, Person, PersonId, PersonUpdate, Result, Violation};

pub const USERNAME_MAX: usize = 150;
pub const NAME_MAX: usize = 150;
pub const EMAIL_MAX: usize = 50;
pub const PASSWORD_MAX: usize = 150;
pub const ADDRESS_MAX: usize = 255;
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

/// Store-side facts a registration is checked against.
#[derive(Debug, Default)]
pub struct Probe {
    /// Current holder of the requested username.
    pub username_owner: Option<PersonId>,
    /// Current holder of the requested email.
    pub email_owner: Option<PersonId>,
    /// Related ids that name nobody.
    pub missing: Vec<PersonId>,
}

/// Check a registration request.
pub fn check_new(new: &NewPerson, probe: &Probe) -> Result<()> {
    let mut violations = Vec::new();

    check_username(&new.username, &mut violations);
    check_email(&new.email, &mut violations);
    if probe.username_owner.is_some() {
        violations.push(Violation::new("username", "Username already exists"));
    }
    if probe.email_owner.is_some() {
        violations.push(Violation::new("email", "Email already exists"));
    }

    if new.password.is_empty() {
        violations.push(Violation::new("password", "Password is required"));
    } else if new.password.chars().count() > PASSWORD_MAX {
        violations.push(Violation::new(
            "password",
            format!("Password must be at most {PASSWORD_MAX} characters"),
        ));
    }
    if new.password != new.confirm_password {
        violations.push(Violation::new("confirm_password", "Passwords do not match"));
    }

    check_name("first_name", &new.first_name, &mut violations);
    check_name("last_name", &new.last_name, &mut violations);
    if let Some(phone) = &new.phone {
        check_phone(phone, &mut violations);
    }
    check_address(&new.address, &mut violations);
    if let Some(date) = new.birth_date {
        check_birth_date(date, &mut violations);
    }
    check_missing(&probe.missing, &mut violations);

    finish(violations)
}

/// Check an edit of `current`. `missing` lists related ids that name nobody.
pub fn check_update(current: &Person, update: &PersonUpdate, missing: &[PersonId]) -> Result<()> {
    let mut violations = Vec::new();

    if let Some(username) = &update.username {
        if username.trim() != current.username {
            violations.push(Violation::new(
                "username",
                "Username once set cannot be changed.",
            ));
        }
    }
    if let Some(email) = &update.email {
        if !email.trim().eq_ignore_ascii_case(current.email.trim()) {
            violations.push(Violation::new("email", "Email once set cannot be changed."));
        }
    }

    if let Some(first_name) = &update.first_name {
        check_name("first_name", first_name, &mut violations);
    }
    if let Some(last_name) = &update.last_name {
        check_name("last_name", last_name, &mut violations);
    }
    if let Some(phone) = &update.phone {
        if !phone.trim().is_empty() {
            check_phone(phone, &mut violations);
        }
    }
    if let Some(address) = &update.address {
        check_address(address, &mut violations);
    }
    if let Some(date) = update.birth_date {
        check_birth_date(date, &mut violations);
    }

    if update
        .siblings
        .as_ref()
        .is_some_and(|s| s.contains(&current.id))
    {
        violations.push(Violation::new(
            "siblings",
            "A person cannot be their own sibling",
        ));
    }
    if update
        .parents
        .as_ref()
        .is_some_and(|p| p.contains(&current.id))
    {
        violations.push(Violation::new(
            "parents",
            "A person cannot be their own parent",
        ));
    }
    check_missing(missing, &mut violations);

    finish(violations)
}

fn finish(violations: Vec<Violation>) -> Result<()> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(KinError::Validation(violations))
    }
}

// ── Field Rules ──────────────────────────────────────────────────

fn check_username(username: &str, out: &mut Vec<Violation>) {
    let username = username.trim();
    if username.is_empty() {
        out.push(Violation::new("username", "Username is required"));
        return;
    }
    if username.chars().count() > USERNAME_MAX {
        out.push(Violation::new(
            "username",
            format!("Username must be at most {USERNAME_MAX} characters"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        out.push(Violation::new(
            "username",
            "Username may contain only letters, digits and @/./+/-/_",
        ));
    }
}

fn check_email(email: &str, out: &mut Vec<Violation>) {
    let email = email.trim();
    if email.is_empty() {
        out.push(Violation::new("email", "Email is required"));
        return;
    }
    if email.chars().count() > EMAIL_MAX {
        out.push(Violation::new(
            "email",
            format!("Email must be at most {EMAIL_MAX} characters"),
        ));
    }
    if !is_email_shaped(email) {
        out.push(Violation::new("email", "Enter a valid email address"));
    }
}

fn is_email_shaped(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn check_name(field: &str, name: &str, out: &mut Vec<Violation>) {
    if name.chars().count() > NAME_MAX {
        out.push(Violation::new(
            field,
            format!("Must be at most {NAME_MAX} characters"),
        ));
    }
}

fn check_phone(phone: &str, out: &mut Vec<Violation>) {
    let compact: String = phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if digits.is_empty()
        || !digits.chars().all(|c| c.is_ascii_digit())
        || !PHONE_DIGITS.contains(&digits.len())
    {
        out.push(Violation::new("phone", "Enter a valid phone number"));
    }
}

fn check_address(address: &str, out: &mut Vec<Violation>) {
    if address.chars().count() > ADDRESS_MAX {
        out.push(Violation::new(
            "address",
            format!("Address must be at most {ADDRESS_MAX} characters"),
        ));
    }
}

fn check_birth_date(date: NaiveDate, out: &mut Vec<Violation>) {
    if date > Utc::now().date_naive() {
        out.push(Violation::new("birth_date", "Birth date cannot be in the future"));
    }
}

fn check_missing(missing: &[PersonId], out: &mut Vec<Violation>) {
    for id in missing {
        out.push(Violation::new("relations", format!("Unknown person id {id}")));
    }
}
