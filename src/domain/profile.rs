//! Delivery profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::value_objects::UserId;
use crate::ShopError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: UserId,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub email: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Whether checkout can proceed without sending the shopper to the address screen.
    pub fn is_complete(&self) -> bool {
        char_len(&self.full_name) >= 2 && char_len(&self.phone) >= 5 && char_len(&self.address) >= 10
    }
}

fn char_len(value: &str) -> usize { value.trim().chars().count() }

#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    #[validate(length(min = 2, max = 100, message = "نام و نام خانوادگی باید بین ۲ تا ۱۰۰ حرف باشد"))]
    pub full_name: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 10, max = 500, message = "آدرس باید حداقل ۱۰ کاراکتر باشد"))]
    pub address: String,
    #[validate(email(message = "ایمیل وارد شده معتبر نیست"))]
    pub email: Option<String>,
}

impl ProfileInput {
    /// Trims fields, converts Persian digits in the phone number and drops an empty email.
    pub fn normalized(self) -> Self {
        let phone: String = self
            .phone
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .map(ascii_digit)
            .collect();
        let email = self.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        Self {
            full_name: self.full_name.trim().to_string(),
            phone,
            address: self.address.trim().to_string(),
            email,
        }
    }

    pub fn into_profile(self, user: UserId, now: DateTime<Utc>) -> Result<Profile, ShopError> {
        let input = self.normalized();
        input.validate().map_err(|e| ShopError::Validation(first_message(&e)))?;
        Ok(Profile {
            id: user,
            full_name: input.full_name,
            phone: input.phone,
            address: input.address,
            email: input.email,
            updated_at: now,
        })
    }
}

fn ascii_digit(c: char) -> char {
    match c {
        '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
        '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
        other => other,
    }
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if (10..=14).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        return Ok(());
    }
    let mut error = ValidationError::new("phone");
    error.message = Some(Cow::Borrowed("شماره تماس معتبر نیست"));
    Err(error)
}

/// First human readable message, picked in field-name order so the result is stable.
pub fn first_message(errors: &ValidationErrors) -> String {
    let fields = errors.field_errors();
    let mut names: Vec<_> = fields.keys().copied().collect();
    names.sort_unstable();
    names
        .into_iter()
        .filter_map(|name| fields.get(name))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "اطلاعات وارد شده معتبر نیست".to_string())
}
