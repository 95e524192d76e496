use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Which side of the marketplace the user is currently acting on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserMode {
    #[default]
    Passenger,
    Driver,
}

impl UserMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserMode::Passenger => "PASSENGER",
            UserMode::Driver => "DRIVER",
        }
    }
}

impl fmt::Display for UserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASSENGER" => Ok(UserMode::Passenger),
            "DRIVER" => Ok(UserMode::Driver),
            _ => Err(CoreError::Validation("Invalid mode".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(CoreError::Validation(format!(
                "Invalid gender. Must be male, female, or other. Received: {}",
                s
            ))),
        }
    }
}

/// Registered account. `password_hash` and identity document numbers are
/// never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    #[serde(skip)]
    pub aadhaar_number: Option<String>,
    #[serde(skip)]
    pub pan_number: Option<String>,
    #[serde(skip)]
    pub driving_license_number: Option<String>,
    pub can_drive: bool,
    pub mode: UserMode,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, name: Option<&str>, password_hash: String) -> Self {
        let email = email.trim().to_lowercase();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .unwrap_or_else(|| display_name_from_email(&email));

        Self {
            id: Uuid::new_v4(),
            email,
            name,
            phone: None,
            image: None,
            gender: None,
            date_of_birth: None,
            address: None,
            aadhaar_number: None,
            pan_number: None,
            driving_license_number: None,
            can_drive: false,
            mode: UserMode::Passenger,
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            image: self.image.clone(),
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            address: self.address.clone(),
            can_drive: self.can_drive,
            mode: self.mode,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    pub fn driver_summary(&self) -> DriverSummary {
        DriverSummary {
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }

    /// Every identity and contact field has been filled in.
    pub fn is_profile_complete(&self) -> bool {
        self.phone.is_some()
            && self.gender.is_some()
            && self.date_of_birth.is_some()
            && self.address.is_some()
            && self.aadhaar_number.is_some()
            && self.pan_number.is_some()
            && self.driving_license_number.is_some()
    }

    /// Driver mode needs the driving capability, which a completed profile grants.
    pub fn ensure_can_switch_to(&self, mode: UserMode) -> CoreResult<()> {
        if mode == UserMode::Driver && !self.can_drive {
            return Err(CoreError::Forbidden("Driver capability not enabled".to_string()));
        }
        Ok(())
    }

    pub fn apply_profile(&mut self, details: &ProfileDetails) {
        self.phone = Some(details.phone.clone());
        self.gender = Some(details.gender);
        self.date_of_birth = Some(details.date_of_birth);
        self.address = Some(details.address.clone());
        self.aadhaar_number = Some(details.aadhaar_number.clone());
        self.pan_number = Some(details.pan_number.clone());
        self.driving_license_number = Some(details.driving_license_number.clone());
        self.can_drive = true;
    }
}

fn display_name_from_email(email: &str) -> String {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => "User".to_string(),
    }
}

/// Ten digits once separators are stripped, e.g. `98765 43210` → `9876543210`.
pub fn normalize_phone(raw: &str) -> CoreResult<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 10 {
        return Err(CoreError::Validation("Phone must be a 10-digit number".to_string()));
    }
    Ok(digits)
}

/// Response contract for `/users/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub image: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub can_drive: bool,
    pub mode: UserMode,
}

/// Driver as shown on ride listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverSummary {
    pub name: String,
    pub image: Option<String>,
}

/// Profile completion form as submitted. Every field is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfile {
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub aadhaar_number: Option<String>,
    pub pan_number: Option<String>,
    pub driving_license_number: Option<String>,
}

/// Normalised completion fields, ready to store.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDetails {
    pub phone: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub aadhaar_number: String,
    pub pan_number: String,
    pub driving_license_number: String,
}

impl CompleteProfile {
    pub fn normalize(&self) -> CoreResult<ProfileDetails> {
        let field = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        let required = [
            ("phone", field(&self.phone)),
            ("gender", field(&self.gender)),
            ("dateOfBirth", field(&self.date_of_birth)),
            ("address", field(&self.address)),
            ("aadhaarNumber", field(&self.aadhaar_number)),
            ("panNumber", field(&self.pan_number)),
            ("drivingLicenseNumber", field(&self.driving_license_number)),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let [phone, gender, date_of_birth, address, aadhaar, pan, license] =
            required.map(|(_, value)| value.unwrap_or_default());

        Ok(ProfileDetails {
            phone: normalize_phone(&phone)?,
            aadhaar_number: normalize_aadhaar(&aadhaar)?,
            pan_number: normalize_pan(&pan)?,
            date_of_birth: parse_date_of_birth(&date_of_birth)?,
            gender: gender.parse()?,
            address,
            driving_license_number: license,
        })
    }
}

fn normalize_aadhaar(raw: &str) -> CoreResult<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 12 {
        return Err(CoreError::Validation(format!(
            "Invalid Aadhaar number. Must be 12 digits. Received: {} digits",
            digits.len()
        )));
    }
    Ok(digits)
}

/// Five letters, four digits, one letter: `ABCDE1234F`.
fn normalize_pan(raw: &str) -> CoreResult<String> {
    let pan = raw.to_uppercase();
    let bytes = pan.as_bytes();
    let valid = bytes.len() == 10
        && bytes[..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_uppercase();
    if !valid {
        return Err(CoreError::Validation(format!(
            "Invalid PAN number format. Expected format: ABCDE1234F. Received: {}",
            raw
        )));
    }
    Ok(pan)
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp whose date part is kept.
fn parse_date_of_birth(raw: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| CoreError::Validation(format!("Invalid date of birth format. Received: {}", raw)))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: Uuid,
    pub user_id: Uuid,
    pub make: String,
    pub model: String,
    pub plate_number: String,
    pub color: Option<String>,
    pub seats: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Car {
    pub fn new(
        user_id: Uuid,
        make: &str,
        model: &str,
        plate_number: &str,
        color: Option<&str>,
        seats: Option<i32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            make: make.trim().to_string(),
            model: model.trim().to_string(),
            plate_number: plate_number.trim().to_uppercase(),
            color: color.map(str::trim).filter(|c| !c.is_empty()).map(String::from),
            seats,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_normalization() {
        let user = User::new("  Priya@Example.com ", None, "hash".to_string());
        assert_eq!(user.email, "priya@example.com");
        assert_eq!(user.name, "priya");

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["mode"], "PASSENGER");
        assert_eq!(json["canDrive"], false);
    }

    #[test]
    fn test_normalize_phone() {
        assert!(normalize_phone("+91 98765-43210").is_err());
        assert_eq!(normalize_phone("(987) 654-3210").unwrap(), "9876543210");
        assert!(normalize_phone("12345").is_err());
    }

    fn form() -> CompleteProfile {
        CompleteProfile {
            phone: Some("98765 43210".to_string()),
            gender: Some("Female".to_string()),
            date_of_birth: Some("1994-03-18".to_string()),
            address: Some(" DLF Phase 3, Gurugram ".to_string()),
            aadhaar_number: Some("1234 5678 9012".to_string()),
            pan_number: Some("abcde1234f".to_string()),
            driving_license_number: Some("HR26 20190001234".to_string()),
        }
    }

    #[test]
    fn test_complete_profile_normalizes_fields() {
        let details = form().normalize().unwrap();
        assert_eq!(details.phone, "9876543210");
        assert_eq!(details.gender, Gender::Female);
        assert_eq!(details.date_of_birth, NaiveDate::from_ymd_opt(1994, 3, 18).unwrap());
        assert_eq!(details.address, "DLF Phase 3, Gurugram");
        assert_eq!(details.aadhaar_number, "123456789012");
        assert_eq!(details.pan_number, "ABCDE1234F");

        let mut user = User::new("priya@example.com", None, "hash".to_string());
        assert!(!user.is_profile_complete());
        user.apply_profile(&details);
        assert!(user.is_profile_complete());
        assert!(user.can_drive);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("aadhaarNumber").is_none());
        assert!(json.get("panNumber").is_none());
    }

    #[test]
    fn test_complete_profile_lists_missing_fields() {
        let mut partial = form();
        partial.gender = None;
        partial.address = Some("  ".to_string());
        match partial.normalize() {
            Err(CoreError::Validation(msg)) => assert_eq!(msg, "Missing required fields: gender, address"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_profile_rejects_malformed_ids() {
        let cases: [fn(&mut CompleteProfile); 5] = [
            |f| f.phone = Some("12345".to_string()),
            |f| f.aadhaar_number = Some("1234".to_string()),
            |f| f.pan_number = Some("ABCD12345F".to_string()),
            |f| f.date_of_birth = Some("18/03/1994".to_string()),
            |f| f.gender = Some("unknown".to_string()),
        ];
        for break_field in cases {
            let mut bad = form();
            break_field(&mut bad);
            assert!(matches!(bad.normalize(), Err(CoreError::Validation(_))));
        }
    }

    #[test]
    fn test_driver_mode_requires_capability() {
        let mut user = User::new("rider@example.com", None, "hash".to_string());
        assert!(user.ensure_can_switch_to(UserMode::Passenger).is_ok());
        assert!(matches!(user.ensure_can_switch_to(UserMode::Driver), Err(CoreError::Forbidden(_))));

        user.can_drive = true;
        assert!(user.ensure_can_switch_to(UserMode::Driver).is_ok());
        assert!(matches!("driver".parse::<UserMode>(), Err(CoreError::Validation(_))));
        assert_eq!("DRIVER".parse::<UserMode>().unwrap(), UserMode::Driver);
    }

    #[test]
    fn test_car_plate_is_uppercased() {
        let car = Car::new(Uuid::new_v4(), "Maruti", "Swift", " hr26dk1234 ", Some(" "), Some(4));
        assert_eq!(car.plate_number, "HR26DK1234");
        assert_eq!(car.color, None);
    }
}
