use crate::{error::FieldError, types::GarageInfo};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

pub const VERIFICATION_CODE_LENGTH: usize = 6;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref SIRET: Regex = Regex::new(r"^[0-9]{14}$").unwrap();
    // 0612345678, +33612345678 or 0033612345678 once separators are removed
    static ref PHONE: Regex = Regex::new(r"^(?:(?:\+|00)33|0)[1-9](?:[0-9]{2}){4}$").unwrap();
    static ref PHONE_SEPARATORS: Regex = Regex::new(r"[\s.\-]").unwrap();
}

/// Form order, used to report field errors top to bottom.
const FIELD_ORDER: [&str; 8] = [
    "name",
    "manager_name",
    "address",
    "postal_code",
    "city",
    "phone",
    "siret",
    "email",
];

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

pub fn is_valid_siret(siret: &str) -> bool {
    let digits: String = siret.chars().filter(|c| !c.is_whitespace()).collect();
    SIRET.is_match(&digits)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(&PHONE_SEPARATORS.replace_all(phone, ""))
}

pub fn is_well_formed_code(code: &str) -> bool {
    code.trim().chars().count() == VERIFICATION_CODE_LENGTH
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(field_error("required", "Ce champ est obligatoire"));
    }
    Ok(())
}

fn email_field(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    if !is_valid_email(value.trim()) {
        return Err(field_error("email", "Adresse email invalide"));
    }
    Ok(())
}

fn siret_field(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    if !is_valid_siret(value) {
        return Err(field_error("siret", "SIRET doit contenir 14 chiffres"));
    }
    Ok(())
}

fn phone_field(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    if !is_valid_phone(value) {
        return Err(field_error("phone", "Numéro de téléphone invalide"));
    }
    Ok(())
}

/// Raw content of the garage form on the first step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GarageForm {
    #[validate(custom(function = "required"))]
    pub name: String,
    #[validate(custom(function = "required"))]
    pub manager_name: String,
    #[validate(custom(function = "required"))]
    pub address: String,
    #[validate(custom(function = "required"))]
    pub postal_code: String,
    #[validate(custom(function = "required"))]
    pub city: String,
    #[validate(custom(function = "phone_field"))]
    pub phone: String,
    #[validate(custom(function = "siret_field"))]
    pub siret: String,
    #[validate(custom(function = "email_field"))]
    pub email: String,
}

impl GarageForm {
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        self.validate().map_err(|errors| field_errors(&errors))
    }

    pub fn to_garage_info(&self, email_verified: bool) -> GarageInfo {
        GarageInfo {
            name: self.name.clone(),
            manager_name: self.manager_name.clone(),
            address: self.address.clone(),
            postal_code: self.postal_code.clone(),
            city: self.city.clone(),
            phone: self.phone.clone(),
            siret: self.siret.clone(),
            email: self.email.trim().to_string(),
            email_verified,
        }
    }
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errors)| {
            errors.first().map(|error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| error.code.to_string()),
            })
        })
        .collect();
    fields.sort_by_key(|error| FIELD_ORDER.iter().position(|field| *field == error.field));
    fields
}

#[cfg(test)]
pub mod test {
    use super::*;
    use test_case::test_case;

    pub fn valid_form() -> GarageForm {
        GarageForm {
            name: "Garage du Centre".into(),
            manager_name: "Claire Martin".into(),
            address: "12 rue des Lilas".into(),
            postal_code: "69003".into(),
            city: "Lyon".into(),
            phone: "06 12 34 56 78".into(),
            siret: "123 456 789 00012".into(),
            email: "contact@garage-centre.fr".into(),
        }
    }

    #[test_case("123 456 789 00012", true ; "fourteen digits with spaces")]
    #[test_case("12345678900012", true ; "fourteen digits")]
    #[test_case("1234567890001", false ; "thirteen digits")]
    #[test_case("123456789000123", false ; "fifteen digits")]
    #[test_case("1234567890001A", false ; "letter")]
    fn test_siret(siret: &str, expected: bool) {
        assert_eq!(is_valid_siret(siret), expected);
    }

    #[test_case("06 12 34 56 78", true)]
    #[test_case("0612345678", true)]
    #[test_case("06.12.34.56.78", true)]
    #[test_case("06-12-34-56-78", true)]
    #[test_case("+33612345678", true)]
    #[test_case("+33 6 12 34 56 78", true)]
    #[test_case("0033612345678", true)]
    #[test_case("123456", false)]
    #[test_case("0012345678", false ; "zero after trunk prefix")]
    #[test_case("061234567", false ; "nine digits")]
    fn test_phone(phone: &str, expected: bool) {
        assert_eq!(is_valid_phone(phone), expected);
    }

    #[test_case("contact@garage.fr", true)]
    #[test_case("a.b@c.d.e", true)]
    #[test_case("contact@garage", false ; "no dot after at")]
    #[test_case("contact@@garage.fr", false)]
    #[test_case("contact @garage.fr", false)]
    #[test_case("@garage.fr", false)]
    #[test_case("", false)]
    fn test_email(email: &str, expected: bool) {
        assert_eq!(is_valid_email(email), expected);
    }

    #[test_case("123456", true)]
    #[test_case(" 123456 ", true ; "surrounding whitespace")]
    #[test_case("12345", false)]
    #[test_case("1234567", false)]
    fn test_code_shape(code: &str, expected: bool) {
        assert_eq!(is_well_formed_code(code), expected);
    }

    #[test]
    fn test_valid_form() {
        assert_eq!(valid_form().check(), Ok(()));
    }

    #[test]
    fn test_invalid_form_reports_fields_in_order() {
        let form = GarageForm {
            city: "  ".into(),
            phone: "123456".into(),
            siret: "1234567890001".into(),
            ..valid_form()
        };
        let errors = form.check().unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|error| error.field.as_str()).collect();
        assert_eq!(fields, vec!["city", "phone", "siret"]);
        assert_eq!(errors[0].message, "Ce champ est obligatoire");
        assert_eq!(errors[2].message, "SIRET doit contenir 14 chiffres");
    }

    #[test]
    fn test_garage_info_snapshot() {
        let form = GarageForm {
            email: " contact@garage-centre.fr ".into(),
            ..valid_form()
        };
        let info = form.to_garage_info(true);
        assert_eq!(info.email, "contact@garage-centre.fr");
        assert!(info.email_verified);
        assert_eq!(info.siret, "123 456 789 00012");
    }
}
