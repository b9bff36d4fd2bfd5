use std::collections::BTreeMap;
use std::fmt;

use playground_types::models::Playground;

use crate::store::{NewPlayground, Promotion, StoreError};

/// Per-field problems collected during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a problem; the first message for a field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(field, message)| (field.to_string(), message.clone()))
            .collect()
    }

    fn required(&mut self, field: &'static str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "must not be empty");
        }
    }

    fn into_invalid(self) -> Result<(), StoreError> {
        if self.is_empty() { Ok(()) } else { Err(StoreError::Invalid(self)) }
    }

    fn into_conflict(self) -> Result<(), StoreError> {
        if self.is_empty() { Ok(()) } else { Err(StoreError::Conflict(self)) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Exactly five ASCII digits.
pub fn is_valid_postal_code(code: &str) -> bool {
    code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit())
}

fn check_postal_code(errors: &mut FieldErrors, code: &str) {
    if code.trim().is_empty() {
        errors.add("postal_code", "must not be empty");
    } else if !is_valid_postal_code(code.trim()) {
        errors.add("postal_code", "must be exactly 5 digits");
    }
}

pub fn validate_submission(new: &NewPlayground) -> Result<(), StoreError> {
    let mut errors = FieldErrors::new();
    errors.required("name", &new.name);
    errors.required("address", &new.address);
    check_postal_code(&mut errors, &new.postal_code);
    errors.required("city", &new.city);
    errors.required("department", &new.department);
    errors.required("author", &new.author);
    errors.into_invalid()
}

pub fn validate_promotion(promotion: &Promotion) -> Result<(), StoreError> {
    let mut errors = FieldErrors::new();
    errors.required("address", &promotion.address);
    check_postal_code(&mut errors, &promotion.postal_code);
    errors.required("city", &promotion.city);
    errors.required("department", &promotion.department);
    if !promotion.long.is_finite() {
        errors.add("longitude", "must be a finite number");
    }
    if !promotion.lat.is_finite() {
        errors.add("latitude", "must be a finite number");
    }
    errors.into_invalid()
}

pub fn validate_comment(content: &str, author: &str) -> Result<(), StoreError> {
    let mut errors = FieldErrors::new();
    errors.required("content", content);
    errors.required("author", author);
    errors.into_invalid()
}

/// Name and address must be unique, ignoring case, across drafts and
/// published records. When `coordinates` is given, no other published record
/// may sit at exactly that point. `exclude` skips the record being updated.
pub fn check_duplicates(
    name: &str,
    address: &str,
    coordinates: Option<(f64, f64)>,
    existing: &[Playground],
    exclude: Option<i64>,
) -> Result<(), StoreError> {
    let name = name.to_lowercase();
    let address = address.to_lowercase();

    let mut errors = FieldErrors::new();
    for other in existing.iter().filter(|p| Some(p.id) != exclude) {
        if other.name.to_lowercase() == name {
            errors.add("name", format!("already used by playground {}", other.id));
        }
        if other.address.to_lowercase() == address {
            errors.add("address", format!("already used by playground {}", other.id));
        }
        if let Some((long, lat)) = coordinates {
            if !other.draft && other.long == long && other.lat == lat {
                errors.add(
                    "coordinates",
                    format!("already used by playground {}", other.id),
                );
            }
        }
    }
    errors.into_conflict()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn submission(name: &str, address: &str, postal_code: &str) -> NewPlayground {
        NewPlayground {
            name: name.into(),
            address: address.into(),
            postal_code: postal_code.into(),
            city: "Paris".into(),
            department: "Paris".into(),
            author: "test".into(),
            time_of_submission: Utc::now(),
        }
    }

    fn published(id: i64, name: &str, address: &str, long: f64, lat: f64) -> Playground {
        let mut p = submission(name, address, "75019").into_draft(id);
        p.long = long;
        p.lat = lat;
        p.draft = false;
        p
    }

    #[test]
    fn postal_codes() {
        assert!(is_valid_postal_code("75019"));
        assert!(!is_valid_postal_code("7555"));
        assert!(!is_valid_postal_code("abcde"));
        assert!(!is_valid_postal_code("750190"));
        assert!(!is_valid_postal_code("75 19"));
    }

    #[test]
    fn submission_reports_every_bad_field() {
        let mut bad = submission("  ", "", "abcde");
        bad.city = " ".into();
        match validate_submission(&bad) {
            Err(StoreError::Invalid(errors)) => {
                assert_eq!(errors.len(), 4);
                assert!(errors.contains("name"));
                assert!(errors.contains("address"));
                assert!(errors.contains("city"));
                assert_eq!(errors.get("postal_code"), Some("must be exactly 5 digits"));
            }
            other => panic!("expected invalid, got {:?}", other),
        }
        assert!(validate_submission(&submission("TEP", "1 rue", "75019")).is_ok());
    }

    #[test]
    fn duplicate_name_or_address_ignores_case() {
        let existing = vec![published(1, "TEP Jardins", "1 Rue Saint Paul", 2.36, 48.85)];

        let err = check_duplicates("tep jardins", "2 rue", None, &existing, None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref f) if f.contains("name")));

        let err = check_duplicates("Other", "1 RUE SAINT PAUL", None, &existing, None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref f) if f.contains("address")));

        assert!(check_duplicates("Other", "2 rue", None, &existing, None).is_ok());
        assert!(check_duplicates("TEP Jardins", "1 rue saint paul", None, &existing, Some(1)).is_ok());
    }

    #[test]
    fn coordinates_only_collide_with_published_records() {
        let mut draft = published(2, "Draft", "3 rue", 2.31, 48.87);
        draft.draft = true;
        let existing = vec![published(1, "A", "1 rue", 2.36, 48.85), draft];

        let err = check_duplicates("B", "2 rue", Some((2.36, 48.85)), &existing, None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref f) if f.contains("coordinates")));

        assert!(check_duplicates("B", "2 rue", Some((2.31, 48.87)), &existing, None).is_ok());
    }

    #[test]
    fn comment_needs_content_and_author() {
        assert!(validate_comment("  ", "test").is_err());
        assert!(validate_comment("nice", " ").is_err());
        assert!(validate_comment("nice", "test").is_ok());
    }
}
