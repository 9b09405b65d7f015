// Student records and the one-line-per-record text codec

use crate::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single registry entry.
///
/// Names never contain whitespace: the backing file separates fields with a
/// single space, so a name like "Mary Ann" cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub age: u32,
}

impl Student {
    /// Render as `"<id> <first_name> <last_name> <age>"`, without the newline.
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {}",
            self.id, self.first_name, self.last_name, self.age
        )
    }

    /// Parse one record line. `line_no` is 1-based and only used in errors.
    pub fn parse_line(line_no: usize, line: &str) -> Result<Self> {
        let corrupt = |reason: String| RegistryError::Corrupt {
            line: line_no,
            reason,
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        let [id, first_name, last_name, age] = fields.as_slice() else {
            return Err(corrupt(format!(
                "expected 4 fields, found {}",
                fields.len()
            )));
        };

        let id: u32 = id
            .parse()
            .map_err(|_| corrupt(format!("invalid id '{id}'")))?;
        if id == 0 {
            return Err(corrupt("id must be positive".into()));
        }
        let age: u32 = age
            .parse()
            .map_err(|_| corrupt(format!("invalid age '{age}'")))?;

        Ok(Student {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            age,
        })
    }
}

impl fmt::Display for Student {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, age {} (ID {})",
            self.first_name, self.last_name, self.age, self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ada() -> Student {
        Student {
            id: 1,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            age: 28,
        }
    }

    #[test]
    fn test_to_line() {
        assert_eq!(ada().to_line(), "1 Ada Lovelace 28");
    }

    #[test]
    fn test_parse_line() {
        let student = Student::parse_line(2, "1 Ada Lovelace 28").unwrap();
        assert_eq!(student, ada());
    }

    #[test]
    fn test_parse_line_tolerates_trailing_whitespace() {
        let student = Student::parse_line(2, "1 Ada Lovelace 28\r").unwrap();
        assert_eq!(student, ada());
    }

    #[test]
    fn test_parse_line_wrong_field_count() {
        let err = Student::parse_line(3, "1 Ada 28").unwrap_err();
        match err {
            RegistryError::Corrupt { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("expected 4 fields"));
            }
            other => panic!("Expected Corrupt error, got: {other:?}"),
        }
    }

    #[test]
    fn test_parse_line_rejects_bad_numbers() {
        assert!(Student::parse_line(2, "x Ada Lovelace 28").is_err());
        assert!(Student::parse_line(2, "0 Ada Lovelace 28").is_err());
        assert!(Student::parse_line(2, "1 Ada Lovelace -4").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ada().to_string(), "Ada Lovelace, age 28 (ID 1)");
    }
}
