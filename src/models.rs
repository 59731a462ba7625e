//! Frontend Models
//!
//! Data structures matching the backend's Restaurant type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Restaurant data structure (matches backend input shape)
///
/// The server assigns identity; extra fields it returns (`id`, timestamps)
/// are ignored when decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    pub description: String,
    pub city: String,
}

impl Restaurant {
    pub fn new(name: impl Into<String>, description: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            city: city.into(),
        }
    }

    pub fn field(&self, field: RestaurantField) -> &str {
        match field {
            RestaurantField::Name => &self.name,
            RestaurantField::Description => &self.description,
            RestaurantField::City => &self.city,
        }
    }

    pub fn set_field(&mut self, field: RestaurantField, value: String) {
        match field {
            RestaurantField::Name => self.name = value,
            RestaurantField::Description => self.description = value,
            RestaurantField::City => self.city = value,
        }
    }
}

/// Editable fields of a restaurant draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestaurantField {
    Name,
    Description,
    City,
}

impl RestaurantField {
    pub const ALL: [RestaurantField; 3] = [Self::Name, Self::Description, Self::City];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::City => "city",
        }
    }

    /// Placeholder text shown in the form input
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Description => "Description",
            Self::City => "City",
        }
    }
}

impl fmt::Display for RestaurantField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestaurantField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "city" => Ok(Self::City),
            other => Err(format!("unknown restaurant field: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ignores_server_fields() {
        let json = r#"{
            "id": "8f1c",
            "name": "Joe's",
            "description": "Pizza",
            "city": "NYC",
            "createdAt": "2024-01-01T00:00:00Z",
            "__typename": "Restaurant"
        }"#;
        let restaurant: Restaurant = serde_json::from_str(json).unwrap();
        assert_eq!(restaurant, Restaurant::new("Joe's", "Pizza", "NYC"));
    }

    #[test]
    fn test_field_names_parse() {
        for field in RestaurantField::ALL {
            assert_eq!(field.as_str().parse::<RestaurantField>(), Ok(field));
        }
        assert!("address".parse::<RestaurantField>().is_err());
    }

    #[test]
    fn test_set_field_touches_one_field() {
        let mut draft = Restaurant::new("a", "b", "c");
        draft.set_field(RestaurantField::City, "Paris".to_string());
        assert_eq!(draft, Restaurant::new("a", "b", "Paris"));
        assert_eq!(draft.field(RestaurantField::City), "Paris");
    }
}
