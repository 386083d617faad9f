// Copyright 2024 Meal Planner Authors

//! Field constraints checked before any row is written.
//!
//! SQLite doesn't enforce `VARCHAR` lengths, so every limit lives here. A form is checked as a
//! whole and all offending fields are reported together.

use crate::database::models::{
    MealType, NewMeal, NewPlan, NewProduct, NewProvider, NewRecipe, NewSupplement, PlanType,
};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub const USERNAME_MAX: usize = 150;
pub const PROVIDER_NAME_MAX: usize = 120;
pub const PROVIDER_DESCRIPTION_MAX: usize = 200;
pub const URL_MAX: usize = 200;
pub const PRODUCT_NAME_MAX: usize = 120;
pub const PRODUCT_DESCRIPTION_MAX: usize = 3000;
pub const SUPPLEMENT_NAME_MAX: usize = 120;
pub const SUPPLEMENT_DESCRIPTION_MAX: usize = 3000;
pub const CAPTION_MAX: usize = 120;
pub const TAG_NAME_MAX: usize = 20;
pub const COMMENT_MAX: usize = 2000;
pub const RECIPE_TITLE_MAX: usize = 120;
pub const MEAL_NAME_MAX: usize = 60;
pub const PLAN_TITLE_MAX: usize = 120;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldErrorKind {
    Required,
    TooLong { max: usize, actual: usize },
    InvalidUrl,
    NotFinite,
    InvalidChoice { value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field;
        match &self.kind {
            FieldErrorKind::Required => write!(f, "{field}: this field is required"),
            FieldErrorKind::TooLong { max, actual } => write!(
                f,
                "{field}: ensure this value has at most {max} characters (it has {actual})"
            ),
            FieldErrorKind::InvalidUrl => write!(f, "{field}: enter a valid URL"),
            FieldErrorKind::NotFinite => write!(f, "{field}: enter a finite number"),
            FieldErrorKind::InvalidChoice { value } => {
                write!(f, "{field}: {value:?} is not one of the available choices")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn single(field: &'static str, kind: FieldErrorKind) -> Self {
        Self {
            errors: vec![FieldError { field, kind }],
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Accumulates field errors for one form.
#[derive(Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, field: &'static str, kind: FieldErrorKind) {
        self.errors.push(FieldError { field, kind });
    }

    pub fn required(&mut self, field: &'static str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.push(field, FieldErrorKind::Required);
        }
        self
    }

    pub fn max_length(&mut self, field: &'static str, value: &str, max: usize) -> &mut Self {
        let actual = value.chars().count();
        if actual > max {
            self.push(field, FieldErrorKind::TooLong { max, actual });
        }
        self
    }

    pub fn url(&mut self, field: &'static str, value: &str) -> &mut Self {
        if !value.trim().is_empty() && !is_valid_url(value) {
            self.push(field, FieldErrorKind::InvalidUrl);
        }
        self
    }

    pub fn finite(&mut self, field: &'static str, value: f64) -> &mut Self {
        if !value.is_finite() {
            self.push(field, FieldErrorKind::NotFinite);
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: std::mem::take(&mut self.errors),
            })
        }
    }
}

fn url_regex() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(
            r"(?ix)
            ^(?:https?|ftps?)://
            (?:[^\s:@/]+(?::[^\s@/]*)?@)?
            (?:
                localhost
              | (?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}\.?
              | \d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}
              | \[[0-9a-f:.]+\]
            )
            (?::\d{1,5})?
            (?:[/?\#][^\s]*)?$",
        )
        .expect("url pattern is valid")
    })
}

pub fn is_valid_url(value: &str) -> bool {
    url_regex().is_match(value)
}

pub fn meal_type(code: &str) -> Result<MealType, ValidationError> {
    MealType::from_code(code).ok_or_else(|| {
        ValidationError::single(
            "meal_type",
            FieldErrorKind::InvalidChoice { value: code.into() },
        )
    })
}

pub fn plan_type(code: &str) -> Result<PlanType, ValidationError> {
    PlanType::from_code(code).ok_or_else(|| {
        ValidationError::single(
            "plan_type",
            FieldErrorKind::InvalidChoice { value: code.into() },
        )
    })
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for NewProvider {
    fn validate(&self) -> Result<(), ValidationError> {
        Checker::new()
            .required("name", &self.name)
            .max_length("name", &self.name, PROVIDER_NAME_MAX)
            .max_length(
                "description",
                self.description.as_deref().unwrap_or_default(),
                PROVIDER_DESCRIPTION_MAX,
            )
            .required("url", &self.url)
            .max_length("url", &self.url, URL_MAX)
            .url("url", &self.url)
            .finish()
    }
}

impl Validate for NewProduct {
    fn validate(&self) -> Result<(), ValidationError> {
        Checker::new()
            .required("name", &self.name)
            .max_length("name", &self.name, PRODUCT_NAME_MAX)
            .max_length("description", &self.description, PRODUCT_DESCRIPTION_MAX)
            .finite("carbs", self.carbs)
            .finite("proteins", self.proteins)
            .finite("fats", self.fats)
            .finite("calories", self.calories)
            .finish()
    }
}

impl Validate for NewSupplement {
    fn validate(&self) -> Result<(), ValidationError> {
        Checker::new()
            .required("name", &self.name)
            .max_length("name", &self.name, SUPPLEMENT_NAME_MAX)
            .required("description", &self.description)
            .max_length(
                "description",
                &self.description,
                SUPPLEMENT_DESCRIPTION_MAX,
            )
            .finish()
    }
}

impl Validate for NewRecipe {
    fn validate(&self) -> Result<(), ValidationError> {
        Checker::new()
            .max_length("title", &self.title, RECIPE_TITLE_MAX)
            .finite("rating", self.rating)
            .finish()
    }
}

impl Validate for NewMeal {
    fn validate(&self) -> Result<(), ValidationError> {
        Checker::new()
            .required("name", &self.name)
            .max_length("name", &self.name, MEAL_NAME_MAX)
            .finite("amount", self.amount)
            .finish()
    }
}

impl Validate for NewPlan {
    fn validate(&self) -> Result<(), ValidationError> {
        Checker::new()
            .max_length("title", &self.title, PLAN_TITLE_MAX)
            .finish()
    }
}

#[test]
fn urls() {
    for good in [
        "http://example.com",
        "https://shop.example.co.uk/products/42?ref=plan#top",
        "ftp://files.example.org/list.txt",
        "http://localhost:8000/",
        "http://192.168.0.1/",
        "https://user:pw@example.com",
    ] {
        assert!(is_valid_url(good), "{good}");
    }
    for bad in [
        "example.com",
        "mailto:someone@example.com",
        "http://",
        "https://exa mple.com",
        "http://-bad-.com",
    ] {
        assert!(!is_valid_url(bad), "{bad}");
    }
}

#[test]
fn provider_errors_are_collected() {
    let provider = NewProvider {
        name: "  ".into(),
        description: Some("d".repeat(PROVIDER_DESCRIPTION_MAX + 1)),
        url: "not a url".into(),
    };
    let error = provider.validate().unwrap_err();
    let fields: Vec<_> = error.errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, ["name", "description", "url"]);
    assert_eq!(
        error.errors[1].kind,
        FieldErrorKind::TooLong {
            max: PROVIDER_DESCRIPTION_MAX,
            actual: PROVIDER_DESCRIPTION_MAX + 1
        }
    );
}

#[test]
fn max_length_counts_characters() {
    let meal = NewMeal {
        recipe_id: crate::database::models::RecipeId::from_row_id(1),
        name: "é".repeat(MEAL_NAME_MAX),
        meal_type: MealType::Supper,
        amount: 1.0,
    };
    assert!(meal.validate().is_ok());

    let meal = NewMeal {
        name: "é".repeat(MEAL_NAME_MAX + 1),
        ..meal
    };
    assert!(meal.validate().unwrap_err().has("name"));
}

#[test]
fn blank_fields() {
    let recipe = NewRecipe {
        based_on: None,
        is_custom: true,
        title: String::new(),
        content: String::new(),
        rating: 0.0,
    };
    assert!(recipe.validate().is_ok());

    let supplement = NewSupplement {
        name: "Vitamin D".into(),
        description: String::new(),
    };
    assert!(supplement.validate().unwrap_err().has("description"));

    let product = NewProduct {
        name: "Oats".into(),
        description: String::new(),
        carbs: 66.0,
        proteins: f64::NAN,
        fats: 7.0,
        calories: 389.0,
    };
    assert!(product.validate().unwrap_err().has("proteins"));
}

#[test]
fn choices() {
    assert_eq!(meal_type("S2"), Ok(MealType::SecondSupper));
    assert_eq!(plan_type("RD"), Ok(PlanType::Reduction));

    let error = meal_type("Lunch").unwrap_err();
    assert_eq!(
        error.errors[0].kind,
        FieldErrorKind::InvalidChoice {
            value: "Lunch".into()
        }
    );
    assert!(plan_type("XX").unwrap_err().has("plan_type"));
}
