// Copyright 2024 Meal Planner Authors

use derive_more::Display;
use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::{AsChangeset, Insertable};
use diesel_derive_enum::DbEnum;
use diesel_derive_newtype::DieselNewType;
use std::fmt;
use strum::EnumIter;

macro_rules! database_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(
                DieselNewType, Display, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone,
            )]
            pub struct $name(i32);

            impl $name {
                pub(crate) fn from_row_id(raw: i32) -> Self {
                    Self(raw)
                }

                pub fn get(&self) -> i32 {
                    self.0
                }
            }
        )*
    };
}

database_id!(
    UserId,
    ProductProviderId,
    SupplementProviderId,
    ProductId,
    SupplementId,
    ProductOfferingId,
    SupplementOfferingId,
    ProductPhotoId,
    RecipePhotoId,
    ProductDealId,
    TagId,
    CommentId,
    IngredientId,
    RecipeId,
    MealId,
    PlanId,
    PlanExecutionId,
    PlanSupplementId,
);

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::users)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// Shape shared by both provider kinds. The two kinds live in separate tables and an offering
/// only ever points at its own kind.
pub trait Provider: fmt::Display {
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn url(&self) -> &str;
}

/// Fields accepted when creating or editing either kind of provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProvider {
    pub name: String,
    pub description: Option<String>,
    pub url: String,
}

macro_rules! provider_entity {
    ($name:ident, $id:ident, $table:ident) => {
        #[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
        #[diesel(table_name = crate::database::schema::$table)]
        pub struct $name {
            pub id: $id,
            pub name: String,
            pub description: Option<String>,
            pub url: String,
        }

        impl Provider for $name {
            fn name(&self) -> &str {
                &self.name
            }

            fn description(&self) -> Option<&str> {
                self.description.as_deref()
            }

            fn url(&self) -> &str {
                &self.url
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.name)
            }
        }
    };
}

provider_entity!(ProductProvider, ProductProviderId, product_providers);
provider_entity!(SupplementProvider, SupplementProviderId, supplement_providers);

#[derive(Queryable, Selectable, Identifiable, Debug, Display, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::products)]
#[display("{name}")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub calories: f64,
}

#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::products)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub carbs: f64,
    pub proteins: f64,
    pub fats: f64,
    pub calories: f64,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Display, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::supplements)]
#[display("{name}")]
pub struct Supplement {
    pub id: SupplementId,
    pub name: String,
    pub description: String,
}

#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::supplements)]
pub struct NewSupplement {
    pub name: String,
    pub description: String,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Product))]
#[diesel(belongs_to(ProductProvider, foreign_key = provider_id))]
#[diesel(table_name = crate::database::schema::product_offerings)]
pub struct ProductOffering {
    pub id: ProductOfferingId,
    pub product_id: ProductId,
    pub provider_id: ProductProviderId,
    pub url: String,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Supplement))]
#[diesel(belongs_to(SupplementProvider, foreign_key = provider_id))]
#[diesel(table_name = crate::database::schema::supplement_offerings)]
pub struct SupplementOffering {
    pub id: SupplementOfferingId,
    pub supplement_id: SupplementId,
    pub provider_id: SupplementProviderId,
    pub url: String,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Product))]
#[diesel(table_name = crate::database::schema::product_photos)]
pub struct ProductPhoto {
    pub id: ProductPhotoId,
    pub product_id: ProductId,
    pub caption: Option<String>,
    pub photo: String,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::product_deals)]
pub struct ProductDeal {
    pub id: ProductDealId,
    pub user_id: UserId,
    pub created_on: chrono::NaiveDateTime,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Display, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::tags)]
#[display("{name}")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Recipe))]
#[diesel(table_name = crate::database::schema::comments)]
pub struct Comment {
    pub id: CommentId,
    pub user_id: Option<UserId>,
    pub recipe_id: RecipeId,
    pub contents: String,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Product))]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct Ingredient {
    pub id: IngredientId,
    pub recipe_id: RecipeId,
    pub product_id: ProductId,
    pub amount: f64,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Display, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
#[display("{title}")]
pub struct Recipe {
    pub id: RecipeId,
    pub owner_id: Option<UserId>,
    pub based_on: Option<RecipeId>,
    pub is_custom: bool,
    pub title: String,
    pub content: String,
    pub timestamp: chrono::NaiveDateTime,
    pub rating: f64,
}

/// The owner and creation timestamp are supplied by the write, not the form.
#[derive(AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(treat_none_as_null = true)]
pub struct NewRecipe {
    pub based_on: Option<RecipeId>,
    pub is_custom: bool,
    pub title: String,
    pub content: String,
    pub rating: f64,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Recipe))]
#[diesel(table_name = crate::database::schema::recipe_photos)]
pub struct RecipePhoto {
    pub id: RecipePhotoId,
    pub recipe_id: RecipeId,
    pub caption: Option<String>,
    pub photo: String,
}

#[derive(Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq, DbEnum)]
pub enum MealType {
    #[display("Breakfast")]
    #[db_rename = "B1"]
    Breakfast,
    #[display("Second Breakfast")]
    #[db_rename = "B2"]
    SecondBreakfast,
    #[display("Dinner")]
    #[db_rename = "D1"]
    Dinner,
    #[display("Second Dinner")]
    #[db_rename = "D2"]
    SecondDinner,
    #[display("Supper")]
    #[db_rename = "S1"]
    Supper,
    #[display("Second Supper")]
    #[db_rename = "S2"]
    SecondSupper,
}

impl MealType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Breakfast => "B1",
            Self::SecondBreakfast => "B2",
            Self::Dinner => "D1",
            Self::SecondDinner => "D2",
            Self::Supper => "S1",
            Self::SecondSupper => "S2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::iter().find(|t| t.code() == code)
    }

    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

#[derive(Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq, DbEnum)]
pub enum PlanType {
    #[display("Regular")]
    #[db_rename = "RE"]
    Regular,
    #[display("Reduction")]
    #[db_rename = "RD"]
    Reduction,
    #[display("Gain")]
    #[db_rename = "GA"]
    Gain,
}

impl PlanType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Regular => "RE",
            Self::Reduction => "RD",
            Self::Gain => "GA",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::iter().find(|t| t.code() == code)
    }

    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Plan))]
#[diesel(table_name = crate::database::schema::meals)]
pub struct Meal {
    pub id: MealId,
    pub recipe_id: RecipeId,
    pub plan_id: PlanId,
    pub name: String,
    pub meal_type: MealType,
    pub amount: f64,
}

impl Meal {
    /// `"<name>: <recipe title>"`. The caller supplies the recipe the meal points at.
    pub fn label(&self, recipe: &Recipe) -> String {
        format!("{}: {}", self.name, recipe.title)
    }
}

#[derive(AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::meals)]
pub struct NewMeal {
    pub recipe_id: RecipeId,
    pub name: String,
    pub meal_type: MealType,
    pub amount: f64,
}

/// A meal loaded together with its recipe, so it can render its label.
#[derive(Debug, Clone, PartialEq)]
pub struct MealWithRecipe {
    pub meal: Meal,
    pub recipe: Recipe,
}

impl fmt::Display for MealWithRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.meal.name, self.recipe.title)
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::plans)]
pub struct Plan {
    pub id: PlanId,
    pub owner_id: UserId,
    pub title: String,
    pub plan_type: PlanType,
    pub created_on: chrono::NaiveDateTime,
}

#[derive(AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::plans)]
pub struct NewPlan {
    pub title: String,
    pub plan_type: PlanType,
}

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Plan))]
#[diesel(table_name = crate::database::schema::plan_executions)]
pub struct PlanExecution {
    pub id: PlanExecutionId,
    pub plan_id: PlanId,
    pub started_on: chrono::NaiveDateTime,
    pub finished_on: chrono::NaiveDateTime,
}

/// A supplement scheduled into a plan at a dosage.
#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Supplement))]
#[diesel(belongs_to(Plan))]
#[diesel(table_name = crate::database::schema::plan_supplements)]
pub struct PlanSupplement {
    pub id: PlanSupplementId,
    pub supplement_id: SupplementId,
    pub plan_id: PlanId,
    pub dosage: f64,
}

#[test]
fn display_labels() {
    let recipe = Recipe {
        id: RecipeId(1),
        owner_id: None,
        based_on: None,
        is_custom: false,
        title: "Oats".into(),
        content: String::new(),
        timestamp: chrono::NaiveDateTime::default(),
        rating: 4.5,
    };
    assert_eq!(recipe.to_string(), "Oats");

    let meal = Meal {
        id: MealId(1),
        recipe_id: recipe.id,
        plan_id: PlanId(1),
        name: "Morning Oats".into(),
        meal_type: MealType::Breakfast,
        amount: 1.0,
    };
    assert_eq!(meal.label(&recipe), "Morning Oats: Oats");
    assert_eq!(
        MealWithRecipe { meal, recipe }.to_string(),
        "Morning Oats: Oats"
    );

    let provider = ProductProvider {
        id: ProductProviderId(1),
        name: "Green Grocer".into(),
        description: None,
        url: "https://grocer.example".into(),
    };
    assert_eq!(provider.to_string(), "Green Grocer");

    let tag = Tag {
        id: TagId(3),
        name: "vegan".into(),
    };
    assert_eq!(tag.to_string(), "vegan");
}

#[test]
fn category_codes() {
    let meal_codes: Vec<_> = MealType::iter().map(|t| t.code()).collect();
    assert_eq!(meal_codes, ["B1", "B2", "D1", "D2", "S1", "S2"]);
    assert_eq!(MealType::from_code("D2"), Some(MealType::SecondDinner));
    assert_eq!(MealType::from_code("XX"), None);
    assert_eq!(MealType::SecondSupper.to_string(), "Second Supper");

    assert_eq!(PlanType::from_code("GA"), Some(PlanType::Gain));
    assert_eq!(PlanType::from_code("re"), None);
    assert_eq!(PlanType::Reduction.to_string(), "Reduction");
}
