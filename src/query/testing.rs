// Copyright 2024 Meal Planner Authors

//! Row builders shared by the query tests.

use super::{catalog, plans, recipes, users};
use crate::database::models::{
    MealType, NewMeal, NewPlan, NewProduct, NewProvider, NewRecipe, NewSupplement, Plan, PlanType,
    Product, ProductProvider, Recipe, RecipeId, Supplement, SupplementProvider, User, UserId,
};
use crate::database::Connection;

pub fn user(conn: &mut Connection, name: &str) -> User {
    users::create_user(conn, name).unwrap()
}

pub fn oats_form() -> NewProduct {
    NewProduct {
        name: "Oats".into(),
        description: "rolled".into(),
        carbs: 66.3,
        proteins: 16.9,
        fats: 6.9,
        calories: 389.0,
    }
}

pub fn product(conn: &mut Connection, name: &str) -> Product {
    catalog::create_product(
        conn,
        &NewProduct {
            name: name.into(),
            ..oats_form()
        },
    )
    .unwrap()
}

fn provider_form(name: &str) -> NewProvider {
    NewProvider {
        name: name.into(),
        description: None,
        url: format!("https://{}.example.com", name.to_lowercase()),
    }
}

pub fn product_provider(conn: &mut Connection, name: &str) -> ProductProvider {
    catalog::create_product_provider(conn, &provider_form(name)).unwrap()
}

pub fn supplement_provider(conn: &mut Connection, name: &str) -> SupplementProvider {
    catalog::create_supplement_provider(conn, &provider_form(name)).unwrap()
}

pub fn supplement(conn: &mut Connection, name: &str) -> Supplement {
    catalog::create_supplement(
        conn,
        &NewSupplement {
            name: name.into(),
            description: "one a day".into(),
        },
    )
    .unwrap()
}

pub fn recipe_form(title: &str) -> NewRecipe {
    NewRecipe {
        based_on: None,
        is_custom: false,
        title: title.into(),
        content: "Mix and cook.".into(),
        rating: 4.0,
    }
}

pub fn recipe(conn: &mut Connection, owner: Option<UserId>, title: &str) -> Recipe {
    recipes::create_recipe(conn, owner, &recipe_form(title)).unwrap()
}

pub fn plan(conn: &mut Connection, owner: UserId, title: &str) -> Plan {
    plans::create_plan(
        conn,
        owner,
        &NewPlan {
            title: title.into(),
            plan_type: PlanType::Regular,
        },
    )
    .unwrap()
}

pub fn meal_form(recipe_id: RecipeId, name: &str) -> NewMeal {
    NewMeal {
        recipe_id,
        name: name.into(),
        meal_type: MealType::Breakfast,
        amount: 1.0,
    }
}
