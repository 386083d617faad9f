// Copyright 2024 Meal Planner Authors

use super::{ensure_deleted, ensure_updated, found, now};
use crate::database::models::{
    Meal, MealId, MealWithRecipe, NewMeal, NewPlan, Plan, PlanExecution, PlanExecutionId, PlanId,
    PlanSupplement, PlanSupplementId, Recipe, Supplement, SupplementId, UserId,
};
use crate::database::{last_insert_id, schema, Connection};
use crate::error::{Error, Result};
use crate::validation::{Checker, Validate as _};
use diesel::prelude::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

pub fn create_plan(conn: &mut Connection, owner: UserId, new: &NewPlan) -> Result<Plan> {
    new.validate()?;

    use schema::plans::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(plans)
            .values((
                owner_id.eq(owner),
                title.eq(&new.title),
                plan_type.eq(new.plan_type),
                created_on.eq(now()),
            ))
            .execute(conn)?;
        let new_id = PlanId::from_row_id(last_insert_id(conn)?);
        log::debug!("created {} plan {new_id} for user {owner}", new.plan_type);
        get_plan(conn, new_id)
    })
}

pub fn get_plan(conn: &mut Connection, plan_id: PlanId) -> Result<Plan> {
    use schema::plans::dsl::*;

    let plan = plans
        .find(plan_id)
        .select(Plan::as_select())
        .first(conn)
        .optional()?;
    found(plan, "plan", plan_id.get())
}

pub fn user_plans(conn: &mut Connection, owner: UserId) -> Result<Vec<Plan>> {
    use schema::plans::dsl::*;

    Ok(plans
        .filter(owner_id.eq(owner))
        .select(Plan::as_select())
        .order_by(created_on.desc())
        .then_order_by(id.desc())
        .load(conn)?)
}

pub fn update_plan(conn: &mut Connection, edit_id: PlanId, edit: &NewPlan) -> Result<()> {
    edit.validate()?;

    use schema::plans::dsl::*;
    let updated = diesel::update(plans.find(edit_id))
        .set(edit)
        .execute(conn)?;
    ensure_updated(updated, "plan", edit_id.get())
}

/// Meals, executions and scheduled supplements go with the plan.
pub fn delete_plan(conn: &mut Connection, delete_id: PlanId) -> Result<()> {
    use schema::plans::dsl::*;

    let deleted = diesel::delete(plans.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "plan", delete_id.get())
}

pub fn add_meal(conn: &mut Connection, into: PlanId, new: &NewMeal) -> Result<Meal> {
    new.validate()?;

    use schema::meals::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(meals)
            .values((
                recipe_id.eq(new.recipe_id),
                plan_id.eq(into),
                name.eq(&new.name),
                meal_type.eq(new.meal_type),
                amount.eq(new.amount),
            ))
            .execute(conn)?;
        let new_id = MealId::from_row_id(last_insert_id(conn)?);
        Ok(meals
            .find(new_id)
            .select(Meal::as_select())
            .first(conn)?)
    })
}

pub fn update_meal(conn: &mut Connection, edit_id: MealId, edit: &NewMeal) -> Result<()> {
    edit.validate()?;

    use schema::meals::dsl::*;
    let updated = diesel::update(meals.find(edit_id))
        .set(edit)
        .execute(conn)?;
    ensure_updated(updated, "meal", edit_id.get())
}

pub fn delete_meal(conn: &mut Connection, delete_id: MealId) -> Result<()> {
    use schema::meals::dsl::*;

    let deleted = diesel::delete(meals.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "meal", delete_id.get())
}

/// Meals of the plan in insertion order, each with its recipe.
pub fn plan_meals(conn: &mut Connection, plan: PlanId) -> Result<Vec<MealWithRecipe>> {
    use schema::meals::dsl::*;

    Ok(meals
        .inner_join(schema::recipes::table)
        .filter(plan_id.eq(plan))
        .select((Meal::as_select(), Recipe::as_select()))
        .order_by(id)
        .load::<(Meal, Recipe)>(conn)?
        .into_iter()
        .map(|(meal, recipe)| MealWithRecipe { meal, recipe })
        .collect())
}

/// Recipes the plan goes through, once per meal.
pub fn plan_recipes(conn: &mut Connection, plan: PlanId) -> Result<Vec<Recipe>> {
    Ok(plan_meals(conn, plan)?
        .into_iter()
        .map(|m| m.recipe)
        .collect())
}

/// `"<name>: <recipe title>"` for the meal.
pub fn meal_label(conn: &mut Connection, meal: MealId) -> Result<String> {
    use schema::meals::dsl::*;

    let row = meals
        .inner_join(schema::recipes::table)
        .filter(id.eq(meal))
        .select((Meal::as_select(), Recipe::as_select()))
        .first::<(Meal, Recipe)>(conn)
        .optional()?;
    let (meal_row, recipe) = found(row, "meal", meal.get())?;
    Ok(meal_row.label(&recipe))
}

pub fn record_execution(
    conn: &mut Connection,
    executed: PlanId,
    started: chrono::NaiveDateTime,
    finished: chrono::NaiveDateTime,
) -> Result<PlanExecution> {
    use schema::plan_executions::dsl::*;

    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(plan_executions)
            .values((
                plan_id.eq(executed),
                started_on.eq(started),
                finished_on.eq(finished),
            ))
            .execute(conn)?;
        Ok(PlanExecution {
            id: PlanExecutionId::from_row_id(last_insert_id(conn)?),
            plan_id: executed,
            started_on: started,
            finished_on: finished,
        })
    })
}

pub fn plan_executions(conn: &mut Connection, plan: PlanId) -> Result<Vec<PlanExecution>> {
    use schema::plan_executions::dsl;

    Ok(dsl::plan_executions
        .filter(dsl::plan_id.eq(plan))
        .select(PlanExecution::as_select())
        .order_by(dsl::started_on)
        .load(conn)?)
}

pub fn add_plan_supplement(
    conn: &mut Connection,
    into: PlanId,
    supplement: SupplementId,
    new_dosage: f64,
) -> Result<PlanSupplement> {
    Checker::new().finite("dosage", new_dosage).finish()?;

    use schema::plan_supplements::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(plan_supplements)
            .values((
                plan_id.eq(into),
                supplement_id.eq(supplement),
                dosage.eq(new_dosage),
            ))
            .execute(conn)?;
        Ok(PlanSupplement {
            id: PlanSupplementId::from_row_id(last_insert_id(conn)?),
            supplement_id: supplement,
            plan_id: into,
            dosage: new_dosage,
        })
    })
}

/// Supplements scheduled into the plan, each with its dosage row.
pub fn plan_supplements(
    conn: &mut Connection,
    plan: PlanId,
) -> Result<Vec<(PlanSupplement, Supplement)>> {
    use schema::plan_supplements::dsl;

    Ok(dsl::plan_supplements
        .inner_join(schema::supplements::table)
        .filter(dsl::plan_id.eq(plan))
        .select((PlanSupplement::as_select(), Supplement::as_select()))
        .order_by(dsl::id)
        .load(conn)?)
}

pub fn delete_plan_supplement(conn: &mut Connection, delete_id: PlanSupplementId) -> Result<()> {
    use schema::plan_supplements::dsl::*;

    let deleted = diesel::delete(plan_supplements.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "plan supplement", delete_id.get())
}

#[test]
fn meals_render_with_their_recipe() {
    use super::testing::*;
    use crate::database::models::MealType;

    let mut conn = crate::database::test_connection();
    let owner = user(&mut conn, "owner");
    let oats = recipe(&mut conn, None, "Oats");
    let week = plan(&mut conn, owner.id, "Week");

    let meal = add_meal(&mut conn, week.id, &meal_form(oats.id, "Morning Oats")).unwrap();
    assert_eq!(meal.meal_type, MealType::Breakfast);
    assert_eq!(meal_label(&mut conn, meal.id).unwrap(), "Morning Oats: Oats");

    let meals = plan_meals(&mut conn, week.id).unwrap();
    assert_eq!(meals.len(), 1);
    assert_eq!(meals[0].to_string(), "Morning Oats: Oats");

    update_meal(
        &mut conn,
        meal.id,
        &NewMeal {
            meal_type: MealType::SecondSupper,
            ..meal_form(oats.id, "Late Oats")
        },
    )
    .unwrap();
    assert_eq!(meal_label(&mut conn, meal.id).unwrap(), "Late Oats: Oats");

    delete_meal(&mut conn, meal.id).unwrap();
    assert!(matches!(
        meal_label(&mut conn, meal.id),
        Err(Error::NotFound { entity: "meal", .. })
    ));
}

#[test]
fn plan_recipes_through_meals() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let owner = user(&mut conn, "owner");
    let oats = recipe(&mut conn, None, "Oats");
    let soup = recipe(&mut conn, None, "Soup");
    let week = plan(&mut conn, owner.id, "Week");

    add_meal(&mut conn, week.id, &meal_form(oats.id, "Monday")).unwrap();
    add_meal(&mut conn, week.id, &meal_form(soup.id, "Monday lunch")).unwrap();
    add_meal(&mut conn, week.id, &meal_form(oats.id, "Tuesday")).unwrap();

    let titles: Vec<_> = plan_recipes(&mut conn, week.id)
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, ["Oats", "Soup", "Oats"]);
}

#[test]
fn delete_plan_cascades() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let owner = user(&mut conn, "owner");
    let oats = recipe(&mut conn, None, "Oats");
    let vitamin = supplement(&mut conn, "Vitamin D");
    let week = plan(&mut conn, owner.id, "Week");
    let other = plan(&mut conn, owner.id, "Other");

    add_meal(&mut conn, week.id, &meal_form(oats.id, "Monday")).unwrap();
    add_plan_supplement(&mut conn, week.id, vitamin.id, 1.0).unwrap();
    add_plan_supplement(&mut conn, other.id, vitamin.id, 2.0).unwrap();
    let started = chrono::NaiveDate::from_ymd_opt(2024, 5, 6)
        .unwrap()
        .and_hms_opt(7, 0, 0)
        .unwrap();
    let execution =
        record_execution(&mut conn, week.id, started, started + chrono::Days::new(7)).unwrap();
    assert_eq!(plan_executions(&mut conn, week.id).unwrap(), [execution]);

    let scheduled = plan_supplements(&mut conn, week.id).unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].0.dosage, 1.0);
    assert_eq!(scheduled[0].1, vitamin);

    delete_plan(&mut conn, week.id).unwrap();

    assert!(plan_meals(&mut conn, week.id).unwrap().is_empty());
    assert!(plan_executions(&mut conn, week.id).unwrap().is_empty());
    assert!(plan_supplements(&mut conn, week.id).unwrap().is_empty());
    assert_eq!(plan_supplements(&mut conn, other.id).unwrap().len(), 1);
    // the recipe is only referenced by the meal
    crate::query::recipes::get_recipe(&mut conn, oats.id).unwrap();
}

#[test]
fn plan_type_is_checked_by_the_database() {
    use super::testing::*;
    use diesel::connection::SimpleConnection as _;
    use maplit::btreemap;
    use std::collections::BTreeMap;

    let mut conn = crate::database::test_connection();
    let owner = user(&mut conn, "owner");

    let err = conn
        .batch_execute(&format!(
            "INSERT INTO plans (owner_id, title, plan_type, created_on) \
             VALUES ({}, 'bad', 'XX', '2024-05-06 07:00:00')",
            owner.id
        ))
        .map_err(Error::from)
        .unwrap_err();
    assert!(err.is_integrity_violation(), "{err}");

    let mut created = BTreeMap::new();
    for plan_type in crate::database::models::PlanType::iter() {
        let new_plan = create_plan(
            &mut conn,
            owner.id,
            &NewPlan {
                title: plan_type.to_string(),
                plan_type,
            },
        )
        .unwrap();
        created.insert(new_plan.title.clone(), new_plan.plan_type.code());
    }
    assert_eq!(
        created,
        btreemap! {
            "Gain".to_owned() => "GA",
            "Reduction".to_owned() => "RD",
            "Regular".to_owned() => "RE",
        }
    );
    assert_eq!(user_plans(&mut conn, owner.id).unwrap().len(), 3);

    let gain = created_plan_id(&mut conn, "Gain");
    update_plan(
        &mut conn,
        gain,
        &NewPlan {
            title: "Bulk".into(),
            plan_type: crate::database::models::PlanType::Gain,
        },
    )
    .unwrap();
    let bulk = get_plan(&mut conn, gain).unwrap();
    assert_eq!(bulk.title, "Bulk");
    assert_eq!(bulk.plan_type, crate::database::models::PlanType::Gain);
}

#[test]
fn meal_type_is_checked_by_the_database() {
    use super::testing::*;
    use diesel::connection::SimpleConnection as _;

    let mut conn = crate::database::test_connection();
    let owner = user(&mut conn, "owner");
    let oats = recipe(&mut conn, None, "Oats");
    let week = plan(&mut conn, owner.id, "Week");

    let err = conn
        .batch_execute(&format!(
            "INSERT INTO meals (recipe_id, plan_id, name, meal_type, amount) \
             VALUES ({}, {}, 'bad', 'XX', 1.0)",
            oats.id, week.id
        ))
        .map_err(Error::from)
        .unwrap_err();
    assert!(err.is_integrity_violation(), "{err}");
    assert!(plan_meals(&mut conn, week.id).unwrap().is_empty());

    let meal = add_meal(&mut conn, week.id, &meal_form(oats.id, "Morning")).unwrap();
    assert_eq!(meal.meal_type.code(), "B1");
}

#[cfg(test)]
fn created_plan_id(conn: &mut Connection, plan_title: &str) -> PlanId {
    use schema::plans::dsl::*;

    plans
        .filter(title.eq(plan_title))
        .select(id)
        .first(conn)
        .unwrap()
}
