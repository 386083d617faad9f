// Copyright 2024 Meal Planner Authors

use super::{ensure_deleted, found};
use crate::database::models::{User, UserId};
use crate::database::{last_insert_id, schema, Connection};
use crate::error::{Error, Result};
use crate::validation::{Checker, USERNAME_MAX};
use diesel::prelude::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

pub fn create_user(conn: &mut Connection, new_username: &str) -> Result<User> {
    Checker::new()
        .required("username", new_username)
        .max_length("username", new_username, USERNAME_MAX)
        .finish()?;

    use schema::users::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(users)
            .values(username.eq(new_username))
            .execute(conn)?;
        let new_id = UserId::from_row_id(last_insert_id(conn)?);
        log::debug!("created user {new_id}");
        get_user(conn, new_id)
    })
}

pub fn get_user(conn: &mut Connection, user_id: UserId) -> Result<User> {
    use schema::users::dsl::*;

    let user = users
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .optional()?;
    found(user, "user", user_id.get())
}

/// Removes the user together with their plans and deals. Their recipes and comments stay, with the
/// owner and author cleared.
pub fn delete_user(conn: &mut Connection, delete_id: UserId) -> Result<()> {
    use schema::users::dsl::*;

    let deleted = diesel::delete(users.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "user", delete_id.get())
}

#[test]
fn usernames_are_unique() {
    let mut conn = crate::database::test_connection();
    let ada = create_user(&mut conn, "ada").unwrap();
    assert_eq!(get_user(&mut conn, ada.id).unwrap().username, "ada");

    let err = create_user(&mut conn, "ada").unwrap_err();
    assert!(err.is_integrity_violation(), "{err}");

    let err = create_user(&mut conn, "").unwrap_err();
    assert!(matches!(err, Error::Validation(v) if v.has("username")));
}

#[test]
fn delete_user_cascades_and_detaches() {
    use super::testing::*;
    use super::{deals, plans, recipes};

    let mut conn = crate::database::test_connection();
    let owner = user(&mut conn, "owner");
    let reader = user(&mut conn, "reader");

    let recipe = recipe(&mut conn, Some(owner.id), "Pancakes");
    let comment = recipes::add_comment(&mut conn, Some(owner.id), recipe.id, "mine").unwrap();
    let other_comment =
        recipes::add_comment(&mut conn, Some(reader.id), recipe.id, "tasty").unwrap();
    let plan = plan(&mut conn, owner.id, "Cut");
    let deal = deals::create_deal(&mut conn, owner.id, &[], &[]).unwrap();

    delete_user(&mut conn, owner.id).unwrap();

    let recipe = recipes::get_recipe(&mut conn, recipe.id).unwrap();
    assert_eq!(recipe.owner_id, None);

    let comments = recipes::recipe_comments(&mut conn, &recipe).unwrap();
    let authors: Vec<_> = comments.iter().map(|c| (c.id, c.user_id)).collect();
    assert_eq!(
        authors,
        [(comment.id, None), (other_comment.id, Some(reader.id))]
    );

    assert!(matches!(
        plans::get_plan(&mut conn, plan.id),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        deals::get_deal(&mut conn, deal.id),
        Err(Error::NotFound { .. })
    ));

    assert!(matches!(
        delete_user(&mut conn, owner.id),
        Err(Error::NotFound { entity: "user", .. })
    ));
}
