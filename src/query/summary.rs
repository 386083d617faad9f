// Copyright 2024 Meal Planner Authors

use crate::database::{schema, Connection};
use crate::error::Result;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;

macro_rules! count_rows {
    ($conn:expr, $($table:ident),* $(,)?) => {
        vec![$(
            (
                stringify!($table),
                schema::$table::table.count().get_result::<i64>($conn)?,
            ),
        )*]
    };
}

/// Number of rows in every table, in schema order.
pub fn table_counts(conn: &mut Connection) -> Result<Vec<(&'static str, i64)>> {
    Ok(count_rows!(
        conn,
        users,
        product_providers,
        supplement_providers,
        products,
        supplements,
        product_offerings,
        supplement_offerings,
        product_photos,
        product_deals,
        product_deal_products,
        product_deal_supplements,
        tags,
        recipes,
        recipe_tags,
        comments,
        ingredients,
        recipe_photos,
        plans,
        meals,
        plan_executions,
        plan_supplements,
    ))
}

#[test]
fn counts() {
    use super::testing::*;
    use std::collections::HashMap;

    let mut conn = crate::database::test_connection();
    let owner = user(&mut conn, "owner");
    recipe(&mut conn, Some(owner.id), "Pancakes");
    recipe(&mut conn, Some(owner.id), "Waffles");

    let counts: HashMap<_, _> = table_counts(&mut conn).unwrap().into_iter().collect();
    assert_eq!(counts.len(), 21);
    assert_eq!(counts["users"], 1);
    assert_eq!(counts["recipes"], 2);
    assert_eq!(counts["plans"], 0);
}
