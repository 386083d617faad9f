// Copyright 2024 Meal Planner Authors

//! Deals: a user's pick of product and supplement offerings at a point in time.

use super::{ensure_deleted, found, now};
use crate::database::models::{
    ProductDeal, ProductDealId, ProductOffering, ProductOfferingId, SupplementOffering,
    SupplementOfferingId, UserId,
};
use crate::database::{last_insert_id, schema, Connection};
use crate::error::{Error, Result};
use diesel::prelude::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

/// Records the deal and its chosen offerings in one transaction. Repeated offerings are kept once.
pub fn create_deal(
    conn: &mut Connection,
    user: UserId,
    products: &[ProductOfferingId],
    supplements: &[SupplementOfferingId],
) -> Result<ProductDeal> {
    conn.transaction::<_, Error, _>(|conn| {
        {
            use schema::product_deals::dsl::*;

            diesel::insert_into(product_deals)
                .values((user_id.eq(user), created_on.eq(now())))
                .execute(conn)?;
        }
        let deal = ProductDealId::from_row_id(last_insert_id(conn)?);

        for offering in products {
            use schema::product_deal_products::dsl::*;

            diesel::insert_or_ignore_into(product_deal_products)
                .values((deal_id.eq(deal), product_offering_id.eq(offering)))
                .execute(conn)?;
        }
        for offering in supplements {
            use schema::product_deal_supplements::dsl::*;

            diesel::insert_or_ignore_into(product_deal_supplements)
                .values((deal_id.eq(deal), supplement_offering_id.eq(offering)))
                .execute(conn)?;
        }
        log::debug!(
            "created deal {deal} for user {user} with {} product and {} supplement offering(s)",
            products.len(),
            supplements.len()
        );
        get_deal(conn, deal)
    })
}

pub fn get_deal(conn: &mut Connection, deal: ProductDealId) -> Result<ProductDeal> {
    use schema::product_deals::dsl::*;

    let row = product_deals
        .find(deal)
        .select(ProductDeal::as_select())
        .first(conn)
        .optional()?;
    found(row, "deal", deal.get())
}

pub fn user_deals(conn: &mut Connection, user: UserId) -> Result<Vec<ProductDeal>> {
    use schema::product_deals::dsl::*;

    Ok(product_deals
        .filter(user_id.eq(user))
        .select(ProductDeal::as_select())
        .order_by(id)
        .load(conn)?)
}

pub fn deal_product_offerings(
    conn: &mut Connection,
    deal: ProductDealId,
) -> Result<Vec<ProductOffering>> {
    use schema::product_deal_products::dsl::*;

    Ok(product_deal_products
        .inner_join(schema::product_offerings::table)
        .filter(deal_id.eq(deal))
        .select(ProductOffering::as_select())
        .order_by(product_offering_id)
        .load(conn)?)
}

pub fn deal_supplement_offerings(
    conn: &mut Connection,
    deal: ProductDealId,
) -> Result<Vec<SupplementOffering>> {
    use schema::product_deal_supplements::dsl::*;

    Ok(product_deal_supplements
        .inner_join(schema::supplement_offerings::table)
        .filter(deal_id.eq(deal))
        .select(SupplementOffering::as_select())
        .order_by(supplement_offering_id)
        .load(conn)?)
}

pub fn delete_deal(conn: &mut Connection, delete_id: ProductDealId) -> Result<()> {
    use schema::product_deals::dsl::*;

    let deleted = diesel::delete(product_deals.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "deal", delete_id.get())
}

#[test]
fn deal_collects_offerings() {
    use super::catalog::{add_product_offering, add_supplement_offering, delete_product};
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let buyer = user(&mut conn, "buyer");
    let oats = product(&mut conn, "Oats");
    let rice = product(&mut conn, "Rice");
    let shop = product_provider(&mut conn, "Shop");
    let vitamin = supplement(&mut conn, "Vitamin D");
    let pharmacy = supplement_provider(&mut conn, "Pharmacy");

    let oats_offer =
        add_product_offering(&mut conn, oats.id, shop.id, "https://shop.example.com/oats").unwrap();
    let rice_offer =
        add_product_offering(&mut conn, rice.id, shop.id, "https://shop.example.com/rice").unwrap();
    let vitamin_offer = add_supplement_offering(
        &mut conn,
        vitamin.id,
        pharmacy.id,
        "https://pharmacy.example.com/d",
    )
    .unwrap();

    let deal = create_deal(
        &mut conn,
        buyer.id,
        &[oats_offer.id, rice_offer.id, oats_offer.id],
        &[vitamin_offer.id],
    )
    .unwrap();
    assert_eq!(deal.user_id, buyer.id);
    assert_eq!(user_deals(&mut conn, buyer.id).unwrap(), [deal.clone()]);

    assert_eq!(
        deal_product_offerings(&mut conn, deal.id).unwrap(),
        [oats_offer.clone(), rice_offer.clone()]
    );
    assert_eq!(
        deal_supplement_offerings(&mut conn, deal.id).unwrap(),
        [vitamin_offer]
    );

    // removing a product drops its offerings, and with them the deal's link to them
    delete_product(&mut conn, rice.id).unwrap();
    assert_eq!(
        deal_product_offerings(&mut conn, deal.id).unwrap(),
        [oats_offer]
    );

    delete_deal(&mut conn, deal.id).unwrap();
    assert!(deal_supplement_offerings(&mut conn, deal.id).unwrap().is_empty());
    assert!(user_deals(&mut conn, buyer.id).unwrap().is_empty());
}

#[test]
fn deal_with_unknown_offering_is_rolled_back() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let buyer = user(&mut conn, "buyer");

    let err = create_deal(
        &mut conn,
        buyer.id,
        &[ProductOfferingId::from_row_id(77)],
        &[],
    )
    .unwrap_err();
    assert!(err.is_integrity_violation(), "{err}");
    assert!(user_deals(&mut conn, buyer.id).unwrap().is_empty());
}
