// Copyright 2024 Meal Planner Authors

//! Products, supplements, the two kinds of provider, and the offerings that link them.

use super::{ensure_deleted, ensure_updated, found, refuse_if_referenced};
use crate::database::models::{
    NewProduct, NewProvider, NewSupplement, Product, ProductId, ProductOffering,
    ProductOfferingId, ProductPhoto, ProductPhotoId, ProductProvider, ProductProviderId,
    Supplement, SupplementId, SupplementOffering, SupplementOfferingId, SupplementProvider,
    SupplementProviderId,
};
use crate::database::{last_insert_id, schema, Connection};
use crate::error::{Error, Result};
use crate::media::{MediaStore, UploadTo};
use crate::validation::{Checker, Validate as _, CAPTION_MAX, URL_MAX};
use diesel::prelude::Connection as _;
use diesel::BelongingToDsl as _;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::path::Path;

fn check_offering_url(offering_url: &str) -> Result<()> {
    Checker::new()
        .required("url", offering_url)
        .max_length("url", offering_url, URL_MAX)
        .url("url", offering_url)
        .finish()?;
    Ok(())
}

macro_rules! provider_queries {
    (
        $entity:literal,
        $model:ident,
        $id:ident,
        $table:ident,
        $offerings:ident,
        create = $create:ident,
        get = $get:ident,
        list = $list:ident,
        update = $update:ident,
        delete = $delete:ident $(,)?
    ) => {
        pub fn $create(conn: &mut Connection, new: &NewProvider) -> Result<$model> {
            new.validate()?;

            use schema::$table::dsl;
            conn.transaction::<_, Error, _>(|conn| {
                diesel::insert_into(dsl::$table)
                    .values((
                        dsl::name.eq(&new.name),
                        dsl::description.eq(new.description.as_deref()),
                        dsl::url.eq(&new.url),
                    ))
                    .execute(conn)?;
                let new_id = $id::from_row_id(last_insert_id(conn)?);
                log::debug!("created {} {new_id}", $entity);
                $get(conn, new_id)
            })
        }

        pub fn $get(conn: &mut Connection, provider_id: $id) -> Result<$model> {
            use schema::$table::dsl;

            let provider = dsl::$table
                .find(provider_id)
                .select($model::as_select())
                .first(conn)
                .optional()?;
            found(provider, $entity, provider_id.get())
        }

        pub fn $list(conn: &mut Connection) -> Result<Vec<$model>> {
            use schema::$table::dsl;

            Ok(dsl::$table
                .select($model::as_select())
                .order_by(dsl::name)
                .load(conn)?)
        }

        pub fn $update(conn: &mut Connection, provider_id: $id, edit: &NewProvider) -> Result<()> {
            edit.validate()?;

            use schema::$table::dsl;
            let updated = diesel::update(dsl::$table.find(provider_id))
                .set((
                    dsl::name.eq(&edit.name),
                    dsl::description.eq(edit.description.as_deref()),
                    dsl::url.eq(&edit.url),
                ))
                .execute(conn)?;
            ensure_updated(updated, $entity, provider_id.get())
        }

        /// Refused while any offering still goes through this provider.
        pub fn $delete(conn: &mut Connection, delete_id: $id) -> Result<()> {
            conn.transaction::<_, Error, _>(|conn| {
                let offerings: i64 = schema::$offerings::table
                    .filter(schema::$offerings::provider_id.eq(delete_id))
                    .count()
                    .get_result(conn)?;
                refuse_if_referenced($entity, delete_id.get(), "offering", offerings)?;

                let deleted =
                    diesel::delete(schema::$table::table.find(delete_id)).execute(conn)?;
                ensure_deleted(deleted, $entity, delete_id.get())
            })
        }
    };
}

provider_queries!(
    "product provider",
    ProductProvider,
    ProductProviderId,
    product_providers,
    product_offerings,
    create = create_product_provider,
    get = get_product_provider,
    list = product_providers,
    update = update_product_provider,
    delete = delete_product_provider,
);

provider_queries!(
    "supplement provider",
    SupplementProvider,
    SupplementProviderId,
    supplement_providers,
    supplement_offerings,
    create = create_supplement_provider,
    get = get_supplement_provider,
    list = supplement_providers,
    update = update_supplement_provider,
    delete = delete_supplement_provider,
);

pub fn create_product(conn: &mut Connection, new: &NewProduct) -> Result<Product> {
    new.validate()?;

    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(schema::products::table)
            .values(new)
            .execute(conn)?;
        let new_id = ProductId::from_row_id(last_insert_id(conn)?);
        log::debug!("created product {new_id}");
        get_product(conn, new_id)
    })
}

pub fn get_product(conn: &mut Connection, product_id: ProductId) -> Result<Product> {
    use schema::products::dsl::*;

    let product = products
        .find(product_id)
        .select(Product::as_select())
        .first(conn)
        .optional()?;
    found(product, "product", product_id.get())
}

pub fn update_product(conn: &mut Connection, product_id: ProductId, edit: &NewProduct) -> Result<()> {
    edit.validate()?;

    use schema::products::dsl::*;
    let updated = diesel::update(products.find(product_id))
        .set(edit)
        .execute(conn)?;
    ensure_updated(updated, "product", product_id.get())
}

/// Refused while any recipe uses the product as an ingredient. Photos and offerings of the
/// product go with it.
pub fn delete_product(conn: &mut Connection, delete_id: ProductId) -> Result<()> {
    conn.transaction::<_, Error, _>(|conn| {
        let uses: i64 = {
            use schema::ingredients::dsl::*;

            ingredients
                .filter(product_id.eq(delete_id))
                .count()
                .get_result(conn)?
        };
        refuse_if_referenced("product", delete_id.get(), "ingredient", uses)?;

        let deleted = {
            use schema::products::dsl::*;

            diesel::delete(products.filter(id.eq(delete_id))).execute(conn)?
        };
        ensure_deleted(deleted, "product", delete_id.get())
    })
}

pub fn create_supplement(conn: &mut Connection, new: &NewSupplement) -> Result<Supplement> {
    new.validate()?;

    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(schema::supplements::table)
            .values(new)
            .execute(conn)?;
        let new_id = SupplementId::from_row_id(last_insert_id(conn)?);
        log::debug!("created supplement {new_id}");
        get_supplement(conn, new_id)
    })
}

pub fn get_supplement(conn: &mut Connection, supplement_id: SupplementId) -> Result<Supplement> {
    use schema::supplements::dsl::*;

    let supplement = supplements
        .find(supplement_id)
        .select(Supplement::as_select())
        .first(conn)
        .optional()?;
    found(supplement, "supplement", supplement_id.get())
}

pub fn update_supplement(
    conn: &mut Connection,
    supplement_id: SupplementId,
    edit: &NewSupplement,
) -> Result<()> {
    edit.validate()?;

    use schema::supplements::dsl::*;
    let updated = diesel::update(supplements.find(supplement_id))
        .set(edit)
        .execute(conn)?;
    ensure_updated(updated, "supplement", supplement_id.get())
}

/// Refused while any plan schedules the supplement.
pub fn delete_supplement(conn: &mut Connection, delete_id: SupplementId) -> Result<()> {
    conn.transaction::<_, Error, _>(|conn| {
        let scheduled: i64 = {
            use schema::plan_supplements::dsl::*;

            plan_supplements
                .filter(supplement_id.eq(delete_id))
                .count()
                .get_result(conn)?
        };
        refuse_if_referenced("supplement", delete_id.get(), "plan supplement", scheduled)?;

        let deleted = {
            use schema::supplements::dsl::*;

            diesel::delete(supplements.filter(id.eq(delete_id))).execute(conn)?
        };
        ensure_deleted(deleted, "supplement", delete_id.get())
    })
}

/// The same product may be offered by the same provider more than once.
pub fn add_product_offering(
    conn: &mut Connection,
    offered_product: ProductId,
    offered_by: ProductProviderId,
    offering_url: &str,
) -> Result<ProductOffering> {
    check_offering_url(offering_url)?;

    use schema::product_offerings::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(product_offerings)
            .values((
                product_id.eq(offered_product),
                provider_id.eq(offered_by),
                url.eq(offering_url),
            ))
            .execute(conn)?;
        let new_id = ProductOfferingId::from_row_id(last_insert_id(conn)?);
        log::debug!("product {offered_product} offered by {offered_by} as offering {new_id}");

        Ok(product_offerings
            .find(new_id)
            .select(ProductOffering::as_select())
            .first(conn)?)
    })
}

pub fn delete_product_offering(conn: &mut Connection, delete_id: ProductOfferingId) -> Result<()> {
    use schema::product_offerings::dsl::*;

    let deleted = diesel::delete(product_offerings.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "product offering", delete_id.get())
}

pub fn offerings_of_product(
    conn: &mut Connection,
    product: &Product,
) -> Result<Vec<(ProductOffering, ProductProvider)>> {
    use schema::product_offerings::dsl::*;

    Ok(ProductOffering::belonging_to(product)
        .inner_join(schema::product_providers::table)
        .select((ProductOffering::as_select(), ProductProvider::as_select()))
        .order_by(id)
        .load(conn)?)
}

/// Providers of the product, one entry per offering.
pub fn providers_of_product(
    conn: &mut Connection,
    product: ProductId,
) -> Result<Vec<ProductProvider>> {
    use schema::product_offerings::dsl::*;

    Ok(product_offerings
        .inner_join(schema::product_providers::table)
        .filter(product_id.eq(product))
        .select(ProductProvider::as_select())
        .order_by(id)
        .load(conn)?)
}

pub fn add_supplement_offering(
    conn: &mut Connection,
    offered_supplement: SupplementId,
    offered_by: SupplementProviderId,
    offering_url: &str,
) -> Result<SupplementOffering> {
    check_offering_url(offering_url)?;

    use schema::supplement_offerings::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(supplement_offerings)
            .values((
                supplement_id.eq(offered_supplement),
                provider_id.eq(offered_by),
                url.eq(offering_url),
            ))
            .execute(conn)?;
        let new_id = SupplementOfferingId::from_row_id(last_insert_id(conn)?);
        log::debug!(
            "supplement {offered_supplement} offered by {offered_by} as offering {new_id}"
        );

        Ok(supplement_offerings
            .find(new_id)
            .select(SupplementOffering::as_select())
            .first(conn)?)
    })
}

pub fn delete_supplement_offering(
    conn: &mut Connection,
    delete_id: SupplementOfferingId,
) -> Result<()> {
    use schema::supplement_offerings::dsl::*;

    let deleted = diesel::delete(supplement_offerings.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "supplement offering", delete_id.get())
}

pub fn offerings_of_supplement(
    conn: &mut Connection,
    supplement: &Supplement,
) -> Result<Vec<(SupplementOffering, SupplementProvider)>> {
    use schema::supplement_offerings::dsl::*;

    Ok(SupplementOffering::belonging_to(supplement)
        .inner_join(schema::supplement_providers::table)
        .select((
            SupplementOffering::as_select(),
            SupplementProvider::as_select(),
        ))
        .order_by(id)
        .load(conn)?)
}

pub fn providers_of_supplement(
    conn: &mut Connection,
    supplement: SupplementId,
) -> Result<Vec<SupplementProvider>> {
    use schema::supplement_offerings::dsl::*;

    Ok(supplement_offerings
        .inner_join(schema::supplement_providers::table)
        .filter(supplement_id.eq(supplement))
        .select(SupplementProvider::as_select())
        .order_by(id)
        .load(conn)?)
}

pub fn add_product_photo(
    conn: &mut Connection,
    media: &MediaStore,
    photographed: ProductId,
    source: impl AsRef<Path>,
    new_caption: Option<&str>,
) -> Result<ProductPhoto> {
    Checker::new()
        .max_length("caption", new_caption.unwrap_or_default(), CAPTION_MAX)
        .finish()?;

    use schema::product_photos::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        get_product(conn, photographed)?;
        let stored = media.store(UploadTo::Products, source)?;

        let insert = |conn: &mut Connection| -> Result<ProductPhoto> {
            diesel::insert_into(product_photos)
                .values((
                    product_id.eq(photographed),
                    caption.eq(new_caption),
                    photo.eq(&stored),
                ))
                .execute(conn)?;
            let new_id = ProductPhotoId::from_row_id(last_insert_id(conn)?);

            Ok(product_photos
                .find(new_id)
                .select(ProductPhoto::as_select())
                .first(conn)?)
        };
        insert(conn).inspect_err(|_| media.discard(&stored))
    })
}

pub fn product_photos(conn: &mut Connection, product: ProductId) -> Result<Vec<ProductPhoto>> {
    use schema::product_photos::dsl;

    Ok(dsl::product_photos
        .filter(dsl::product_id.eq(product))
        .select(ProductPhoto::as_select())
        .order_by(dsl::id)
        .load(conn)?)
}

/// Removes the row only; the stored image stays under the media root.
pub fn delete_product_photo(conn: &mut Connection, delete_id: ProductPhotoId) -> Result<()> {
    use schema::product_photos::dsl::*;

    let deleted = diesel::delete(product_photos.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "product photo", delete_id.get())
}

#[test]
fn provider_lifecycle() {
    let mut conn = crate::database::test_connection();
    let provider = create_product_provider(
        &mut conn,
        &NewProvider {
            name: "Green Grocer".into(),
            description: Some("local produce".into()),
            url: "https://grocer.example.com".into(),
        },
    )
    .unwrap();
    assert_eq!(provider.to_string(), "Green Grocer");

    update_product_provider(
        &mut conn,
        provider.id,
        &NewProvider {
            name: "Green Grocer Ltd".into(),
            description: None,
            url: "https://grocer.example.com/shop".into(),
        },
    )
    .unwrap();
    let provider = get_product_provider(&mut conn, provider.id).unwrap();
    assert_eq!(provider.name, "Green Grocer Ltd");
    assert_eq!(provider.description, None);

    let err = create_supplement_provider(
        &mut conn,
        &NewProvider {
            name: "Pills".into(),
            description: None,
            url: "pills".into(),
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(v) if v.has("url")));
    assert!(supplement_providers(&mut conn).unwrap().is_empty());
}

#[test]
fn product_provider_is_protected_by_offerings() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let oats = product(&mut conn, "Oats");
    let shop = product_provider(&mut conn, "Shop");
    let offering = add_product_offering(&mut conn, oats.id, shop.id, "https://shop.example.com/oats")
        .unwrap();

    let err = delete_product_provider(&mut conn, shop.id).unwrap_err();
    assert!(matches!(
        err,
        Error::Protected {
            entity: "product provider",
            dependent: "offering",
            count: 1,
            ..
        }
    ));
    assert!(get_product_provider(&mut conn, shop.id).is_ok());

    delete_product_offering(&mut conn, offering.id).unwrap();
    delete_product_provider(&mut conn, shop.id).unwrap();
    assert!(matches!(
        get_product_provider(&mut conn, shop.id),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn database_also_refuses_protected_delete() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let oats = product(&mut conn, "Oats");
    let shop = product_provider(&mut conn, "Shop");
    add_product_offering(&mut conn, oats.id, shop.id, "https://shop.example.com/oats").unwrap();

    let err = diesel::delete(schema::product_providers::table.find(shop.id))
        .execute(&mut conn)
        .map_err(Error::from)
        .unwrap_err();
    assert!(err.is_integrity_violation(), "{err}");
}

#[test]
fn product_offerings_many_to_many() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let oats = product(&mut conn, "Oats");
    let rice = product(&mut conn, "Rice");
    let shop = product_provider(&mut conn, "Shop");
    let market = product_provider(&mut conn, "Market");

    add_product_offering(&mut conn, oats.id, shop.id, "https://shop.example.com/oats").unwrap();
    add_product_offering(&mut conn, oats.id, market.id, "https://market.example.com/1").unwrap();
    add_product_offering(&mut conn, oats.id, shop.id, "https://shop.example.com/oats-xl").unwrap();
    add_product_offering(&mut conn, rice.id, shop.id, "https://shop.example.com/rice").unwrap();

    let names: Vec<_> = providers_of_product(&mut conn, oats.id)
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, ["Shop", "Market", "Shop"]);

    let offerings = offerings_of_product(&mut conn, &rice).unwrap();
    assert_eq!(offerings.len(), 1);
    assert_eq!(offerings[0].0.url, "https://shop.example.com/rice");
    assert_eq!(offerings[0].1, shop);

    let err = add_product_offering(&mut conn, oats.id, shop.id, "").unwrap_err();
    assert!(matches!(err, Error::Validation(v) if v.has("url")));
}

#[test]
fn delete_product_cascades_offerings_and_photos() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let media_root = tempfile::tempdir().unwrap();
    let media = MediaStore::new(media_root.path());
    let image = media_root.path().join("oats.png");
    std::fs::write(&image, b"png").unwrap();

    let oats = product(&mut conn, "Oats");
    let shop = product_provider(&mut conn, "Shop");
    add_product_offering(&mut conn, oats.id, shop.id, "https://shop.example.com/oats").unwrap();
    let photo = add_product_photo(&mut conn, &media, oats.id, &image, Some("a bowl")).unwrap();
    assert_eq!(photo.photo, "products/oats.png");
    assert_eq!(photo.caption.as_deref(), Some("a bowl"));

    delete_product(&mut conn, oats.id).unwrap();

    assert!(product_photos(&mut conn, oats.id).unwrap().is_empty());
    assert!(providers_of_product(&mut conn, oats.id).unwrap().is_empty());
    delete_product_provider(&mut conn, shop.id).unwrap();
}

#[test]
fn product_is_protected_by_ingredients() {
    use super::recipes::{add_ingredient, delete_ingredient};
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let oats = product(&mut conn, "Oats");
    let porridge = recipe(&mut conn, None, "Porridge");
    let ingredient = add_ingredient(&mut conn, porridge.id, oats.id, 80.0).unwrap();

    let err = delete_product(&mut conn, oats.id).unwrap_err();
    assert!(matches!(
        err,
        Error::Protected {
            entity: "product",
            dependent: "ingredient",
            count: 1,
            ..
        }
    ));

    delete_ingredient(&mut conn, ingredient.id).unwrap();
    delete_product(&mut conn, oats.id).unwrap();
}

#[test]
fn supplement_offerings_and_protection() {
    use super::plans::add_plan_supplement;
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let vitamin = supplement(&mut conn, "Vitamin D");
    let pharmacy = supplement_provider(&mut conn, "Pharmacy");
    let offering =
        add_supplement_offering(&mut conn, vitamin.id, pharmacy.id, "https://pharmacy.example.com/d3")
            .unwrap();
    assert_eq!(
        providers_of_supplement(&mut conn, vitamin.id).unwrap(),
        [pharmacy.clone()]
    );
    assert_eq!(
        offerings_of_supplement(&mut conn, &vitamin).unwrap(),
        [(offering, pharmacy.clone())]
    );

    let err = delete_supplement_provider(&mut conn, pharmacy.id).unwrap_err();
    assert!(matches!(err, Error::Protected { count: 1, .. }));

    let owner = user(&mut conn, "owner");
    let cut = plan(&mut conn, owner.id, "Cut");
    add_plan_supplement(&mut conn, cut.id, vitamin.id, 2.0).unwrap();
    let err = delete_supplement(&mut conn, vitamin.id).unwrap_err();
    assert!(matches!(
        err,
        Error::Protected {
            entity: "supplement",
            dependent: "plan supplement",
            ..
        }
    ));

    super::plans::delete_plan(&mut conn, cut.id).unwrap();
    delete_supplement(&mut conn, vitamin.id).unwrap();
    delete_supplement_provider(&mut conn, pharmacy.id).unwrap();
}

#[test]
fn updates() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let oats = product(&mut conn, "Oats");
    update_product(
        &mut conn,
        oats.id,
        &NewProduct {
            name: "Rolled Oats".into(),
            ..oats_form()
        },
    )
    .unwrap();
    assert_eq!(get_product(&mut conn, oats.id).unwrap().name, "Rolled Oats");

    let vitamin = supplement(&mut conn, "Vitamin D");
    update_supplement(
        &mut conn,
        vitamin.id,
        &NewSupplement {
            name: "Vitamin D3".into(),
            description: "2000 IU".into(),
        },
    )
    .unwrap();
    assert_eq!(get_supplement(&mut conn, vitamin.id).unwrap().to_string(), "Vitamin D3");

    delete_product(&mut conn, oats.id).unwrap();
    let err = update_product(&mut conn, oats.id, &oats_form()).unwrap_err();
    assert!(matches!(err, Error::NotFound { entity: "product", .. }));
}

#[test]
fn failed_product_photo_leaves_no_file() {
    use super::testing::*;
    use diesel::connection::SimpleConnection as _;

    let mut conn = crate::database::test_connection();
    let uploads = tempfile::tempdir().unwrap();
    let media_root = tempfile::tempdir().unwrap();
    let media = MediaStore::new(media_root.path());
    let image = uploads.path().join("oats.png");
    std::fs::write(&image, b"png").unwrap();
    let stored_files = || {
        std::fs::read_dir(media_root.path().join("products"))
            .map(|dir| dir.count())
            .unwrap_or(0)
    };

    let err = add_product_photo(&mut conn, &media, ProductId::from_row_id(42), &image, None)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "{err}");
    assert_eq!(stored_files(), 0);

    let oats = product(&mut conn, "Oats");
    conn.batch_execute(
        "CREATE TRIGGER reject_photos BEFORE INSERT ON product_photos \
         BEGIN SELECT RAISE(ABORT, 'photos rejected'); END;",
    )
    .unwrap();
    add_product_photo(&mut conn, &media, oats.id, &image, None).unwrap_err();
    assert_eq!(stored_files(), 0);
    assert!(product_photos(&mut conn, oats.id).unwrap().is_empty());

    conn.batch_execute("DROP TRIGGER reject_photos").unwrap();
    let photo = add_product_photo(&mut conn, &media, oats.id, &image, None).unwrap();
    assert_eq!(photo.photo, "products/oats.png");
    assert_eq!(stored_files(), 1);
}
