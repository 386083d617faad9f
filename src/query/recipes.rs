// Copyright 2024 Meal Planner Authors

//! Recipes and what hangs off them: tags, comments, ingredients and photos.

use super::{ensure_deleted, ensure_updated, found, now};
use crate::database::models::{
    Comment, CommentId, Ingredient, IngredientId, NewRecipe, Product, ProductId, Recipe,
    RecipeId, RecipePhoto, RecipePhotoId, Tag, TagId, UserId,
};
use crate::database::{last_insert_id, schema, Connection};
use crate::error::{Error, Result};
use crate::media::{MediaStore, UploadTo};
use crate::validation::{Checker, Validate as _, CAPTION_MAX, COMMENT_MAX, TAG_NAME_MAX};
use diesel::prelude::Connection as _;
use diesel::BelongingToDsl as _;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::HashSet;
use std::path::Path;

/// Creates a recipe owned by `owner`, stamped with the current time.
pub fn create_recipe(
    conn: &mut Connection,
    owner: Option<UserId>,
    new: &NewRecipe,
) -> Result<Recipe> {
    new.validate()?;

    use schema::recipes::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(recipes)
            .values((
                owner_id.eq(owner),
                based_on.eq(new.based_on),
                is_custom.eq(new.is_custom),
                title.eq(&new.title),
                content.eq(&new.content),
                timestamp.eq(now()),
                rating.eq(new.rating),
            ))
            .execute(conn)?;
        let new_id = RecipeId::from_row_id(last_insert_id(conn)?);
        log::debug!("created recipe {new_id}");
        get_recipe(conn, new_id)
    })
}

pub fn get_recipe(conn: &mut Connection, recipe_id: RecipeId) -> Result<Recipe> {
    use schema::recipes::dsl::*;

    let recipe = recipes
        .find(recipe_id)
        .select(Recipe::as_select())
        .first(conn)
        .optional()?;
    found(recipe, "recipe", recipe_id.get())
}

pub fn user_recipes(conn: &mut Connection, owner: UserId) -> Result<Vec<Recipe>> {
    use schema::recipes::dsl::*;

    Ok(recipes
        .filter(owner_id.eq(owner))
        .select(Recipe::as_select())
        .order_by(id)
        .load(conn)?)
}

/// Edits the recipe's own fields. The owner and timestamp are left alone.
pub fn update_recipe(conn: &mut Connection, edit_id: RecipeId, edit: &NewRecipe) -> Result<()> {
    edit.validate()?;

    use schema::recipes::dsl::*;
    let updated = diesel::update(recipes.find(edit_id))
        .set(edit)
        .execute(conn)?;
    ensure_updated(updated, "recipe", edit_id.get())
}

/// Comments, ingredients, meals, photos and tag links go with the recipe. Recipes based on it
/// lose their `based_on`.
pub fn delete_recipe(conn: &mut Connection, delete_id: RecipeId) -> Result<()> {
    use schema::recipes::dsl::*;

    let deleted = diesel::delete(recipes.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "recipe", delete_id.get())
}

/// The recipes `recipe_id` was derived from, nearest first. Stops early if the chain loops.
pub fn recipe_lineage(conn: &mut Connection, recipe_id: RecipeId) -> Result<Vec<Recipe>> {
    let mut seen = HashSet::from([recipe_id]);
    let mut lineage = vec![];
    let mut next = get_recipe(conn, recipe_id)?.based_on;

    while let Some(base_id) = next {
        if !seen.insert(base_id) {
            log::warn!("recipe {recipe_id} has a looping lineage at {base_id}");
            break;
        }
        let base = get_recipe(conn, base_id)?;
        next = base.based_on;
        lineage.push(base);
    }
    Ok(lineage)
}

/// Recipes directly based on `base`.
pub fn derived_recipes(conn: &mut Connection, base: RecipeId) -> Result<Vec<Recipe>> {
    use schema::recipes::dsl::*;

    Ok(recipes
        .filter(based_on.eq(base))
        .select(Recipe::as_select())
        .order_by(id)
        .load(conn)?)
}

pub fn create_tag(conn: &mut Connection, new_name: &str) -> Result<Tag> {
    Checker::new()
        .required("name", new_name)
        .max_length("name", new_name, TAG_NAME_MAX)
        .finish()?;

    use schema::tags::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(tags)
            .values(name.eq(new_name))
            .execute(conn)?;
        Ok(Tag {
            id: TagId::from_row_id(last_insert_id(conn)?),
            name: new_name.into(),
        })
    })
}

pub fn delete_tag(conn: &mut Connection, delete_id: TagId) -> Result<()> {
    use schema::tags::dsl::*;

    let deleted = diesel::delete(tags.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "tag", delete_id.get())
}

/// Tagging a recipe twice with the same tag leaves a single link.
pub fn tag_recipe(conn: &mut Connection, tagged: RecipeId, tag: TagId) -> Result<()> {
    use schema::recipe_tags::dsl::*;

    diesel::insert_or_ignore_into(recipe_tags)
        .values((recipe_id.eq(tagged), tag_id.eq(tag)))
        .execute(conn)?;
    Ok(())
}

pub fn untag_recipe(conn: &mut Connection, tagged: RecipeId, tag: TagId) -> Result<()> {
    use schema::recipe_tags::dsl::*;

    diesel::delete(recipe_tags.filter(recipe_id.eq(tagged)).filter(tag_id.eq(tag)))
        .execute(conn)?;
    Ok(())
}

pub fn recipe_tags(conn: &mut Connection, tagged: RecipeId) -> Result<Vec<Tag>> {
    use schema::recipe_tags::dsl;
    use schema::tags;

    Ok(dsl::recipe_tags
        .inner_join(tags::table)
        .filter(dsl::recipe_id.eq(tagged))
        .select(Tag::as_select())
        .order_by(tags::name)
        .load(conn)?)
}

pub fn recipes_tagged(conn: &mut Connection, tag: TagId) -> Result<Vec<Recipe>> {
    use schema::recipe_tags::dsl::*;

    Ok(recipe_tags
        .inner_join(schema::recipes::table)
        .filter(tag_id.eq(tag))
        .select(Recipe::as_select())
        .order_by(recipe_id)
        .load(conn)?)
}

/// `author` may be absent, as it becomes once the author's account is deleted.
pub fn add_comment(
    conn: &mut Connection,
    author: Option<UserId>,
    on: RecipeId,
    text: &str,
) -> Result<Comment> {
    Checker::new()
        .required("contents", text)
        .max_length("contents", text, COMMENT_MAX)
        .finish()?;

    use schema::comments::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(comments)
            .values((user_id.eq(author), recipe_id.eq(on), contents.eq(text)))
            .execute(conn)?;
        Ok(Comment {
            id: CommentId::from_row_id(last_insert_id(conn)?),
            user_id: author,
            recipe_id: on,
            contents: text.into(),
        })
    })
}

pub fn recipe_comments(conn: &mut Connection, recipe: &Recipe) -> Result<Vec<Comment>> {
    use schema::comments::dsl::*;

    Ok(Comment::belonging_to(recipe)
        .select(Comment::as_select())
        .order_by(id)
        .load(conn)?)
}

pub fn delete_comment(conn: &mut Connection, delete_id: CommentId) -> Result<()> {
    use schema::comments::dsl::*;

    let deleted = diesel::delete(comments.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "comment", delete_id.get())
}

pub fn add_ingredient(
    conn: &mut Connection,
    used_in: RecipeId,
    used: ProductId,
    new_amount: f64,
) -> Result<Ingredient> {
    Checker::new().finite("amount", new_amount).finish()?;

    use schema::ingredients::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        diesel::insert_into(ingredients)
            .values((
                recipe_id.eq(used_in),
                product_id.eq(used),
                amount.eq(new_amount),
            ))
            .execute(conn)?;
        Ok(Ingredient {
            id: IngredientId::from_row_id(last_insert_id(conn)?),
            recipe_id: used_in,
            product_id: used,
            amount: new_amount,
        })
    })
}

pub fn update_ingredient_amount(
    conn: &mut Connection,
    edit_id: IngredientId,
    new_amount: f64,
) -> Result<()> {
    Checker::new().finite("amount", new_amount).finish()?;

    use schema::ingredients::dsl::*;
    let updated = diesel::update(ingredients.filter(id.eq(edit_id)))
        .set(amount.eq(new_amount))
        .execute(conn)?;
    ensure_updated(updated, "ingredient", edit_id.get())
}

/// Ingredients of the recipe, each with the product it uses.
pub fn recipe_ingredients(
    conn: &mut Connection,
    recipe: &Recipe,
) -> Result<Vec<(Ingredient, Product)>> {
    use schema::ingredients::dsl::*;

    Ok(Ingredient::belonging_to(recipe)
        .inner_join(schema::products::table)
        .select((Ingredient::as_select(), Product::as_select()))
        .order_by(id)
        .load(conn)?)
}

pub fn delete_ingredient(conn: &mut Connection, delete_id: IngredientId) -> Result<()> {
    use schema::ingredients::dsl::*;

    let deleted = diesel::delete(ingredients.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "ingredient", delete_id.get())
}

pub fn add_recipe_photo(
    conn: &mut Connection,
    media: &MediaStore,
    photographed: RecipeId,
    source: impl AsRef<Path>,
    new_caption: Option<&str>,
) -> Result<RecipePhoto> {
    Checker::new()
        .max_length("caption", new_caption.unwrap_or_default(), CAPTION_MAX)
        .finish()?;

    use schema::recipe_photos::dsl::*;
    conn.transaction::<_, Error, _>(|conn| {
        get_recipe(conn, photographed)?;
        let stored = media.store(UploadTo::Recipes, source)?;

        let insert = |conn: &mut Connection| -> Result<RecipePhoto> {
            diesel::insert_into(recipe_photos)
                .values((
                    recipe_id.eq(photographed),
                    caption.eq(new_caption),
                    photo.eq(&stored),
                ))
                .execute(conn)?;
            Ok(RecipePhoto {
                id: RecipePhotoId::from_row_id(last_insert_id(conn)?),
                recipe_id: photographed,
                caption: new_caption.map(Into::into),
                photo: stored.clone(),
            })
        };
        insert(conn).inspect_err(|_| media.discard(&stored))
    })
}

pub fn recipe_photos(conn: &mut Connection, recipe: &Recipe) -> Result<Vec<RecipePhoto>> {
    use schema::recipe_photos::dsl;

    Ok(RecipePhoto::belonging_to(recipe)
        .select(RecipePhoto::as_select())
        .order_by(dsl::id)
        .load(conn)?)
}

/// Removes the row only; the stored image stays under the media root.
pub fn delete_recipe_photo(conn: &mut Connection, delete_id: RecipePhotoId) -> Result<()> {
    use schema::recipe_photos::dsl::*;

    let deleted = diesel::delete(recipe_photos.filter(id.eq(delete_id))).execute(conn)?;
    ensure_deleted(deleted, "recipe photo", delete_id.get())
}

#[test]
fn recipe_display_and_fields() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let cook = user(&mut conn, "cook");
    let pancakes = recipe(&mut conn, Some(cook.id), "Pancakes");

    assert_eq!(pancakes.to_string(), "Pancakes");
    assert_eq!(pancakes.owner_id, Some(cook.id));
    assert_eq!(user_recipes(&mut conn, cook.id).unwrap(), [pancakes.clone()]);

    update_recipe(
        &mut conn,
        pancakes.id,
        &NewRecipe {
            title: "Fluffy Pancakes".into(),
            rating: 5.0,
            ..recipe_form("")
        },
    )
    .unwrap();
    let updated = get_recipe(&mut conn, pancakes.id).unwrap();
    assert_eq!(updated.to_string(), "Fluffy Pancakes");
    assert_eq!(updated.timestamp, pancakes.timestamp);
    assert_eq!(updated.owner_id, Some(cook.id));

    let err = create_recipe(
        &mut conn,
        None,
        &NewRecipe {
            title: "x".repeat(121),
            ..recipe_form("")
        },
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(v) if v.has("title")));
}

#[test]
fn delete_recipe_cascades() {
    use super::plans::{add_meal, plan_meals};
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let media_root = tempfile::tempdir().unwrap();
    let media = MediaStore::new(media_root.path());
    let image = media_root.path().join("stack.jpg");
    std::fs::write(&image, b"jpg").unwrap();

    let cook = user(&mut conn, "cook");
    let flour = product(&mut conn, "Flour");
    let pancakes = recipe(&mut conn, Some(cook.id), "Pancakes");
    let sweet = create_tag(&mut conn, "sweet").unwrap();
    let cut = plan(&mut conn, cook.id, "Cut");

    add_comment(&mut conn, Some(cook.id), pancakes.id, "family favourite").unwrap();
    add_ingredient(&mut conn, pancakes.id, flour.id, 200.0).unwrap();
    add_meal(&mut conn, cut.id, &meal_form(pancakes.id, "Sunday")).unwrap();
    add_recipe_photo(&mut conn, &media, pancakes.id, &image, None).unwrap();
    tag_recipe(&mut conn, pancakes.id, sweet.id).unwrap();

    delete_recipe(&mut conn, pancakes.id).unwrap();

    assert!(recipe_comments(&mut conn, &pancakes).unwrap().is_empty());
    assert!(recipe_ingredients(&mut conn, &pancakes).unwrap().is_empty());
    assert!(recipe_photos(&mut conn, &pancakes).unwrap().is_empty());
    assert!(plan_meals(&mut conn, cut.id).unwrap().is_empty());
    assert!(recipes_tagged(&mut conn, sweet.id).unwrap().is_empty());

    // the product and tag themselves survive
    crate::query::catalog::get_product(&mut conn, flour.id).unwrap();
    delete_tag(&mut conn, sweet.id).unwrap();
}

#[test]
fn lineage_is_cleared_when_base_is_deleted() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let base = recipe(&mut conn, None, "Pancakes");
    let variant = create_recipe(
        &mut conn,
        None,
        &NewRecipe {
            based_on: Some(base.id),
            ..recipe_form("Banana Pancakes")
        },
    )
    .unwrap();
    let grandchild = create_recipe(
        &mut conn,
        None,
        &NewRecipe {
            based_on: Some(variant.id),
            ..recipe_form("Vegan Banana Pancakes")
        },
    )
    .unwrap();

    let titles: Vec<_> = recipe_lineage(&mut conn, grandchild.id)
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, ["Banana Pancakes", "Pancakes"]);
    assert_eq!(
        derived_recipes(&mut conn, base.id).unwrap(),
        [variant.clone()]
    );

    delete_recipe(&mut conn, base.id).unwrap();
    let variant = get_recipe(&mut conn, variant.id).unwrap();
    assert_eq!(variant.based_on, None);
    assert_eq!(recipe_lineage(&mut conn, grandchild.id).unwrap(), [variant]);
}

#[test]
fn looping_lineage_terminates() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let a = recipe(&mut conn, None, "A");
    let b = create_recipe(
        &mut conn,
        None,
        &NewRecipe {
            based_on: Some(a.id),
            ..recipe_form("B")
        },
    )
    .unwrap();
    update_recipe(
        &mut conn,
        a.id,
        &NewRecipe {
            based_on: Some(b.id),
            ..recipe_form("A")
        },
    )
    .unwrap();

    let titles: Vec<_> = recipe_lineage(&mut conn, a.id)
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, ["B"]);
}

#[test]
fn tags_many_to_many() {
    use super::testing::*;
    use maplit::hashset;

    let mut conn = crate::database::test_connection();
    let pancakes = recipe(&mut conn, None, "Pancakes");
    let waffles = recipe(&mut conn, None, "Waffles");
    let sweet = create_tag(&mut conn, "sweet").unwrap();
    let quick = create_tag(&mut conn, "quick").unwrap();
    assert_eq!(sweet.to_string(), "sweet");

    tag_recipe(&mut conn, pancakes.id, sweet.id).unwrap();
    tag_recipe(&mut conn, pancakes.id, sweet.id).unwrap();
    tag_recipe(&mut conn, pancakes.id, quick.id).unwrap();
    tag_recipe(&mut conn, waffles.id, sweet.id).unwrap();

    assert_eq!(
        recipe_tags(&mut conn, pancakes.id).unwrap(),
        [quick.clone(), sweet.clone()]
    );
    let tagged: HashSet<_> = recipes_tagged(&mut conn, sweet.id)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(tagged, hashset! {pancakes.id, waffles.id});

    untag_recipe(&mut conn, pancakes.id, sweet.id).unwrap();
    assert_eq!(recipe_tags(&mut conn, pancakes.id).unwrap(), [quick.clone()]);

    delete_tag(&mut conn, quick.id).unwrap();
    assert!(recipe_tags(&mut conn, pancakes.id).unwrap().is_empty());

    let err = create_tag(&mut conn, "a tag name that is far too long").unwrap_err();
    assert!(matches!(err, Error::Validation(v) if v.has("name")));
}

#[test]
fn ingredients_and_comments() {
    use super::testing::*;

    let mut conn = crate::database::test_connection();
    let flour = product(&mut conn, "Flour");
    let milk = product(&mut conn, "Milk");
    let pancakes = recipe(&mut conn, None, "Pancakes");

    let first = add_ingredient(&mut conn, pancakes.id, flour.id, 200.0).unwrap();
    add_ingredient(&mut conn, pancakes.id, milk.id, 300.0).unwrap();
    update_ingredient_amount(&mut conn, first.id, 250.0).unwrap();

    let listed: Vec<_> = recipe_ingredients(&mut conn, &pancakes)
        .unwrap()
        .into_iter()
        .map(|(i, p)| (p.name, i.amount))
        .collect();
    assert_eq!(listed, [("Flour".to_owned(), 250.0), ("Milk".to_owned(), 300.0)]);

    let err = add_ingredient(&mut conn, pancakes.id, ProductId::from_row_id(999), 1.0)
        .unwrap_err();
    assert!(err.is_integrity_violation(), "{err}");

    let anonymous = add_comment(&mut conn, None, pancakes.id, "nice").unwrap();
    assert_eq!(anonymous.user_id, None);
    let err = add_comment(&mut conn, None, pancakes.id, "   ").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    delete_comment(&mut conn, anonymous.id).unwrap();
    assert!(recipe_comments(&mut conn, &pancakes).unwrap().is_empty());
    assert!(matches!(
        delete_comment(&mut conn, anonymous.id),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn failed_recipe_photo_leaves_no_file() {
    use super::testing::*;
    use diesel::connection::SimpleConnection as _;

    let mut conn = crate::database::test_connection();
    let uploads = tempfile::tempdir().unwrap();
    let media_root = tempfile::tempdir().unwrap();
    let media = MediaStore::new(media_root.path());
    let image = uploads.path().join("pancakes.jpg");
    std::fs::write(&image, b"jpg").unwrap();
    let stored_files = || {
        std::fs::read_dir(media_root.path().join("recipes"))
            .map(|dir| dir.count())
            .unwrap_or(0)
    };

    let err = add_recipe_photo(&mut conn, &media, RecipeId::from_row_id(42), &image, None)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "{err}");
    assert_eq!(stored_files(), 0);

    let pancakes = recipe(&mut conn, None, "Pancakes");
    conn.batch_execute(
        "CREATE TRIGGER reject_photos BEFORE INSERT ON recipe_photos \
         BEGIN SELECT RAISE(ABORT, 'photos rejected'); END;",
    )
    .unwrap();
    add_recipe_photo(&mut conn, &media, pancakes.id, &image, Some("stack")).unwrap_err();
    assert_eq!(stored_files(), 0);
    assert!(recipe_photos(&mut conn, &pancakes).unwrap().is_empty());
}
