//! Category/house/weight/grade maintenance.
//!
//! All writes go through here so the cross-couple invariants and the
//! backfill side effects stay explicit: a new category gets a neutral
//! weight for every homebuyer in the couple, a new house gets a neutral
//! grade for every homebuyer/category pair, and a new homebuyer gets both
//! for everything that already exists.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::entities::{
    category, category_weight, grade, homebuyer, house, prelude::*,
};
use crate::error::{AppError, AppResult};

/// Weights and scores share the same discrete 1-5 scale.
pub const SCALE_MIN: i16 = 1;
pub const SCALE_MAX: i16 = 5;
pub const DEFAULT_WEIGHT: i16 = 3;
pub const DEFAULT_SCORE: i16 = 3;

pub const WEIGHT_LABELS: [(i16, &str); 5] = [
    (1, "Unimportant"),
    (2, "Below Average"),
    (3, "Average"),
    (4, "Above Average"),
    (5, "Important"),
];

pub const SCORE_LABELS: [(i16, &str); 5] = [
    (1, "Poor"),
    (2, "Below Average"),
    (3, "Average"),
    (4, "Above Average"),
    (5, "Excellent"),
];

/// Every new couple starts out with these categories.
pub const DEFAULT_CATEGORIES: [(&str, &str); 2] = [
    ("Location", "How good is the neighborhood and commute?"),
    ("Price", "How does the asking price fit the budget?"),
];

fn now() -> chrono::NaiveDateTime {
    Utc::now().naive_utc()
}

fn validate_scale(value: i16, what: &str) -> AppResult<()> {
    if !(SCALE_MIN..=SCALE_MAX).contains(&value) {
        return Err(AppError::validation(format!(
            "{what} must be between {SCALE_MIN} and {SCALE_MAX}"
        )));
    }
    Ok(())
}

/// True when every id in the iterator is the same couple.
pub fn same_couple<I: IntoIterator<Item = i32>>(couple_ids: I) -> bool {
    let mut iter = couple_ids.into_iter();
    match iter.next() {
        None => true,
        Some(first) => iter.all(|id| id == first),
    }
}

pub async fn create_category<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    couple_id: i32,
    summary: &str,
    description: &str,
) -> AppResult<category::Model> {
    let summary = summary.trim();
    if summary.is_empty() {
        return Err(AppError::validation("Summary must not be empty"));
    }

    // Best-effort pre-check; the unique index is the source of truth.
    let existing = Category::find()
        .filter(category::Column::CoupleId.eq(couple_id))
        .filter(category::Column::Summary.eq(summary))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::validation(
            "A category with this summary already exists",
        ));
    }

    // The category and its backfilled weights land together or not at all.
    let txn = db.begin().await?;

    let cat = category::ActiveModel {
        couple_id: Set(couple_id),
        summary: Set(summary.to_string()),
        description: Set(description.trim().to_string()),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    backfill_for_category(&txn, &cat).await?;

    txn.commit().await?;

    Ok(cat)
}

pub async fn update_category<C: ConnectionTrait>(
    db: &C,
    couple_id: i32,
    category_id: i32,
    summary: &str,
    description: &str,
) -> AppResult<category::Model> {
    let cat = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    if cat.couple_id != couple_id {
        return Err(AppError::Forbidden);
    }

    let summary = summary.trim();
    if summary.is_empty() {
        return Err(AppError::validation("Summary must not be empty"));
    }

    let clash = Category::find()
        .filter(category::Column::CoupleId.eq(couple_id))
        .filter(category::Column::Summary.eq(summary))
        .filter(category::Column::Id.ne(category_id))
        .one(db)
        .await?;
    if clash.is_some() {
        return Err(AppError::validation(
            "A category with this summary already exists",
        ));
    }

    let mut cat: category::ActiveModel = cat.into();
    cat.summary = Set(summary.to_string());
    cat.description = Set(description.trim().to_string());
    cat.updated_at = Set(now());
    Ok(cat.update(db).await?)
}

/// Dependent weights and grades go with the category via cascade.
pub async fn delete_category<C: ConnectionTrait>(
    db: &C,
    couple_id: i32,
    category_id: i32,
) -> AppResult<()> {
    let cat = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    if cat.couple_id != couple_id {
        return Err(AppError::Forbidden);
    }
    Category::delete_by_id(category_id).exec(db).await?;
    Ok(())
}

pub async fn create_house<C: ConnectionTrait + TransactionTrait>(
    db: &C,
    couple_id: i32,
    nickname: &str,
    address: &str,
) -> AppResult<house::Model> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(AppError::validation("Nickname must not be empty"));
    }

    let existing = House::find()
        .filter(house::Column::CoupleId.eq(couple_id))
        .filter(house::Column::Nickname.eq(nickname))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::validation(
            "A house with this nickname already exists",
        ));
    }

    // The house and its backfilled grades land together or not at all.
    let txn = db.begin().await?;

    let house = house::ActiveModel {
        couple_id: Set(couple_id),
        nickname: Set(nickname.to_string()),
        address: Set(address.trim().to_string()),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    backfill_for_house(&txn, &house).await?;

    txn.commit().await?;

    Ok(house)
}

pub async fn delete_house<C: ConnectionTrait>(
    db: &C,
    couple_id: i32,
    house_id: i32,
) -> AppResult<()> {
    let house = House::find_by_id(house_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    if house.couple_id != couple_id {
        return Err(AppError::Forbidden);
    }
    House::delete_by_id(house_id).exec(db).await?;
    Ok(())
}

/// Upsert a homebuyer's importance weight for one category.
pub async fn set_weight<C: ConnectionTrait>(
    db: &C,
    hb: &homebuyer::Model,
    category_id: i32,
    weight: i16,
) -> AppResult<category_weight::Model> {
    validate_scale(weight, "Weight")?;

    let cat = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    if !same_couple([hb.couple_id, cat.couple_id]) {
        return Err(AppError::mismatch("Category is for a different couple"));
    }

    let existing = CategoryWeight::find()
        .filter(category_weight::Column::HomebuyerId.eq(hb.id))
        .filter(category_weight::Column::CategoryId.eq(category_id))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            let mut row: category_weight::ActiveModel = row.into();
            row.weight = Set(weight);
            row.updated_at = Set(now());
            Ok(row.update(db).await?)
        }
        None => Ok(category_weight::ActiveModel {
            homebuyer_id: Set(hb.id),
            category_id: Set(category_id),
            weight: Set(weight),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?),
    }
}

/// Upsert a homebuyer's score for one house in one category.
pub async fn set_grade<C: ConnectionTrait>(
    db: &C,
    hb: &homebuyer::Model,
    house_id: i32,
    category_id: i32,
    score: i16,
) -> AppResult<grade::Model> {
    validate_scale(score, "Score")?;

    let house = House::find_by_id(house_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    let cat = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)?;
    if !same_couple([hb.couple_id, house.couple_id, cat.couple_id]) {
        return Err(AppError::mismatch(
            "House, category, and homebuyer must all be for the same couple",
        ));
    }

    let existing = Grade::find()
        .filter(grade::Column::HouseId.eq(house_id))
        .filter(grade::Column::CategoryId.eq(category_id))
        .filter(grade::Column::HomebuyerId.eq(hb.id))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            let mut row: grade::ActiveModel = row.into();
            row.score = Set(score);
            row.updated_at = Set(now());
            Ok(row.update(db).await?)
        }
        None => Ok(grade::ActiveModel {
            house_id: Set(house_id),
            category_id: Set(category_id),
            homebuyer_id: Set(hb.id),
            score: Set(score),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?),
    }
}

/// Neutral weight for every homebuyer of the couple owning the category.
async fn backfill_for_category<C: ConnectionTrait>(
    db: &C,
    cat: &category::Model,
) -> AppResult<()> {
    let homebuyers = Homebuyer::find()
        .filter(homebuyer::Column::CoupleId.eq(cat.couple_id))
        .all(db)
        .await?;
    for hb in &homebuyers {
        category_weight::ActiveModel {
            homebuyer_id: Set(hb.id),
            category_id: Set(cat.id),
            weight: Set(DEFAULT_WEIGHT),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Neutral grade for every homebuyer/category pair of the couple owning
/// the house.
async fn backfill_for_house<C: ConnectionTrait>(db: &C, house: &house::Model) -> AppResult<()> {
    let homebuyers = Homebuyer::find()
        .filter(homebuyer::Column::CoupleId.eq(house.couple_id))
        .all(db)
        .await?;
    let categories = Category::find()
        .filter(category::Column::CoupleId.eq(house.couple_id))
        .all(db)
        .await?;
    for hb in &homebuyers {
        for cat in &categories {
            grade::ActiveModel {
                house_id: Set(house.id),
                category_id: Set(cat.id),
                homebuyer_id: Set(hb.id),
                score: Set(DEFAULT_SCORE),
                created_at: Set(now()),
                updated_at: Set(now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

/// A freshly attached homebuyer gets a weight for every existing category
/// and a grade for every existing house/category pair.
pub async fn backfill_for_homebuyer<C: ConnectionTrait>(
    db: &C,
    hb: &homebuyer::Model,
) -> AppResult<()> {
    let categories = Category::find()
        .filter(category::Column::CoupleId.eq(hb.couple_id))
        .all(db)
        .await?;
    let houses = House::find()
        .filter(house::Column::CoupleId.eq(hb.couple_id))
        .all(db)
        .await?;

    for cat in &categories {
        category_weight::ActiveModel {
            homebuyer_id: Set(hb.id),
            category_id: Set(cat.id),
            weight: Set(DEFAULT_WEIGHT),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    for house in &houses {
        for cat in &categories {
            grade::ActiveModel {
                house_id: Set(house.id),
                category_id: Set(cat.id),
                homebuyer_id: Set(hb.id),
                score: Set(DEFAULT_SCORE),
                created_at: Set(now()),
                updated_at: Set(now()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    Ok(())
}

/// Seed the couple's starter categories. Called right after the couple is
/// created, before the first homebuyer is attached, so no weights exist
/// yet to backfill.
pub async fn seed_default_categories<C: ConnectionTrait>(db: &C, couple_id: i32) -> AppResult<()> {
    for (summary, description) in DEFAULT_CATEGORIES {
        category::ActiveModel {
            couple_id: Set(couple_id),
            summary: Set(summary.to_string()),
            description: Set(description.to_string()),
            created_at: Set(now()),
            updated_at: Set(now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

pub async fn categories_for_couple<C: ConnectionTrait>(
    db: &C,
    couple_id: i32,
) -> AppResult<Vec<category::Model>> {
    Ok(Category::find()
        .filter(category::Column::CoupleId.eq(couple_id))
        .order_by_asc(category::Column::Summary)
        .all(db)
        .await?)
}

pub async fn houses_for_couple<C: ConnectionTrait>(
    db: &C,
    couple_id: i32,
) -> AppResult<Vec<house::Model>> {
    Ok(House::find()
        .filter(house::Column::CoupleId.eq(couple_id))
        .order_by_asc(house::Column::Nickname)
        .all(db)
        .await?)
}

/// Categories of the homebuyer's couple paired with their weight, neutral
/// when the backfill has not caught up.
pub async fn categories_with_weights<C: ConnectionTrait>(
    db: &C,
    hb: &homebuyer::Model,
) -> AppResult<Vec<(category::Model, i16)>> {
    let categories = categories_for_couple(db, hb.couple_id).await?;
    let weights = CategoryWeight::find()
        .filter(category_weight::Column::HomebuyerId.eq(hb.id))
        .all(db)
        .await?;

    Ok(categories
        .into_iter()
        .map(|cat| {
            let weight = weights
                .iter()
                .find(|w| w.category_id == cat.id)
                .map(|w| w.weight)
                .unwrap_or(DEFAULT_WEIGHT);
            (cat, weight)
        })
        .collect())
}

/// Categories of the couple paired with this homebuyer's score for one
/// house, neutral where no grade row exists yet.
pub async fn grades_for_house<C: ConnectionTrait>(
    db: &C,
    hb: &homebuyer::Model,
    house_id: i32,
) -> AppResult<Vec<(category::Model, i16)>> {
    let categories = categories_for_couple(db, hb.couple_id).await?;
    let grades = Grade::find()
        .filter(grade::Column::HouseId.eq(house_id))
        .filter(grade::Column::HomebuyerId.eq(hb.id))
        .all(db)
        .await?;

    Ok(categories
        .into_iter()
        .map(|cat| {
            let score = grades
                .iter()
                .find(|g| g.category_id == cat.id)
                .map(|g| g.score)
                .unwrap_or(DEFAULT_SCORE);
            (cat, score)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn homebuyer_row() -> homebuyer::Model {
        let now = now();
        homebuyer::Model {
            id: 1,
            user_id: 7,
            couple_id: 3,
            created_at: now,
            updated_at: now,
        }
    }

    fn category_row() -> category::Model {
        let now = now();
        category::Model {
            id: 10,
            couple_id: 3,
            summary: "Yard".to_string(),
            description: "Fenced, with some shade".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn house_row() -> house::Model {
        let now = now();
        house::Model {
            id: 20,
            couple_id: 3,
            nickname: "Blue Cape".to_string(),
            address: "12 Elm St".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn weight_row() -> category_weight::Model {
        let now = now();
        category_weight::Model {
            id: 100,
            homebuyer_id: 1,
            category_id: 10,
            weight: DEFAULT_WEIGHT,
            created_at: now,
            updated_at: now,
        }
    }

    fn grade_row() -> grade::Model {
        let now = now();
        grade::Model {
            id: 200,
            house_id: 20,
            category_id: 10,
            homebuyer_id: 1,
            score: DEFAULT_SCORE,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn category_creation_commits_with_its_backfill() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // duplicate pre-check
            .append_query_results([Vec::<category::Model>::new()])
            // category insert
            .append_query_results([vec![category_row()]])
            // homebuyers of the couple
            .append_query_results([vec![homebuyer_row()]])
            // weight insert
            .append_query_results([vec![weight_row()]])
            .into_connection();

        let cat = create_category(&db, 3, "Yard", "Fenced, with some shade")
            .await
            .unwrap();
        assert_eq!(cat.id, 10);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("BEGIN"));
        assert!(log.contains(r#"INSERT INTO \"category_weight\""#));
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn house_creation_commits_with_its_backfill() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // duplicate pre-check
            .append_query_results([Vec::<house::Model>::new()])
            // house insert
            .append_query_results([vec![house_row()]])
            // homebuyers, then categories of the couple
            .append_query_results([vec![homebuyer_row()]])
            .append_query_results([vec![category_row()]])
            // grade insert
            .append_query_results([vec![grade_row()]])
            .into_connection();

        let house = create_house(&db, 3, "Blue Cape", "12 Elm St").await.unwrap();
        assert_eq!(house.id, 20);

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("BEGIN"));
        assert!(log.contains(r#"INSERT INTO \"grade\""#));
        assert!(log.contains("COMMIT"));
    }

    #[test]
    fn same_couple_accepts_matching_ids() {
        assert!(same_couple([3, 3, 3]));
        assert!(same_couple([7]));
        assert!(same_couple([]));
    }

    #[test]
    fn same_couple_rejects_mixed_ids() {
        assert!(!same_couple([3, 4]));
        assert!(!same_couple([3, 3, 4]));
    }

    #[test]
    fn scale_bounds_are_enforced() {
        assert!(validate_scale(1, "Weight").is_ok());
        assert!(validate_scale(5, "Weight").is_ok());
        assert!(validate_scale(0, "Weight").is_err());
        assert!(validate_scale(6, "Score").is_err());
    }
}
