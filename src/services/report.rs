//! Combined house report for a registered couple.
//!
//! Each buyer's category weights are normalized to sum to 1, so two buyers
//! remain comparable even when one rates everything Important and the
//! other rates everything Unimportant. A house's combined score per
//! category is the average of the two buyers' `grade * relative_weight`
//! contributions; the house total is the sum over categories.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::entities::{category_weight, grade, homebuyer, prelude::*};
use crate::error::{AppError, AppResult};
use crate::services::catalog::{self, DEFAULT_SCORE, DEFAULT_WEIGHT, SCALE_MAX};

/// One buyer's raw inputs, keyed by category and (house, category) ids.
#[derive(Debug, Clone)]
pub struct BuyerInput {
    pub homebuyer_id: i32,
    pub name: String,
    pub weights: HashMap<i32, i16>,
    pub grades: HashMap<(i32, i32), i16>,
}

/// Which report precondition is missing. The report never computes a
/// partial result; callers render the reason instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPrecondition {
    PartnerNotRegistered,
    NoCategories,
    NoHouses,
    NoWeights,
}

impl MissingPrecondition {
    pub fn message(&self) -> &'static str {
        match self {
            Self::PartnerNotRegistered => "Your partner has not registered yet",
            Self::NoCategories => "Add at least one category first",
            Self::NoHouses => "Add at least one house first",
            Self::NoWeights => "Set your category weights first",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category_id: i32,
    pub summary: String,
    pub combined: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseScore {
    pub house_id: i32,
    pub nickname: String,
    pub total: f64,
    pub categories: Vec<CategoryScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub buyer_names: Vec<String>,
    /// Sorted best-first.
    pub houses: Vec<HouseScore>,
    pub chart_min: f64,
    pub chart_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    Ready(ReportData),
    Incomplete { missing: MissingPrecondition },
}

/// Compute the combined report. Pure over its inputs, so calling it twice
/// with unchanged weights and grades yields identical totals.
pub fn compute_report(
    categories: &[(i32, String)],
    houses: &[(i32, String)],
    buyers: &[BuyerInput],
) -> Report {
    if buyers.len() != 2 {
        return Report::Incomplete {
            missing: MissingPrecondition::PartnerNotRegistered,
        };
    }
    if categories.is_empty() {
        return Report::Incomplete {
            missing: MissingPrecondition::NoCategories,
        };
    }
    if houses.is_empty() {
        return Report::Incomplete {
            missing: MissingPrecondition::NoHouses,
        };
    }

    // Normalize each buyer's weight vector to sum to 1. A zero total would
    // divide by zero, so it short-circuits to the incomplete state.
    let mut relative: Vec<HashMap<i32, f64>> = Vec::with_capacity(2);
    for buyer in buyers {
        let total: f64 = categories
            .iter()
            .map(|(cat_id, _)| f64::from(*buyer.weights.get(cat_id).unwrap_or(&DEFAULT_WEIGHT)))
            .sum();
        if total <= 0.0 {
            return Report::Incomplete {
                missing: MissingPrecondition::NoWeights,
            };
        }
        relative.push(
            categories
                .iter()
                .map(|(cat_id, _)| {
                    let weight = f64::from(*buyer.weights.get(cat_id).unwrap_or(&DEFAULT_WEIGHT));
                    (*cat_id, weight / total)
                })
                .collect(),
        );
    }

    let mut scored: Vec<HouseScore> = houses
        .iter()
        .map(|(house_id, nickname)| {
            let categories: Vec<CategoryScore> = categories
                .iter()
                .map(|(cat_id, summary)| {
                    let combined = buyers
                        .iter()
                        .zip(&relative)
                        .map(|(buyer, rel)| {
                            let score = f64::from(
                                *buyer
                                    .grades
                                    .get(&(*house_id, *cat_id))
                                    .unwrap_or(&DEFAULT_SCORE),
                            );
                            score * rel[cat_id]
                        })
                        .sum::<f64>()
                        / 2.0;
                    CategoryScore {
                        category_id: *cat_id,
                        summary: summary.clone(),
                        combined,
                    }
                })
                .collect();
            let total = categories.iter().map(|c| c.combined).sum();
            HouseScore {
                house_id: *house_id,
                nickname: nickname.clone(),
                total,
                categories,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.nickname.cmp(&b.nickname))
    });

    // Pad the axis so the worst bar does not sit on the floor, clamped to
    // the grade scale.
    let min_total = scored.iter().map(|h| h.total).fold(f64::INFINITY, f64::min);
    let max_total = scored
        .iter()
        .map(|h| h.total)
        .fold(f64::NEG_INFINITY, f64::max);
    let chart_min = (min_total - 1.0).max(0.0);
    let chart_max = (max_total + 0.5).min(f64::from(SCALE_MAX));

    Report::Ready(ReportData {
        buyer_names: buyers.iter().map(|b| b.name.clone()).collect(),
        houses: scored,
        chart_min,
        chart_max,
    })
}

/// Load everything the report needs for one couple and compute it.
pub async fn report_for_couple<C: ConnectionTrait>(db: &C, couple_id: i32) -> AppResult<Report> {
    let homebuyers = Homebuyer::find()
        .filter(homebuyer::Column::CoupleId.eq(couple_id))
        .find_also_related(User)
        .all(db)
        .await?;
    if homebuyers.len() > 2 {
        return Err(AppError::integrity(format!(
            "couple {couple_id} has more than 2 homebuyers"
        )));
    }

    let categories: Vec<(i32, String)> = catalog::categories_for_couple(db, couple_id)
        .await?
        .into_iter()
        .map(|c| (c.id, c.summary))
        .collect();
    let houses: Vec<(i32, String)> = catalog::houses_for_couple(db, couple_id)
        .await?
        .into_iter()
        .map(|h| (h.id, h.nickname))
        .collect();

    let mut buyers = Vec::with_capacity(homebuyers.len());
    for (hb, user) in homebuyers {
        let weights = CategoryWeight::find()
            .filter(category_weight::Column::HomebuyerId.eq(hb.id))
            .all(db)
            .await?
            .into_iter()
            .map(|w| (w.category_id, w.weight))
            .collect();
        let grades = Grade::find()
            .filter(grade::Column::HomebuyerId.eq(hb.id))
            .all(db)
            .await?
            .into_iter()
            .map(|g| ((g.house_id, g.category_id), g.score))
            .collect();
        buyers.push(BuyerInput {
            homebuyer_id: hb.id,
            name: user.map(|u| u.full_name()).unwrap_or_default(),
            weights,
            grades,
        });
    }

    Ok(compute_report(&categories, &houses, &buyers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buyer(id: i32, weights: &[(i32, i16)], grades: &[((i32, i32), i16)]) -> BuyerInput {
        BuyerInput {
            homebuyer_id: id,
            name: format!("Buyer {id}"),
            weights: weights.iter().copied().collect(),
            grades: grades.iter().copied().collect(),
        }
    }

    fn cats() -> Vec<(i32, String)> {
        vec![(1, "Kitchen".to_string()), (2, "Yard".to_string())]
    }

    fn houses() -> Vec<(i32, String)> {
        vec![(10, "123 Main St".to_string()), (11, "Oak Ave".to_string())]
    }

    #[test]
    fn one_homebuyer_is_incomplete() {
        let buyers = vec![buyer(1, &[(1, 3)], &[])];
        let report = compute_report(&cats(), &houses(), &buyers);
        assert_eq!(
            report,
            Report::Incomplete {
                missing: MissingPrecondition::PartnerNotRegistered
            }
        );
    }

    #[test]
    fn no_categories_is_incomplete() {
        let buyers = vec![buyer(1, &[], &[]), buyer(2, &[], &[])];
        let report = compute_report(&[], &houses(), &buyers);
        assert_eq!(
            report,
            Report::Incomplete {
                missing: MissingPrecondition::NoCategories
            }
        );
    }

    #[test]
    fn no_houses_is_incomplete() {
        let buyers = vec![buyer(1, &[(1, 3)], &[]), buyer(2, &[(1, 3)], &[])];
        let report = compute_report(&cats(), &[], &buyers);
        assert_eq!(
            report,
            Report::Incomplete {
                missing: MissingPrecondition::NoHouses
            }
        );
    }

    #[test]
    fn zero_weight_total_short_circuits() {
        // Weights below the scale floor cannot normally happen; the guard
        // must still refuse to divide by zero.
        let buyers = vec![
            buyer(1, &[(1, 0), (2, 0)], &[]),
            buyer(2, &[(1, 3), (2, 3)], &[]),
        ];
        let report = compute_report(&cats(), &houses(), &buyers);
        assert_eq!(
            report,
            Report::Incomplete {
                missing: MissingPrecondition::NoWeights
            }
        );
    }

    #[test]
    fn relative_weights_sum_to_one() {
        let buyers = vec![
            buyer(1, &[(1, 5), (2, 1)], &[((10, 1), 5), ((10, 2), 1)]),
            buyer(2, &[(1, 1), (2, 5)], &[((10, 1), 1), ((10, 2), 5)]),
        ];
        let single_house = vec![(10, "A".to_string())];
        let Report::Ready(data) = compute_report(&cats(), &single_house, &buyers) else {
            panic!("expected a ready report");
        };
        // With every grade equal, the total equals the grade because the
        // relative weights sum to 1.
        let all_threes = vec![
            buyer(1, &[(1, 5), (2, 1)], &[((10, 1), 3), ((10, 2), 3)]),
            buyer(2, &[(1, 2), (2, 2)], &[((10, 1), 3), ((10, 2), 3)]),
        ];
        let Report::Ready(flat) = compute_report(&cats(), &single_house, &all_threes) else {
            panic!("expected a ready report");
        };
        assert!((flat.houses[0].total - 3.0).abs() < 1e-9);
        // And the mixed case stays within the grade scale.
        assert!(data.houses[0].total > 0.0 && data.houses[0].total <= 5.0);
    }

    #[test]
    fn mirrored_preferences_are_buyer_order_invariant() {
        // H1 loves the kitchen, H2 loves the yard; house A matches each
        // buyer's own priorities, house B is the mirror image. Relabeling
        // which homebuyer is which must not change any total.
        let b1 = buyer(
            1,
            &[(1, 5), (2, 1)],
            &[((10, 1), 5), ((10, 2), 1), ((11, 1), 1), ((11, 2), 5)],
        );
        let b2 = buyer(
            2,
            &[(1, 1), (2, 5)],
            &[((10, 1), 1), ((10, 2), 5), ((11, 1), 5), ((11, 2), 1)],
        );

        let Report::Ready(data) = compute_report(&cats(), &houses(), &[b1.clone(), b2.clone()])
        else {
            panic!("expected a ready report");
        };
        let Report::Ready(swapped) = compute_report(&cats(), &houses(), &[b2, b1]) else {
            panic!("expected a ready report");
        };
        for (a, b) in data.houses.iter().zip(&swapped.houses) {
            assert_eq!(a.house_id, b.house_id);
            assert!((a.total - b.total).abs() < 1e-9);
        }

        // Both buyers weight 5:1, so relative weights are 5/6 and 1/6.
        // House A aligns with each buyer's own priorities: each
        // contribution is 5*(5/6) + 1*(1/6) = 26/6. House B anti-aligns:
        // 1*(5/6) + 5*(1/6) = 10/6.
        let house_a = data.houses.iter().find(|h| h.house_id == 10).unwrap();
        let house_b = data.houses.iter().find(|h| h.house_id == 11).unwrap();
        assert!((house_a.total - 26.0 / 6.0).abs() < 1e-9);
        assert!((house_b.total - 10.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn computation_is_idempotent() {
        let buyers = vec![
            buyer(
                1,
                &[(1, 4), (2, 2)],
                &[((10, 1), 5), ((10, 2), 2), ((11, 1), 3), ((11, 2), 4)],
            ),
            buyer(
                2,
                &[(1, 1), (2, 5)],
                &[((10, 1), 2), ((10, 2), 4), ((11, 1), 5), ((11, 2), 1)],
            ),
        ];
        let first = compute_report(&cats(), &houses(), &buyers);
        let second = compute_report(&cats(), &houses(), &buyers);
        assert_eq!(first, second);
    }

    #[test]
    fn houses_are_sorted_best_first() {
        let buyers = vec![
            buyer(
                1,
                &[(1, 3), (2, 3)],
                &[((10, 1), 1), ((10, 2), 1), ((11, 1), 5), ((11, 2), 5)],
            ),
            buyer(
                2,
                &[(1, 3), (2, 3)],
                &[((10, 1), 1), ((10, 2), 1), ((11, 1), 5), ((11, 2), 5)],
            ),
        ];
        let Report::Ready(data) = compute_report(&cats(), &houses(), &buyers) else {
            panic!("expected a ready report");
        };
        assert_eq!(data.houses[0].house_id, 11);
        assert!((data.houses[0].total - 5.0).abs() < 1e-9);
        assert!((data.houses[1].total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn chart_range_is_clamped_to_grade_scale() {
        let buyers = vec![
            buyer(
                1,
                &[(1, 3), (2, 3)],
                &[((10, 1), 1), ((10, 2), 1), ((11, 1), 5), ((11, 2), 5)],
            ),
            buyer(
                2,
                &[(1, 3), (2, 3)],
                &[((10, 1), 1), ((10, 2), 1), ((11, 1), 5), ((11, 2), 5)],
            ),
        ];
        let Report::Ready(data) = compute_report(&cats(), &houses(), &buyers) else {
            panic!("expected a ready report");
        };
        // min total 1.0 -> 0.0 after the 1-unit pad; max total 5.0 stays
        // clamped at the top of the scale.
        assert!((data.chart_min - 0.0).abs() < 1e-9);
        assert!((data.chart_max - 5.0).abs() < 1e-9);
    }
}
