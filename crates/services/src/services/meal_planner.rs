//! Weekly dinner planning: slot assignment and drag-and-drop moves.
//!
//! Days are numbered 1 (Monday) through 5 (Friday). A liked recipe lands in the
//! first free weekday; when the week is full it falls back to Monday and
//! replaces whatever was planned there.

use chrono::{Datelike, Duration, Local, NaiveDate};
use db::models::{
    meal_plan::{DINNER, MealPlan, MealPlanEntry, MealPlanRecipe},
    saved_recipe::SavedRecipe,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

pub const FIRST_DAY: i64 = 1;
pub const LAST_DAY: i64 = 5;
// Temporary day used while two entries trade places under the slot UNIQUE constraint.
const PARKING_DAY: i64 = 0;

#[derive(Debug, Error)]
pub enum MealPlanError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("day must be between {first} and {last}, got {0}", first = FIRST_DAY, last = LAST_DAY)]
    InvalidDay(i64),
    #[error("meal plan entry not found")]
    EntryNotFound,
    #[error("saved recipe not found")]
    RecipeNotFound,
    #[error("only liked recipes can be planned")]
    RecipeNotLiked,
}

/// First weekday slot not in `occupied`; Monday when every slot is taken.
pub fn find_next_available_day(occupied: &[i64]) -> i64 {
    (FIRST_DAY..=LAST_DAY)
        .find(|day| !occupied.contains(day))
        .unwrap_or(FIRST_DAY)
}

pub fn is_valid_day(day: i64) -> bool {
    (FIRST_DAY..=LAST_DAY).contains(&day)
}

/// Monday of the week containing `date`.
pub fn week_start_for(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn current_week_start() -> NaiveDate {
    week_start_for(Local::now().date_naive())
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanView {
    pub plan: MealPlan,
    pub entries: Vec<MealPlanEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub entry: MealPlanRecipe,
    /// Saved recipe that used to occupy the slot, when the fallback replaced one.
    pub replaced_recipe_id: Option<Uuid>,
    pub already_planned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MoveResult {
    pub entry_id: Uuid,
    pub from_day: i64,
    pub to_day: i64,
    /// Entry that was sitting on `to_day` and now sits on `from_day`.
    pub swapped_entry_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct MealPlanner {
    pool: SqlitePool,
}

impl MealPlanner {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn plan_for_week(
        &self,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<MealPlanView, MealPlanError> {
        let plan = MealPlan::get_or_create(&self.pool, user_id, week_start).await?;
        let entries = MealPlanRecipe::find_entries(&self.pool, plan.id).await?;
        Ok(MealPlanView { plan, entries })
    }

    /// Put a freshly liked recipe into the week's first open dinner slot.
    pub async fn auto_assign(
        &self,
        user_id: Uuid,
        recipe: &SavedRecipe,
        week_start: NaiveDate,
    ) -> Result<Assignment, MealPlanError> {
        let plan = MealPlan::get_or_create(&self.pool, user_id, week_start).await?;

        if let Some(existing) =
            MealPlanRecipe::find_by_saved_recipe(&self.pool, plan.id, recipe.id).await?
        {
            debug!(recipe_id = %recipe.id, day = existing.day_of_week, "Recipe already planned");
            return Ok(Assignment {
                entry: existing,
                replaced_recipe_id: None,
                already_planned: true,
            });
        }

        let occupied = MealPlanRecipe::occupied_days(&self.pool, plan.id, DINNER).await?;
        let day = find_next_available_day(&occupied);
        self.write_slot(&plan, recipe.id, day).await
    }

    /// Explicitly plan one of the user's liked recipes, on `day` or the next open slot.
    pub async fn assign(
        &self,
        user_id: Uuid,
        saved_recipe_id: Uuid,
        day: Option<i64>,
        week_start: NaiveDate,
    ) -> Result<Assignment, MealPlanError> {
        if let Some(day) = day.filter(|d| !is_valid_day(*d)) {
            return Err(MealPlanError::InvalidDay(day));
        }
        let recipe = SavedRecipe::find_for_user(&self.pool, saved_recipe_id, user_id)
            .await?
            .ok_or(MealPlanError::RecipeNotFound)?;
        if !recipe.liked {
            return Err(MealPlanError::RecipeNotLiked);
        }

        let Some(day) = day else {
            return self.auto_assign(user_id, &recipe, week_start).await;
        };

        let plan = MealPlan::get_or_create(&self.pool, user_id, week_start).await?;

        // A recipe holds at most one slot per week: an already planned one is moved.
        if let Some(existing) =
            MealPlanRecipe::find_by_saved_recipe(&self.pool, plan.id, recipe.id).await?
        {
            self.move_entry(user_id, existing.id, day).await?;
            let entry = MealPlanRecipe::find_for_user(&self.pool, existing.id, user_id)
                .await?
                .ok_or(MealPlanError::EntryNotFound)?;
            return Ok(Assignment {
                entry,
                replaced_recipe_id: None,
                already_planned: true,
            });
        }

        self.write_slot(&plan, recipe.id, day).await
    }

    /// Move an entry to `target_day`. An entry already on that day trades places with it.
    pub async fn move_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        target_day: i64,
    ) -> Result<MoveResult, MealPlanError> {
        if !is_valid_day(target_day) {
            return Err(MealPlanError::InvalidDay(target_day));
        }

        let mut tx = self.pool.begin().await?;

        let entry = MealPlanRecipe::find_for_user(&mut *tx, entry_id, user_id)
            .await?
            .ok_or(MealPlanError::EntryNotFound)?;
        let from_day = entry.day_of_week;

        if from_day == target_day {
            tx.commit().await?;
            return Ok(MoveResult {
                entry_id,
                from_day,
                to_day: target_day,
                swapped_entry_id: None,
            });
        }

        let occupant =
            MealPlanRecipe::find_at_slot(&mut *tx, entry.meal_plan_id, target_day, &entry.meal_type)
                .await?;

        if let Some(occupant) = &occupant {
            MealPlanRecipe::set_day(&mut *tx, occupant.id, PARKING_DAY).await?;
        }
        MealPlanRecipe::set_day(&mut *tx, entry.id, target_day).await?;
        if let Some(occupant) = &occupant {
            MealPlanRecipe::set_day(&mut *tx, occupant.id, from_day).await?;
        }
        MealPlan::touch(&mut *tx, entry.meal_plan_id).await?;

        tx.commit().await?;

        info!(
            entry_id = %entry_id,
            from_day,
            to_day = target_day,
            swapped = occupant.is_some(),
            "Moved meal plan entry"
        );

        Ok(MoveResult {
            entry_id,
            from_day,
            to_day: target_day,
            swapped_entry_id: occupant.map(|o| o.id),
        })
    }

    pub async fn remove_entry(&self, user_id: Uuid, entry_id: Uuid) -> Result<(), MealPlanError> {
        let removed = MealPlanRecipe::delete_for_user(&self.pool, entry_id, user_id).await?;
        if removed == 0 {
            return Err(MealPlanError::EntryNotFound);
        }
        Ok(())
    }

    /// Drop a recipe from the week's plan, e.g. after it was dismissed.
    pub async fn unplan_recipe(
        &self,
        user_id: Uuid,
        saved_recipe_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<u64, MealPlanError> {
        let Some(plan) = MealPlan::find_by_user_and_week(&self.pool, user_id, week_start).await?
        else {
            return Ok(0);
        };
        Ok(MealPlanRecipe::delete_by_saved_recipe(&self.pool, plan.id, saved_recipe_id).await?)
    }

    async fn write_slot(
        &self,
        plan: &MealPlan,
        saved_recipe_id: Uuid,
        day: i64,
    ) -> Result<Assignment, MealPlanError> {
        let replaced_recipe_id =
            MealPlanRecipe::find_at_slot(&self.pool, plan.id, day, DINNER)
                .await?
                .map(|occupant| occupant.saved_recipe_id)
                .filter(|id| *id != saved_recipe_id);

        let entry =
            MealPlanRecipe::upsert_slot(&self.pool, plan.id, saved_recipe_id, day, DINNER).await?;
        MealPlan::touch(&self.pool, plan.id).await?;

        info!(
            meal_plan_id = %plan.id,
            saved_recipe_id = %saved_recipe_id,
            day,
            replaced = replaced_recipe_id.is_some(),
            "Assigned recipe to meal plan"
        );

        Ok(Assignment {
            entry,
            replaced_recipe_id,
            already_planned: false,
        })
    }
}
