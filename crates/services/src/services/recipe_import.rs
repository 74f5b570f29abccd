//! Admin catalog input: validation plus bulk JSON and CSV import.

use std::collections::HashSet;

use db::{
    is_unique_violation,
    models::saved_recipe::{RecipeData, SavedRecipe},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info};
use ts_rs::TS;
use utils::text::non_blank;
use uuid::Uuid;

pub const IMPORT_ID_PREFIX: &str = "import";
pub const ADMIN_ID_PREFIX: &str = "admin";

#[derive(Debug, Error)]
pub enum RecipeImportError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV header must include a title column")]
    MissingTitleColumn,
}

/// A recipe as submitted by an admin, before validation. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInput {
    #[serde(default, alias = "recipe_id")]
    pub recipe_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub indication: Option<String>,
    /// Accepts a list or a single newline separated string.
    #[serde(default, deserialize_with = "materials_from_list_or_text")]
    pub materials: Vec<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default, alias = "image_url")]
    pub image_url: Option<String>,
    #[serde(default, alias = "recipe_url")]
    pub recipe_url: Option<String>,
    #[serde(default, alias = "shop_name")]
    pub shop_name: Option<String>,
}

fn materials_from_list_or_text<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Materials {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<Materials>::deserialize(deserializer)? {
        Some(Materials::List(list)) => list,
        Some(Materials::Text(text)) => split_material_cell(&text),
        None => Vec::new(),
    })
}

impl From<RecipeData> for RecipeInput {
    fn from(data: RecipeData) -> Self {
        Self {
            recipe_id: Some(data.recipe_id),
            title: Some(data.title),
            description: data.description,
            indication: data.indication,
            materials: data.materials,
            instructions: data.instructions,
            image_url: data.image_url,
            recipe_url: data.recipe_url,
            shop_name: data.shop_name,
        }
    }
}

fn owned_non_blank(value: Option<String>) -> Option<String> {
    non_blank(value.as_deref()).map(|s| s.trim().to_string())
}

impl RecipeInput {
    /// Validated recipe data. A missing `recipeId` becomes `<prefix>-<uuid>`.
    pub fn into_data(self, id_prefix: &str) -> Result<RecipeData, RecipeImportError> {
        validate_recipe(&self)?;
        let recipe_id = owned_non_blank(self.recipe_id)
            .unwrap_or_else(|| format!("{id_prefix}-{}", Uuid::new_v4()));
        let materials = self
            .materials
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        Ok(RecipeData {
            recipe_id,
            title: self.title.unwrap_or_default().trim().to_string(),
            description: owned_non_blank(self.description),
            image_url: owned_non_blank(self.image_url),
            indication: owned_non_blank(self.indication),
            materials,
            instructions: owned_non_blank(self.instructions),
            recipe_url: owned_non_blank(self.recipe_url),
            shop_name: owned_non_blank(self.shop_name),
        })
    }
}

/// Title, description, indication and at least one material are required.
pub fn validate_recipe(input: &RecipeInput) -> Result<(), RecipeImportError> {
    if non_blank(input.title.as_deref()).is_none() {
        return Err(RecipeImportError::MissingField("title"));
    }
    if non_blank(input.description.as_deref()).is_none() {
        return Err(RecipeImportError::MissingField("description"));
    }
    if non_blank(input.indication.as_deref()).is_none() {
        return Err(RecipeImportError::MissingField("indication"));
    }
    if !input.materials.iter().any(|m| !m.trim().is_empty()) {
        return Err(RecipeImportError::MissingField("materials"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total: usize,
    pub imported: usize,
    pub skipped: usize,
    /// One line per skipped or failed entry, e.g. `#2: title is required`.
    pub errors: Vec<String>,
    /// Set when a database failure stopped the import early.
    pub aborted: bool,
}

/// Insert `inputs` into the catalog as recipes owned by `admin_id`.
///
/// Invalid entries and ids already in the catalog (or repeated within the
/// batch) are skipped. Each insert stands alone; a database error stops the
/// loop and the summary reports what was written before it.
pub async fn import_recipes(
    pool: &SqlitePool,
    admin_id: Uuid,
    inputs: Vec<RecipeInput>,
    id_prefix: &str,
) -> ImportSummary {
    let mut summary = ImportSummary {
        total: inputs.len(),
        ..Default::default()
    };
    let mut seen = HashSet::new();

    for (i, input) in inputs.into_iter().enumerate() {
        let position = i + 1;
        let data = match input.into_data(id_prefix) {
            Ok(data) => data,
            Err(e) => {
                summary.skipped += 1;
                summary.errors.push(format!("#{position}: {e}"));
                continue;
            }
        };

        if !seen.insert(data.recipe_id.clone()) {
            summary.skipped += 1;
            summary
                .errors
                .push(format!("#{position}: duplicate recipeId {} in batch", data.recipe_id));
            continue;
        }

        let exists = match SavedRecipe::catalog_contains(pool, &data.recipe_id).await {
            Ok(exists) => exists,
            Err(e) => {
                abort(&mut summary, position, &e);
                break;
            }
        };
        if exists {
            debug!(recipe_id = %data.recipe_id, "Skipping recipe already in catalog");
            summary.skipped += 1;
            summary
                .errors
                .push(format!("#{position}: recipeId {} already exists", data.recipe_id));
            continue;
        }

        match SavedRecipe::create(pool, admin_id, &data, true).await {
            Ok(_) => summary.imported += 1,
            Err(e) if is_unique_violation(&e) => {
                summary.skipped += 1;
                summary
                    .errors
                    .push(format!("#{position}: recipeId {} already exists", data.recipe_id));
            }
            Err(e) => {
                abort(&mut summary, position, &e);
                break;
            }
        }
    }

    info!(
        total = summary.total,
        imported = summary.imported,
        skipped = summary.skipped,
        aborted = summary.aborted,
        "Recipe import finished"
    );
    summary
}

fn abort(summary: &mut ImportSummary, position: usize, e: &sqlx::Error) {
    error!("Recipe import stopped at entry {}: {}", position, e);
    summary.aborted = true;
    summary.errors.push(format!("#{position}: database error: {e}"));
}

/// Accepts `{"recipes": [...]}` or a bare array. Entries that are not objects
/// become empty inputs so they are counted as skipped.
pub fn parse_json_payload(payload: Value) -> Result<Vec<RecipeInput>, RecipeImportError> {
    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("recipes") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(RecipeImportError::InvalidJson(
                    "expected a \"recipes\" array".to_string(),
                ));
            }
        },
        _ => {
            return Err(RecipeImportError::InvalidJson(
                "expected an object or an array".to_string(),
            ));
        }
    };

    Ok(entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry).unwrap_or_else(|e| {
                debug!("Unreadable recipe entry: {}", e);
                RecipeInput::default()
            })
        })
        .collect())
}

/// Materials in a single CSV cell, separated by `|`, newlines or `、`.
pub fn split_material_cell(cell: &str) -> Vec<String> {
    cell.split(['|', '\n', '\r', '、'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Default)]
struct CsvColumns {
    recipe_id: Option<usize>,
    title: Option<usize>,
    description: Option<usize>,
    indication: Option<usize>,
    materials: Option<usize>,
    instructions: Option<usize>,
    image_url: Option<usize>,
    recipe_url: Option<usize>,
    shop_name: Option<usize>,
}

impl CsvColumns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut columns = Self::default();
        for (i, header) in headers.iter().enumerate() {
            let key: String = header
                .trim_start_matches('\u{feff}')
                .trim()
                .chars()
                .filter(|c| *c != '_')
                .flat_map(char::to_lowercase)
                .collect();
            let slot = match key.as_str() {
                "recipeid" => &mut columns.recipe_id,
                "title" => &mut columns.title,
                "description" => &mut columns.description,
                "indication" => &mut columns.indication,
                "materials" => &mut columns.materials,
                "instructions" => &mut columns.instructions,
                "imageurl" => &mut columns.image_url,
                "recipeurl" => &mut columns.recipe_url,
                "shopname" => &mut columns.shop_name,
                _ => continue,
            };
            slot.get_or_insert(i);
        }
        columns
    }
}

/// Parse a CSV document with a header row into recipe inputs.
///
/// Headers may be camelCase (`imageUrl`) or snake_case (`image_url`).
pub fn parse_csv(text: &str) -> Result<Vec<RecipeInput>, RecipeImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns = CsvColumns::from_headers(reader.headers()?);
    if columns.title.is_none() {
        return Err(RecipeImportError::MissingTitleColumn);
    }

    let mut inputs = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let cell = |column: Option<usize>| {
            column
                .and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        inputs.push(RecipeInput {
            recipe_id: cell(columns.recipe_id),
            title: cell(columns.title),
            description: cell(columns.description),
            indication: cell(columns.indication),
            materials: cell(columns.materials)
                .map(|m| split_material_cell(&m))
                .unwrap_or_default(),
            instructions: cell(columns.instructions),
            image_url: cell(columns.image_url),
            recipe_url: cell(columns.recipe_url),
            shop_name: cell(columns.shop_name),
        });
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::user::{CreateUser, User, UserRole},
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn valid(title: &str) -> RecipeInput {
        RecipeInput {
            title: Some(title.to_string()),
            description: Some("おいしい".to_string()),
            indication: Some("約15分".to_string()),
            materials: vec!["豚こま肉 200g".to_string()],
            ..Default::default()
        }
    }

    async fn admin(db: &DBService) -> User {
        User::create(
            &db.pool,
            &CreateUser {
                email: "admin@example.com".to_string(),
                name: None,
                role: UserRole::Admin,
            },
            "hash",
        )
        .await
        .unwrap()
    }

    #[test]
    fn validation_names_the_missing_field() {
        let mut input = valid("生姜焼き");
        assert!(validate_recipe(&input).is_ok());

        input.indication = Some("  ".to_string());
        let err = validate_recipe(&input).unwrap_err();
        assert_eq!(err.to_string(), "indication is required");

        let mut input = valid("生姜焼き");
        input.materials = vec![" ".to_string()];
        assert!(matches!(
            validate_recipe(&input),
            Err(RecipeImportError::MissingField("materials"))
        ));
    }

    #[test]
    fn into_data_assigns_synthetic_id() {
        let data = valid("生姜焼き").into_data(IMPORT_ID_PREFIX).unwrap();
        assert!(data.recipe_id.starts_with("import-"));

        let mut input = valid("生姜焼き");
        input.recipe_id = Some("given-1".to_string());
        assert_eq!(input.into_data(IMPORT_ID_PREFIX).unwrap().recipe_id, "given-1");
    }

    #[test]
    fn json_payload_shapes() {
        let wrapped = parse_json_payload(json!({ "recipes": [{ "title": "a" }, 42] })).unwrap();
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[0].title.as_deref(), Some("a"));
        assert_eq!(wrapped[1], RecipeInput::default());

        let bare = parse_json_payload(json!([{ "title": "b", "materials": "卵 2\n塩 少々" }])).unwrap();
        assert_eq!(bare[0].materials, vec!["卵 2", "塩 少々"]);

        assert!(parse_json_payload(json!({ "items": [] })).is_err());
        assert!(parse_json_payload(json!("nope")).is_err());
    }

    #[test]
    fn csv_with_snake_case_headers() {
        let csv = "title,description,indication,materials,image_url,shop_name\n\
                   肉じゃが,定番,約30分,\"じゃがいも 3個|牛こま肉 200g、玉ねぎ 1個\",https://img/1.jpg,母\n\
                   ,,,,,\n";
        let inputs = parse_csv(csv).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(
            inputs[0].materials,
            vec!["じゃがいも 3個", "牛こま肉 200g", "玉ねぎ 1個"]
        );
        assert_eq!(inputs[0].image_url.as_deref(), Some("https://img/1.jpg"));
        assert_eq!(inputs[0].shop_name.as_deref(), Some("母"));
        assert_eq!(inputs[0].instructions, None);
    }

    #[test]
    fn csv_requires_title_column() {
        assert!(matches!(
            parse_csv("name,description\nx,y\n"),
            Err(RecipeImportError::MissingTitleColumn)
        ));
    }

    #[tokio::test]
    async fn import_skips_invalid_and_duplicate_entries() {
        let db = DBService::new_in_memory().await.unwrap();
        let admin = admin(&db).await;

        let mut no_title = valid("x");
        no_title.title = None;
        let mut fixed = valid("固定ID");
        fixed.recipe_id = Some("fixed-1".to_string());

        let summary = import_recipes(
            &db.pool,
            admin.id,
            vec![valid("カレー"), no_title, fixed.clone(), fixed],
            IMPORT_ID_PREFIX,
        )
        .await;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 2);
        assert!(!summary.aborted);
        assert_eq!(SavedRecipe::count_catalog(&db.pool).await.unwrap(), 2);

        let mut again = valid("固定ID");
        again.recipe_id = Some("fixed-1".to_string());
        let summary = import_recipes(&db.pool, admin.id, vec![again], IMPORT_ID_PREFIX).await;
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, vec!["#1: recipeId fixed-1 already exists"]);
    }

    #[tokio::test]
    async fn import_stops_on_database_error() {
        let db = DBService::new_in_memory().await.unwrap();
        let admin = admin(&db).await;
        let imported = import_recipes(&db.pool, admin.id, vec![valid("a")], IMPORT_ID_PREFIX).await;
        assert_eq!(imported.imported, 1);

        db.pool.close().await;
        let summary =
            import_recipes(&db.pool, admin.id, vec![valid("b"), valid("c")], IMPORT_ID_PREFIX).await;
        assert!(summary.aborted);
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.errors.len(), 1);
    }
}
