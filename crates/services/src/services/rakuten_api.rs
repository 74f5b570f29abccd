//! Rakuten Recipe API client with a deterministic offline fallback.

use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use backon::{ExponentialBuilder, Retryable};
use db::models::saved_recipe::RecipeData;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};
use ts_rs::TS;
use utils::text::mask_secret;

pub const DEFAULT_BASE_URL: &str = "https://app.rakuten.co.jp/services/api/Recipe";
const CATEGORY_LIST_PATH: &str = "CategoryList/20170426";
const CATEGORY_RANKING_PATH: &str = "CategoryRanking/20170426";
/// The ranking endpoint never returns more than this many recipes.
pub const RANKING_SIZE: usize = 4;
const MAX_SEARCH_CATEGORIES: usize = 3;
pub const RECIPE_ID_PREFIX: &str = "rakuten";

#[derive(Debug, Clone, Error)]
pub enum RakutenApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited")]
    RateLimited,
    #[error("invalid application id")]
    InvalidApplicationId,
    #[error("json error: {0}")]
    Serde(String),
    #[error("missing application id: RAKUTEN_APPLICATION_ID is not set")]
    MissingApplicationId,
}

impl RakutenApiError {
    /// Returns true if the error is transient and should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout | Self::RateLimited => true,
            Self::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            Self::InvalidApplicationId => Some(StatusCode::UNAUTHORIZED.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Rakuten,
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum CategoryLevel {
    Large,
    Medium,
    Small,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RakutenCategory {
    /// Id accepted by the ranking endpoint: `30`, `30-275` or `30-275-516`.
    pub id: String,
    pub name: String,
    pub level: CategoryLevel,
    pub parent_id: Option<String>,
    pub url: Option<String>,
}

/// A result list tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RakutenListing<T> {
    pub source: DataSource,
    pub items: Vec<T>,
    /// Why mock data was served, when it was.
    pub warning: Option<String>,
}

impl<T> RakutenListing<T> {
    fn live(items: Vec<T>) -> Self {
        Self {
            source: DataSource::Rakuten,
            items,
            warning: None,
        }
    }

    fn mock(items: Vec<T>, reason: &RakutenApiError) -> Self {
        Self {
            source: DataSource::Mock,
            items,
            warning: Some(reason.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub endpoint: String,
    pub ok: bool,
    pub status: Option<u16>,
    #[ts(type = "number")]
    pub latency_ms: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RakutenDiagnostics {
    pub configured: bool,
    pub masked_application_id: Option<String>,
    pub base_url: String,
    pub probes: Vec<ProbeResult>,
}

// Rakuten mixes string and numeric ids across endpoints.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCategory {
    category_id: RawId,
    category_name: String,
    category_url: Option<String>,
    parent_category_id: Option<RawId>,
}

#[derive(Debug, Deserialize)]
struct CategoryListResult {
    #[serde(default)]
    large: Vec<RawCategory>,
    #[serde(default)]
    medium: Vec<RawCategory>,
    #[serde(default)]
    small: Vec<RawCategory>,
}

#[derive(Debug, Deserialize)]
struct CategoryListResponse {
    result: CategoryListResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankingItem {
    recipe_id: RawId,
    recipe_title: String,
    recipe_url: Option<String>,
    food_image_url: Option<String>,
    medium_image_url: Option<String>,
    recipe_description: Option<String>,
    #[serde(default)]
    recipe_material: Vec<String>,
    recipe_indication: Option<String>,
    nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RankingResponse {
    result: Vec<RankingItem>,
}

impl From<RankingItem> for RecipeData {
    fn from(item: RankingItem) -> Self {
        Self {
            recipe_id: format!("{RECIPE_ID_PREFIX}-{}", item.recipe_id.into_string()),
            title: item.recipe_title,
            description: item.recipe_description,
            image_url: item.food_image_url.or(item.medium_image_url),
            indication: item.recipe_indication,
            materials: item.recipe_material,
            instructions: None,
            recipe_url: item.recipe_url,
            shop_name: item.nickname,
        }
    }
}

/// Flatten the three category levels into ranking ids.
fn flatten_categories(result: CategoryListResult) -> Vec<RakutenCategory> {
    let mut categories = Vec::new();
    let mut medium_parent: HashMap<String, String> = HashMap::new();

    for raw in result.large {
        categories.push(RakutenCategory {
            id: raw.category_id.into_string(),
            name: raw.category_name,
            level: CategoryLevel::Large,
            parent_id: None,
            url: raw.category_url,
        });
    }
    for raw in result.medium {
        let Some(parent) = raw.parent_category_id.map(RawId::into_string) else {
            continue;
        };
        let id = raw.category_id.into_string();
        medium_parent.insert(id.clone(), parent.clone());
        categories.push(RakutenCategory {
            id: format!("{parent}-{id}"),
            name: raw.category_name,
            level: CategoryLevel::Medium,
            parent_id: Some(parent),
            url: raw.category_url,
        });
    }
    for raw in result.small {
        let Some(medium) = raw.parent_category_id.map(RawId::into_string) else {
            continue;
        };
        let Some(large) = medium_parent.get(&medium) else {
            continue;
        };
        let id = raw.category_id.into_string();
        categories.push(RakutenCategory {
            id: format!("{large}-{medium}-{id}"),
            name: raw.category_name,
            level: CategoryLevel::Small,
            parent_id: Some(format!("{large}-{medium}")),
            url: raw.category_url,
        });
    }
    categories
}

/// Categories whose name contains `keyword`, at most three.
pub fn matching_categories<'a>(
    categories: &'a [RakutenCategory],
    keyword: &str,
) -> Vec<&'a RakutenCategory> {
    categories
        .iter()
        .filter(|c| c.name.contains(keyword))
        .take(MAX_SEARCH_CATEGORIES)
        .collect()
}

pub fn recipe_matches(recipe: &RecipeData, keyword: &str) -> bool {
    recipe.title.contains(keyword)
        || recipe.materials.iter().any(|m| m.contains(keyword))
        || recipe
            .description
            .as_deref()
            .is_some_and(|d| d.contains(keyword))
}

fn dedupe_and_truncate(recipes: Vec<RecipeData>, limit: usize) -> Vec<RecipeData> {
    let mut seen = HashSet::new();
    recipes
        .into_iter()
        .filter(|r| seen.insert(r.recipe_id.clone()))
        .take(limit)
        .collect()
}

fn map_reqwest_error(e: reqwest::Error) -> RakutenApiError {
    if e.is_timeout() {
        RakutenApiError::Timeout
    } else {
        RakutenApiError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RakutenClient {
    http: Client,
    application_id: Option<String>,
    base_url: String,
}

impl RakutenClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Without an application id every listing is served from mock data.
    pub fn new(
        application_id: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, RakutenApiError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("mealmatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RakutenApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            application_id: application_id.filter(|id| !id.trim().is_empty()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.application_id.is_some()
    }

    pub async fn categories(&self) -> RakutenListing<RakutenCategory> {
        match self.fetch_categories().await {
            Ok(categories) => RakutenListing::live(categories),
            Err(e) => {
                warn!("Rakuten category list unavailable, serving mock data: {}", e);
                RakutenListing::mock(mock::categories(), &e)
            }
        }
    }

    /// Top recipes of a category, or of all recipes when `category_id` is `None`.
    pub async fn ranking(&self, category_id: Option<&str>) -> RakutenListing<RecipeData> {
        match self.fetch_ranking(category_id).await {
            Ok(recipes) => RakutenListing::live(recipes),
            Err(e) => {
                warn!(
                    category_id = category_id.unwrap_or("all"),
                    "Rakuten ranking unavailable, serving mock data: {}", e
                );
                RakutenListing::mock(mock::ranking(category_id), &e)
            }
        }
    }

    /// Rankings of up to three categories named like `keyword`; with no such
    /// category, the overall ranking filtered by title, materials and description.
    pub async fn search(&self, keyword: &str, limit: usize) -> RakutenListing<RecipeData> {
        match self.try_search(keyword, limit).await {
            Ok(recipes) => RakutenListing::live(recipes),
            Err(e) => {
                warn!(keyword, "Rakuten search unavailable, serving mock data: {}", e);
                RakutenListing::mock(mock::search(keyword, limit), &e)
            }
        }
    }

    async fn try_search(
        &self,
        keyword: &str,
        limit: usize,
    ) -> Result<Vec<RecipeData>, RakutenApiError> {
        let categories = self.fetch_categories().await?;
        let matched = matching_categories(&categories, keyword);

        let recipes = if matched.is_empty() {
            self.fetch_ranking(None)
                .await?
                .into_iter()
                .filter(|r| recipe_matches(r, keyword))
                .collect()
        } else {
            let mut recipes = Vec::new();
            for category in matched {
                debug!(category_id = %category.id, "Searching Rakuten category");
                recipes.extend(self.fetch_ranking(Some(&category.id)).await?);
            }
            recipes
        };

        Ok(dedupe_and_truncate(recipes, limit))
    }

    pub async fn fetch_categories(&self) -> Result<Vec<RakutenCategory>, RakutenApiError> {
        let response: CategoryListResponse = self.get_json(CATEGORY_LIST_PATH, &[]).await?;
        Ok(flatten_categories(response.result))
    }

    pub async fn fetch_ranking(
        &self,
        category_id: Option<&str>,
    ) -> Result<Vec<RecipeData>, RakutenApiError> {
        let params: Vec<(&str, &str)> = category_id
            .map(|id| ("categoryId", id))
            .into_iter()
            .collect();
        let response: RankingResponse = self.get_json(CATEGORY_RANKING_PATH, &params).await?;
        Ok(response
            .result
            .into_iter()
            .take(RANKING_SIZE)
            .map(RecipeData::from)
            .collect())
    }

    /// Configuration plus one unretried call to each endpoint.
    pub async fn diagnostics(&self) -> RakutenDiagnostics {
        let probes = vec![
            self.probe(CATEGORY_LIST_PATH, &[("categoryType", "large")]).await,
            self.probe(CATEGORY_RANKING_PATH, &[]).await,
        ];
        RakutenDiagnostics {
            configured: self.is_configured(),
            masked_application_id: self.application_id.as_deref().map(mask_secret),
            base_url: self.base_url.clone(),
            probes,
        }
    }

    async fn probe(&self, path: &str, params: &[(&str, &str)]) -> ProbeResult {
        let started = Instant::now();
        let outcome = self.send_request(path, params).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(_) => ProbeResult {
                endpoint: path.to_string(),
                ok: true,
                status: Some(StatusCode::OK.as_u16()),
                latency_ms,
                error: None,
            },
            Err(e) => ProbeResult {
                endpoint: path.to_string(),
                ok: false,
                status: e.status(),
                latency_ms,
                error: Some(e.to_string()),
            },
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, RakutenApiError> {
        let body = (|| async { self.send_request(path, params).await })
            .retry(
                &ExponentialBuilder::default()
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(10))
                    .with_max_times(3)
                    .with_jitter(),
            )
            .when(|e: &RakutenApiError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "Rakuten API call failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await?;

        serde_json::from_str(&body).map_err(|e| RakutenApiError::Serde(e.to_string()))
    }

    async fn send_request(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<String, RakutenApiError> {
        let application_id = self
            .application_id
            .as_deref()
            .ok_or(RakutenApiError::MissingApplicationId)?;

        let res = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .query(&[("applicationId", application_id), ("format", "json")])
            .query(params)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res.text().await.map_err(map_reqwest_error),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RakutenApiError::InvalidApplicationId)
            }
            StatusCode::TOO_MANY_REQUESTS => Err(RakutenApiError::RateLimited),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(RakutenApiError::Http { status, body })
            }
        }
    }
}

/// Fixed data served when the API cannot be reached.
pub mod mock {
    use db::models::saved_recipe::RecipeData;

    use super::{
        CategoryLevel, RANKING_SIZE, RakutenCategory, dedupe_and_truncate, matching_categories,
        recipe_matches,
    };

    const CATEGORIES: &[(&str, &str, CategoryLevel)] = &[
        ("30", "人気メニュー", CategoryLevel::Large),
        ("31", "定番の肉料理", CategoryLevel::Large),
        ("32", "定番の魚料理", CategoryLevel::Large),
        ("14", "ご飯もの", CategoryLevel::Large),
        ("31-721", "鶏肉", CategoryLevel::Medium),
        ("31-722", "豚肉", CategoryLevel::Medium),
        ("32-339", "鮭", CategoryLevel::Medium),
        ("14-121", "丼物", CategoryLevel::Medium),
        ("31-721-1500", "鶏もも肉", CategoryLevel::Small),
        ("31-722-1491", "豚こま切れ肉", CategoryLevel::Small),
    ];

    struct MockRecipe {
        id: u32,
        title: &'static str,
        description: &'static str,
        indication: &'static str,
        materials: &'static [&'static str],
        /// Large category the recipe ranks in.
        category: &'static str,
    }

    const RECIPES: &[MockRecipe] = &[
        MockRecipe {
            id: 900001,
            title: "鶏もも肉の照り焼き",
            description: "甘辛いタレがご飯に合う定番おかず",
            indication: "約15分",
            materials: &["鶏もも肉 300g", "醤油 大さじ2", "みりん 大さじ2", "砂糖 小さじ1"],
            category: "31",
        },
        MockRecipe {
            id: 900002,
            title: "豚の生姜焼き",
            description: "しょうがたっぷりで食欲がすすむ",
            indication: "約15分",
            materials: &["豚ロース薄切り 250g", "玉ねぎ 1/2個", "しょうが 1かけ", "醤油 大さじ2"],
            category: "31",
        },
        MockRecipe {
            id: 900003,
            title: "鮭のバター醤油焼き",
            description: "フライパンひとつで簡単",
            indication: "約10分",
            materials: &["鮭 2切れ", "バター 10g", "醤油 小さじ2", "しめじ 1/2株"],
            category: "32",
        },
        MockRecipe {
            id: 900004,
            title: "親子丼",
            description: "ふわとろ卵の定番丼",
            indication: "約20分",
            materials: &["鶏もも肉 200g", "卵 3個", "玉ねぎ 1/2個", "ご飯 2杯", "めんつゆ 大さじ3"],
            category: "14",
        },
        MockRecipe {
            id: 900005,
            title: "肉じゃが",
            description: "ほっとする家庭の味",
            indication: "約30分",
            materials: &["牛こま切れ肉 200g", "じゃがいも 3個", "にんじん 1本", "玉ねぎ 1個"],
            category: "30",
        },
        MockRecipe {
            id: 900006,
            title: "さばの味噌煮",
            description: "こっくり味噌味で骨まで柔らか",
            indication: "約25分",
            materials: &["さば 2切れ", "味噌 大さじ2", "砂糖 大さじ1", "しょうが 1かけ"],
            category: "32",
        },
        MockRecipe {
            id: 900007,
            title: "豚こまと野菜の炒め物",
            description: "冷蔵庫の残り野菜で",
            indication: "約10分",
            materials: &["豚こま切れ肉 200g", "キャベツ 1/4個", "にんじん 1/2本", "塩 少々"],
            category: "31",
        },
        MockRecipe {
            id: 900008,
            title: "カレーライス",
            description: "子どもも喜ぶ定番",
            indication: "約40分",
            materials: &["豚こま切れ肉 250g", "じゃがいも 2個", "にんじん 1本", "カレールー 1/2箱"],
            category: "30",
        },
    ];

    fn to_data(recipe: &MockRecipe) -> RecipeData {
        RecipeData {
            recipe_id: format!("{}-{}", super::RECIPE_ID_PREFIX, recipe.id),
            title: recipe.title.to_string(),
            description: Some(recipe.description.to_string()),
            image_url: None,
            indication: Some(recipe.indication.to_string()),
            materials: recipe.materials.iter().map(|m| m.to_string()).collect(),
            instructions: None,
            recipe_url: None,
            shop_name: Some("MealMatch".to_string()),
        }
    }

    pub fn categories() -> Vec<RakutenCategory> {
        CATEGORIES
            .iter()
            .map(|(id, name, level)| RakutenCategory {
                id: id.to_string(),
                name: name.to_string(),
                level: *level,
                parent_id: id.rsplit_once('-').map(|(parent, _)| parent.to_string()),
                url: None,
            })
            .collect()
    }

    pub fn all_recipes() -> Vec<RecipeData> {
        RECIPES.iter().map(to_data).collect()
    }

    /// Recipes of the category's top-level parent; the first few overall when none match.
    pub fn ranking(category_id: Option<&str>) -> Vec<RecipeData> {
        let large = category_id.map(|id| id.split('-').next().unwrap_or(id));
        let in_category: Vec<RecipeData> = RECIPES
            .iter()
            .filter(|r| large == Some(r.category))
            .map(to_data)
            .take(RANKING_SIZE)
            .collect();
        if in_category.is_empty() {
            RECIPES.iter().take(RANKING_SIZE).map(to_data).collect()
        } else {
            in_category
        }
    }

    pub fn search(keyword: &str, limit: usize) -> Vec<RecipeData> {
        let categories = categories();
        let matched = matching_categories(&categories, keyword);
        let recipes = if matched.is_empty() {
            all_recipes()
                .into_iter()
                .filter(|r| recipe_matches(r, keyword))
                .collect()
        } else {
            matched
                .iter()
                .flat_map(|c| ranking(Some(&c.id)))
                .collect()
        };
        dedupe_and_truncate(recipes, limit)
    }
}
