use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use db::DBService;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use server::{AppState, config::Config, router};
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@test.local";
const ADMIN_PASSWORD: &str = "admin-pass";

struct TestApp {
    router: Router,
}

struct TestResponse {
    status: StatusCode,
    cookie: Option<String>,
    body: Value,
}

impl TestApp {
    async fn new() -> Self {
        let db = DBService::new_in_memory().await.unwrap();
        let state = AppState::new(db, Config::default()).unwrap();
        state
            .auth
            .ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD, "Admin")
            .await
            .unwrap();
        Self {
            router: router(state),
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            cookie,
            body,
        }
    }

    async fn register(&self, email: &str) -> String {
        let res = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": "password1", "name": "Test" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        res.cookie.unwrap()
    }

    async fn login_admin(&self) -> String {
        let res = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        res.cookie.unwrap()
    }

    async fn add_catalog_recipe(&self, admin: &str, title: &str, materials: &[&str]) -> Value {
        let res = self
            .request(
                Method::POST,
                "/api/admin/recipes",
                Some(admin),
                Some(json!({
                    "title": title,
                    "description": "テスト用",
                    "indication": "約20分",
                    "materials": materials,
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        res.body["data"].clone()
    }

    async fn swipe(&self, user: &str, recipe: &Value, liked: bool) -> TestResponse {
        let mut body = recipe.clone();
        body["liked"] = json!(liked);
        self.request(Method::POST, "/api/saved-recipes", Some(user), Some(body))
            .await
    }
}

#[tokio::test]
async fn health_reports_database_state() {
    let app = TestApp::new().await;
    let res = app.request(Method::GET, "/api/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], json!(true));
    assert_eq!(res.body["data"]["status"], json!("ok"));
    assert_eq!(res.body["data"]["database"]["missingTables"], json!([]));
}

#[tokio::test]
async fn session_lifecycle() {
    let app = TestApp::new().await;

    let anonymous = app.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["success"], json!(false));

    let cookie = app.register("hana@example.com").await;
    assert!(cookie.starts_with("mealmatch_session="));

    let me = app.request(Method::GET, "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], json!("hana@example.com"));
    assert_eq!(me.body["data"]["role"], json!("user"));
    assert!(me.body["data"].get("passwordHash").is_none());

    let duplicate = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "HANA@example.com", "password": "password1" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let wrong = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "hana@example.com", "password": "nope-nope" })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let logout = app
        .request(Method::POST, "/api/auth/logout", Some(&cookie), None)
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    let after = app.request(Method::GET, "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let app = TestApp::new().await;
    let user = app.register("user@example.com").await;

    let anonymous = app.request(Method::GET, "/api/admin/stats", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = app
        .request(Method::GET, "/api/admin/stats", Some(&user), None)
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let admin = app.login_admin().await;
    let stats = app
        .request(Method::GET, "/api/admin/stats", Some(&admin), None)
        .await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(stats.body["data"]["users"], json!(2));
}

#[tokio::test]
async fn liking_plans_the_recipe_and_feeds_the_shopping_list() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let user = app.register("cook@example.com").await;

    let curry = app
        .add_catalog_recipe(&admin, "チキンカレー", &["鶏もも肉 300g", "玉ねぎ 1個"])
        .await;
    let teriyaki = app
        .add_catalog_recipe(&admin, "照り焼き", &["鶏もも肉 200g", "醤油 大さじ2"])
        .await;
    let salad = app.add_catalog_recipe(&admin, "サラダ", &["レタス 1/2個"]).await;

    let deck = app.request(Method::GET, "/api/recipes", Some(&user), None).await;
    assert_eq!(deck.body["data"].as_array().unwrap().len(), 3);

    let first = app.swipe(&user, &curry, true).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["data"]["assignedDay"], json!(1));

    let second = app.swipe(&user, &teriyaki, true).await;
    assert_eq!(second.body["data"]["assignedDay"], json!(2));

    let dismissed = app.swipe(&user, &salad, false).await;
    assert_eq!(dismissed.body["data"]["assignedDay"], Value::Null);

    let deck = app.request(Method::GET, "/api/recipes", Some(&user), None).await;
    assert_eq!(deck.body["data"], json!([]));

    let plan = app
        .request(Method::GET, "/api/meal-plans/current", Some(&user), None)
        .await;
    let entries = plan.body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["recipe"]["title"], json!("チキンカレー"));

    let list = app
        .request(Method::GET, "/api/shopping-list", Some(&user), None)
        .await;
    assert_eq!(list.status, StatusCode::OK);
    let items = list.body["data"]["items"].as_array().unwrap();
    let chicken = items.iter().find(|i| i["name"] == json!("鶏もも肉")).unwrap();
    assert_eq!(chicken["quantity"], json!(500.0));
    assert_eq!(chicken["category"], json!("肉類"));
    assert_eq!(list.body["data"]["recipeCount"], json!(2));

    let cleared = app
        .request(Method::DELETE, "/api/saved-recipes/dismissed", Some(&user), None)
        .await;
    assert_eq!(cleared.body["data"]["deleted"], json!(1));
    let deck = app.request(Method::GET, "/api/recipes", Some(&user), None).await;
    assert_eq!(deck.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn swiping_again_updates_instead_of_duplicating() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let user = app.register("again@example.com").await;
    let recipe = app.add_catalog_recipe(&admin, "親子丼", &["卵 3個"]).await;

    app.swipe(&user, &recipe, true).await;
    let res = app.swipe(&user, &recipe, false).await;
    assert_eq!(res.body["data"]["savedRecipe"]["liked"], json!(false));

    let saved = app
        .request(Method::GET, "/api/saved-recipes", Some(&user), None)
        .await;
    assert_eq!(saved.body["data"].as_array().unwrap().len(), 1);

    let plan = app
        .request(Method::GET, "/api/meal-plans/current", Some(&user), None)
        .await;
    assert_eq!(plan.body["data"]["entries"], json!([]));
}

#[tokio::test]
async fn moving_onto_an_occupied_day_swaps() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;
    let user = app.register("mover@example.com").await;
    let a = app.add_catalog_recipe(&admin, "A", &["米 2合"]).await;
    let b = app.add_catalog_recipe(&admin, "B", &["卵 2"]).await;
    app.swipe(&user, &a, true).await;
    app.swipe(&user, &b, true).await;

    let plan = app
        .request(Method::GET, "/api/meal-plans/current", Some(&user), None)
        .await;
    let entry_a = plan.body["data"]["entries"][0]["entryId"].clone();

    let moved = app
        .request(
            Method::PUT,
            "/api/meal-plans/move",
            Some(&user),
            Some(json!({ "entryId": entry_a, "targetDay": 2 })),
        )
        .await;
    assert_eq!(moved.status, StatusCode::OK);
    assert!(moved.body["data"]["swappedEntryId"].is_string());

    let plan = app
        .request(Method::GET, "/api/meal-plans/current", Some(&user), None)
        .await;
    let titles: Vec<_> = plan.body["data"]["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["dayOfWeek"].clone(), e["recipe"]["title"].clone()))
        .collect();
    assert_eq!(titles, vec![(json!(1), json!("B")), (json!(2), json!("A"))]);

    let invalid = app
        .request(
            Method::PUT,
            "/api/meal-plans/move",
            Some(&user),
            Some(json!({ "entryId": entry_a, "targetDay": 6 })),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_import_counts_skipped_entries() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let res = app
        .request(
            Method::POST,
            "/api/admin/recipes/import/json",
            Some(&admin),
            Some(json!({
                "recipes": [
                    { "title": "豚汁", "description": "具だくさん", "indication": "約20分", "materials": ["豚バラ肉 100g"] },
                    { "title": "説明なし", "indication": "約5分", "materials": ["塩 少々"] },
                    { "description": "タイトルなし", "indication": "約5分", "materials": ["塩 少々"] }
                ]
            })),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["imported"], json!(1));
    assert_eq!(res.body["data"]["skipped"], json!(2));

    let csv = "title,description,indication,materials\n\
               焼きそば,屋台風,約15分,中華麺 2玉|豚こま肉 100g|キャベツ 1/4個\n";
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/admin/recipes/import/csv")
        .header(header::COOKIE, &admin)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let res = app.send(request).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["imported"], json!(1));

    let catalog = app
        .request(Method::GET, "/api/admin/recipes", Some(&admin), None)
        .await;
    let catalog = catalog.body["data"].as_array().unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(
        catalog
            .iter()
            .all(|r| r["recipeId"].as_str().unwrap().starts_with("import-"))
    );
}

#[tokio::test]
async fn rakuten_falls_back_to_mock_data_without_key() {
    let app = TestApp::new().await;
    let admin = app.login_admin().await;

    let categories = app
        .request(Method::GET, "/api/admin/rakuten/categories", Some(&admin), None)
        .await;
    assert_eq!(categories.status, StatusCode::OK);
    assert_eq!(categories.body["data"]["source"], json!("mock"));

    let missing_keyword = app
        .request(Method::GET, "/api/admin/rakuten/search", Some(&admin), None)
        .await;
    assert_eq!(missing_keyword.status, StatusCode::BAD_REQUEST);

    let imported = app
        .request(
            Method::POST,
            "/api/admin/rakuten/import",
            Some(&admin),
            Some(json!({ "categoryId": "31" })),
        )
        .await;
    assert_eq!(imported.body["data"]["source"], json!("mock"));
    assert_eq!(imported.body["data"]["imported"], json!(3));

    let again = app
        .request(
            Method::POST,
            "/api/admin/rakuten/import",
            Some(&admin),
            Some(json!({ "categoryId": "31" })),
        )
        .await;
    assert_eq!(again.body["data"]["imported"], json!(0));
    assert_eq!(again.body["data"]["skipped"], json!(3));

    let diagnostics = app
        .request(Method::GET, "/api/admin/rakuten/diagnostics", Some(&admin), None)
        .await;
    assert_eq!(diagnostics.body["data"]["configured"], json!(false));
}

#[tokio::test]
async fn finance_rows_are_scoped_and_validated() {
    let app = TestApp::new().await;
    let alice = app.register("alice@example.com").await;
    let bob = app.register("bob@example.com").await;

    let food = app
        .request(
            Method::POST,
            "/api/categories",
            Some(&alice),
            Some(json!({ "name": "食費", "kind": "expense" })),
        )
        .await;
    assert_eq!(food.status, StatusCode::CREATED);
    let food_id = food.body["data"]["id"].clone();

    let duplicate = app
        .request(
            Method::POST,
            "/api/categories",
            Some(&alice),
            Some(json!({ "name": "食費", "kind": "expense" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let negative = app
        .request(
            Method::POST,
            "/api/expenses",
            Some(&alice),
            Some(json!({ "amount": -5.0, "spentOn": "2026-10-01" })),
        )
        .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);

    let foreign_category = app
        .request(
            Method::POST,
            "/api/expenses",
            Some(&bob),
            Some(json!({ "amount": 100.0, "categoryId": food_id, "spentOn": "2026-10-01" })),
        )
        .await;
    assert_eq!(foreign_category.status, StatusCode::BAD_REQUEST);

    for (amount, date) in [(1200.0, "2026-10-03"), (800.0, "2026-10-20"), (50.0, "2026-11-01")] {
        let res = app
            .request(
                Method::POST,
                "/api/expenses",
                Some(&alice),
                Some(json!({ "amount": amount, "categoryId": food_id, "spentOn": date })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
    }
    app.request(
        Method::POST,
        "/api/incomes",
        Some(&alice),
        Some(json!({ "amount": 3000.0, "source": "給与", "receivedOn": "2026-10-25" })),
    )
    .await;

    let october = app
        .request(Method::GET, "/api/expenses?month=2026-10", Some(&alice), None)
        .await;
    assert_eq!(october.body["data"].as_array().unwrap().len(), 2);

    let summary = app
        .request(
            Method::GET,
            "/api/finance/summary?month=2026-10",
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(summary.body["data"]["totalExpense"], json!(2000.0));
    assert_eq!(summary.body["data"]["totalIncome"], json!(3000.0));
    assert_eq!(summary.body["data"]["balance"], json!(1000.0));
    assert_eq!(
        summary.body["data"]["expensesByCategory"][0]["categoryName"],
        json!("食費")
    );

    let bob_view = app
        .request(Method::GET, "/api/expenses", Some(&bob), None)
        .await;
    assert_eq!(bob_view.body["data"], json!([]));

    let bad_month = app
        .request(Method::GET, "/api/expenses?month=october", Some(&alice), None)
        .await;
    assert_eq!(bad_month.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_the_account_removes_the_session() {
    let app = TestApp::new().await;
    let user = app.register("leaver@example.com").await;

    let renamed = app
        .request(
            Method::PUT,
            "/api/users/me",
            Some(&user),
            Some(json!({ "name": "新しい名前" })),
        )
        .await;
    assert_eq!(renamed.body["data"]["name"], json!("新しい名前"));

    let deleted = app
        .request(Method::DELETE, "/api/users/me", Some(&user), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let me = app.request(Method::GET, "/api/users/me", Some(&user), None).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
}
