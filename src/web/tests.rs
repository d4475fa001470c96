//! HTTP tests for the server-rendered pages

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};

use crate::api::{build_router, AppState};
use crate::config::Config;
use crate::db::{create_test_pool, migrations};
use crate::models::{AuthorInput, BookInput, CreateUserInput, LibraryBookInput, LibraryInput, UserRole};

struct TestApp {
    server: TestServer,
    state: AppState,
    dune: i64,
    herbert: i64,
    central: i64,
}

async fn setup() -> TestApp {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();

    let config = Config::default();
    let state = AppState::new(pool, &config).unwrap();
    let server = TestServer::new(build_router(state.clone(), &config.server.cors_origin)).unwrap();

    let herbert = state
        .catalog_service
        .create_author(AuthorInput::new("Frank Herbert"))
        .await
        .unwrap()
        .id;
    let dune = state
        .catalog_service
        .create_book(BookInput::new("Dune", 1965, herbert))
        .await
        .unwrap()
        .id;
    let central = state
        .library_service
        .create_library(LibraryInput {
            name: Some("Central".to_string()),
        })
        .await
        .unwrap()
        .id;
    state
        .library_service
        .add_book(central, LibraryBookInput { book: Some(dune) })
        .await
        .unwrap();

    TestApp {
        server,
        state,
        dune,
        herbert,
        central,
    }
}

impl TestApp {
    /// Create a user with the given role and return a session cookie value
    async fn cookie_for(&self, email: &str, role: UserRole) -> HeaderValue {
        let user = self
            .state
            .user_service
            .create_user(CreateUserInput {
                email: email.to_string(),
                password: "shelf-pass-42".to_string(),
                role: Some(role),
                ..Default::default()
            })
            .await
            .unwrap();
        let session = self.state.user_service.start_session(user.id).await.unwrap();
        HeaderValue::from_str(&format!("session={}", session.id)).unwrap()
    }
}

fn location(response: &TestResponse) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_root_redirects_to_books() {
    let app = setup().await;

    let response = app.server.get("/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books/");
}

#[tokio::test]
async fn test_book_list_page() {
    let app = setup().await;

    let response = app.server.get("/books/").await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("Dune by Frank Herbert (1965)"));
    assert!(!html.contains("/add_book/"));
}

#[tokio::test]
async fn test_book_list_shows_actions_to_librarians() {
    let app = setup().await;
    let cookie = app.cookie_for("librarian@example.com", UserRole::Librarian).await;

    let html = app
        .server
        .get("/books/")
        .add_header(header::COOKIE, cookie)
        .await
        .text();
    assert!(html.contains("/add_book/"));
    assert!(html.contains(&format!("/edit_book/{}/", app.dune)));
}

#[tokio::test]
async fn test_library_page() {
    let app = setup().await;

    let response = app.server.get(&format!("/library/{}/", app.central)).await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("Central"));
    assert!(html.contains("Dune by Frank Herbert"));

    app.server
        .get("/library/9999/")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = app.server.get("/library/abc/").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.text().contains("404 Not Found"));
}

#[tokio::test]
async fn test_book_pages_reject_non_numeric_ids() {
    let app = setup().await;
    let cookie = app.cookie_for("admin@example.com", UserRole::Admin).await;

    for path in ["/edit_book/abc/", "/delete_book/abc/"] {
        app.server
            .get(path)
            .add_header(header::COOKIE, cookie.clone())
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_add_book_redirects_anonymous_to_login() {
    let app = setup().await;

    let response = app.server.get("/add_book/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login/?next=%2Fadd_book%2F");
}

#[tokio::test]
async fn test_member_cannot_add_book() {
    let app = setup().await;
    let cookie = app.cookie_for("member@example.com", UserRole::Member).await;

    app.server
        .get("/add_book/")
        .add_header(header::COOKIE, cookie.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post("/add_book/")
        .add_header(header::COOKIE, cookie)
        .form(&[("title", "Sneaky"), ("publication_year", "2000")])
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_librarian_adds_book() {
    let app = setup().await;
    let cookie = app.cookie_for("librarian@example.com", UserRole::Librarian).await;

    let response = app
        .server
        .get("/add_book/")
        .add_header(header::COOKIE, cookie.clone())
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Frank Herbert"));

    let herbert = app.herbert.to_string();
    let response = app
        .server
        .post("/add_book/")
        .add_header(header::COOKIE, cookie)
        .form(&[
            ("title", "Dune Messiah"),
            ("publication_year", "1969"),
            ("author", herbert.as_str()),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books/");

    let books = app.state.catalog_service.list_books_with_authors().await.unwrap();
    assert!(books.iter().any(|b| b.title == "Dune Messiah"));
}

#[tokio::test]
async fn test_add_book_rerenders_with_errors() {
    let app = setup().await;
    let cookie = app.cookie_for("librarian@example.com", UserRole::Librarian).await;

    let response = app
        .server
        .post("/add_book/")
        .add_header(header::COOKIE, cookie)
        .form(&[("title", "Later"), ("publication_year", "3000"), ("author", "")])
        .await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("Publication year cannot be in the future."));
    assert!(html.contains("This field is required."));
    assert!(html.contains("value=\"Later\""));
}

#[tokio::test]
async fn test_edit_and_delete_book() {
    let app = setup().await;
    let cookie = app.cookie_for("admin@example.com", UserRole::Admin).await;
    let herbert = app.herbert.to_string();

    let response = app
        .server
        .get(&format!("/edit_book/{}/", app.dune))
        .add_header(header::COOKIE, cookie.clone())
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("value=\"Dune\""));

    app.server
        .post(&format!("/edit_book/{}/", app.dune))
        .add_header(header::COOKIE, cookie.clone())
        .form(&[
            ("title", "Dune (1965)"),
            ("publication_year", "1965"),
            ("author", herbert.as_str()),
        ])
        .await
        .assert_status(StatusCode::SEE_OTHER);
    let book = app.state.catalog_service.get_book(app.dune).await.unwrap();
    assert_eq!(book.title, "Dune (1965)");

    let response = app
        .server
        .get(&format!("/delete_book/{}/", app.dune))
        .add_header(header::COOKIE, cookie.clone())
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Are you sure"));

    app.server
        .post(&format!("/delete_book/{}/", app.dune))
        .add_header(header::COOKIE, cookie.clone())
        .await
        .assert_status(StatusCode::SEE_OTHER);

    app.server
        .get(&format!("/edit_book/{}/", app.dune))
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_pages() {
    let app = setup().await;
    let member = app.cookie_for("member@example.com", UserRole::Member).await;
    let librarian = app.cookie_for("librarian@example.com", UserRole::Librarian).await;

    app.server
        .get("/member/")
        .add_header(header::COOKIE, member.clone())
        .await
        .assert_status_ok();
    app.server
        .get("/librarian/")
        .add_header(header::COOKIE, member.clone())
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .get("/admin/")
        .add_header(header::COOKIE, member)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = app
        .server
        .get("/librarian/")
        .add_header(header::COOKIE, librarian)
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Librarian dashboard"));

    let response = app.server.get("/admin/").await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login/?next=%2Fadmin%2F");
}

#[tokio::test]
async fn test_register_logs_in() {
    let app = setup().await;

    let response = app
        .server
        .post("/register/")
        .form(&[
            ("email", "new@example.com"),
            ("password", "long-enough-pass"),
            ("password_confirm", "long-enough-pass"),
            ("first_name", ""),
            ("last_name", ""),
            ("date_of_birth", ""),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/books/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("session="));
}

#[tokio::test]
async fn test_register_shows_errors() {
    let app = setup().await;

    let response = app
        .server
        .post("/register/")
        .form(&[
            ("email", "new@example.com"),
            ("password", "short"),
            ("password_confirm", "other"),
        ])
        .await;
    response.assert_status_ok();
    let html = response.text();
    assert!(html.contains("This password is too short."));
    assert!(html.contains("The two password fields didn&#x27;t match."));
    assert!(html.contains("value=\"new@example.com\""));
}

#[tokio::test]
async fn test_login_follows_safe_next() {
    let app = setup().await;
    app.cookie_for("member@example.com", UserRole::Member).await;

    let response = app
        .server
        .post("/login/")
        .form(&[
            ("email", "member@example.com"),
            ("password", "shelf-pass-42"),
            ("next", "/member/"),
        ])
        .await;
    response.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/member/");
    assert!(response.headers().contains_key(header::SET_COOKIE));

    let response = app
        .server
        .post("/login/")
        .form(&[
            ("email", "member@example.com"),
            ("password", "shelf-pass-42"),
            ("next", "//evil.example.com/"),
        ])
        .await;
    assert_eq!(location(&response), "/books/");
}

#[tokio::test]
async fn test_login_failure_rerenders_form() {
    let app = setup().await;
    app.cookie_for("member@example.com", UserRole::Member).await;

    let response = app
        .server
        .post("/login/")
        .form(&[("email", "member@example.com"), ("password", "nope-nope")])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("Invalid email or password"));
}

#[tokio::test]
async fn test_login_form_keeps_next() {
    let app = setup().await;

    let response = app
        .server
        .get("/login/")
        .add_query_param("next", "/add_book/")
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("value=\"&#x2F;add_book&#x2F;\""));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup().await;
    let cookie = app.cookie_for("member@example.com", UserRole::Member).await;

    let response = app
        .server
        .post("/logout/")
        .add_header(header::COOKIE, cookie.clone())
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("You have been logged out"));
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));

    app.server
        .get("/member/")
        .add_header(header::COOKIE, cookie)
        .await
        .assert_status(StatusCode::SEE_OTHER);
}
