//! Page handlers

use std::collections::HashSet;

use axum::{
    extract::{Form, Query, State},
    http::{HeaderMap, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use super::{page_context, PageError, PagePath};
use crate::api::common::{clear_session_cookie_headers, session_cookie_headers};
use crate::api::middleware::{extract_session_token, AppState, AuthenticatedUser};
use crate::models::{Book, BookInput, Permission, User, UserRole};
use crate::services::validation::already_exists;
use crate::services::{
    CatalogServiceError, FieldErrors, LoginInput, RegisterInput, UserServiceError,
};

type PageResult = Result<Response, PageError>;

fn render(state: &AppState, template: &str, context: &TeraContext) -> PageResult {
    let html = state.templates.render(template, context)?;
    Ok(Html(html).into_response())
}

// ============================================================================
// Access checks
// ============================================================================

/// The logged-in user, or a redirect to the login form
fn login_required(user: Option<AuthenticatedUser>, uri: &Uri) -> Result<User, PageError> {
    user.map(|u| u.0).ok_or_else(|| PageError::LoginRequired {
        next: uri
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
    })
}

/// The logged-in user holding `perm`
fn permission_required(
    user: Option<AuthenticatedUser>,
    uri: &Uri,
    perm: Permission,
) -> Result<User, PageError> {
    let user = login_required(user, uri)?;
    if !user.has_perm(perm) {
        tracing::debug!("User {} lacks {}", user.id, perm);
        return Err(PageError::Forbidden);
    }
    Ok(user)
}

/// The logged-in user whose role is exactly `role`
fn role_required(
    user: Option<AuthenticatedUser>,
    uri: &Uri,
    role: UserRole,
) -> Result<User, PageError> {
    let user = login_required(user, uri)?;
    if user.role != role {
        return Err(PageError::Forbidden);
    }
    Ok(user)
}

/// Redirect target after login: only local absolute paths are followed
pub(super) fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => {
            next
        }
        _ => "/books/",
    }
}

// ============================================================================
// Catalog pages
// ============================================================================

/// GET /
pub async fn index() -> Redirect {
    Redirect::to("/books/")
}

/// GET /books/
pub async fn list_books(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
) -> PageResult {
    let books = state.catalog_service.list_books_with_authors().await?;
    let user = user.map(|u| u.0);
    let can = |perm| user.as_ref().is_some_and(|u| u.has_perm(perm));

    let mut context = page_context(user.as_ref());
    context.insert("books", &books);
    context.insert("can_add", &can(Permission::AddBook));
    context.insert("can_change", &can(Permission::ChangeBook));
    context.insert("can_delete", &can(Permission::DeleteBook));
    render(&state, "list_books.html", &context)
}

/// GET /library/{id}/
pub async fn library_detail(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    PagePath(id): PagePath<i64>,
) -> PageResult {
    let library = state.library_service.get_library(id).await?;

    let held: HashSet<i64> = library.books.iter().map(|b| b.id).collect();
    let books: Vec<_> = state
        .catalog_service
        .list_books_with_authors()
        .await?
        .into_iter()
        .filter(|b| held.contains(&b.id))
        .collect();

    let mut context = page_context(user.as_ref().map(|u| &u.0));
    context.insert("library", &library);
    context.insert("books", &books);
    render(&state, "library_detail.html", &context)
}

// ============================================================================
// Book forms
// ============================================================================

/// Book form as posted by the browser; every field arrives as text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookForm {
    pub title: String,
    pub publication_year: String,
    pub author: String,
}

impl BookForm {
    fn from_book(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            publication_year: book.publication_year.to_string(),
            author: book.author_id.to_string(),
        }
    }

    /// Convert to a service input, reporting fields that aren't numbers
    fn to_input(&self) -> Result<BookInput, FieldErrors> {
        let mut errors = FieldErrors::new();

        let publication_year = match self.publication_year.trim() {
            "" => None,
            raw => match raw.parse() {
                Ok(year) => Some(year),
                Err(_) => {
                    errors.add("publication_year", "Enter a whole number.");
                    None
                }
            },
        };

        let author = match self.author.trim() {
            "" => None,
            raw => match raw.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add(
                        "author",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                    None
                }
            },
        };

        errors.into_result()?;
        Ok(BookInput {
            title: Some(self.title.clone()),
            publication_year,
            author,
        })
    }
}

async fn render_book_form(
    state: &AppState,
    user: &User,
    heading: &str,
    form: &BookForm,
    errors: &FieldErrors,
) -> PageResult {
    let authors = state.catalog_service.list_authors().await?;

    let mut context = page_context(Some(user));
    context.insert("heading", heading);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("authors", &authors);
    context.insert("selected_author", &form.author.trim().parse::<i64>().ok());
    render(state, "book_form.html", &context)
}

/// GET /add_book/
pub async fn add_book_form(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
) -> PageResult {
    let user = permission_required(user, &uri, Permission::AddBook)?;
    render_book_form(&state, &user, "Add book", &BookForm::default(), &FieldErrors::new()).await
}

/// POST /add_book/
pub async fn add_book(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
    Form(form): Form<BookForm>,
) -> PageResult {
    let user = permission_required(user, &uri, Permission::AddBook)?;

    let result = match form.to_input() {
        Ok(input) => state.catalog_service.create_book(input).await.map(|_| ()),
        Err(errors) => Err(CatalogServiceError::ValidationError(errors)),
    };

    match result {
        Ok(()) => Ok(Redirect::to("/books/").into_response()),
        Err(CatalogServiceError::ValidationError(errors)) => {
            render_book_form(&state, &user, "Add book", &form, &errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /edit_book/{id}/
pub async fn edit_book_form(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
    PagePath(id): PagePath<i64>,
) -> PageResult {
    let user = permission_required(user, &uri, Permission::ChangeBook)?;
    let book = state.catalog_service.get_book(id).await?;

    let heading = format!("Edit {}", book.title);
    render_book_form(&state, &user, &heading, &BookForm::from_book(&book), &FieldErrors::new())
        .await
}

/// POST /edit_book/{id}/
pub async fn edit_book(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
    PagePath(id): PagePath<i64>,
    Form(form): Form<BookForm>,
) -> PageResult {
    let user = permission_required(user, &uri, Permission::ChangeBook)?;
    let book = state.catalog_service.get_book(id).await?;

    let result = match form.to_input() {
        Ok(input) => state
            .catalog_service
            .update_book(id, input, false)
            .await
            .map(|_| ()),
        Err(errors) => Err(CatalogServiceError::ValidationError(errors)),
    };

    match result {
        Ok(()) => Ok(Redirect::to("/books/").into_response()),
        Err(CatalogServiceError::ValidationError(errors)) => {
            let heading = format!("Edit {}", book.title);
            render_book_form(&state, &user, &heading, &form, &errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /delete_book/{id}/
pub async fn delete_book_confirm(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
    PagePath(id): PagePath<i64>,
) -> PageResult {
    let user = permission_required(user, &uri, Permission::DeleteBook)?;
    let book = state.catalog_service.get_book(id).await?;

    let mut context = page_context(Some(&user));
    context.insert("book", &book);
    render(&state, "book_confirm_delete.html", &context)
}

/// POST /delete_book/{id}/
pub async fn delete_book(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
    PagePath(id): PagePath<i64>,
) -> PageResult {
    permission_required(user, &uri, Permission::DeleteBook)?;
    state.catalog_service.delete_book(id).await?;
    Ok(Redirect::to("/books/").into_response())
}

// ============================================================================
// Role pages
// ============================================================================

fn render_role_page(state: &AppState, user: &User, heading: &str) -> PageResult {
    let mut context = page_context(Some(user));
    context.insert("heading", heading);
    context.insert("role", &user.role.to_string());
    context.insert("display_name", &user.display_name());
    render(state, "role_page.html", &context)
}

/// GET /admin/
pub async fn admin_page(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
) -> PageResult {
    let user = role_required(user, &uri, UserRole::Admin)?;
    render_role_page(&state, &user, "Admin dashboard")
}

/// GET /librarian/
pub async fn librarian_page(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
) -> PageResult {
    let user = role_required(user, &uri, UserRole::Librarian)?;
    render_role_page(&state, &user, "Librarian dashboard")
}

/// GET /member/
pub async fn member_page(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    uri: Uri,
) -> PageResult {
    let user = role_required(user, &uri, UserRole::Member)?;
    render_role_page(&state, &user, "Member dashboard")
}

// ============================================================================
// Registration, login and logout
// ============================================================================

/// One input of the registration form
#[derive(Debug, Serialize)]
struct FormField {
    name: &'static str,
    label: &'static str,
    input_type: &'static str,
    value: String,
    errors: Vec<String>,
}

fn register_fields(input: &RegisterInput, errors: &FieldErrors) -> Vec<FormField> {
    let field = |name, label, input_type, value: &str| FormField {
        name,
        label,
        input_type,
        value: value.to_string(),
        errors: errors.get(name).map(<[String]>::to_vec).unwrap_or_default(),
    };

    vec![
        field("email", "Email", "email", &input.email),
        field("first_name", "First name", "text", &input.first_name),
        field("last_name", "Last name", "text", &input.last_name),
        field(
            "date_of_birth",
            "Date of birth",
            "date",
            input.date_of_birth.as_deref().unwrap_or_default(),
        ),
        // Passwords are never echoed back
        field("password", "Password", "password", ""),
        field("password_confirm", "Password confirmation", "password", ""),
    ]
}

fn render_register(state: &AppState, input: &RegisterInput, errors: &FieldErrors) -> PageResult {
    let mut context = page_context(None);
    context.insert("fields", &register_fields(input, errors));
    render(state, "register.html", &context)
}

/// GET /register/
pub async fn register_form(State(state): State<AppState>) -> PageResult {
    render_register(&state, &RegisterInput::default(), &FieldErrors::new())
}

/// POST /register/ - create the account, log it in and go to the book list
pub async fn register(
    State(state): State<AppState>,
    Form(input): Form<RegisterInput>,
) -> PageResult {
    match state.user_service.register(input.clone()).await {
        Ok(user) => {
            let session = state.user_service.start_session(user.id).await?;
            tracing::info!("Registered user {}", user.email);
            let headers =
                session_cookie_headers(&session.id, state.user_service.session_max_age_seconds());
            Ok((headers, Redirect::to("/books/")).into_response())
        }
        Err(UserServiceError::ValidationError(errors)) => render_register(&state, &input, &errors),
        Err(UserServiceError::UserExists(_)) => {
            let errors = FieldErrors::single("email", already_exists("user", "email"));
            render_register(&state, &input, &errors)
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

fn render_login(state: &AppState, email: &str, next: &str, error: Option<&str>) -> PageResult {
    let mut context = page_context(None);
    context.insert("email", email);
    context.insert("next", next);
    context.insert("error", &error);
    render(state, "login.html", &context)
}

/// GET /login/
pub async fn login_form(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> PageResult {
    render_login(&state, "", query.next.as_deref().unwrap_or_default(), None)
}

/// POST /login/
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> PageResult {
    let input = LoginInput::new(form.email.clone(), form.password);

    match state.user_service.login(input).await {
        Ok((_, session)) => {
            let headers =
                session_cookie_headers(&session.id, state.user_service.session_max_age_seconds());
            let target = safe_next(form.next.as_deref());
            Ok((headers, Redirect::to(target)).into_response())
        }
        Err(UserServiceError::AuthenticationError(message)) => render_login(
            &state,
            &form.email,
            form.next.as_deref().unwrap_or_default(),
            Some(&message),
        ),
        Err(e) => Err(e.into()),
    }
}

/// GET|POST /logout/
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> PageResult {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let html = state.templates.render("logged_out.html", &page_context(None))?;
    Ok((clear_session_cookie_headers(), Html(html)).into_response())
}
