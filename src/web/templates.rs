//! Embedded page templates
//!
//! Templates are compiled into the binary and registered with Tera once at
//! startup. Names end in `.html`, so Tera auto-escapes every variable.

use std::error::Error as _;

use anyhow::Result;
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::models::User;

/// Template sources, base first so the others can extend it
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("list_books.html", include_str!("../../templates/list_books.html")),
    ("library_detail.html", include_str!("../../templates/library_detail.html")),
    ("book_form.html", include_str!("../../templates/book_form.html")),
    (
        "book_confirm_delete.html",
        include_str!("../../templates/book_confirm_delete.html"),
    ),
    ("login.html", include_str!("../../templates/login.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("logged_out.html", include_str!("../../templates/logged_out.html")),
    ("role_page.html", include_str!("../../templates/role_page.html")),
];

/// Template errors
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to add template {name}: {message}")]
    Load { name: String, message: String },

    #[error("Failed to render '{name}': {message}")]
    Render { name: String, message: String },
}

/// The set of page templates
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Register every embedded template
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        for (name, source) in TEMPLATES {
            tera.add_raw_template(name, source)
                .map_err(|e| TemplateError::Load {
                    name: name.to_string(),
                    message: error_chain(&e),
                })?;
        }

        tera.build_inheritance_chains()
            .map_err(|e| TemplateError::Load {
                name: "inheritance".to_string(),
                message: error_chain(&e),
            })?;

        tracing::debug!("Loaded {} templates", TEMPLATES.len());
        Ok(Self { tera })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            TemplateError::Render {
                name: template.to_string(),
                message: error_chain(&e),
            }
            .into()
        })
    }

    /// Names of all registered templates
    pub fn names(&self) -> Vec<&str> {
        self.tera.get_template_names().collect()
    }
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// The logged-in user as seen by templates
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.to_string(),
        }
    }
}

/// A context carrying the variables every page uses
pub fn page_context(user: Option<&User>) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("current_user", &user.map(CurrentUser::from));
    context
}
