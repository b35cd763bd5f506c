//! Category creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::UserID,
    category::{CategoryName, create_category},
    endpoints,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base, submit_button},
    navigation::NavBar,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw data entered in the new category form.
#[derive(Serialize, Deserialize)]
pub struct CategoryFormData {
    pub name: String,
}

/// Render the category creation page.
pub async fn get_new_category_page() -> Response {
    let nav_bar = NavBar::new(endpoints::NEW_CATEGORY_VIEW).into_html();
    let form = new_category_form(None);

    let content = html! {
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4"
            {
                h1 class="text-xl font-bold" { "Create Category" }

                (form)
            }
        }
    };

    base("Create Category", &content).into_response()
}

/// Handle category creation form submissions.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryState>,
    Extension(user_id): Extension<UserID>,
    Form(new_category): Form<CategoryFormData>,
) -> Response {
    let name = match CategoryName::new(&new_category.name) {
        Ok(name) => name,
        Err(error) => {
            let error_message = error.to_string();
            return new_category_form(Some(&error_message)).into_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_alert_response(),
    };

    match create_category(name, user_id, &connection) {
        Ok(_) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::CATEGORIES_VIEW.to_owned()),
            (),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");

            error.into_alert_response()
        }
    }
}

fn new_category_form(error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::CATEGORIES_API)
            hx-indicator="#indicator"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Category Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    placeholder="e.g. Groceries"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);

                @if let Some(error_message) = error_message {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            (submit_button("Create Category"))
        }
    }
}
