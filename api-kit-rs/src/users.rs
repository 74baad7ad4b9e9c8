//! api-kit-rs/src/users.rs
//! Demo user endpoint

use axum::{
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use input_validation_rs::{FieldSchema, FieldType, Rule, TypeSchema, Validatable};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::problem::{send_json, HttpError};
use crate::server::ApiState;
use crate::validated::ValidatedJson;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub zip: String,
}

impl Validatable for Address {
    fn schema() -> &'static TypeSchema {
        static SCHEMA: Lazy<TypeSchema> = Lazy::new(|| {
            TypeSchema::builder("Address")
                .field(FieldSchema::string("Street").tag("street").rule(Rule::Required))
                .field(FieldSchema::string("City").tag("city").rule(Rule::Required))
                .field(
                    FieldSchema::string("Zip")
                        .tag("zip")
                        .rules([Rule::Required, Rule::Len(5.0)]),
                )
                .build()
        });
        &SCHEMA
    }
}

/// Payload of `POST /api/v1/users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub age: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub address: Address,
}

impl Validatable for CreateUser {
    fn schema() -> &'static TypeSchema {
        static SCHEMA: Lazy<TypeSchema> = Lazy::new(|| {
            TypeSchema::builder("CreateUser")
                .field(
                    FieldSchema::string("Name")
                        .tag("name")
                        .rules([Rule::Required, Rule::Min(2.0), Rule::Max(64.0)]),
                )
                .field(
                    FieldSchema::string("Email")
                        .tag("email")
                        .rules([Rule::Required, Rule::Email]),
                )
                .field(
                    FieldSchema::integer("Age")
                        .tag("age")
                        .rules([Rule::Gte(18.0), Rule::Lte(130.0)]),
                )
                .field(
                    FieldSchema::string("Nickname")
                        .tag("nickname")
                        .optional()
                        .rule(Rule::AlphaNum),
                )
                .field(
                    FieldSchema::array("Tags", FieldType::String)
                        .tag("tags")
                        .rules([Rule::Max(5.0), Rule::Dive, Rule::Min(1.0)]),
                )
                .field(
                    FieldSchema::object::<Address>("Address")
                        .tag("address")
                        .rule(Rule::Required),
                )
                .build()
        });
        &SCHEMA
    }
}

/// Echoes the validated payload back
pub async fn create_user(ValidatedJson(payload): ValidatedJson<CreateUser>) -> Response {
    match payload {
        Some(user) => {
            tracing::info!(name = %user.name, "Accepted user");
            send_json(&user)
        }
        None => HttpError::bad_request().into_response(),
    }
}

/// Registers the user routes
pub fn routes(router: Router<ApiState>) -> Router<ApiState> {
    router.route("/api/v1/users", post(create_user))
}
