// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use clap::Args;
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams},
    Client, ResourceExt,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::*;

use crate::error::is_not_found;
use crate::simpleapp_types::*;

// Submission front-end. It turns free-text input into a SimpleApp and hands it to
// the API server; checking the values is left to the CRD schema.

pub const FIELD_MANAGER: &str = "simpleapp-dashboard";
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("Validation Error: {0} is required")]
    MissingField(&'static str),
    #[error("Validation Error: {field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ApplicationForm {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub image: String,
    #[arg(long)]
    pub replicas: String,
    #[arg(long)]
    pub container_port: String,
    #[arg(long)]
    pub service_port: String,
    /// Defaults to "default" when empty.
    #[arg(long)]
    pub namespace: Option<String>,
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, FormError> {
    let value = value.trim();
    if value.is_empty() {
        Err(FormError::MissingField(field))
    } else {
        Ok(value)
    }
}

fn number(field: &'static str, value: &str) -> Result<i32, FormError> {
    let value = required(field, value)?;
    value.parse().map_err(|_| FormError::NotANumber {
        field,
        value: value.to_string(),
    })
}

impl ApplicationForm {
    pub fn render(&self) -> Result<SimpleApp, FormError> {
        let name = required("name", &self.name)?;
        let spec = SimpleAppSpec {
            image: required("image", &self.image)?.to_string(),
            replicas: number("replicas", &self.replicas)?,
            container_port: number("containerPort", &self.container_port)?,
            service_port: number("servicePort", &self.service_port)?,
        };
        let namespace = self
            .namespace
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE);

        let mut app = SimpleApp::new(name, spec);
        app.metadata.namespace = Some(namespace.to_string());
        Ok(app)
    }
}

/// Creates or updates the SimpleApp with a server-side apply.
pub async fn apply_simple_app(client: Client, app: &SimpleApp) -> Result<SimpleApp, kube::Error> {
    let namespace = app.namespace().unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let name = app.name_any();
    info!("Apply SimpleApp: {}/{}", namespace, name);
    Api::<SimpleApp>::namespaced(client, &namespace)
        .patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(app),
        )
        .await
}

/// All SimpleApps in the cluster as a JSON list. Any failure (for example the CRD
/// not being installed yet) yields an empty list.
pub async fn list_simple_apps(client: Client) -> Value {
    match Api::<SimpleApp>::all(client).list(&ListParams::default()).await {
        Ok(list) => json!({ "items": list.items }),
        Err(e) => {
            warn!("Error listing SimpleApps: {}", e);
            json!({ "items": [] })
        }
    }
}

pub async fn delete_simple_app(client: Client, namespace: &str, name: &str) -> Result<(), kube::Error> {
    info!("Delete SimpleApp: {}/{}", namespace, name);
    match Api::<SimpleApp>::namespaced(client, namespace)
        .delete(name, &DeleteParams::default())
        .await
    {
        Ok(_) => Ok(()),
        Err(e) => {
            if is_not_found(&e) {
                warn!("SimpleApp {}/{} does not exist", namespace, name);
            }
            Err(e)
        }
    }
}
