// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::error::Error;
use crate::simpleapp_types::*;
use kube::ResourceExt;
use std::collections::BTreeMap;

pub const APP_LABEL_KEY: &str = "app";
pub const CONTAINER_NAME: &str = "app";
pub const LEGACY_INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";

pub fn deployment_name(app: &SimpleApp) -> String {
    app.name_any()
}

pub fn service_name(app: &SimpleApp) -> String {
    app.name_any()
}

pub fn ingress_name(app: &SimpleApp) -> String {
    app.name_any() + "-ingress"
}

pub fn ingress_host(app: &SimpleApp) -> String {
    app.name_any() + ".local"
}

pub fn app_labels(app: &SimpleApp) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL_KEY.to_string(), app.name_any())])
}

/// Namespace the dependents of `app` live in.
pub fn app_namespace(app: &SimpleApp) -> Result<String, Error> {
    app.metadata
        .namespace
        .clone()
        .ok_or_else(|| Error::MissingObjectKey(".metadata.namespace"))
}
