// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(group = "apps.myapp.io", version = "v1", kind = "SimpleApp")]
#[kube(shortname = "sapp", namespaced)]
#[kube(status = "SimpleAppStatus")]
#[kube(printcolumn = r#"{"name":"Image", "type":"string", "jsonPath":".spec.image"}"#)]
#[kube(printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#)]
#[kube(printcolumn = r#"{"name":"Ready", "type":"integer", "jsonPath":".status.readyReplicas"}"#)]
#[kube(printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#)]
pub struct SimpleAppSpec {
    /// Container image to run, e.g. `nginx:latest`.
    #[schemars(length(min = 1))]
    pub image: String,
    #[serde(default = "default_replicas")]
    #[schemars(range(min = 1))]
    pub replicas: i32,
    /// Port the application listens on inside the container.
    #[serde(rename = "containerPort")]
    #[schemars(range(min = 1, max = 65535))]
    pub container_port: i32,
    /// Port exposed by the Service inside the cluster.
    #[serde(rename = "servicePort", default = "default_service_port")]
    pub service_port: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SimpleAppStatus {
    #[serde(rename = "readyReplicas", default)]
    pub ready_replicas: i32,
    // Reserved; nothing in the reconciler writes it.
    #[serde(rename = "serviceStatus", default, skip_serializing_if = "Option::is_none")]
    pub service_status: Option<String>,
}

fn default_replicas() -> i32 {
    1
}

fn default_service_port() -> i32 {
    80
}
