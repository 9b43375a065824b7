// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use clap::Args;
use std::time::Duration;

use crate::route_class::DEFAULT_INGRESS_CLASS_ENV;

#[derive(Debug, Clone, Args)]
pub struct ControllerConfig {
    /// Environment variable holding the ingress class. It is read again on every
    /// reconcile; when it is unset or empty no Ingress is managed.
    #[arg(
        long,
        env = "SIMPLEAPP_INGRESS_CLASS_ENV",
        default_value = DEFAULT_INGRESS_CLASS_ENV
    )]
    pub ingress_class_env: String,

    /// Only watch SimpleApps in this namespace (default: all namespaces).
    #[arg(long, env = "SIMPLEAPP_WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Seconds to wait before retrying a failed reconcile.
    #[arg(long, env = "SIMPLEAPP_ERROR_REQUEUE_SECS", default_value_t = 10)]
    pub error_requeue_secs: u64,
}

impl ControllerConfig {
    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}
