// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to get SimpleApp: {0}")]
    GetSimpleAppFailed(#[source] kube::Error),
    #[error("Failed to reconcile Deployment: {0}")]
    ReconcileDeploymentFailed(#[source] kube::Error),
    #[error("Failed to reconcile Service: {0}")]
    ReconcileServiceFailed(#[source] kube::Error),
    #[error("Failed to reconcile Ingress: {0}")]
    ReconcileIngressFailed(#[source] kube::Error),
    #[error("Failed to update SimpleApp status: {0}")]
    UpdateStatusFailed(#[source] kube::Error),
    #[error("MissingObjectKey: {0}")]
    MissingObjectKey(&'static str),
}

pub fn is_not_found(error: &kube::Error) -> bool {
    matches!(
        error,
        kube::Error::Api(kube_core::ErrorResponse { reason, code, .. })
            if reason == "NotFound" || *code == 404
    )
}
