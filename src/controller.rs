// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    api::{Api, ListParams},
    runtime::{
        controller::{Action, Controller},
    },
    Client, Resource,
};
use kube_core::NamespaceResourceScope;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::*;

use crate::config::ControllerConfig;
use crate::error::Error;
use crate::reconciler::*;
use crate::route_class::{EnvRouteClass, RouteClassSource};
use crate::shim_layer::{KubeObjectApi, ObjectApi};
use crate::simpleapp_types::*;

/// Steps of one reconcile pass, in the order they run. Each step carries what the
/// later steps need; an error at any step ends the pass.
#[derive(Debug, Clone)]
pub enum SimpleAppReconcileStep {
    Fetch,
    EnsureWorkload(SimpleApp),
    EnsureEndpoint(SimpleApp, Deployment),
    EnsureRoute(SimpleApp, Deployment),
    ReconcileStatus(SimpleApp, Deployment),
    Done,
}

impl SimpleAppReconcileStep {
    pub fn is_done(&self) -> bool {
        matches!(self, SimpleAppReconcileStep::Done)
    }
}

// Data we want access to in error/reconcile calls
pub struct Data<C> {
    pub api: C,
    pub route_class: Arc<dyn RouteClassSource>,
    pub error_requeue: Duration,
}

/// Runs one full pass for the SimpleApp `namespace/name`.
///
/// A SimpleApp that no longer exists ends the pass successfully: its dependents are
/// removed by the garbage collector through their owner references.
pub async fn reconcile_with<C: ObjectApi>(
    namespace: &str,
    name: &str,
    ctx: &Data<C>,
) -> Result<(), Error> {
    let log_header = format!("Reconciling SimpleApp {}/{}:", namespace, name);
    let mut step = SimpleAppReconcileStep::Fetch;
    while !step.is_done() {
        step = reconcile_core(namespace, name, ctx, step)
            .await
            .map_err(|err| {
                info!("{} error: {}", log_header, err);
                err
            })?;
    }
    info!("{} done", log_header);
    Ok(())
}

async fn reconcile_core<C: ObjectApi>(
    namespace: &str,
    name: &str,
    ctx: &Data<C>,
    step: SimpleAppReconcileStep,
) -> Result<SimpleAppReconcileStep, Error> {
    match step {
        SimpleAppReconcileStep::Fetch => {
            let app = ctx
                .api
                .get_opt::<SimpleApp>(namespace, name)
                .await
                .map_err(Error::GetSimpleAppFailed)?;
            match app {
                Some(app) => Ok(SimpleAppReconcileStep::EnsureWorkload(app)),
                None => {
                    info!("{}/{} not found, end reconcile", namespace, name);
                    Ok(SimpleAppReconcileStep::Done)
                }
            }
        }
        SimpleAppReconcileStep::EnsureWorkload(app) => {
            let deployment = ensure_workload(&app, &ctx.api).await?.into_inner();
            Ok(SimpleAppReconcileStep::EnsureEndpoint(app, deployment))
        }
        SimpleAppReconcileStep::EnsureEndpoint(app, deployment) => {
            ensure_endpoint(&app, &ctx.api).await?;
            Ok(SimpleAppReconcileStep::EnsureRoute(app, deployment))
        }
        SimpleAppReconcileStep::EnsureRoute(app, deployment) => {
            ensure_route(&app, &ctx.api, ctx.route_class.as_ref()).await?;
            Ok(SimpleAppReconcileStep::ReconcileStatus(app, deployment))
        }
        SimpleAppReconcileStep::ReconcileStatus(mut app, deployment) => {
            let observed = deployment
                .status
                .as_ref()
                .and_then(|status| status.ready_replicas)
                .unwrap_or(0);
            let stored = app
                .status
                .as_ref()
                .map(|status| status.ready_replicas)
                .unwrap_or(0);
            if observed != stored {
                info!(
                    "Update status of {}/{}: readyReplicas {} -> {}",
                    namespace, name, stored, observed
                );
                app.status.get_or_insert_with(Default::default).ready_replicas = observed;
                ctx.api
                    .replace_status(namespace, name, &app)
                    .await
                    .map_err(Error::UpdateStatusFailed)?;
            }
            Ok(SimpleAppReconcileStep::Done)
        }
        SimpleAppReconcileStep::Done => Ok(SimpleAppReconcileStep::Done),
    }
}

/// Controller triggers this whenever our main object or our children changed
pub async fn reconcile<C: ObjectApi>(app: Arc<SimpleApp>, ctx: Arc<Data<C>>) -> Result<Action, Error> {
    let name = app
        .metadata
        .name
        .as_ref()
        .ok_or_else(|| Error::MissingObjectKey(".metadata.name"))?;
    let namespace = app
        .metadata
        .namespace
        .as_ref()
        .ok_or_else(|| Error::MissingObjectKey(".metadata.namespace"))?;

    reconcile_with(namespace, name, &ctx).await?;
    Ok(Action::await_change())
}

/// The controller triggers this on reconcile errors
pub fn error_policy<C: ObjectApi>(_app: Arc<SimpleApp>, error: &Error, ctx: Arc<Data<C>>) -> Action {
    warn!("Reconcile failed due to error: {}", error);
    Action::requeue(ctx.error_requeue)
}

fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    match namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    }
}

/// Watches SimpleApps and the Deployments, Services and Ingresses they own, and
/// runs a reconcile pass for every SimpleApp whose state changed.
pub async fn run_controller(config: &ControllerConfig) -> Result<()> {
    let client = Client::try_default().await?;
    let namespace = config.namespace.as_deref();
    let apps = scoped_api::<SimpleApp>(client.clone(), namespace);
    let data = Arc::new(Data {
        api: KubeObjectApi::new(client.clone()),
        route_class: Arc::new(EnvRouteClass::new(config.ingress_class_env.clone())),
        error_requeue: config.error_requeue(),
    });

    info!(
        "starting simpleapp-controller (namespace: {}, ingress class from ${})",
        namespace.unwrap_or("<all>"),
        config.ingress_class_env
    );
    Controller::new(apps, ListParams::default())
        .owns(
            scoped_api::<Deployment>(client.clone(), namespace),
            ListParams::default(),
        )
        .owns(
            scoped_api::<Service>(client.clone(), namespace),
            ListParams::default(),
        )
        .owns(
            scoped_api::<Ingress>(client.clone(), namespace),
            ListParams::default(),
        )
        .shutdown_on_signal()
        .run(
            reconcile::<KubeObjectApi>,
            error_policy::<KubeObjectApi>,
            data,
        )
        .for_each(|res| async move {
            match res {
                Ok((app, _)) => info!(simpleapp = %app, "reconciled"),
                Err(e) => warn!("simpleapp reconcile failed: {}", e),
            }
        })
        .await;
    info!("controller terminated");
    Ok(())
}
