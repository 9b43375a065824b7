// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServicePort};
use k8s_openapi::api::networking::v1::Ingress;
use tracing::*;

use crate::common::*;
use crate::error::Error;
use crate::resources::*;
use crate::route_class::RouteClassSource;
use crate::shim_layer::ObjectApi;
use crate::simpleapp_types::*;

// Each ensure_* function brings one dependent of a SimpleApp to its desired state:
// create it when it is missing, otherwise compare a fixed, narrow set of fields and
// replace the live object only when one of them drifted. Fields outside that set
// (labels, selectors, ingress rules) are owned by whoever edits them after creation.

/// What an ensure step did to the object it manages.
#[derive(Debug, Clone, PartialEq)]
pub enum Ensured<K> {
    Created(K),
    Updated(K),
    Unchanged(K),
}

impl<K> Ensured<K> {
    pub fn into_inner(self) -> K {
        match self {
            Ensured::Created(obj) | Ensured::Updated(obj) | Ensured::Unchanged(obj) => obj,
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, Ensured::Unchanged(_))
    }
}

fn deployment_replicas(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|spec| spec.replicas)
}

fn deployment_image(deployment: &Deployment) -> Option<&str> {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod_spec| pod_spec.containers.first())
        .and_then(|container| container.image.as_deref())
}

fn first_service_port(service: &Service) -> Option<&ServicePort> {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
}

fn ingress_class_name(ingress: &Ingress) -> Option<&str> {
    ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.ingress_class_name.as_deref())
}

pub async fn ensure_workload<C: ObjectApi>(
    app: &SimpleApp,
    api: &C,
) -> Result<Ensured<Deployment>, Error> {
    let namespace = app_namespace(app)?;
    let desired = make_deployment(app);
    let name = deployment_name(app);
    let existing = api
        .get_opt::<Deployment>(&namespace, &name)
        .await
        .map_err(Error::ReconcileDeploymentFailed)?;

    match existing {
        None => {
            info!("Create deployment: {}/{}", namespace, name);
            let created = api
                .create(&namespace, &desired)
                .await
                .map_err(Error::ReconcileDeploymentFailed)?;
            Ok(Ensured::Created(created))
        }
        Some(mut existing) => {
            if deployment_replicas(&existing) == deployment_replicas(&desired)
                && deployment_image(&existing) == deployment_image(&desired)
            {
                debug!("Deployment {}/{} is up to date", namespace, name);
                return Ok(Ensured::Unchanged(existing));
            }

            // Replicas and image are written together, nothing else is touched.
            let image = deployment_image(&desired).map(str::to_string);
            let spec = existing.spec.get_or_insert_with(Default::default);
            spec.replicas = deployment_replicas(&desired);
            let pod_spec = spec.template.spec.get_or_insert_with(Default::default);
            match pod_spec.containers.first_mut() {
                Some(container) => container.image = image,
                None => {
                    pod_spec.containers = desired
                        .spec
                        .and_then(|spec| spec.template.spec)
                        .map(|pod_spec| pod_spec.containers)
                        .unwrap_or_default()
                }
            }

            info!(
                "Update deployment: {}/{} (replicas: {}, image: {})",
                namespace, name, app.spec.replicas, app.spec.image
            );
            let updated = api
                .replace(&namespace, &name, &existing)
                .await
                .map_err(Error::ReconcileDeploymentFailed)?;
            Ok(Ensured::Updated(updated))
        }
    }
}

pub async fn ensure_endpoint<C: ObjectApi>(
    app: &SimpleApp,
    api: &C,
) -> Result<Ensured<Service>, Error> {
    let namespace = app_namespace(app)?;
    let desired = make_service(app);
    let name = service_name(app);
    let existing = api
        .get_opt::<Service>(&namespace, &name)
        .await
        .map_err(Error::ReconcileServiceFailed)?;

    match existing {
        None => {
            info!("Create service: {}/{}", namespace, name);
            let created = api
                .create(&namespace, &desired)
                .await
                .map_err(Error::ReconcileServiceFailed)?;
            Ok(Ensured::Created(created))
        }
        Some(mut existing) => {
            let in_sync = match (first_service_port(&existing), first_service_port(&desired)) {
                (Some(live), Some(wanted)) => {
                    live.port == wanted.port && live.target_port == wanted.target_port
                }
                _ => false,
            };
            if in_sync {
                debug!("Service {}/{} is up to date", namespace, name);
                return Ok(Ensured::Unchanged(existing));
            }

            info!(
                "Update service ports: {}/{} ({} -> {})",
                namespace, name, app.spec.service_port, app.spec.container_port
            );
            existing.spec.get_or_insert_with(Default::default).ports =
                desired.spec.and_then(|spec| spec.ports);
            let updated = api
                .replace(&namespace, &name, &existing)
                .await
                .map_err(Error::ReconcileServiceFailed)?;
            Ok(Ensured::Updated(updated))
        }
    }
}

/// Returns `Ok(None)` when no ingress class is configured. An Ingress created while
/// a class was configured is left as it is in that case.
pub async fn ensure_route<C: ObjectApi>(
    app: &SimpleApp,
    api: &C,
    route_class: &dyn RouteClassSource,
) -> Result<Option<Ensured<Ingress>>, Error> {
    let ingress_class = match route_class.resolve() {
        Some(ingress_class) => ingress_class,
        None => {
            debug!("No ingress class configured, skip ingress for {}", deployment_name(app));
            return Ok(None);
        }
    };

    let namespace = app_namespace(app)?;
    let desired = make_ingress(app, &ingress_class);
    let name = ingress_name(app);
    let existing = api
        .get_opt::<Ingress>(&namespace, &name)
        .await
        .map_err(Error::ReconcileIngressFailed)?;

    match existing {
        None => {
            info!(
                "Create ingress: {}/{} (class: {})",
                namespace, name, ingress_class
            );
            let created = api
                .create(&namespace, &desired)
                .await
                .map_err(Error::ReconcileIngressFailed)?;
            Ok(Some(Ensured::Created(created)))
        }
        Some(mut existing) => {
            if ingress_class_name(&existing) == Some(ingress_class.as_str()) {
                debug!("Ingress {}/{} is up to date", namespace, name);
                return Ok(Some(Ensured::Unchanged(existing)));
            }

            info!(
                "Update ingress class: {}/{} ({:?} -> {})",
                namespace,
                name,
                ingress_class_name(&existing),
                ingress_class
            );
            existing
                .spec
                .get_or_insert_with(Default::default)
                .ingress_class_name = Some(ingress_class);
            let updated = api
                .replace(&namespace, &name, &existing)
                .await
                .map_err(Error::ReconcileIngressFailed)?;
            Ok(Some(Ensured::Updated(updated)))
        }
    }
}
