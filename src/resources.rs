// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::api::networking::v1 as networkingv1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{ObjectMeta, Resource};
use std::collections::BTreeMap;

use crate::common::*;
use crate::simpleapp_types::*;

// Desired state of every object owned by a SimpleApp. These are pure functions of
// the SimpleApp: the same input always produces the same objects, which keeps the
// diffs in the reconciler stable.

/// Controller owner reference that lets the garbage collector delete the object
/// together with its SimpleApp.
pub fn make_owner_references(app: &SimpleApp) -> Option<Vec<metav1::OwnerReference>> {
    app.controller_owner_ref(&()).map(|oref| vec![oref])
}

pub fn make_deployment(app: &SimpleApp) -> appsv1::Deployment {
    appsv1::Deployment {
        metadata: ObjectMeta {
            name: Some(deployment_name(app)),
            namespace: app.meta().namespace.clone(),
            owner_references: make_owner_references(app),
            ..ObjectMeta::default()
        },
        spec: Some(appsv1::DeploymentSpec {
            replicas: Some(app.spec.replicas),
            selector: metav1::LabelSelector {
                match_labels: Some(app_labels(app)),
                ..metav1::LabelSelector::default()
            },
            template: corev1::PodTemplateSpec {
                metadata: Some(metav1::ObjectMeta {
                    labels: Some(app_labels(app)),
                    ..metav1::ObjectMeta::default()
                }),
                spec: Some(make_pod_spec(app)),
            },
            ..appsv1::DeploymentSpec::default()
        }),
        ..appsv1::Deployment::default()
    }
}

fn make_pod_spec(app: &SimpleApp) -> corev1::PodSpec {
    corev1::PodSpec {
        containers: vec![corev1::Container {
            name: CONTAINER_NAME.to_string(),
            image: Some(app.spec.image.clone()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            ports: Some(vec![corev1::ContainerPort {
                container_port: app.spec.container_port,
                ..corev1::ContainerPort::default()
            }]),
            ..corev1::Container::default()
        }],
        ..corev1::PodSpec::default()
    }
}

pub fn make_service(app: &SimpleApp) -> corev1::Service {
    corev1::Service {
        metadata: ObjectMeta {
            name: Some(service_name(app)),
            namespace: app.meta().namespace.clone(),
            owner_references: make_owner_references(app),
            ..ObjectMeta::default()
        },
        spec: Some(corev1::ServiceSpec {
            selector: Some(app_labels(app)),
            ports: Some(vec![corev1::ServicePort {
                port: app.spec.service_port,
                target_port: Some(IntOrString::Int(app.spec.container_port)),
                ..corev1::ServicePort::default()
            }]),
            type_: Some("ClusterIP".to_string()),
            ..corev1::ServiceSpec::default()
        }),
        ..corev1::Service::default()
    }
}

pub fn make_ingress(app: &SimpleApp, ingress_class: &str) -> networkingv1::Ingress {
    networkingv1::Ingress {
        metadata: ObjectMeta {
            name: Some(ingress_name(app)),
            namespace: app.meta().namespace.clone(),
            annotations: Some(BTreeMap::from([(
                LEGACY_INGRESS_CLASS_ANNOTATION.to_string(),
                ingress_class.to_string(),
            )])),
            owner_references: make_owner_references(app),
            ..ObjectMeta::default()
        },
        spec: Some(networkingv1::IngressSpec {
            ingress_class_name: Some(ingress_class.to_string()),
            rules: Some(vec![networkingv1::IngressRule {
                host: Some(ingress_host(app)),
                http: Some(networkingv1::HTTPIngressRuleValue {
                    paths: vec![networkingv1::HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: networkingv1::IngressBackend {
                            service: Some(networkingv1::IngressServiceBackend {
                                name: service_name(app),
                                port: Some(networkingv1::ServiceBackendPort {
                                    number: Some(app.spec.service_port),
                                    ..networkingv1::ServiceBackendPort::default()
                                }),
                            }),
                            ..networkingv1::IngressBackend::default()
                        },
                    }],
                }),
            }]),
            ..networkingv1::IngressSpec::default()
        }),
        ..networkingv1::Ingress::default()
    }
}
