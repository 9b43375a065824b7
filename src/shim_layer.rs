// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use core::fmt::Debug;
use kube::{
    api::{Api, PostParams},
    Client, Resource,
};
use kube_core::NamespaceResourceScope;
use serde::{de::DeserializeOwned, Serialize};

// The shim layer is the only place the reconciler talks to the Kubernetes API.
// Reconcile logic is written against ObjectApi so that it runs unchanged on top of
// kube-rs (KubeObjectApi) or on top of the in-memory API server model in tests.

pub trait NamespacedObject:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> NamespacedObject for K where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[async_trait]
pub trait ObjectApi: Send + Sync {
    /// Returns `Ok(None)` when the object does not exist.
    async fn get_opt<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error>;

    async fn create<K: NamespacedObject>(&self, namespace: &str, obj: &K)
        -> Result<K, kube::Error>;

    async fn replace<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, kube::Error>;

    /// Writes only the status subresource of `obj`.
    async fn replace_status<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, kube::Error>;
}

#[derive(Clone)]
pub struct KubeObjectApi {
    client: Client,
}

impl KubeObjectApi {
    pub fn new(client: Client) -> Self {
        KubeObjectApi { client }
    }
}

#[async_trait]
impl ObjectApi for KubeObjectApi {
    async fn get_opt<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error> {
        Api::<K>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
    }

    async fn create<K: NamespacedObject>(
        &self,
        namespace: &str,
        obj: &K,
    ) -> Result<K, kube::Error> {
        Api::<K>::namespaced(self.client.clone(), namespace)
            .create(&PostParams::default(), obj)
            .await
    }

    async fn replace<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, kube::Error> {
        Api::<K>::namespaced(self.client.clone(), namespace)
            .replace(name, &PostParams::default(), obj)
            .await
    }

    async fn replace_status<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, kube::Error> {
        let data = serde_json::to_vec(obj).map_err(kube::Error::SerdeError)?;
        Api::<K>::namespaced(self.client.clone(), namespace)
            .replace_status(name, &PostParams::default(), data)
            .await
    }
}
