// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::shim_layer::{NamespacedObject, ObjectApi};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

// ApiServerModel is a small in-memory stand-in for the Kubernetes API server.
// It keeps the behaviors the reconciler depends on: uid and resourceVersion
// assignment, AlreadyExists on duplicate create, NotFound on replace of a missing
// object, Conflict on a stale resourceVersion, and status being written only
// through the status subresource. Objects are stored in their JSON form.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Replace,
    ReplaceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub verb: Verb,
    pub kind: String,
    pub name: String,
}

type ObjectKey = (String, String, String);

#[derive(Default)]
struct ApiServerState {
    objects: BTreeMap<ObjectKey, Value>,
    resource_version: u64,
    next_uid: u64,
    mutations: Vec<Mutation>,
    faults: Vec<(Verb, String)>,
}

impl ApiServerState {
    fn next_resource_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }

    fn take_fault(&mut self, verb: Verb, kind: &str) -> Option<kube::Error> {
        let pos = self
            .faults
            .iter()
            .position(|(v, k)| *v == verb && k == kind)?;
        self.faults.remove(pos);
        Some(api_error(
            "InternalError",
            500,
            format!("injected {:?} failure for {}", verb, kind),
        ))
    }
}

#[derive(Default)]
pub struct ApiServerModel {
    state: Mutex<ApiServerState>,
}

fn kind_of<K: NamespacedObject>() -> String {
    K::kind(&()).to_string()
}

fn key_of<K: NamespacedObject>(namespace: &str, name: &str) -> ObjectKey {
    (kind_of::<K>(), namespace.to_string(), name.to_string())
}

fn api_error(reason: &str, code: u16, message: String) -> kube::Error {
    kube::Error::Api(kube_core::ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

fn to_value<K: NamespacedObject>(obj: &K) -> Result<Value, kube::Error> {
    serde_json::to_value(obj).map_err(kube::Error::SerdeError)
}

fn from_value<K: NamespacedObject>(value: &Value) -> Result<K, kube::Error> {
    serde_json::from_value(value.clone()).map_err(kube::Error::SerdeError)
}

fn metadata_mut(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    if !value["metadata"].is_object() {
        value["metadata"] = Value::Object(serde_json::Map::new());
    }
    value["metadata"].as_object_mut().unwrap()
}

fn resource_version_of(value: &Value) -> Option<&str> {
    value["metadata"]["resourceVersion"].as_str()
}

impl ApiServerModel {
    pub fn new() -> Self {
        ApiServerModel::default()
    }

    fn lock(&self) -> MutexGuard<'_, ApiServerState> {
        self.state.lock().unwrap()
    }

    /// Stores `obj` as if some other client created it, status included.
    /// Not recorded as a mutation.
    pub fn insert<K: NamespacedObject>(&self, obj: K) -> K {
        let mut state = self.lock();
        let mut value = to_value(&obj).unwrap();
        let namespace = obj.meta().namespace.clone().unwrap();
        let name = obj.meta().name.clone().unwrap();
        state.next_uid += 1;
        let uid = format!("uid-{}", state.next_uid);
        let rv = state.next_resource_version();
        let metadata = metadata_mut(&mut value);
        metadata.entry("uid").or_insert(Value::String(uid));
        metadata.insert("resourceVersion".to_string(), Value::String(rv));
        state
            .objects
            .insert(key_of::<K>(&namespace, &name), value.clone());
        from_value(&value).unwrap()
    }

    pub fn get<K: NamespacedObject>(&self, namespace: &str, name: &str) -> Option<K> {
        self.lock()
            .objects
            .get(&key_of::<K>(namespace, name))
            .map(|value| from_value(value).unwrap())
    }

    /// Edits a stored object the way another actor would (a user or a built-in
    /// controller). Not recorded as a mutation.
    pub fn modify<K: NamespacedObject>(&self, namespace: &str, name: &str, f: impl FnOnce(&mut K)) {
        let mut state = self.lock();
        let key = key_of::<K>(namespace, name);
        let mut obj: K = from_value(state.objects.get(&key).unwrap()).unwrap();
        f(&mut obj);
        let mut value = to_value(&obj).unwrap();
        let rv = state.next_resource_version();
        metadata_mut(&mut value).insert("resourceVersion".to_string(), Value::String(rv));
        state.objects.insert(key, value);
    }

    pub fn remove<K: NamespacedObject>(&self, namespace: &str, name: &str) {
        self.lock().objects.remove(&key_of::<K>(namespace, name));
    }

    pub fn count<K: NamespacedObject>(&self) -> usize {
        let kind = kind_of::<K>();
        self.lock()
            .objects
            .keys()
            .filter(|(k, _, _)| *k == kind)
            .count()
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().mutations.len()
    }

    /// Makes the next `verb` call on an object of kind `K` fail with InternalError.
    pub fn inject_fault<K: NamespacedObject>(&self, verb: Verb) {
        self.lock().faults.push((verb, kind_of::<K>()));
    }
}

#[async_trait]
impl ObjectApi for ApiServerModel {
    async fn get_opt<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, kube::Error> {
        let mut state = self.lock();
        if let Some(err) = state.take_fault(Verb::Get, &kind_of::<K>()) {
            return Err(err);
        }
        state
            .objects
            .get(&key_of::<K>(namespace, name))
            .map(from_value)
            .transpose()
    }

    async fn create<K: NamespacedObject>(&self, namespace: &str, obj: &K) -> Result<K, kube::Error> {
        let mut state = self.lock();
        let kind = kind_of::<K>();
        if let Some(err) = state.take_fault(Verb::Create, &kind) {
            return Err(err);
        }
        let name = obj
            .meta()
            .name
            .clone()
            .ok_or_else(|| api_error("Invalid", 422, "name is required".to_string()))?;
        let key = key_of::<K>(namespace, &name);
        if state.objects.contains_key(&key) {
            return Err(api_error(
                "AlreadyExists",
                409,
                format!("{} {} already exists", kind, name),
            ));
        }
        let mut value = to_value(obj)?;
        if let Some(fields) = value.as_object_mut() {
            fields.remove("status");
        }
        state.next_uid += 1;
        let uid = format!("uid-{}", state.next_uid);
        let rv = state.next_resource_version();
        let metadata = metadata_mut(&mut value);
        metadata.insert("namespace".to_string(), Value::String(namespace.to_string()));
        metadata.insert("uid".to_string(), Value::String(uid));
        metadata.insert("resourceVersion".to_string(), Value::String(rv));
        state.objects.insert(key, value.clone());
        state.mutations.push(Mutation {
            verb: Verb::Create,
            kind,
            name,
        });
        from_value(&value)
    }

    async fn replace<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, kube::Error> {
        self.write(Verb::Replace, namespace, name, obj)
    }

    async fn replace_status<K: NamespacedObject>(
        &self,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, kube::Error> {
        self.write(Verb::ReplaceStatus, namespace, name, obj)
    }
}

impl ApiServerModel {
    fn write<K: NamespacedObject>(
        &self,
        verb: Verb,
        namespace: &str,
        name: &str,
        obj: &K,
    ) -> Result<K, kube::Error> {
        let mut state = self.lock();
        let kind = kind_of::<K>();
        if let Some(err) = state.take_fault(verb, &kind) {
            return Err(err);
        }
        let key = key_of::<K>(namespace, name);
        let stored = match state.objects.get(&key) {
            Some(stored) => stored.clone(),
            None => {
                return Err(api_error(
                    "NotFound",
                    404,
                    format!("{} {} not found", kind, name),
                ))
            }
        };
        let incoming = to_value(obj)?;
        if let Some(rv) = resource_version_of(&incoming) {
            if Some(rv) != resource_version_of(&stored) {
                return Err(api_error(
                    "Conflict",
                    409,
                    format!("{} {} has been modified", kind, name),
                ));
            }
        }

        // A spec write keeps the stored status; a status write keeps everything else.
        let mut value = match verb {
            Verb::ReplaceStatus => {
                let mut value = stored.clone();
                value["status"] = incoming["status"].clone();
                value
            }
            _ => {
                let mut value = incoming;
                match stored.get("status") {
                    Some(status) => value["status"] = status.clone(),
                    None => {
                        if let Some(fields) = value.as_object_mut() {
                            fields.remove("status");
                        }
                    }
                }
                value["metadata"]["uid"] = stored["metadata"]["uid"].clone();
                value
            }
        };
        let rv = state.next_resource_version();
        metadata_mut(&mut value).insert("resourceVersion".to_string(), Value::String(rv));
        state.objects.insert(key, value.clone());
        state.mutations.push(Mutation {
            verb,
            kind,
            name: name.to_string(),
        });
        from_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use kube::api::ObjectMeta;

    fn make_config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        }
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let model = ApiServerModel::new();
        let created = model
            .create("default", &make_config_map("cm"))
            .await
            .unwrap();
        assert!(created.metadata.uid.is_some());
        assert!(created.metadata.resource_version.is_some());

        let err = model
            .create("default", &make_config_map("cm"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            kube::Error::Api(kube_core::ErrorResponse { code: 409, .. })
        ));
        assert_eq!(model.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_replace_detects_stale_resource_version() {
        let model = ApiServerModel::new();
        let stale = model.insert(make_config_map("cm"));
        model.modify::<ConfigMap>("default", "cm", |cm| {
            cm.data = Some(BTreeMap::from([("k".to_string(), "v".to_string())]));
        });

        let err = model.replace("default", "cm", &stale).await.unwrap_err();
        assert!(matches!(
            err,
            kube::Error::Api(kube_core::ErrorResponse { ref reason, .. }) if reason == "Conflict"
        ));
        assert_eq!(model.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_fault_fires_once() {
        let model = ApiServerModel::new();
        model.inject_fault::<ConfigMap>(Verb::Get);
        assert!(model.get_opt::<ConfigMap>("default", "cm").await.is_err());
        assert!(model
            .get_opt::<ConfigMap>("default", "cm")
            .await
            .unwrap()
            .is_none());
    }
}
