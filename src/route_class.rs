// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
#[cfg(test)]
use std::sync::RwLock;

pub const DEFAULT_INGRESS_CLASS_ENV: &str = "INGRESS_CLASS_NAME";

/// Source of the ingress class that every managed Ingress should use.
///
/// `resolve` is called once per reconcile and must not cache: the class can change
/// between two reconciles when the controller's deployment configuration changes.
/// `None` means no Ingress is wanted.
pub trait RouteClassSource: Send + Sync {
    fn resolve(&self) -> Option<String>;
}

/// Reads the class from an environment variable of the controller process.
#[derive(Debug, Clone)]
pub struct EnvRouteClass {
    var: String,
}

impl EnvRouteClass {
    pub fn new(var: impl Into<String>) -> Self {
        EnvRouteClass { var: var.into() }
    }
}

impl Default for EnvRouteClass {
    fn default() -> Self {
        EnvRouteClass::new(DEFAULT_INGRESS_CLASS_ENV)
    }
}

impl RouteClassSource for EnvRouteClass {
    fn resolve(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|class| !class.is_empty())
    }
}

/// An in-process class that can be swapped between reconciles.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FixedRouteClass {
    class: RwLock<Option<String>>,
}

#[cfg(test)]
impl FixedRouteClass {
    pub fn new(class: Option<&str>) -> Self {
        FixedRouteClass {
            class: RwLock::new(class.map(str::to_string)),
        }
    }

    pub fn set(&self, class: Option<&str>) {
        let mut guard = match self.class.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = class.map(str::to_string);
    }
}

#[cfg(test)]
impl RouteClassSource for FixedRouteClass {
    fn resolve(&self) -> Option<String> {
        let guard = match self.class.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().filter(|class| !class.is_empty())
    }
}
