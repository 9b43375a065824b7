// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod common;
pub mod config;
pub mod controller;
pub mod error;
pub mod reconciler;
pub mod resources;
pub mod route_class;
pub mod shim_layer;
pub mod simpleapp_types;
pub mod submit;

#[cfg(test)]
pub mod executable_model;

pub use error::Error;
