// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::{Parser, Subcommand};
use kube::{Client, CustomResourceExt};
use tracing::*;
use tracing_subscriber::EnvFilter;

use simpleapp_controller::config::ControllerConfig;
use simpleapp_controller::controller::run_controller;
use simpleapp_controller::simpleapp_types::SimpleApp;
use simpleapp_controller::submit::{
    apply_simple_app, delete_simple_app, list_simple_apps, ApplicationForm, DEFAULT_NAMESPACE,
};

#[derive(Parser)]
#[command(name = "simpleapp-controller", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the SimpleApp custom resource definition
    Export,
    /// Run the controller
    Run(ControllerConfig),
    /// Create or update a SimpleApp from plain field values
    Apply(ApplicationForm),
    /// List SimpleApps in all namespaces as JSON
    List,
    /// Delete a SimpleApp
    Delete {
        name: String,
        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,
    },
}

/// The CRD manifest printed by `export`, ready for `kubectl apply -f -`.
fn crd_yaml() -> Result<String> {
    Ok(serde_yaml::to_string(&SimpleApp::crd())?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Export => {
            info!("exporting custom resource definition");
            print!("{}", crd_yaml()?);
        }
        Command::Run(config) => {
            info!("running simpleapp-controller");
            run_controller(&config).await?;
        }
        Command::Apply(form) => {
            let app = form.render()?;
            let client = Client::try_default().await?;
            let applied = apply_simple_app(client, &app).await?;
            println!("{}", serde_yaml::to_string(&applied)?);
        }
        Command::List => {
            let client = Client::try_default().await?;
            println!("{}", serde_json::to_string_pretty(&list_simple_apps(client).await)?);
        }
        Command::Delete { name, namespace } => {
            let client = Client::try_default().await?;
            delete_simple_app(client, &namespace, &name).await?;
            println!("simpleapp \"{}\" deleted", name);
        }
    }
    Ok(())
}
