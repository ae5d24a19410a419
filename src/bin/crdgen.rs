//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions of the operator as YAML.
//!
//! ```bash
//! # All definitions, separated by `---`
//! crdgen > config/crd/all.yaml
//!
//! # A single kind
//! crdgen --kind KeycloakClient
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use keycloak_operator::crd::{Keycloak, KeycloakClient, KeycloakRealm, KeycloakUser};
use kube::CustomResourceExt;

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "PascalCase")]
enum Kind {
    Keycloak,
    KeycloakRealm,
    KeycloakClient,
    KeycloakUser,
}

impl Kind {
    fn crd(self) -> CustomResourceDefinition {
        match self {
            Self::Keycloak => Keycloak::crd(),
            Self::KeycloakRealm => KeycloakRealm::crd(),
            Self::KeycloakClient => KeycloakClient::crd(),
            Self::KeycloakUser => KeycloakUser::crd(),
        }
    }
}

/// Keycloak operator CRD generator
#[derive(Debug, Parser)]
#[command(name = "crdgen")]
#[command(about = "Print the Keycloak operator CRDs as YAML", long_about = None)]
struct Cli {
    /// Only print this kind (defaults to every kind)
    #[arg(short, long, value_enum)]
    kind: Option<Kind>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let kinds = match cli.kind {
        Some(kind) => vec![kind],
        None => Kind::value_variants().to_vec(),
    };

    let documents = kinds
        .into_iter()
        .map(|kind| serde_yaml::to_string(&kind.crd()))
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", documents.join("---\n"));
    Ok(())
}
