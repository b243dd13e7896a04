//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions owned by the operator as one
//! multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > deploy/crds.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use codebase_operator::crd::{CDStageDeploy, Codebase, CodebaseBranch, CodebaseImageStream};
use kube::core::CustomResourceExt;

fn main() {
    let crds = [
        Codebase::crd(),
        CodebaseBranch::crd(),
        CodebaseImageStream::crd(),
        CDStageDeploy::crd(),
    ];

    for crd in &crds {
        match serde_yaml::to_string(crd) {
            Ok(yaml) => print!("---\n{yaml}"),
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
