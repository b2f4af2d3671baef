//! Prints the `Application` CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/application.yaml`

use crds::Application;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    let crd = Application::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
