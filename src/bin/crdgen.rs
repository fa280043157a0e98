//! Prints the catalog's CustomResourceDefinitions as a multi-document YAML stream.

use anyhow::Result;
use kubernetes_service_catalog::apis;

fn main() -> Result<()> {
    for crd in apis::crds() {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
