//! Prints the StatefulSetWorkload CRD as YAML
//!
//! Usage: `cargo run -p crds --bin crdgen > statefulsetworkload.crd.yaml`

use crds::StatefulSetWorkload;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crd = StatefulSetWorkload::crd();
    print!("{}", serde_yaml::to_string(&crd)?);
    Ok(())
}
