use std::process::ExitCode;

use florist::flower::Flower;
use florist::flowers::{AptPackages, AuthorizedKeys};
use florist::provisioner::Provisioner;

const AUTHORIZED_KEYS: &str = "authorized-keys";

fn main() -> ExitCode {
    Provisioner::new(|registry| {
        let flowers: Vec<Box<dyn Flower>> = vec![
            Box::new(AptPackages::new(["openssh-server", "curl", "ca-certificates"])),
            Box::new(AuthorizedKeys::default()),
        ];
        registry.add_flowers(flowers)?;
        Ok(())
    })
    .with_pre_configure(|registry, settings| {
        if let Some(flower) = registry.flower_mut::<AuthorizedKeys>(AUTHORIZED_KEYS) {
            flower.keys = settings.get("authorized_keys");
        }
        Ok(())
    })
    .main()
}
