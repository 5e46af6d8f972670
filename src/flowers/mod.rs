//! Flowers shipped with the crate, used by the `florist` binary.

mod apt_packages;
mod authorized_keys;

pub use apt_packages::AptPackages;
pub use authorized_keys::AuthorizedKeys;

use crate::assets::EmbeddedAssets;

/// Every file under `assets/`, addressed as `<flower>/<file>`.
pub(crate) static ASSETS: EmbeddedAssets = crate::embed_assets!("assets" => [
    "authorized_keys/authorized_keys.tmpl",
]);
