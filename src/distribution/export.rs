//! Writes certificate material in the certbot `live/` layout:
//!
//! ```text
//! <root>/live/
//! ├── README
//! └── <lineage>/
//!     ├── README
//!     ├── cert.pem
//!     ├── chain.pem
//!     ├── fullchain.pem
//!     └── privkey.pem
//! ```

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Component, Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};

use crate::core::material::CertificateMaterial;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
#[cfg(not(unix))]
use log::warn;

pub const LIVE_DIRNAME: &str = "live";
pub const CERT_FILENAME: &str = "cert.pem";
pub const CHAIN_FILENAME: &str = "chain.pem";
pub const FULLCHAIN_FILENAME: &str = "fullchain.pem";
pub const PRIVKEY_FILENAME: &str = "privkey.pem";
pub const README_FILENAME: &str = "README";

const README_CONTENTS: &str = "\
This directory contains your keys and certificates.

`privkey.pem`  : the private key for your certificate.
`fullchain.pem`: the certificate file used in most server software.
`chain.pem`    : used for OCSP stapling in Nginx >=1.3.7.
`cert.pem`     : will break many server configurations, and should not be used
                 without reading further documentation.
";

const LIVE_README_CONTENTS: &str = "\
This directory contains your keys and certificates.

`[cert name]/privkey.pem`  : the private key for your certificate.
`[cert name]/fullchain.pem`: the certificate file used in most server software.
`[cert name]/chain.pem`    : used for OCSP stapling in Nginx >=1.3.7.
`[cert name]/cert.pem`     : will break many server configurations, and should not be used
                 without reading further documentation.
";

/// Writes `<root>/live/README` and the lineage directory under it, and
/// returns the `live` directory path. Every file is created fresh with owner-only permissions.
pub fn write_live_layout(
    root: &Path,
    lineage: &str,
    material: &CertificateMaterial,
) -> Result<PathBuf> {
    validate_folder_name(lineage)?;
    let live_dir = root.join(LIVE_DIRNAME);
    let output_dir = live_dir.join(lineage);
    fs::create_dir_all(&output_dir).with_context(|| {
        format!(
            "failed to create certificate directory at {}",
            output_dir.display()
        )
    })?;

    write_secure_file(&live_dir.join(README_FILENAME), LIVE_README_CONTENTS.as_bytes())?;
    write_secure_file(&output_dir.join(README_FILENAME), README_CONTENTS.as_bytes())?;
    write_secure_file(
        &output_dir.join(CERT_FILENAME),
        material.certificate.as_bytes(),
    )?;
    write_secure_file(
        &output_dir.join(CHAIN_FILENAME),
        material.certificate_chain.as_bytes(),
    )?;
    write_secure_file(
        &output_dir.join(FULLCHAIN_FILENAME),
        material.fullchain().as_bytes(),
    )?;
    write_secure_file(
        &output_dir.join(PRIVKEY_FILENAME),
        material.private_key.as_bytes(),
    )?;

    Ok(live_dir)
}

fn validate_folder_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("lineage name cannot be empty"));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(anyhow!("lineage name must be a single path segment")),
    }
}

fn write_secure_file(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    ensure_permissions(path)?;
    Ok(())
}

fn ensure_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let desired = fs::Permissions::from_mode(0o600);
        let metadata = fs::metadata(path)?;
        let current = metadata.permissions();
        if current.mode() & 0o777 != 0o600 {
            fs::set_permissions(path, desired).with_context(|| {
                format!(
                    "failed to set restrictive permissions on {}",
                    path.display()
                )
            })?;
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(err) = fs::metadata(path) {
            warn!(
                "[export] warning: unable to confirm permissions for {}: {}",
                path.display(),
                err
            );
        }
    }
    Ok(())
}
