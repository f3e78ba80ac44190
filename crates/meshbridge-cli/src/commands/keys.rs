use std::path::Path;

use meshbridge_config::{ConfigLoader, NodeConfig, PrivateKey};
use meshbridge_core::{MeshError, Result};
use meshbridge_stack::{addr_for_key, subnet_cidr};

pub(super) fn cmd_genkey(show_address: bool) -> Result<()> {
    let key = PrivateKey::generate()?;
    println!("{}", key.to_hex());
    if show_address {
        let public = key.public_key();
        println!("public key: {}", public.to_hex());
        println!("address:    {}", addr_for_key(&public));
        println!("subnet:     {}", subnet_cidr(&public));
    }
    Ok(())
}

pub(super) fn cmd_genconf(peers: Vec<String>) -> Result<()> {
    let mut config = NodeConfig::generate()?;
    config.peers = peers;
    // Surface bad peers now rather than at `run`.
    if let Err(reason) = config.validate() {
        return Err(MeshError::ConfigValidation {
            field: "Peers".into(),
            reason,
        });
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub(super) fn cmd_address(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = ConfigLoader::load(config_path)?;
    let Some(bytes) = config.private_key.as_deref() else {
        return Err(MeshError::InvalidArgument(
            "config has no PrivateKey, the address would be ephemeral".into(),
        ));
    };
    let public = PrivateKey::from_bytes(bytes)?.public_key();
    let address = addr_for_key(&public);

    if json {
        let out = serde_json::json!({
            "address": address.to_string(),
            "subnet": subnet_cidr(&public),
            "public_key": public.to_hex(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{address}");
    }
    Ok(())
}
