//! # Signing Subcommands
//!
//! - `keygen`: Write an Ed25519 seed and public key as hex files.
//! - `sign`: Append an enveloped signature to a manifest or event.
//! - `verify`: Check a signed document against a public key.
//!
//! Key files hold a single hex line: 64 characters for the seed
//! (`<prefix>.key`), 64 for the public key (`<prefix>.pub`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use mdfe_core::Element;
use mdfe_crypto::{verify_signature, Ed25519DocumentSigner, Ed25519KeyPair, Ed25519PublicKey, Signer};

use crate::manifest::emit_output;

/// Arguments for `mdfe keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Directory to write the key files into.
    #[arg(long, default_value = ".")]
    pub output: PathBuf,
    /// File name prefix.
    #[arg(long, default_value = "mdfe")]
    pub prefix: String,
    /// Overwrite existing key files.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `mdfe sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Document to sign.
    pub document: PathBuf,
    /// Seed file written by `keygen`.
    #[arg(long)]
    pub key: PathBuf,
    /// Local name of the element to sign.
    #[arg(long, default_value = "infMDFe")]
    pub tag: String,
    /// Write the signed document here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `mdfe verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Signed document.
    pub document: PathBuf,
    /// Public key file written by `keygen`.
    #[arg(long)]
    pub pubkey: PathBuf,
}

fn read_hex(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    Ok(content.trim().to_string())
}

pub(crate) fn read_document(path: &Path) -> Result<Element> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Element::parse(&xml).with_context(|| format!("failed to parse {}", path.display()))
}

/// Execute `mdfe keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key_path = args.output.join(format!("{}.key", args.prefix));
    let pub_path = args.output.join(format!("{}.pub", args.prefix));
    if !args.force && (key_path.exists() || pub_path.exists()) {
        bail!(
            "key files already exist under {} (use --force to overwrite)",
            args.output.display()
        );
    }
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;

    let pair = Ed25519KeyPair::generate();
    std::fs::write(&key_path, format!("{}\n", pair.seed_hex()))
        .with_context(|| format!("failed to write {}", key_path.display()))?;
    std::fs::write(&pub_path, format!("{}\n", pair.public_key().to_hex()))
        .with_context(|| format!("failed to write {}", pub_path.display()))?;

    println!("OK: wrote {} and {}", key_path.display(), pub_path.display());
    Ok(0)
}

/// Execute `mdfe sign`.
pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let pair = Ed25519KeyPair::from_seed_hex(&read_hex(&args.key)?).context("invalid seed file")?;
    let document = read_document(&args.document)?;
    let signer = Ed25519DocumentSigner::new(pair);
    let signed = signer
        .sign(&document, &args.tag)
        .with_context(|| format!("cannot sign {}", args.tag))?;
    emit_output(&signed.to_document(), args.out.as_deref())?;
    Ok(0)
}

/// Execute `mdfe verify`. Returns 2 when the signature does not verify.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let public_key = Ed25519PublicKey::from_hex(&read_hex(&args.pubkey)?).context("invalid public key file")?;
    let document = read_document(&args.document)?;
    match verify_signature(&document, &public_key) {
        Ok(()) => {
            println!("OK: signature valid");
            Ok(0)
        }
        Err(e) => {
            println!("INVALID: {e}");
            Ok(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_document(dir: &Path) -> PathBuf {
        let path = dir.join("event.xml");
        std::fs::write(
            &path,
            "<eventoMDFe versao=\"3.00\"><infEvento Id=\"ID1101114114058145288000013958001000000028161174316601\">\
             <tpEvento>110111</tpEvento></infEvento></eventoMDFe>",
        )
        .unwrap();
        path
    }

    #[test]
    fn keygen_sign_verify_round() {
        let dir = tempfile::tempdir().unwrap();
        run_keygen(&KeygenArgs {
            output: dir.path().to_path_buf(),
            prefix: "test".into(),
            force: false,
        })
        .unwrap();
        let seed = std::fs::read_to_string(dir.path().join("test.key")).unwrap();
        assert_eq!(seed.trim().len(), 64);

        let signed = dir.path().join("signed.xml");
        run_sign(&SignArgs {
            document: event_document(dir.path()),
            key: dir.path().join("test.key"),
            tag: "infEvento".into(),
            out: Some(signed.clone()),
        })
        .unwrap();
        let code = run_verify(&VerifyArgs {
            document: signed.clone(),
            pubkey: dir.path().join("test.pub"),
        })
        .unwrap();
        assert_eq!(code, 0);

        // Tamper with the signed content.
        let tampered = std::fs::read_to_string(&signed)
            .unwrap()
            .replace("110111", "110112");
        std::fs::write(&signed, tampered).unwrap();
        let code = run_verify(&VerifyArgs {
            document: signed,
            pubkey: dir.path().join("test.pub"),
        })
        .unwrap();
        assert_eq!(code, 2);
    }

    #[test]
    fn keygen_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let args = KeygenArgs {
            output: dir.path().to_path_buf(),
            prefix: "k".into(),
            force: false,
        };
        run_keygen(&args).unwrap();
        assert!(run_keygen(&args).is_err());
        run_keygen(&KeygenArgs { force: true, ..args }).unwrap();
    }

    #[test]
    fn sign_missing_tag_fails() {
        let dir = tempfile::tempdir().unwrap();
        run_keygen(&KeygenArgs {
            output: dir.path().to_path_buf(),
            prefix: "k".into(),
            force: false,
        })
        .unwrap();
        let result = run_sign(&SignArgs {
            document: event_document(dir.path()),
            key: dir.path().join("k.key"),
            tag: "infMDFe".into(),
            out: None,
        });
        assert!(result.is_err());
    }
}
