use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::fmt;
use std::fmt::Formatter;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// FtpsConfig shows how TLS security is configured for the server or a
// particular channel.
#[derive(Clone)]
pub enum FtpsConfig {
    Off,
    Building { certs_file: PathBuf, key_file: PathBuf },
    On { tls_config: Arc<ServerConfig> },
}

impl fmt::Debug for FtpsConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FtpsConfig::Off => write!(f, "Off"),
            FtpsConfig::Building { .. } => write!(f, "Building"),
            FtpsConfig::On { .. } => write!(f, "On"),
        }
    }
}

pub fn new_config<P: AsRef<Path>>(certs_file: P, key_file: P) -> std::io::Result<Arc<ServerConfig>> {
    let certs: Vec<CertificateDer<'static>> = load_certs(certs_file)?;
    let privkey: PrivateKeyDer<'static> = load_private_key(key_file)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, privkey)
        .map_err(std::io::Error::other)?;

    Ok(Arc::new(config))
}

fn load_certs<P: AsRef<Path>>(filename: P) -> std::io::Result<Vec<CertificateDer<'static>>> {
    let certfile: File = File::open(filename)?;
    let mut reader: BufReader<File> = BufReader::new(certfile);
    rustls_pemfile::certs(&mut reader).collect()
}

fn load_private_key<P: AsRef<Path>>(filename: P) -> std::io::Result<PrivateKeyDer<'static>> {
    let keyfile = File::open(&filename)?;
    let mut reader = BufReader::new(keyfile);
    rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| std::io::Error::other("no private key found in PEM file"))
}
