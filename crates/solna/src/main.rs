#![forbid(unsafe_code)]

//! Solna CLI: encrypt an element of an XML document in place.

use clap::{ArgGroup, Parser, Subcommand};
use solna::{encrypt_node, Document, EncryptOptions, Error, LongTermKey, NodeId};
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "solna",
    about = "Solna: in-place XML Encryption (XML-Enc) with hybrid keys",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace an element with EncryptedData
    #[command(group(ArgGroup::new("target").args(["id", "element"])))]
    Encrypt {
        /// Input XML file
        file: PathBuf,

        /// Key that encrypts the session key (PEM/DER RSA key or
        /// certificate, or a raw 16/24/32-byte AES key)
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Name written to KeyName
        #[arg(short = 'K', long = "key-name")]
        key_name: Option<String>,

        /// Certificate(s) written to X509Data (PEM or DER)
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Content encryption algorithm (short name or URI)
        #[arg(long, default_value = "aes256-cbc")]
        block: String,

        /// Key transport or key wrap algorithm (short name or URI)
        #[arg(long, default_value = "rsa-oaep-mgf1p")]
        transport: String,

        /// RSA-OAEP digest (only with rsa-oaep)
        #[arg(long = "oaep-digest")]
        oaep_digest: Option<String>,

        /// Encrypt the element with this Id attribute
        #[arg(long)]
        id: Option<String>,

        /// Encrypt the first element with this local name
        #[arg(long)]
        element: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List supported algorithms and key formats
    Info,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encrypt {
            file,
            key,
            key_name,
            cert,
            block,
            transport,
            oaep_digest,
            id,
            element,
            output,
            verbose,
        } => {
            init_tracing(verbose);
            cmd_encrypt(EncryptArgs {
                file,
                key,
                key_name,
                cert,
                block,
                transport,
                oaep_digest,
                id,
                element,
                output,
            })
        }
        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct EncryptArgs {
    file: PathBuf,
    key: PathBuf,
    key_name: Option<String>,
    cert: Option<PathBuf>,
    block: String,
    transport: String,
    oaep_digest: Option<String>,
    id: Option<String>,
    element: Option<String>,
    output: Option<PathBuf>,
}

fn cmd_encrypt(args: EncryptArgs) -> Result<(), Error> {
    let mut doc = Document::parse_bytes(&read_bytes(&args.file)?)?;
    let target = select_target(&doc, args.id.as_deref(), args.element.as_deref())?;

    let key_bytes = read_bytes(&args.key)?;
    let key = LongTermKey::new(&key_bytes, args.key_name.as_deref())?;
    let cert = args.cert.as_deref().map(read_bytes).transpose()?;

    let mut options = EncryptOptions::from_names(&args.block, &args.transport)?;
    if let Some(digest) = &args.oaep_digest {
        options = options.with_oaep_digest(digest)?;
    }

    debug!(file = %args.file.display(), block = options.block_encryption(), "encrypting");
    encrypt_node(&mut doc, target, &key, cert.as_deref(), &options)?;
    write_output(args.output.as_deref(), doc.to_xml_string().as_bytes())
}

fn select_target(doc: &Document, id: Option<&str>, element: Option<&str>) -> Result<NodeId, Error> {
    let found = match (id, element) {
        (Some(id), _) => doc.find_by_id(id),
        (None, Some(name)) => doc.find_by_name(name),
        (None, None) => doc.document_element(),
    };
    found.ok_or_else(|| {
        Error::Other(match (id, element) {
            (Some(id), _) => format!("no element with Id {id:?}"),
            (None, Some(name)) => format!("no element named {name:?}"),
            (None, None) => "document has no root element".into(),
        })
    })
}

fn cmd_info() -> Result<(), Error> {
    println!("Solna: in-place XML Encryption");
    println!();
    println!("Content encryption (--block):");
    println!("  aes128-cbc, aes192-cbc, aes256-cbc, tripledes-cbc");
    println!("  aes128-gcm, aes192-gcm, aes256-gcm");
    println!();
    println!("Key transport (--transport):");
    println!("  rsa-1_5, rsa-oaep-mgf1p, rsa-oaep (--oaep-digest sha1|sha256|sha384|sha512)");
    println!();
    println!("Key wrap (--transport, pre-shared AES key):");
    println!("  kw-aes128, kw-aes192, kw-aes256");
    println!();
    println!("Key formats:");
    println!("  PEM, DER (RSA PKCS#8/PKCS#1, SPKI, X.509), raw binary (AES)");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    Ok(std::fs::read(path).map_err(|e| with_path(path, e))?)
}

fn write_output(path: Option<&Path>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(p, data).map_err(|e| with_path(p, e))?,
        None => {
            use std::io::Write;
            std::io::stdout().write_all(data)?;
        }
    }
    Ok(())
}

/// Prefix an I/O error with the file it concerns, keeping its kind.
fn with_path(path: &Path, e: std::io::Error) -> std::io::Error {
    std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))
}
