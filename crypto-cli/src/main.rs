use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crypto_ops::{CryptoConfig, TextEncoding};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "cryptops")]
#[command(version, about = "Hashing, encryption, signatures, key derivation and MACs from the command line.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hashes input (argument or stdin)
    Digest {
        /// sha-256, sha-384, sha-512, sha3-256, sha3-512, blake3, md5, sha-1
        #[arg(short, long, env = "CRYPTO_DIGEST_ALGORITHM")]
        algorithm: Option<String>,

        /// Output encoding: hex, base64, base64url
        #[arg(short, long, default_value = "hex")]
        encoding: TextEncoding,

        input: Option<String>,
    },

    /// Computes or checks an HMAC tag
    Mac {
        /// File holding an HMAC key
        #[arg(short, long, value_name = "PATH")]
        key: PathBuf,

        /// Tag to check instead of computing one
        #[arg(long, value_name = "TAG")]
        verify: Option<String>,

        input: Option<String>,
    },

    /// Base64 transport encoding
    #[command(subcommand)]
    Base64(Base64Command),

    /// Generates keys
    #[command(subcommand)]
    Keygen(KeygenCommand),

    /// Encrypts to a symmetric or public key
    Encrypt {
        #[arg(short, long, value_name = "PATH")]
        key: PathBuf,

        /// Associated data bound to the ciphertext (symmetric keys only)
        #[arg(long)]
        aad: Option<String>,

        input: Option<String>,
    },

    /// Decrypts a ciphertext produced by `encrypt`
    Decrypt {
        #[arg(short, long, value_name = "PATH")]
        key: PathBuf,

        #[arg(long)]
        aad: Option<String>,

        ciphertext: Option<String>,
    },

    /// Signs input with a private key
    Sign {
        #[arg(short, long, value_name = "PATH")]
        key: PathBuf,

        /// rsa-pkcs1-sha256, rsa-pss-sha256, ecdsa-p256-sha256, ed25519
        #[arg(short, long)]
        scheme: Option<String>,

        input: Option<String>,
    },

    /// Verifies a signature; exits non-zero when it does not match
    Verify {
        #[arg(short, long, value_name = "PATH")]
        key: PathBuf,

        #[arg(long, value_name = "SIGNATURE")]
        signature: String,

        input: Option<String>,
    },

    /// Derives key material from a password
    Derive {
        /// pbkdf2-sha256, pbkdf2-sha512, argon2id, scrypt
        #[arg(short, long, env = "CRYPTO_KDF_ALGORITHM")]
        algorithm: Option<String>,

        /// Base64 salt; a random 16-byte salt is used when omitted
        #[arg(long)]
        salt: Option<String>,

        /// Cost override, e.g. `i=600000`, `m=19456,t=2,p=1`, `ln=17,r=8,p=1`
        #[arg(long)]
        cost: Option<String>,

        /// Output length in bytes
        #[arg(short, long, default_value_t = 32)]
        length: usize,

        /// Read from stdin when omitted, keeping it out of the process list
        password: Option<String>,
    },

    /// Password storage hashes
    #[command(subcommand)]
    Password(PasswordCommand),

    /// Encrypts input of any size to a public key (JSON envelope)
    Seal {
        #[arg(short, long, value_name = "PATH")]
        key: PathBuf,

        input: Option<String>,
    },

    /// Opens an envelope produced by `seal`
    Open {
        #[arg(short, long, value_name = "PATH")]
        key: PathBuf,

        envelope: Option<String>,
    },

    /// Walks through derive, encrypt, decrypt, sign and verify
    Demo,
}

#[derive(Debug, Subcommand)]
enum Base64Command {
    Encode {
        /// URL-safe alphabet without padding
        #[arg(long, default_value_t = false)]
        url: bool,

        input: Option<String>,
    },
    Decode {
        #[arg(long, default_value_t = false)]
        url: bool,

        input: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum KeygenCommand {
    /// Cipher or HMAC key
    Symmetric {
        /// aes-gcm, chacha20-poly1305, hmac-sha256, hmac-sha384, hmac-sha512
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Key size in bits (AES: 128 or 256)
        #[arg(short, long)]
        bits: Option<usize>,

        /// Write the key here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Public/private key pair
    Pair {
        /// rsa, ec-p256, ed25519
        #[arg(short, long, default_value = "ed25519")]
        algorithm: String,

        /// RSA modulus bits; P-256 and Ed25519 take 256
        #[arg(short, long)]
        bits: Option<usize>,

        #[arg(long, value_name = "PATH")]
        public: PathBuf,

        #[arg(long, value_name = "PATH")]
        private: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum PasswordCommand {
    Hash {
        /// argon2id or bcrypt
        #[arg(short, long, default_value = "argon2id")]
        algorithm: String,

        /// Read from stdin when omitted, keeping it out of the process list
        password: Option<String>,
    },
    /// Exits non-zero when the password does not match
    Verify {
        #[arg(long, value_name = "HASH")]
        hash: String,

        /// Read from stdin when omitted, keeping it out of the process list
        password: Option<String>,
    },
}

fn init_tracing() {
    // Logs go to stderr so stdout stays parseable
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let args = Cli::parse();
    let config = CryptoConfig::from_env().context("invalid CRYPTO_* environment")?;
    tracing::debug!(?config, "Loaded configuration");

    let ok = match args.command {
        Commands::Digest {
            algorithm,
            encoding,
            input,
        } => commands::digest(&config, algorithm.as_deref(), encoding, input)?,
        Commands::Mac { key, verify, input } => commands::mac(&key, verify.as_deref(), input)?,
        Commands::Base64(Base64Command::Encode { url, input }) => commands::base64_encode(url, input)?,
        Commands::Base64(Base64Command::Decode { url, input }) => commands::base64_decode(url, input)?,
        Commands::Keygen(KeygenCommand::Symmetric { algorithm, bits, out }) => {
            commands::keygen_symmetric(&config, algorithm.as_deref(), bits, out.as_deref())?
        }
        Commands::Keygen(KeygenCommand::Pair {
            algorithm,
            bits,
            public,
            private,
        }) => commands::keygen_pair(&config, &algorithm, bits, &public, &private)?,
        Commands::Encrypt { key, aad, input } => commands::encrypt(&key, aad.as_deref(), input)?,
        Commands::Decrypt { key, aad, ciphertext } => commands::decrypt(&key, aad.as_deref(), ciphertext)?,
        Commands::Sign { key, scheme, input } => commands::sign(&key, scheme.as_deref(), input)?,
        Commands::Verify { key, signature, input } => commands::verify(&key, &signature, input)?,
        Commands::Derive {
            algorithm,
            salt,
            cost,
            length,
            password,
        } => commands::derive(
            &config,
            algorithm.as_deref(),
            salt.as_deref(),
            cost.as_deref(),
            length,
            password,
        )?,
        Commands::Password(PasswordCommand::Hash { algorithm, password }) => {
            commands::password_hash(&config, &algorithm, password)?
        }
        Commands::Password(PasswordCommand::Verify { hash, password }) => commands::password_verify(&hash, password)?,
        Commands::Seal { key, input } => commands::seal(&key, input)?,
        Commands::Open { key, envelope } => commands::open(&key, envelope)?,
        Commands::Demo => commands::demo()?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
