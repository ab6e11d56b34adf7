use anyhow::{bail, Context, Result};
use crypto_ops::asymmetric::{self, KeyPairAlgorithm};
use crypto_ops::digest::{self, DigestAlgorithm};
use crypto_ops::kdf::{self, CostParams, KdfAlgorithm};
use crypto_ops::mac::{self, MacAlgorithm};
use crypto_ops::password::{self, PasswordAlgorithm};
use crypto_ops::signature::{self, SignatureScheme};
use crypto_ops::symmetric::{self, SymmetricAlgorithm};
use crypto_ops::{
    Ciphertext, CryptoConfig, HybridEnvelope, KeyAlgorithm, KeyMaterial, KeyRole, Mac, Signature, TextEncoding,
};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Argument if given, stdin otherwise
fn read_input(input: Option<String>) -> Result<Vec<u8>> {
    match input {
        Some(text) => Ok(text.into_bytes()),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn read_text(input: Option<String>) -> Result<String> {
    let bytes = read_input(input)?;
    let text = String::from_utf8(bytes).context("input is not UTF-8")?;
    Ok(text.trim().to_string())
}

/// Argument if given, otherwise stdin with the line ending removed
fn read_password(password: Option<String>) -> Result<Vec<u8>> {
    let mut bytes = read_input(password)?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }
    Ok(bytes)
}

fn load_key(path: &Path) -> Result<KeyMaterial> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read key file {}", path.display()))?;
    let key = KeyMaterial::from_text(text.trim()).with_context(|| format!("invalid key in {}", path.display()))?;
    debug!(path = %path.display(), algorithm = %key.algorithm(), role = %key.role(), "Loaded key");
    Ok(key)
}

fn write_key(path: &Path, key: &KeyMaterial) -> Result<()> {
    fs::write(path, key.to_text() + "\n").with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), algorithm = %key.algorithm(), role = %key.role(), "Wrote key");
    Ok(())
}

fn write_raw(bytes: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}

fn report(valid: bool) -> bool {
    println!("{}", if valid { "valid" } else { "invalid" });
    valid
}

pub fn digest(config: &CryptoConfig, algorithm: Option<&str>, encoding: TextEncoding, input: Option<String>) -> Result<bool> {
    let algorithm: DigestAlgorithm = match algorithm {
        Some(name) => name.parse()?,
        None => config.digest_algorithm,
    };
    let data = read_input(input)?;
    let digest = digest::digest(algorithm, &data);
    println!("{}", encoding.encode(digest.as_bytes()));
    Ok(true)
}

pub fn mac(key: &Path, verify: Option<&str>, input: Option<String>) -> Result<bool> {
    let key = load_key(key)?;
    let data = read_input(input)?;

    match verify {
        Some(text) => {
            let expected = Mac::from_text(text).context("invalid MAC")?;
            Ok(report(mac::verify(&key, &data, &expected)?))
        }
        None => {
            println!("{}", mac::tag(&key, &data)?.to_text());
            Ok(true)
        }
    }
}

fn base64_encoding(url: bool) -> TextEncoding {
    if url {
        TextEncoding::Base64Url
    } else {
        TextEncoding::Base64
    }
}

pub fn base64_encode(url: bool, input: Option<String>) -> Result<bool> {
    let data = read_input(input)?;
    println!("{}", base64_encoding(url).encode(&data));
    Ok(true)
}

pub fn base64_decode(url: bool, input: Option<String>) -> Result<bool> {
    let text = read_text(input)?;
    write_raw(&base64_encoding(url).decode(&text)?)?;
    Ok(true)
}

pub fn keygen_symmetric(
    config: &CryptoConfig,
    algorithm: Option<&str>,
    bits: Option<usize>,
    out: Option<&Path>,
) -> Result<bool> {
    let key = match algorithm {
        Some(name) if name.to_lowercase().starts_with("hmac") => mac::generate_key(name.parse::<MacAlgorithm>()?)?,
        Some(name) => symmetric::generate_key(name.parse::<SymmetricAlgorithm>()?, bits.unwrap_or(256))?,
        None => {
            let (algorithm, default_bits) = config
                .symmetric()
                .context("configured symmetric algorithm is not a cipher")?;
            symmetric::generate_key(algorithm, bits.unwrap_or(default_bits))?
        }
    };

    match out {
        Some(path) => {
            write_key(path, &key)?;
            println!("wrote {} key to {}", key.algorithm(), path.display());
        }
        None => println!("{}", key.to_text()),
    }
    Ok(true)
}

pub fn keygen_pair(
    config: &CryptoConfig,
    algorithm: &str,
    bits: Option<usize>,
    public: &Path,
    private: &Path,
) -> Result<bool> {
    let algorithm: KeyPairAlgorithm = algorithm.parse()?;
    let strength = bits.unwrap_or(match algorithm {
        KeyPairAlgorithm::Rsa => config.rsa_bits,
        _ => 256,
    });

    let (public_key, private_key) = asymmetric::generate_key_pair(algorithm, strength)?.into_parts();
    write_key(public, &public_key)?;
    write_key(private, &private_key)?;

    println!("wrote {} public key to {}", public_key.algorithm(), public.display());
    println!("wrote {} private key to {}", private_key.algorithm(), private.display());
    Ok(true)
}

pub fn encrypt(key: &Path, aad: Option<&str>, input: Option<String>) -> Result<bool> {
    let key = load_key(key)?;
    let plaintext = read_input(input)?;

    let ciphertext = match key.role() {
        KeyRole::Symmetric => symmetric::encrypt_with_aad(&key, &plaintext, aad.unwrap_or_default().as_bytes())?,
        KeyRole::Public if aad.is_none() => asymmetric::encrypt(&key, &plaintext)?,
        KeyRole::Public => bail!("--aad is only supported with symmetric keys"),
        KeyRole::Private => bail!("encrypt needs a symmetric or public key, got a private key"),
    };

    println!("{}", ciphertext.to_text());
    Ok(true)
}

pub fn decrypt(key: &Path, aad: Option<&str>, input: Option<String>) -> Result<bool> {
    let key = load_key(key)?;
    let ciphertext = Ciphertext::from_text(&read_text(input)?).context("invalid ciphertext")?;

    let plaintext = match key.role() {
        KeyRole::Symmetric => symmetric::decrypt_with_aad(&key, &ciphertext, aad.unwrap_or_default().as_bytes())?,
        KeyRole::Private => asymmetric::decrypt(&key, &ciphertext)?,
        KeyRole::Public => bail!("decrypt needs a symmetric or private key, got a public key"),
    };

    write_raw(&plaintext)?;
    Ok(true)
}

pub fn sign(key: &Path, scheme: Option<&str>, input: Option<String>) -> Result<bool> {
    let key = load_key(key)?;
    let message = read_input(input)?;

    let signature = match scheme {
        Some(name) => signature::sign_with(&key, name.parse::<SignatureScheme>()?, &message)?,
        None => signature::sign(&key, &message)?,
    };

    println!("{}", signature.to_text());
    Ok(true)
}

pub fn verify(key: &Path, signature: &str, input: Option<String>) -> Result<bool> {
    let key = load_key(key)?;
    let signature = Signature::from_text(signature).context("invalid signature")?;
    let message = read_input(input)?;
    Ok(report(signature::verify(&key, &message, &signature)?))
}

pub fn derive(
    config: &CryptoConfig,
    algorithm: Option<&str>,
    salt: Option<&str>,
    cost: Option<&str>,
    length: usize,
    password: Option<String>,
) -> Result<bool> {
    let password = read_password(password)?;
    let algorithm: KdfAlgorithm = match algorithm {
        Some(name) => name.parse()?,
        None => config.kdf_algorithm,
    };
    let cost: CostParams = match cost {
        Some(text) => text.parse()?,
        None => config.cost_for(algorithm),
    };
    let salt = match salt {
        Some(text) => TextEncoding::Base64.decode(text).context("invalid salt")?,
        None => kdf::generate_salt(config.salt_len()),
    };

    let derived = kdf::derive_with_timeout(
        &password,
        &salt,
        algorithm,
        &cost,
        length,
        config.derive_timeout,
    )?;
    println!("{}", derived.to_text());
    Ok(true)
}

pub fn password_hash(config: &CryptoConfig, algorithm: &str, password: Option<String>) -> Result<bool> {
    let algorithm: PasswordAlgorithm = algorithm.parse()?;
    let password = read_password(password)?;
    let hash = match algorithm {
        PasswordAlgorithm::Argon2id => password::hash_argon2id(&password, &config.argon2_cost())?,
        PasswordAlgorithm::Bcrypt => password::hash_bcrypt(&password, config.bcrypt_cost)?,
    };
    println!("{}", hash);
    Ok(true)
}

pub fn password_verify(hash: &str, password: Option<String>) -> Result<bool> {
    let password = read_password(password)?;
    Ok(report(password::verify_password(&password, hash)?))
}

pub fn seal(key: &Path, input: Option<String>) -> Result<bool> {
    let key = load_key(key)?;
    let plaintext = read_input(input)?;
    let envelope = crypto_ops::hybrid::seal(&key, &plaintext)?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(true)
}

pub fn open(key: &Path, input: Option<String>) -> Result<bool> {
    let key = load_key(key)?;
    let envelope = HybridEnvelope::from_json(&read_text(input)?)?;
    write_raw(&crypto_ops::hybrid::open(&key, &envelope)?)?;
    Ok(true)
}

/// Derive a key from a password, encrypt and decrypt with it, then hash,
/// authenticate and sign the same message
pub fn demo() -> Result<bool> {
    let message = b"Hello, World!";
    let password = b"password123";

    println!("message:    {}", String::from_utf8_lossy(message));

    let salt = kdf::generate_salt(kdf::MIN_SALT_LEN);
    let derived = kdf::derive(
        password,
        &salt,
        KdfAlgorithm::Pbkdf2Sha256,
        &CostParams::Pbkdf2 { iterations: 10_000 },
        32,
    )?;
    println!("derived:    {}", derived.to_text());

    let key = derived.to_symmetric_key(KeyAlgorithm::Aes256Gcm)?;
    let ciphertext = symmetric::encrypt(&key, message)?;
    println!("encrypted:  {}", ciphertext.to_text());

    let recovered = symmetric::decrypt(&key, &ciphertext)?;
    println!("decrypted:  {}", String::from_utf8_lossy(&recovered));
    if recovered != message {
        bail!("round trip produced different plaintext");
    }

    println!("sha-256:    {}", digest::digest(DigestAlgorithm::Sha256, message).to_hex());

    let mac_key = mac::key_from_bytes(MacAlgorithm::HmacSha256, b"supersecretkey")?;
    println!("hmac:       {}", mac::tag(&mac_key, message)?.to_hex());

    let pair = asymmetric::generate_key_pair(KeyPairAlgorithm::EcP256, 256)?;
    let sealed = asymmetric::encrypt(pair.public_key(), message)?;
    let opened = asymmetric::decrypt(pair.private_key(), &sealed)?;
    println!("ecies:      {}", String::from_utf8_lossy(&opened));

    let signing = asymmetric::generate_key_pair(KeyPairAlgorithm::Ed25519, 256)?;
    let signature = signature::sign(signing.private_key(), message)?;
    let valid = signature::verify(signing.public_key(), message, &signature)?;
    println!("signature:  {}", signature.to_text());
    println!("verified:   {}", valid);

    Ok(valid)
}
