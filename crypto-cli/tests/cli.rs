use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn bin() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cryptops"));
    // Keep password hashing fast under test
    cmd.env("CRYPTO_BCRYPT_COST", "4")
        .env("CRYPTO_ARGON2_MEMORY_KIB", "1024")
        .env("CRYPTO_ARGON2_ITERATIONS", "1")
        .env_remove("CRYPTO_DIGEST_ALGORITHM")
        .env_remove("CRYPTO_KDF_ALGORITHM");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn keygen_pair(algorithm: &str, public: &Path, private: &Path) {
    bin()
        .args(["keygen", "pair", "--algorithm", algorithm, "--public"])
        .arg(public)
        .arg("--private")
        .arg(private)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));
}

#[test]
fn digest_sha256_hex() {
    bin()
        .args(["digest", "Hello, World!"])
        .assert()
        .success()
        .stdout("dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f\n");
}

#[test]
fn digest_reads_stdin() {
    bin()
        .args(["digest", "--algorithm", "sha3-256"])
        .write_stdin("abc")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("3a985da74fe225b2045c172d6bd390bd"));
}

#[test]
fn digest_unknown_algorithm_fails() {
    bin()
        .args(["digest", "--algorithm", "whirlpool", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported algorithm"));
}

#[test]
fn base64_roundtrip() {
    bin()
        .args(["base64", "encode", "Hello, World!"])
        .assert()
        .success()
        .stdout("SGVsbG8sIFdvcmxkIQ==\n");

    bin()
        .args(["base64", "decode", "SGVsbG8sIFdvcmxkIQ=="])
        .assert()
        .success()
        .stdout("Hello, World!");

    bin().args(["base64", "decode", "not base64!"]).assert().failure();
}

#[test]
fn symmetric_encrypt_decrypt() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("aes.key");

    bin()
        .args(["keygen", "symmetric", "--out"])
        .arg(&key)
        .assert()
        .success()
        .stdout(predicate::str::contains("AES-256-GCM"));

    let ciphertext = stdout_of(bin().args(["encrypt", "--key"]).arg(&key).arg("Hello, World!"));
    assert!(ciphertext.starts_with("v1:AES-256-GCM:"));

    bin()
        .args(["decrypt", "--key"])
        .arg(&key)
        .arg(&ciphertext)
        .assert()
        .success()
        .stdout("Hello, World!");
}

#[test]
fn decrypt_with_wrong_key_fails() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("a.key");
    let other = dir.path().join("b.key");
    for path in [&key, &other] {
        bin().args(["keygen", "symmetric", "--out"]).arg(path).assert().success();
    }

    let ciphertext = stdout_of(bin().args(["encrypt", "--key"]).arg(&key).arg("secret"));
    bin()
        .args(["decrypt", "--key"])
        .arg(&other)
        .arg(&ciphertext)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn ecies_encrypt_decrypt() {
    let dir = tempdir().unwrap();
    let public = dir.path().join("ec.pub");
    let private = dir.path().join("ec.key");
    keygen_pair("ec-p256", &public, &private);

    let ciphertext = stdout_of(bin().args(["encrypt", "--key"]).arg(&public).arg("to the recipient"));
    assert!(ciphertext.starts_with("v1:ECIES-P256:"));

    bin()
        .args(["decrypt", "--key"])
        .arg(&private)
        .arg(&ciphertext)
        .assert()
        .success()
        .stdout("to the recipient");
}

#[test]
fn sign_and_verify() {
    let dir = tempdir().unwrap();
    let public = dir.path().join("ed.pub");
    let private = dir.path().join("ed.key");
    keygen_pair("ed25519", &public, &private);

    let signature = stdout_of(bin().args(["sign", "--key"]).arg(&private).arg("message"));
    assert!(signature.starts_with("v1:ED25519:"));

    bin()
        .args(["verify", "--key"])
        .arg(&public)
        .args(["--signature", &signature, "message"])
        .assert()
        .success()
        .stdout("valid\n");

    bin()
        .args(["verify", "--key"])
        .arg(&public)
        .args(["--signature", &signature, "massage"])
        .assert()
        .failure()
        .stdout("invalid\n");
}

#[test]
fn mac_tag_and_verify() {
    let dir = tempdir().unwrap();
    let key = dir.path().join("hmac.key");
    bin()
        .args(["keygen", "symmetric", "--algorithm", "hmac-sha256", "--out"])
        .arg(&key)
        .assert()
        .success();

    let tag = stdout_of(bin().args(["mac", "--key"]).arg(&key).arg("payload"));
    assert!(tag.starts_with("v1:HMAC-SHA256:"));

    bin()
        .args(["mac", "--key"])
        .arg(&key)
        .args(["--verify", &tag, "payload"])
        .assert()
        .success()
        .stdout("valid\n");

    bin()
        .args(["mac", "--key"])
        .arg(&key)
        .args(["--verify", &tag, "tampered"])
        .assert()
        .failure();
}

#[test]
fn derive_is_reproducible_with_salt() {
    let args = [
        "derive",
        "--algorithm",
        "pbkdf2-sha256",
        "--cost",
        "i=1000",
        "--salt",
        "MDEyMzQ1Njc4OWFiY2RlZg==",
        "password123",
    ];
    let first = stdout_of(bin().args(args));
    let second = stdout_of(bin().args(args));
    assert_eq!(first, second);
    assert!(first.starts_with("v1:PBKDF2-SHA256:i=1000:MDEyMzQ1Njc4OWFiY2RlZg==:"));
}

#[test]
fn derive_rejects_short_salt() {
    bin()
        .args(["derive", "--algorithm", "pbkdf2-sha256", "--cost", "i=1000", "--salt", "c2FsdA==", "pw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Weak salt"));
}

#[test]
fn password_hash_and_verify() {
    for algorithm in ["bcrypt", "argon2id"] {
        let hash = stdout_of(bin().args(["password", "hash", "--algorithm", algorithm, "hunter2"]));

        bin()
            .args(["password", "verify", "--hash", &hash, "hunter2"])
            .assert()
            .success()
            .stdout("valid\n");

        bin()
            .args(["password", "verify", "--hash", &hash, "hunter3"])
            .assert()
            .failure()
            .stdout("invalid\n");
    }
}

#[test]
fn passwords_can_come_from_stdin() {
    let hash = stdout_of(bin().args(["password", "hash", "--algorithm", "bcrypt"]).write_stdin("hunter2\n"));

    bin()
        .args(["password", "verify", "--hash", &hash])
        .write_stdin("hunter2\r\n")
        .assert()
        .success()
        .stdout("valid\n");
    bin()
        .args(["password", "verify", "--hash", &hash, "hunter2"])
        .assert()
        .success();

    let args = ["derive", "--algorithm", "pbkdf2-sha256", "--cost", "i=1000", "--salt", "MDEyMzQ1Njc4OWFiY2RlZg=="];
    let from_stdin = stdout_of(bin().args(args).write_stdin("password123\n"));
    let from_arg = stdout_of(bin().args(args).arg("password123"));
    assert_eq!(from_stdin, from_arg);
}

#[test]
fn seal_and_open() {
    let dir = tempdir().unwrap();
    let public = dir.path().join("ec.pub");
    let private = dir.path().join("ec.key");
    keygen_pair("ec-p256", &public, &private);

    let payload = "x".repeat(10_000);
    let envelope = stdout_of(bin().args(["seal", "--key"]).arg(&public).write_stdin(payload.clone()));
    assert!(envelope.contains("\"wrapped_key\""));

    bin()
        .args(["open", "--key"])
        .arg(&private)
        .write_stdin(envelope)
        .assert()
        .success()
        .stdout(payload);
}

#[test]
fn invalid_environment_is_reported() {
    bin()
        .env("CRYPTO_DIGEST_ALGORITHM", "md5")
        .args(["digest", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CRYPTO_"));
}

#[test]
fn demo_runs_end_to_end() {
    bin()
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("decrypted:  Hello, World!"))
        .stdout(predicate::str::contains("verified:   true"));
}
