//! Secrets command - encryption keys, file encryption and random tokens.

use crate::cli::args::{CryptFileArgs, SecretsAction, SecretsArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::security::{generate_key, generate_secure_token, validate_key, Encryptor};

/// Execute the secrets command
pub async fn execute(args: SecretsArgs, config: Config) -> AppResult<()> {
    match args.action {
        SecretsAction::GenerateKey => println!("{}", generate_key()),
        SecretsAction::GenerateToken { length } => println!("{}", generate_secure_token(length)),
        SecretsAction::EncryptFile(file) => {
            encryptor(&file, &config)?
                .encrypt_file(&file.input, &file.output)
                .await?;
            tracing::info!(input = %file.input.display(), output = %file.output.display(), "File encrypted");
        }
        SecretsAction::DecryptFile(file) => {
            encryptor(&file, &config)?
                .decrypt_file(&file.input, &file.output)
                .await?;
            tracing::info!(input = %file.input.display(), output = %file.output.display(), "File decrypted");
        }
    }

    Ok(())
}

fn encryptor(args: &CryptFileArgs, config: &Config) -> AppResult<Encryptor> {
    if let Some(key) = args.key.as_deref() {
        if !validate_key(key) {
            return Err(AppError::bad_request("Encryption key must be at least 16 bytes"));
        }
    }
    Ok(Encryptor::resolve(args.key.as_deref(), Some(config)))
}
