use crate::cli::actions::{server::Args, Action};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

use crate::cli::globals::DEFAULT_MAX_UPLOAD_SIZE;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(6969);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let uploads_dir = matches
        .get_one::<String>("uploads-dir")
        .map_or_else(|| PathBuf::from("uploads"), PathBuf::from);

    let jwt_secret = matches
        .get_one::<String>("jwt-secret")
        .filter(|secret| !secret.is_empty())
        .map(|secret| SecretString::from(secret.clone()));

    let max_upload_size = matches
        .get_one::<usize>("max-upload-size")
        .copied()
        .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);

    Ok(Action::Server(Args {
        port,
        dsn,
        uploads_dir,
        jwt_secret,
        max_upload_size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn builds_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "filekeep",
            "--dsn",
            "postgres://localhost/filekeep",
            "--port",
            "7000",
            "--uploads-dir",
            "/tmp/files",
            "--jwt-secret",
            "s3cret",
        ]);

        let Action::Server(args) = handler(&matches).unwrap();
        assert_eq!(args.port, 7000);
        assert_eq!(args.dsn, "postgres://localhost/filekeep");
        assert_eq!(args.uploads_dir, PathBuf::from("/tmp/files"));
        assert!(args.jwt_secret.is_some());
    }

    #[test]
    fn empty_secret_is_unset() {
        temp_env::with_vars([("FILEKEEP_JWT_SECRET", Some(""))], || {
            let matches = commands::new().get_matches_from(vec![
                "filekeep",
                "--dsn",
                "postgres://localhost/filekeep",
            ]);

            let Action::Server(args) = handler(&matches).unwrap();
            assert!(args.jwt_secret.is_none());
        });
    }
}
