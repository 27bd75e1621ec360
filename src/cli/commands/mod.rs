pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

// 32 MiB
const DEFAULT_MAX_UPLOAD_SIZE_ARG: &str = "33554432";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("filekeep")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("6969")
                .env("FILEKEEP_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("FILEKEEP_DSN")
                .required(true),
        )
        .arg(
            Arg::new("uploads-dir")
                .long("uploads-dir")
                .help("Directory where uploaded files are stored")
                .default_value("uploads")
                .env("FILEKEEP_UPLOADS_DIR"),
        )
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("Secret used to sign and verify bearer tokens")
                .long_help(
                    "Secret used to sign and verify bearer tokens. Without it login fails and every bearer token is rejected.",
                )
                .env("FILEKEEP_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("max-upload-size")
                .long("max-upload-size")
                .help("Maximum upload request body size in bytes")
                .default_value(DEFAULT_MAX_UPLOAD_SIZE_ARG)
                .env("FILEKEEP_MAX_UPLOAD_SIZE")
                .value_parser(clap::value_parser!(usize)),
        );

    logging::with_args(command)
}
