use std::fmt;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use reqwest::Method;

use crate::args::parse_header_arg;

/// Authenticate once, then call a web API with the stored token
#[derive(Parser, Debug)]
#[command(name = "webapi", author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose mode. Can be used multiple times to increase verbosity.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the config file
    #[arg(long, env = "WEBAPI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Authenticate and save the access token
    #[command(alias = "auth", arg_required_else_help = true)]
    Session(SessionArgs),

    /// Call the API with the saved access token
    #[command(arg_required_else_help = true)]
    Call(CallArgs),

    /// Discard the saved access token
    Logout(TargetArgs),

    /// Show version, paths and the active token store
    Env,
}

#[derive(Args)]
pub struct SessionArgs {
    /// Host name or IP address
    #[arg(long)]
    pub host: String,

    /// Port number
    #[arg(short, long, default_value_t = webapi_core::auth::DEFAULT_PORT)]
    pub port: u16,

    /// Username
    #[arg(short = 'U', long = "user")]
    pub username: String,

    /// Password (prompted for when omitted)
    #[arg(short = 'P', long = "pass")]
    pub password: Option<String>,

    /// Print the token as shell `export` lines instead of saving it
    #[arg(long = "env")]
    pub export_to_env: bool,

    /// Keep the password in the OS keychain to renew expired sessions
    #[arg(long)]
    pub remember: bool,
}

// Hand-written so the password never shows up in debug output
impl fmt::Debug for SessionArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionArgs")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("export_to_env", &self.export_to_env)
            .field("remember", &self.remember)
            .finish()
    }
}

#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Host name or IP address (defaults to the last session)
    #[arg(long)]
    pub host: Option<String>,

    /// Port number
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// HTTP method
    #[arg(value_parser = parse_method_arg)]
    pub method: Method,

    /// Request path, starting with '/'
    #[arg(value_parser = parse_path_arg)]
    pub path: String,

    /// Request headers (in "Host: example.com" format)
    #[arg(short = 'H', long = "header", value_parser = parse_header_arg)]
    pub headers: Vec<(String, String)>,

    /// Request body; '@file' reads it from a file
    #[arg(short = 'B', long)]
    pub body: Option<String>,

    /// Send the body verbatim instead of as JSON
    #[arg(long)]
    pub raw: bool,

    /// Show curl command line
    #[arg(long)]
    pub curl: bool,

    /// Show response header
    #[arg(long)]
    pub show_header: bool,

    /// Pretty printing output
    #[arg(short, long)]
    pub pretty: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

fn parse_method_arg(raw: &str) -> Result<Method, String> {
    webapi_core::api::parse_method(raw).map_err(|e| e.to_string())
}

fn parse_path_arg(raw: &str) -> Result<String, String> {
    if raw.starts_with('/') {
        Ok(raw.to_string())
    } else {
        Err(format!("{}: must start with '/'", raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.to_vec()).expect("valid arguments")
    }

    #[test]
    fn test_session_args() {
        let cli = parse(&["webapi", "session", "--host", "h", "--user", "u", "--pass", "p"]);
        match cli.command {
            Command::Session(args) => {
                assert_eq!(args.host, "h");
                assert_eq!(args.port, 443);
                assert_eq!(args.username, "u");
                assert_eq!(args.password.as_deref(), Some("p"));
                assert!(!args.export_to_env);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_auth_alias_and_env_flag() {
        let cli = parse(&["webapi", "auth", "--host", "h", "-p", "8443", "-U", "u", "--env"]);
        match cli.command {
            Command::Session(args) => {
                assert_eq!(args.port, 8443);
                assert!(args.password.is_none());
                assert!(args.export_to_env);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_session_args_debug_hides_password() {
        let cli = parse(&["webapi", "session", "--host", "h", "-U", "u", "-P", "hunter2"]);
        let shown = format!("{:?}", cli.command);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("****"));
    }

    #[test]
    fn test_call_args() {
        let cli = parse(&[
            "webapi", "-vv", "call", "post", "//resource", "-H", "a: alpha", "-H", "b:bravo",
            "-B", "{}", "--pretty",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.method, Method::POST);
                assert_eq!(args.path, "//resource");
                assert_eq!(
                    args.headers,
                    vec![
                        ("a".to_string(), "alpha".to_string()),
                        ("b".to_string(), "bravo".to_string())
                    ]
                );
                assert_eq!(args.body.as_deref(), Some("{}"));
                assert!(args.pretty);
                assert!(args.target.host.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_call_rejects_bad_input() {
        assert!(Cli::try_parse_from(["webapi", "call", "GET", "x"]).is_err());
        assert!(Cli::try_parse_from(["webapi", "call", "FETCH", "/x"]).is_err());
        assert!(Cli::try_parse_from(["webapi", "call", "GET", "/x", "-H", "novalue"]).is_err());
    }
}
