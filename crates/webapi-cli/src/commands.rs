use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use webapi_core::auth::{
    Authenticator, PlaceholderAuthenticator, SecretStore, SessionOutput, DEFAULT_PORT,
};
use webapi_core::store::FileStore;
use webapi_core::{
    ApiCaller, ApiRequest, Config, Credentials, SessionManager, Target, TokenStore,
};

use crate::args::parse_body;
use crate::cli::{CallArgs, Cli, Command, SessionArgs, TargetArgs};
use crate::output::{header_lines, render_body, status_line};

/// Exit code for a completed call that returned a non-2xx status
const EXIT_HTTP_FAILURE: u8 = 1;

/// Credential exchange for this deployment. Swap in the target service's
/// backend here.
fn authenticator() -> Box<dyn Authenticator> {
    Box::new(PlaceholderAuthenticator)
}

struct AppContext {
    config: Config,
    config_path: PathBuf,
}

impl AppContext {
    fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => Config::config_path()?,
        };
        let config = Config::load_from(&config_path)?;
        Ok(Self {
            config,
            config_path,
        })
    }

    fn save_config(&self) -> Result<()> {
        self.config.save_to(&self.config_path)
    }
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let mut ctx = AppContext::load(cli.config)?;

    match cli.command {
        Command::Session(args) => session(&mut ctx, args).await,
        Command::Call(args) => call(&ctx, args).await,
        Command::Logout(args) => logout(&ctx, &args),
        Command::Env => env(&ctx),
    }
}

async fn session(ctx: &mut AppContext, args: SessionArgs) -> Result<ExitCode> {
    let target = Target::new(args.host.clone(), args.port);

    let password = match args.password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };
    let credentials = Credentials::new(args.username.clone(), password);

    let output = if args.export_to_env {
        SessionOutput::ShellExport {
            prefix: ctx.config.env_prefix(),
        }
    } else {
        SessionOutput::Store
    };

    // Sessions are always written to files; the env store only reads
    // what `--env` printed earlier.
    let store = TokenStore::File(FileStore::new(ctx.config.session_dir()));
    let manager = SessionManager::new(authenticator(), store);
    let acquired = manager.acquire_with(&target, &credentials, &output).await?;

    if args.remember {
        let stored = SecretStore::store(&target, credentials.identifier(), credentials.secret());
        log_remembered(&target, stored);
    }

    ctx.config.remember_session(&target, credentials.identifier());
    if let Err(e) = ctx.save_config() {
        warn!(error = %e, "Failed to save config");
    }

    match acquired.exports {
        Some(exports) => print!("{}", exports),
        None => println!("Authentication was successful and the session was saved."),
    }
    Ok(ExitCode::SUCCESS)
}

/// The session already exists when the password is stored, so keychain
/// trouble is reported without failing the command. Returns whether the
/// password was kept.
fn log_remembered(target: &Target, stored: webapi_core::Result<()>) -> bool {
    match stored {
        Ok(()) => {
            debug!(host = %target, "Password stored in keychain");
            true
        }
        Err(e) => {
            warn!(error = %e, "Failed to remember password");
            false
        }
    }
}

async fn call(ctx: &AppContext, args: CallArgs) -> Result<ExitCode> {
    let store = TokenStore::from_config(&ctx.config)?;
    let target = resolve_target(&args.target, &store, &ctx.config)?;

    let mut request = ApiRequest::new(args.method.clone(), args.path.clone())?;
    for (name, value) in &args.headers {
        request = request.header(name, value)?;
    }
    if let Some(ref body) = args.body {
        request = request.body(parse_body(body, args.raw)?);
    }

    let caller = ApiCaller::new(
        store,
        ctx.config.credential_applier(),
        ctx.config.client_options(),
    )?;

    if ctx.config.refresh_on_expiry {
        renew_if_needed(ctx, &caller, &target).await?;
    }

    if args.curl {
        println!("{}", caller.curl_command(&target, &request)?);
        return Ok(ExitCode::SUCCESS);
    }

    let response = caller.call(&target, &request).await?;

    let outcome = CallOutcome::from_status(response.status);
    if outcome.discard_token {
        info!(host = %target, "Unauthorized response, discarding stored token");
        caller.store().clear(&target)?;
    }

    if args.show_header || !response.is_success() {
        eprintln!("{}", status_line(&response));
    }
    if args.show_header {
        for line in header_lines(&response) {
            eprintln!("{}", line);
        }
        eprintln!();
    }
    println!("{}", render_body(&response, args.pretty));

    Ok(ExitCode::from(outcome.exit_code))
}

/// What `call` does once a response has arrived
#[derive(Debug, PartialEq, Eq)]
struct CallOutcome {
    exit_code: u8,
    /// The server no longer accepts the token; dropping it makes the next
    /// call ask for a new session instead of repeating the 401.
    discard_token: bool,
}

impl CallOutcome {
    fn from_status(status: StatusCode) -> Self {
        Self {
            exit_code: if status.is_success() { 0 } else { EXIT_HTTP_FAILURE },
            discard_token: status == StatusCode::UNAUTHORIZED,
        }
    }
}

/// Re-run acquisition with the keychain password when the stored token is
/// gone or expired. Only applies to the host and user of the last session.
async fn renew_if_needed(ctx: &AppContext, caller: &ApiCaller, target: &Target) -> Result<()> {
    let store = caller.store();
    match store.load(target) {
        Ok(_) => return Ok(()),
        Err(e) if e.needs_session() => {}
        Err(e) => return Err(e.into()),
    }
    if !matches!(store, TokenStore::File(_)) {
        return Ok(());
    }
    let Some(ref username) = ctx.config.last_username else {
        return Ok(());
    };
    if ctx.config.last_target().as_ref() != Some(target)
        || !SecretStore::has_credentials(target, username)
    {
        debug!(host = %target, "No remembered password, not renewing session");
        return Ok(());
    }

    info!(host = %target, "Session expired, renewing with remembered password");
    let password = SecretStore::get_password(target, username)?;
    let manager = SessionManager::new(authenticator(), store.clone());
    manager
        .acquire(target, &Credentials::new(username.clone(), password))
        .await?;
    Ok(())
}

fn logout(ctx: &AppContext, args: &TargetArgs) -> Result<ExitCode> {
    let store = TokenStore::from_config(&ctx.config)?;
    let target = resolve_target(args, &store, &ctx.config)?;

    store.clear(&target)?;
    if let Some(ref username) = ctx.config.last_username {
        if ctx.config.last_target().as_ref() == Some(&target) {
            if let Err(e) = SecretStore::delete(&target, username) {
                warn!(error = %e, "Failed to remove remembered password");
            }
        }
    }

    if matches!(store, TokenStore::Env(_)) {
        println!(
            "The token for {} comes from the environment; unset {}ACCESS_TOKEN to discard it.",
            target,
            ctx.config.env_prefix()
        );
    } else {
        println!("Session for {} was discarded.", target);
    }
    Ok(ExitCode::SUCCESS)
}

fn env(ctx: &AppContext) -> Result<ExitCode> {
    let store = TokenStore::from_config(&ctx.config)?;

    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Config file: {}", ctx.config_path.display());
    println!("Session directory: {}", ctx.config.session_dir().display());
    println!("Token store: {}", store.backend_name());
    println!("Environment prefix: {}", ctx.config.env_prefix());
    if let Some(target) = ctx.config.last_target() {
        println!("Last session: {}", target);
    }
    Ok(ExitCode::SUCCESS)
}

/// `--host`/`--port` when given, otherwise the host named by the env store,
/// otherwise the host of the last session.
fn resolve_target(args: &TargetArgs, store: &TokenStore, config: &Config) -> Result<Target> {
    if let Some(ref host) = args.host {
        return Ok(Target::new(host.clone(), args.port.unwrap_or(DEFAULT_PORT)));
    }
    if let Some(target) = store.default_target()? {
        return Ok(target);
    }
    if let Some(target) = config.last_target() {
        return Ok(target);
    }
    bail!("No host given and no previous session - run the 'session' subcommand first")
}
