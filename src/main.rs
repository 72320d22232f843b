use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use securevault::{ParameterSet, TokenStore, Vault, VaultError, constant_time_eq, format};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 time cost / iterations (default: 3)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 memory cost in KiB (default: 65536)
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2 parallelism (default: 4)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u8>,
}

impl Argon2Args {
    fn to_params(&self) -> Result<ParameterSet> {
        let default = ParameterSet::default();

        ParameterSet::new(
            self.time_cost.unwrap_or(default.time()),
            self.mem_cost_kib.unwrap_or(default.memory_kib()),
            self.parallelism.unwrap_or(default.parallelism()),
        )
        .context("invalid Argon2 parameters")
    }
}

#[derive(Debug, Parser)]
#[command(name = "securevault")]
#[command(
    version,
    about = "Encrypt data under a password into a self-describing text token."
)]
struct Cli {
    /// Directory holding named tokens (default: per-user documents folder)
    #[arg(long, global = true, value_name = "DIR", env = "SECUREVAULT_DIR")]
    store: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts TEXT (or stdin) and prints the token
    Encrypt {
        /// Plaintext; read from stdin when omitted
        text: Option<String>,

        /// Associated data bound to the token; must be repeated on decrypt
        #[arg(long, default_value = "")]
        aad: String,

        /// Save the token in the store under this name instead of printing it
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Decrypts a token and writes the plaintext to stdout
    Decrypt {
        /// Token; read from stdin when omitted and no --name is given
        #[arg(conflicts_with = "name")]
        token: Option<String>,

        /// Associated data supplied at encryption time
        #[arg(long, default_value = "")]
        aad: String,

        /// Load the token from the store
        #[arg(long)]
        name: Option<String>,
    },

    /// Shows the header of a token without decrypting it
    Inspect {
        #[arg(conflicts_with = "name")]
        token: Option<String>,

        #[arg(long)]
        name: Option<String>,
    },

    /// Compares two values in constant time; exits 1 when they differ
    #[command(arg_required_else_help = true)]
    Compare { a: String, b: String },

    /// Lists the names of stored tokens
    List,

    /// Prints the storage directory
    Path {
        /// Create the directory if it does not exist
        #[arg(long)]
        create: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn resolve_store(path: Option<PathBuf>, create: bool) -> Result<TokenStore> {
    match path {
        Some(p) => Ok(TokenStore::new(p)),
        None => TokenStore::open_default(create).context("could not open storage directory"),
    }
}

fn read_stdin() -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(Vec::new());
    io::stdin()
        .read_to_end(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

/// Token from the store, the argument, or stdin, in that order.
fn load_token(
    store: Option<PathBuf>,
    token: Option<String>,
    name: Option<String>,
) -> Result<String> {
    if let Some(name) = name {
        let store = resolve_store(store, false)?;
        return store
            .load(&name)
            .with_context(|| format!("failed to load token '{name}'"));
    }
    if let Some(token) = token {
        return Ok(token);
    }

    let raw = read_stdin()?;
    let token = std::str::from_utf8(&raw).context("token is not valid UTF-8")?;
    Ok(token.trim().to_string())
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Encrypt {
            text,
            aad,
            name,
            argon2,
        } => {
            let params = argon2.to_params()?;
            let password = auth::read_password(text.is_some())?;
            let vault = Vault::with_params(password, params)?;

            let plaintext = match text {
                Some(t) => Zeroizing::new(t.into_bytes()),
                None => read_stdin()?,
            };
            let token = vault
                .encrypt(&plaintext, aad.as_bytes())
                .context("encryption failed")?;

            match name {
                Some(name) => {
                    let store = resolve_store(args.store, true)?;
                    store
                        .save(&name, &token)
                        .with_context(|| format!("failed to save token '{name}'"))?;
                    println!("stored token '{name}'");
                }
                None => println!("{token}"),
            }
        }
        Commands::Decrypt { token, aad, name } => {
            let stdin_free = token.is_some() || name.is_some();
            let token = load_token(args.store, token, name)?;
            let password = auth::read_password(stdin_free)?;
            let vault = Vault::new(password)?;

            let plaintext = vault.decrypt(&token, aad.as_bytes())?;

            let mut out = io::stdout().lock();
            out.write_all(&plaintext)?;
            out.flush()?;
        }
        Commands::Inspect { token, name } => {
            let token = load_token(args.store, token, name)?;
            let envelope = format::from_token(&token).context("not a valid token")?;
            println!("{}", serde_json::to_string_pretty(&envelope.info())?);
        }
        Commands::Compare { a, b } => {
            if constant_time_eq(a.as_bytes(), b.as_bytes()) {
                println!("equal");
            } else {
                println!("different");
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List => {
            let names = match args.store {
                Some(dir) => TokenStore::new(dir).list()?,
                None => match TokenStore::open_default(false) {
                    Ok(store) => store.list()?,
                    Err(VaultError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
                    Err(e) => return Err(e).context("could not open storage directory"),
                },
            };
            if names.is_empty() {
                println!("No tokens stored.");
            }
            for name in names {
                println!("{name}");
            }
        }
        Commands::Path { create } => {
            let explicit = args.store.is_some();
            let store = resolve_store(args.store, create)?;
            if create && explicit {
                std::fs::create_dir_all(store.dir())?;
            }
            if !store.dir().is_dir() {
                bail!("storage directory {} does not exist", store.dir().display());
            }
            println!("{}", store.dir().display());
        }
    }

    Ok(ExitCode::SUCCESS)
}
